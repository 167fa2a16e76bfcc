use ndarray::ScalarOperand;
use num_traits::Float;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::{Debug, Display};
use std::ops::AddAssign;

/// 矩阵元素类型：32 位或 64 位浮点数
pub trait Element:
    Float
    + ScalarOperand
    + AddAssign
    + Default
    + Debug
    + Display
    + Send
    + Sync
    + Serialize
    + DeserializeOwned
    + 'static
{
}

impl Element for f32 {}
impl Element for f64 {}
