//! # Frame Reshape
//!
//! `frame_reshape`是计算图中一组按小批量布局（并行序列 × 时间步）重排矩阵的节点：
//! Reshape、RowSlice、RowStack、RowRepeat，以及它们各自的梯度。
//! 其中 Reshape 在带布局时把相邻的若干时间步堆叠成一步（或反过来拆开），
//! 整段对齐的时间窗口只需一次张量重排即可完成。
//!

pub mod errors;
pub mod nn;
pub mod tensor;
pub mod utils;
