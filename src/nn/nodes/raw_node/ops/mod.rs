mod reshape;
mod reshaping_base;
mod row_repeat;
mod row_slice;
mod row_stack;

pub(crate) use reshape::Reshape;
pub use reshaping_base::{stack, unstack};
pub(crate) use row_repeat::RowRepeat;
pub(crate) use row_slice::RowSlice;
pub(crate) use row_stack::RowStack;
