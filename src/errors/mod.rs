use thiserror::Error;
mod ops;
pub use self::ops::*;

/// 矩阵（`Matrix`）层面的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    // 矩阵二元运算
    #[error(
        "形状不一致，故无法{operator}：第一个矩阵的形状为{matrix1_shape:?}，第二个矩阵的形状为{matrix2_shape:?}"
    )]
    OperatorError {
        operator: Operator,
        matrix1_shape: [usize; 2],
        matrix2_shape: [usize; 2],
    },
    #[error("元素个数不一致：数据有{data_len}个元素，而形状{shape:?}需要{expected}个")]
    ElementCountMismatch {
        data_len: usize,
        shape: [usize; 2],
        expected: usize,
    },
    #[error("行区间[{start}, {end})超出矩阵的行数{rows}")]
    RowRangeOutOfBounds { start: usize, end: usize, rows: usize },
    #[error("列区间[{start}, {end})超出矩阵的列数{cols}")]
    ColRangeOutOfBounds { start: usize, end: usize, cols: usize },
    #[error("张量重排的维度(D={d}, S={s}, M={m}, K={k}, T={t})与数据长度{len}不符")]
    ShuffleDimsMismatch {
        d: usize,
        s: usize,
        m: usize,
        k: usize,
        t: usize,
        len: usize,
    },
    #[error("矩阵序列化失败：{0}")]
    Serialization(String),
}
