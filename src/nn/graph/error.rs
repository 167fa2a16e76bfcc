/*
 * @Author       : 老董
 * @Date         : 2026-02-05
 * @Description  : Graph 模块的错误类型
 */

use thiserror::Error;

use crate::errors::TensorError;
use crate::nn::NodeId;

/// Graph 操作错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// 参数本身不合法：行数关系、切片越界、重复次数为 0、序列标记落在堆叠组内部等
    #[error("参数不合法：{0}")]
    InvalidArgument(String),
    /// 维度或布局无法协调：列数不一致、布局冲突、无布局节点被要求按布局重排等
    #[error("逻辑错误：{0}")]
    LogicError(String),
    #[error("不支持的操作：{0}")]
    Unsupported(String),
    #[error("形状不匹配：{message}（期望{expected:?}，实际{got:?}）")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        message: String,
    },
    #[error("节点{0:?}不存在")]
    NodeNotFound(NodeId),
    #[error("节点名重复：{0}")]
    DuplicateNodeName(String),
    #[error("非法操作：{0}")]
    InvalidOperation(String),
    #[error("计算错误：{0}")]
    ComputationError(String),
    #[error(transparent)]
    Tensor(#[from] TensorError),
}
