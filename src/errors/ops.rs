use std::fmt::{self, Display};

/// 矩阵的二元（写入型）运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Assign,
    AddAssign,
    RowSliceAssign,
    RowSliceAddAssign,
    RepeatAssign,
    RepeatAddAssign,
    Shuffle,
}
impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operation_name = match self {
            Operator::Assign => "赋值",
            Operator::AddAssign => "累加",
            Operator::RowSliceAssign => "按行切片赋值",
            Operator::RowSliceAddAssign => "按行切片累加",
            Operator::RepeatAssign => "按行重复赋值",
            Operator::RepeatAddAssign => "按行重复累加",
            Operator::Shuffle => "张量重排",
        };
        write!(f, "{}", operation_name)
    }
}
