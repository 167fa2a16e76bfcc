use super::Matrix;
use crate::errors::{Operator, TensorError};
use crate::utils::traits::float::Element;

impl<T: Element> Matrix<T> {
    /// 把矩阵按列优先顺序视为一个长向量，重新解释为`rows × cols`的新矩阵（返回副本）。
    /// 这只是形状的重新解释，不是元素的置换
    pub fn reshaped(&self, rows: usize, cols: usize) -> Result<Self, TensorError> {
        if rows * cols != self.size() {
            return Err(TensorError::ElementCountMismatch {
                data_len: self.size(),
                shape: [rows, cols],
                expected: rows * cols,
            });
        }
        Self::from_col_major_vec(self.to_col_major_vec(), rows, cols)
    }

    /// 调整为`rows × cols`：形状不变时保留内容，否则重新分配为全零
    pub fn resize(&mut self, rows: usize, cols: usize) {
        if self.shape() != [rows, cols] {
            *self = Self::zeros(rows, cols);
        }
    }

    /// 所有元素置零（形状不变）
    pub fn set_zero(&mut self) {
        self.data.fill(T::zero());
    }

    /// 整体赋值：`self = other`（形状须一致）
    pub fn assign(&mut self, other: &Self) -> Result<(), TensorError> {
        self.check_same_shape(other, Operator::Assign)?;
        self.data.assign(&other.data);
        Ok(())
    }

    /// 整体累加：`self += other`（形状须一致）
    pub fn add_assign(&mut self, other: &Self) -> Result<(), TensorError> {
        self.check_same_shape(other, Operator::AddAssign)?;
        self.data += &other.data;
        Ok(())
    }

    fn check_same_shape(&self, other: &Self, operator: Operator) -> Result<(), TensorError> {
        if !self.is_same_shape(other) {
            return Err(TensorError::OperatorError {
                operator,
                matrix1_shape: self.shape(),
                matrix2_shape: other.shape(),
            });
        }
        Ok(())
    }
}
