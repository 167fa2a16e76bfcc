/*
 * @Author       : 老董
 * @Date         : 2026-02-03
 * @Description  : 按列区间（帧）与行区间（行带）读写矩阵
 *
 * 所有方法都形如 `dst.xxx(dst_cols, src, src_cols, ...)`：
 * `dst_cols`/`src_cols` 分别是目标矩阵和源矩阵上的列区间，二者列数必须相同。
 */

use std::ops::Range;

use ndarray::{ArrayView2, ArrayViewMut2, s};

use super::Matrix;
use crate::errors::{Operator, TensorError};
use crate::utils::traits::float::Element;

impl<T: Element> Matrix<T> {
    /// 取列区间的只读视图
    pub fn cols_view(&self, cols: Range<usize>) -> Result<ArrayView2<'_, T>, TensorError> {
        self.check_cols(&cols)?;
        Ok(self.data.slice(s![.., cols]))
    }

    /// 取列区间的可写视图
    pub fn cols_view_mut(
        &mut self,
        cols: Range<usize>,
    ) -> Result<ArrayViewMut2<'_, T>, TensorError> {
        self.check_cols(&cols)?;
        Ok(self.data.slice_mut(s![.., cols]))
    }

    /// 取列区间的副本
    pub fn cols_slice(&self, cols: Range<usize>) -> Result<Self, TensorError> {
        Ok(Self {
            data: self.cols_view(cols)?.to_owned(),
        })
    }

    /// `self[:, dst_cols] = src[:, src_cols]`，或在`add_to`时累加
    pub fn assign_cols_of(
        &mut self,
        dst_cols: Range<usize>,
        src: &Self,
        src_cols: Range<usize>,
        add_to: bool,
    ) -> Result<(), TensorError> {
        let operator = if add_to {
            Operator::AddAssign
        } else {
            Operator::Assign
        };
        let src_block = src.cols_view(src_cols)?;
        let mut dst_block = self.cols_view_mut(dst_cols)?;
        check_block(operator, dst_block.dim(), src_block.dim())?;
        if add_to {
            dst_block += &src_block;
        } else {
            dst_block.assign(&src_block);
        }
        Ok(())
    }

    /// `self[:, dst_cols] = src[start_row .. start_row+num_rows, src_cols]`
    pub fn assign_row_slice_values_of(
        &mut self,
        dst_cols: Range<usize>,
        src: &Self,
        src_cols: Range<usize>,
        start_row: usize,
        num_rows: usize,
    ) -> Result<(), TensorError> {
        src.check_rows(start_row, num_rows)?;
        let src_block = src
            .cols_view(src_cols)?
            .slice_move(s![start_row..start_row + num_rows, ..]);
        let mut dst_block = self.cols_view_mut(dst_cols)?;
        check_block(Operator::RowSliceAssign, dst_block.dim(), src_block.dim())?;
        dst_block.assign(&src_block);
        Ok(())
    }

    /// `self[start_row .. start_row+num_rows, dst_cols] += src[:, src_cols]`
    pub fn add_to_row_slice_values_of(
        &mut self,
        dst_cols: Range<usize>,
        src: &Self,
        src_cols: Range<usize>,
        start_row: usize,
        num_rows: usize,
    ) -> Result<(), TensorError> {
        self.row_band_from(dst_cols, src, src_cols, start_row, num_rows, true)
    }

    /// `self[start_row .. start_row+src.rows, dst_cols] = src[:, src_cols]`
    pub fn assign_to_row_slice_values_of(
        &mut self,
        dst_cols: Range<usize>,
        src: &Self,
        src_cols: Range<usize>,
        start_row: usize,
    ) -> Result<(), TensorError> {
        self.row_band_from(dst_cols, src, src_cols, start_row, src.rows(), false)
    }

    /// `self[:, dst_cols] += src[start_row .. start_row+self.rows, src_cols]`
    pub fn add_with_row_slice_values_of(
        &mut self,
        dst_cols: Range<usize>,
        src: &Self,
        src_cols: Range<usize>,
        start_row: usize,
    ) -> Result<(), TensorError> {
        let num_rows = self.rows();
        src.check_rows(start_row, num_rows)?;
        let src_block = src
            .cols_view(src_cols)?
            .slice_move(s![start_row..start_row + num_rows, ..]);
        let mut dst_block = self.cols_view_mut(dst_cols)?;
        check_block(Operator::RowSliceAddAssign, dst_block.dim(), src_block.dim())?;
        dst_block += &src_block;
        Ok(())
    }

    /// 将`src[:, src_cols]`沿行方向平铺`num_repeat`次写入`self[:, dst_cols]`：
    /// 输出第`i`行 = 输入第`i mod src.rows`行
    pub fn assign_repeat_of(
        &mut self,
        dst_cols: Range<usize>,
        src: &Self,
        src_cols: Range<usize>,
        num_repeat: usize,
    ) -> Result<(), TensorError> {
        let band = src.rows();
        if self.rows() != band * num_repeat {
            return Err(TensorError::OperatorError {
                operator: Operator::RepeatAssign,
                matrix1_shape: self.shape(),
                matrix2_shape: src.shape(),
            });
        }
        for k in 0..num_repeat {
            self.row_band_from(dst_cols.clone(), src, src_cols.clone(), k * band, band, false)?;
        }
        Ok(())
    }

    /// `assign_repeat_of`的梯度：`self[i, dst_cols] += Σ_k src[i + k*self.rows, src_cols]`
    pub fn add_to_row_repeat_values_of(
        &mut self,
        dst_cols: Range<usize>,
        src: &Self,
        src_cols: Range<usize>,
        num_repeat: usize,
    ) -> Result<(), TensorError> {
        let band = self.rows();
        if src.rows() != band * num_repeat {
            return Err(TensorError::OperatorError {
                operator: Operator::RepeatAddAssign,
                matrix1_shape: self.shape(),
                matrix2_shape: src.shape(),
            });
        }
        for k in 0..num_repeat {
            self.add_with_row_slice_values_of(dst_cols.clone(), src, src_cols.clone(), k * band)?;
        }
        Ok(())
    }

    /// 把`src[:, src_cols]`写入（或累加到）`self`的行带`[start_row, start_row+num_rows)`
    fn row_band_from(
        &mut self,
        dst_cols: Range<usize>,
        src: &Self,
        src_cols: Range<usize>,
        start_row: usize,
        num_rows: usize,
        add_to: bool,
    ) -> Result<(), TensorError> {
        self.check_rows(start_row, num_rows)?;
        let operator = if add_to {
            Operator::RowSliceAddAssign
        } else {
            Operator::RowSliceAssign
        };
        let src_block = src.cols_view(src_cols)?;
        let mut dst_block = self
            .cols_view_mut(dst_cols)?
            .slice_move(s![start_row..start_row + num_rows, ..]);
        check_block(operator, dst_block.dim(), src_block.dim())?;
        if add_to {
            dst_block += &src_block;
        } else {
            dst_block.assign(&src_block);
        }
        Ok(())
    }

    pub(crate) fn check_cols(&self, cols: &Range<usize>) -> Result<(), TensorError> {
        if cols.start > cols.end || cols.end > self.cols() {
            return Err(TensorError::ColRangeOutOfBounds {
                start: cols.start,
                end: cols.end,
                cols: self.cols(),
            });
        }
        Ok(())
    }

    pub(crate) fn check_rows(&self, start_row: usize, num_rows: usize) -> Result<(), TensorError> {
        if start_row + num_rows > self.rows() {
            return Err(TensorError::RowRangeOutOfBounds {
                start: start_row,
                end: start_row + num_rows,
                rows: self.rows(),
            });
        }
        Ok(())
    }
}

fn check_block(
    operator: Operator,
    dst: (usize, usize),
    src: (usize, usize),
) -> Result<(), TensorError> {
    if dst != src {
        return Err(TensorError::OperatorError {
            operator,
            matrix1_shape: [dst.0, dst.1],
            matrix2_shape: [src.0, src.1],
        });
    }
    Ok(())
}
