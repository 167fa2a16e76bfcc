/*
 * @Author       : 老董
 * @Date         : 2026-02-03
 * @Description  : 本文件仅包含一些属性方法，不包含任何运算方法，所以不会需要用到mut
 */

use super::Matrix;
use crate::utils::traits::float::Element;

impl<T: Element> Matrix<T> {
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// `[rows, cols]`
    pub fn shape(&self) -> [usize; 2] {
        [self.rows(), self.cols()]
    }

    /// 矩阵中所有元素的数量
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_same_shape(&self, other: &Self) -> bool {
        self.shape() == other.shape()
    }

    /// 取第`row`行第`col`列的元素，越界返回None
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        self.data.get((row, col)).copied()
    }

    /// 按列优先顺序导出所有元素
    pub fn to_col_major_vec(&self) -> Vec<T> {
        self.data.t().iter().copied().collect()
    }

    /// 按行优先顺序导出所有元素
    pub fn to_row_major_vec(&self) -> Vec<T> {
        self.data.iter().copied().collect()
    }

    /// 所有元素的和
    pub fn sum(&self) -> T {
        self.data.sum()
    }
}
