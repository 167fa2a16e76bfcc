/*
 * @Author       : 老董
 * @Date         : 2026-02-03
 * @Description  : 列优先（column-major）的二维稠密矩阵，是所有重排节点的数据载体
 */

use ndarray::{Array2, ShapeBuilder};
use rand::distributions::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::errors::TensorError;
use crate::utils::traits::float::Element;

mod property;
mod save_load;
mod shape;
mod shuffle;
mod slice;

pub use shuffle::{ShuffleDims, tensor_shuffle_scale_and_add};

#[cfg(test)]
mod tests;

/// 二维稠密矩阵 `rows × cols`。
///
/// 元素按列优先排列：第`c`列的第`r`个元素在扁平存储中的下标为`c * rows + r`。
/// 当矩阵挂有小批量布局时，列按`t * S + s`编号（同一时间步内各并行序列相邻）。
///
/// 注：所有“扁平”的读写（整体reshape、张量重排）都按列优先的逻辑顺序进行，
/// 与底层`ndarray`的实际内存顺序无关。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Element")]
pub struct Matrix<T: Element = f32> {
    data: Array2<T>,
}

impl<T: Element> Matrix<T> {
    /// 用列优先的数据创建矩阵，`data`的长度必须等于`rows * cols`
    pub fn try_new(data: &[T], rows: usize, cols: usize) -> Result<Self, TensorError> {
        Self::from_col_major_vec(data.to_vec(), rows, cols)
    }

    /// 用列优先的数据创建矩阵，便于书写字面量数据。
    ///
    /// # Panics
    /// 元素个数不等于`rows * cols`时panic；数据来自外部时请使用[`Matrix::try_new`]
    pub fn new(data: &[T], rows: usize, cols: usize) -> Self {
        match Self::try_new(data, rows, cols) {
            Ok(matrix) => matrix,
            Err(e) => panic!("{e}"),
        }
    }

    /// 用行优先的数据创建矩阵（书写测试数据时更直观）
    pub fn try_from_row_major(data: &[T], rows: usize, cols: usize) -> Result<Self, TensorError> {
        let row_major = Array2::from_shape_vec((rows, cols), data.to_vec()).map_err(|_| {
            TensorError::ElementCountMismatch {
                data_len: data.len(),
                shape: [rows, cols],
                expected: rows * cols,
            }
        })?;
        let mut col_major = Array2::zeros((rows, cols).f());
        col_major.assign(&row_major);
        Ok(Self { data: col_major })
    }

    /// # Panics
    /// 元素个数不等于`rows * cols`时panic；数据来自外部时请使用[`Matrix::try_from_row_major`]
    pub fn from_row_major(data: &[T], rows: usize, cols: usize) -> Self {
        match Self::try_from_row_major(data, rows, cols) {
            Ok(matrix) => matrix,
            Err(e) => panic!("{e}"),
        }
    }

    pub(crate) fn from_col_major_vec(
        data: Vec<T>,
        rows: usize,
        cols: usize,
    ) -> Result<Self, TensorError> {
        if data.len() != rows * cols {
            return Err(TensorError::ElementCountMismatch {
                data_len: data.len(),
                shape: [rows, cols],
                expected: rows * cols,
            });
        }
        let data = Array2::from_shape_vec((rows, cols).f(), data).map_err(|_| {
            TensorError::ElementCountMismatch {
                data_len: rows * cols,
                shape: [rows, cols],
                expected: rows * cols,
            }
        })?;
        Ok(Self { data })
    }

    /// 全零矩阵
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::zeros((rows, cols).f()),
        }
    }

    /// 创建一个随机矩阵，其值在[min, max]的闭区间
    pub fn new_random(min: T, max: T, rows: usize, cols: usize) -> Self
    where
        T: rand::distributions::uniform::SampleUniform,
    {
        let mut rng = rand::thread_rng();
        let uniform = Uniform::new_inclusive(min, max);
        let data = (0..rows * cols)
            .map(|_| uniform.sample(&mut rng))
            .collect::<Vec<_>>();
        Self {
            data: Array2::from_shape_fn((rows, cols).f(), |(r, c)| data[c * rows + r]),
        }
    }
}
