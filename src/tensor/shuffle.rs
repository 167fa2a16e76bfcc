/*
 * @Author       : 老董
 * @Date         : 2026-02-04
 * @Description  : 张量重排（tensor shuffle）：交换 (D, S, M, K, T) 中 S 与 K 两组维度
 */

use std::borrow::Cow;
use std::ops::Range;

use ndarray::{ArrayView2, ArrayView5, ArrayViewMut5, ShapeBuilder, Zip};

use super::Matrix;
use crate::errors::{Operator, TensorError};
use crate::utils::traits::float::Element;

/// 重排的五组维度，按列优先从最内层到最外层排列：
/// - 输入视为 `(D, S, M, K, T)`
/// - 输出视为 `(D, K, M, S, T)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShuffleDims {
    pub d: usize,
    pub s: usize,
    pub m: usize,
    pub k: usize,
    pub t: usize,
}

impl ShuffleDims {
    pub const fn new(d: usize, s: usize, m: usize, k: usize, t: usize) -> Self {
        Self { d, s, m, k, t }
    }

    /// 元素总数
    pub const fn len(&self) -> usize {
        self.d * self.s * self.m * self.k * self.t
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 逆重排的维度：S 与 K 互换后再做一次同样的重排即可还原
    pub const fn inverse(&self) -> Self {
        Self::new(self.d, self.k, self.m, self.s, self.t)
    }

    fn mismatch(&self, len: usize) -> TensorError {
        TensorError::ShuffleDimsMismatch {
            d: self.d,
            s: self.s,
            m: self.m,
            k: self.k,
            t: self.t,
            len,
        }
    }
}

/// `c = beta * c + alpha * shuffle(a)`，`a`、`c`均为列优先的扁平缓冲区。
///
/// `a`视为列优先的`(D, S, M, K, T)`五维数组，交换 S、K 两轴后按`(D, K, M, S, T)`写入`c`。
/// `beta`为零时不读取`c`原有的内容。
pub fn tensor_shuffle_scale_and_add<T: Element>(
    beta: T,
    a: &[T],
    dims: ShuffleDims,
    alpha: T,
    c: &mut [T],
) -> Result<(), TensorError> {
    if a.len() != dims.len() {
        return Err(dims.mismatch(a.len()));
    }
    if c.len() != dims.len() {
        return Err(dims.mismatch(c.len()));
    }
    let ShuffleDims { d, s, m, k, t } = dims;
    let src = ArrayView5::from_shape((d, s, m, k, t).f(), a)
        .map_err(|_| dims.mismatch(dims.len()))?
        .permuted_axes([0, 3, 2, 1, 4]);
    let mut dst = ArrayViewMut5::from_shape((d, k, m, s, t).f(), c)
        .map_err(|_| dims.mismatch(dims.len()))?;
    if beta == T::zero() {
        Zip::from(&mut dst).and(&src).for_each(|y, &x| *y = alpha * x);
    } else {
        Zip::from(&mut dst)
            .and(&src)
            .for_each(|y, &x| *y = beta * *y + alpha * x);
    }
    Ok(())
}

impl<T: Element> Matrix<T> {
    /// 把`src[:, src_cols]`按`dims`重排后写入（或在`add_to`时累加到）`self[:, dst_cols]`。
    ///
    /// 两个列区间都被看作列优先的扁平缓冲区，
    /// 因此二者的行数可以不同，只要元素总数都等于`dims.len()`
    pub fn shuffle_cols_from(
        &mut self,
        dst_cols: Range<usize>,
        src: &Self,
        src_cols: Range<usize>,
        dims: ShuffleDims,
        add_to: bool,
    ) -> Result<(), TensorError> {
        let src_rows = src.rows();
        let a = col_major_data(src.cols_view(src_cols)?);
        let dst_block = self.cols_view_mut(dst_cols)?;
        if dst_block.len() != a.len() {
            return Err(TensorError::OperatorError {
                operator: Operator::Shuffle,
                matrix1_shape: [dst_block.nrows(), dst_block.ncols()],
                matrix2_shape: [src_rows, a.len() / src_rows.max(1)],
            });
        }
        let beta = if add_to { T::one() } else { T::zero() };
        // 列优先存储的整列区间在内存中连续，可直接就地写入
        let mut dst_block = dst_block.reversed_axes();
        if let Some(c) = dst_block.as_slice_mut() {
            return tensor_shuffle_scale_and_add(beta, &a, dims, T::one(), c);
        }
        let mut c: Vec<T> = dst_block.iter().copied().collect();
        tensor_shuffle_scale_and_add(beta, &a, dims, T::one(), &mut c)?;
        for (y, x) in dst_block.iter_mut().zip(c) {
            *y = x;
        }
        Ok(())
    }
}

/// 按列优先顺序取出一个列区间的元素；区间在内存中连续时不复制
fn col_major_data<T: Element>(block: ArrayView2<'_, T>) -> Cow<'_, [T]> {
    let transposed = block.reversed_axes();
    match transposed.to_slice() {
        Some(slice) => Cow::Borrowed(slice),
        None => Cow::Owned(transposed.iter().copied().collect()),
    }
}
