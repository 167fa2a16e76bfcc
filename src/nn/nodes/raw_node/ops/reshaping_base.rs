/*
 * @Author       : 老董
 * @Date         : 2026-02-07
 * @Description  : 按小批量布局堆叠（stack）/拆分（unstack）时间步
 *
 * 短网格：D 行，S 条序列 × K·T 个时间步；
 * 高网格：K·D 行，S 条序列 × T 个时间步，
 * 短网格第 t 步落在高网格第 t/K 步的第 (t%K) 个行带。
 *
 * 把矩阵按列优先展平后，短网格的下标为 (D, S, M, K, T)，高网格为 (D, K, M, S, T)（M = 1），
 * 因此整段对齐的时间窗口只需一次张量重排；不对齐的窗口逐步按行带搬运。
 */

use std::ops::Range;

use crate::nn::GraphError;
use crate::nn::layout::{FrameRange, MbLayout, TimeWindow};
use crate::tensor::{Matrix, ShuffleDims};
use crate::utils::traits::float::Element;

/// 把`from`（短网格）堆叠进`to`（高网格）。
///
/// `frame`按`to`的布局`to_layout`解释；`num_stack`即每组堆叠的时间步数 K。
/// `add_to`时结果累加到`to`原有的内容上。
///
/// 例：D=2，S=2，K=3，两条序列依次为`abcdef`与`uvwxyz`。
/// 把`from`按列优先看作 D 行的矩阵时为`aubvcw dxeyfz`，
/// 把堆叠后的`to`同样看作 D 行时为`abcuvw defxyz`。
pub fn stack<T: Element>(
    frame: FrameRange,
    from: &Matrix<T>,
    to: &mut Matrix<T>,
    to_layout: &MbLayout,
    num_stack: usize,
    add_to: bool,
) -> Result<(), GraphError> {
    let window = TimeWindow::from_tall_frame(frame, to_layout, num_stack)?;
    stack_window(
        window,
        from,
        to,
        to_layout.num_parallel_sequences(),
        num_stack,
        add_to,
    )
}

/// [`stack`]的逆：把`from`（高网格）拆回`to`（短网格），`frame`按`to`的布局解释
pub fn unstack<T: Element>(
    frame: FrameRange,
    from: &Matrix<T>,
    to: &mut Matrix<T>,
    to_layout: &MbLayout,
    num_stack: usize,
    add_to: bool,
) -> Result<(), GraphError> {
    let window = TimeWindow::from_short_frame(frame, to_layout)?;
    unstack_window(
        window,
        from,
        to,
        to_layout.num_parallel_sequences(),
        num_stack,
        add_to,
    )
}

/// 短网格时间窗口`window`：`short`的对应列 → `tall`的对应列与行带
pub(crate) fn stack_window<T: Element>(
    window: TimeWindow,
    short: &Matrix<T>,
    tall: &mut Matrix<T>,
    num_seqs: usize,
    num_stack: usize,
    add_to: bool,
) -> Result<(), GraphError> {
    let d = check_grids(short, tall, num_stack)?;
    if let Some(dims) = whole_groups(window, num_seqs, num_stack, d) {
        let (short_cols, tall_cols) = group_cols(window, num_seqs, num_stack);
        tall.shuffle_cols_from(tall_cols, short, short_cols, dims, add_to)?;
        return Ok(());
    }
    for t in window.begin..window.begin + window.len {
        let (short_cols, tall_cols) = step_cols(t, window.seq, num_seqs, num_stack);
        let band = (t % num_stack) * d;
        if add_to {
            tall.add_to_row_slice_values_of(tall_cols, short, short_cols, band, d)?;
        } else {
            tall.assign_to_row_slice_values_of(tall_cols, short, short_cols, band)?;
        }
    }
    Ok(())
}

/// 短网格时间窗口`window`：`tall`的对应列与行带 → `short`的对应列
pub(crate) fn unstack_window<T: Element>(
    window: TimeWindow,
    tall: &Matrix<T>,
    short: &mut Matrix<T>,
    num_seqs: usize,
    num_stack: usize,
    add_to: bool,
) -> Result<(), GraphError> {
    let d = check_grids(short, tall, num_stack)?;
    if let Some(dims) = whole_groups(window, num_seqs, num_stack, d) {
        let (short_cols, tall_cols) = group_cols(window, num_seqs, num_stack);
        short.shuffle_cols_from(short_cols, tall, tall_cols, dims.inverse(), add_to)?;
        return Ok(());
    }
    for t in window.begin..window.begin + window.len {
        let (short_cols, tall_cols) = step_cols(t, window.seq, num_seqs, num_stack);
        let band = (t % num_stack) * d;
        if add_to {
            short.add_with_row_slice_values_of(short_cols, tall, tall_cols, band)?;
        } else {
            short.assign_row_slice_values_of(short_cols, tall, tall_cols, band, d)?;
        }
    }
    Ok(())
}

/// 返回短网格的行数 D
fn check_grids<T: Element>(
    short: &Matrix<T>,
    tall: &Matrix<T>,
    num_stack: usize,
) -> Result<usize, GraphError> {
    let d = short.rows();
    if num_stack == 0 || d * num_stack != tall.rows() {
        return Err(GraphError::LogicError(format!(
            "堆叠前后的行数不符：短网格{}行 × K={num_stack} 应等于高网格的{}行",
            d,
            tall.rows()
        )));
    }
    Ok(d)
}

/// 窗口覆盖整组（起点和长度都是 K 的倍数）且不限定序列时，可以一次重排完成
fn whole_groups(
    window: TimeWindow,
    num_seqs: usize,
    num_stack: usize,
    d: usize,
) -> Option<ShuffleDims> {
    if window.seq.is_some() || window.begin % num_stack != 0 || window.len % num_stack != 0 {
        return None;
    }
    Some(ShuffleDims::new(
        d,
        num_seqs,
        1,
        num_stack,
        window.len / num_stack,
    ))
}

fn group_cols(
    window: TimeWindow,
    num_seqs: usize,
    num_stack: usize,
) -> (Range<usize>, Range<usize>) {
    let short_cols = window.begin * num_seqs..(window.begin + window.len) * num_seqs;
    let tall_begin = window.begin / num_stack;
    let tall_end = (window.begin + window.len) / num_stack;
    (short_cols, tall_begin * num_seqs..tall_end * num_seqs)
}

/// 短网格第`t`步（可限定序列）对应的短、高网格列区间
fn step_cols(
    t: usize,
    seq: Option<usize>,
    num_seqs: usize,
    num_stack: usize,
) -> (Range<usize>, Range<usize>) {
    let tall_t = t / num_stack;
    match seq {
        None => (
            t * num_seqs..(t + 1) * num_seqs,
            tall_t * num_seqs..(tall_t + 1) * num_seqs,
        ),
        Some(s) => (
            t * num_seqs + s..t * num_seqs + s + 1,
            tall_t * num_seqs + s..tall_t * num_seqs + s + 1,
        ),
    }
}
