/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : Reshape 节点单元测试（无布局、堆叠、拆分、无操作四种情形）
 */

use std::sync::Arc;

use approx::assert_abs_diff_eq;

use crate::assert_err;
use crate::nn::{
    FrameRange, Graph, GraphError, ImageLayout, MbLayout, NodeId, PackingFlags, stack, unstack,
};
use crate::tensor::Matrix;

/// 每个字符按其码位转成数值，便于直接对照字母排列
fn letters(rows: &[&str]) -> Matrix {
    let cols = rows[0].len();
    let data: Vec<f32> = rows
        .iter()
        .flat_map(|row| row.chars().map(|c| c as u32 as f32))
        .collect();
    Matrix::from_row_major(&data, rows.len(), cols)
}

fn seq(len: usize) -> Vec<f32> {
    (1..=len).map(|x| x as f32).collect()
}

// ==================== 无布局：整体重新解释 ====================

#[test]
fn test_reshape_flat_round_trip() -> Result<(), GraphError> {
    let mut graph: Graph = Graph::new();
    let input = graph.new_input_node(2, 6, Some("input"))?;
    let tall = graph.new_reshape_node(input, 3, None, Some("tall"))?;
    let back = graph.new_reshape_node(tall, 2, None, Some("back"))?;

    let value: Matrix = Matrix::new(&seq(12), 2, 6);
    graph.set_input_value(input, &value, None)?;
    graph.forward(back)?;

    // 列优先的扁平顺序不变
    let expected_tall: Matrix = Matrix::new(&seq(12), 3, 4);
    assert_eq!(graph.get_node_value(tall)?.unwrap(), &expected_tall);
    assert_eq!(graph.get_node_value(back)?.unwrap(), &value);
    assert_eq!(graph.get_node_shape(tall)?, [3, 4]);
    assert!(graph.get_node_layout(tall)?.is_none());
    Ok(())
}

#[test]
fn test_reshape_flat_backward() -> Result<(), GraphError> {
    let mut graph: Graph = Graph::new();
    let input = graph.new_input_node(2, 6, None)?;
    let tall = graph.new_reshape_node(input, 4, None, None)?;
    graph.set_input_value(input, &Matrix::new(&seq(12), 2, 6), None)?;
    graph.forward(tall)?;

    let seed: Matrix = Matrix::new(&seq(12), 4, 3);
    graph.backward(tall, &seed)?;
    let expected: Matrix = Matrix::new(&seq(12), 2, 6);
    assert_eq!(graph.get_node_grad(input)?.unwrap(), &expected);
    Ok(())
}

#[test]
fn test_reshape_flat_rejects_frame_range() -> Result<(), GraphError> {
    let mut graph: Graph = Graph::new();
    let input = graph.new_input_node(2, 6, None)?;
    let tall = graph.new_reshape_node(input, 4, None, None)?;
    graph.forward(tall)?;

    assert_err!(
        graph.forward_frame(tall, FrameRange::at(0)),
        GraphError::Unsupported(_)
    );
    Ok(())
}

#[test]
fn test_reshape_flat_element_count_not_divisible() -> Result<(), GraphError> {
    let mut graph: Graph = Graph::new();
    let input = graph.new_input_node(2, 3, None)?;
    // 4 是 2 的倍数，但 2×3 个元素无法排成 4 行
    let reshape = graph.new_reshape_node(input, 4, None, Some("reshape"))?;

    assert_err!(graph.forward(reshape), GraphError::LogicError(msg) if msg.contains("reshape"));
    Ok(())
}

#[test]
fn test_reshape_row_relationship() -> Result<(), GraphError> {
    let mut graph: Graph = Graph::new();
    let input = graph.new_input_node(4, 6, None)?;
    let reshape = graph.new_reshape_node(input, 3, None, Some("bad"))?;

    assert_err!(
        graph.validate(),
        GraphError::InvalidArgument(msg)
            if msg.contains("bad") && msg.contains('3') && msg.contains('4')
    );
    assert_err!(
        graph.new_reshape_node(reshape, 0, None, None),
        GraphError::InvalidArgument(_)
    );
    Ok(())
}

// ==================== 堆叠/拆分原语 ====================

#[test]
fn test_stack_worked_example() -> Result<(), GraphError> {
    // D=2，S=2，K=3，两个目标时间步
    let short = letters(&["aubvcwdxeyfz", "AUBVCWDXEYFZ"]);
    let expected = letters(&["abcuvwdefxyz", "ABCUVWDEFXYZ"]).reshaped(6, 4)?;

    let tall_layout = MbLayout::new(2, 2);
    let mut tall = Matrix::zeros(6, 4);
    stack(FrameRange::AllFrames, &short, &mut tall, &tall_layout, 3, false)?;
    assert_eq!(tall, expected);

    // 逆变换还原输入
    let short_layout = MbLayout::new(2, 6);
    let mut restored = Matrix::zeros(2, 12);
    unstack(FrameRange::AllFrames, &tall, &mut restored, &short_layout, 3, false)?;
    assert_eq!(restored, short);

    // 累加模式
    stack(FrameRange::AllFrames, &short, &mut tall, &tall_layout, 3, true)?;
    assert_eq!(tall.get(0, 0), Some(2.0 * 'a' as u32 as f32));
    Ok(())
}

#[test]
fn test_stack_grid_mismatch() {
    let short: Matrix = Matrix::zeros(2, 12);
    let mut tall = Matrix::zeros(5, 4);
    assert_err!(
        stack(FrameRange::AllFrames, &short, &mut tall, &MbLayout::new(2, 2), 3, false),
        GraphError::LogicError(_)
    );
}

#[test]
fn test_stack_per_frame_matches_all_frames() -> Result<(), GraphError> {
    let (s, t, d, k) = (3, 2, 2, 2);
    let short: Matrix = Matrix::new_random(-1.0, 1.0, d, s * t * k);
    let tall_layout = MbLayout::new(s, t);
    let mut expected = Matrix::zeros(d * k, s * t);
    stack(FrameRange::AllFrames, &short, &mut expected, &tall_layout, k, false)?;

    let mut by_frame = Matrix::zeros(d * k, s * t);
    for step in 0..t {
        stack(FrameRange::at(step), &short, &mut by_frame, &tall_layout, k, false)?;
    }
    assert_eq!(by_frame, expected);

    let mut by_sequence = Matrix::zeros(d * k, s * t);
    for step in 0..t {
        for sequence in 0..s {
            let frame = FrameRange::at(step).with_sequence(sequence);
            stack(frame, &short, &mut by_sequence, &tall_layout, k, false)?;
        }
    }
    assert_eq!(by_sequence, expected);

    assert_err!(
        stack(FrameRange::at(t), &short, &mut by_frame, &tall_layout, k, false),
        GraphError::InvalidArgument(_)
    );
    Ok(())
}

#[test]
fn test_unstack_single_short_frame() -> Result<(), GraphError> {
    // 短网格的单步不覆盖整组，由所在高网格帧的行带提供
    let (s, t, d, k) = (2, 2, 3, 3);
    let short: Matrix = Matrix::new_random(-1.0, 1.0, d, s * t * k);
    let mut tall = Matrix::zeros(d * k, s * t);
    stack(FrameRange::AllFrames, &short, &mut tall, &MbLayout::new(s, t), k, false)?;

    let short_layout = MbLayout::new(s, t * k);
    let mut restored = Matrix::zeros(d, s * t * k);
    for step in 0..t * k {
        unstack(FrameRange::at(step), &tall, &mut restored, &short_layout, k, false)?;
    }
    assert_eq!(restored, short);
    Ok(())
}

// ==================== 带布局的 Reshape 节点 ====================

#[test]
fn test_reshape_node_worked_example() -> Result<(), GraphError> {
    let mut graph: Graph = Graph::new();
    let input = graph.new_input_node(2, 12, Some("input"))?;
    let stacked = graph.new_reshape_node(input, 6, None, Some("stacked"))?;

    let layout = Arc::new(MbLayout::new(2, 6));
    let short = letters(&["aubvcwdxeyfz", "AUBVCWDXEYFZ"]);
    graph.set_input_value(input, &short, Some(layout))?;
    graph.forward(stacked)?;

    let expected = letters(&["abcuvwdefxyz", "ABCUVWDEFXYZ"]).reshaped(6, 4)?;
    assert_eq!(graph.get_node_value(stacked)?.unwrap(), &expected);

    let derived = graph.get_node_layout(stacked)?.unwrap();
    assert_eq!(derived.num_parallel_sequences(), 2);
    assert_eq!(derived.num_time_steps(), 2);
    Ok(())
}

#[test]
fn test_reshape_stack_unstack_inverse() -> Result<(), GraphError> {
    // (S, 堆叠后的 T, D, K)
    for (s, t, d, k) in [(1, 1, 1, 2), (2, 3, 2, 3), (3, 2, 4, 2), (4, 5, 1, 4), (2, 2, 3, 1)] {
        let mut graph: Graph = Graph::new();
        let input = graph.new_input_node(d, s * t * k, None)?;
        let tall = graph.new_reshape_node(input, d * k, None, None)?;
        let short = graph.new_reshape_node(tall, d, None, None)?;

        let value: Matrix = Matrix::new_random(-1.0, 1.0, d, s * t * k);
        let layout = Arc::new(MbLayout::new(s, t * k));
        graph.set_input_value(input, &value, Some(layout.clone()))?;
        graph.forward(short)?;

        assert_eq!(graph.get_node_shape(tall)?, [d * k, s * t]);
        assert_eq!(graph.get_node_layout(tall)?.unwrap().num_time_steps(), t);
        assert_eq!(graph.get_node_value(short)?.unwrap(), &value);
        assert_eq!(*graph.get_node_layout(short)?.unwrap(), *layout);
    }
    Ok(())
}

#[test]
fn test_reshape_unstack_with_single_sequence() -> Result<(), GraphError> {
    let mut graph: Graph = Graph::new();
    let input = graph.new_input_node(4, 2, None)?;
    let short = graph.new_reshape_node(input, 2, None, None)?;
    graph.set_input_value(
        input,
        &Matrix::new(&seq(8), 4, 2),
        Some(Arc::new(MbLayout::new(1, 2))),
    )?;
    graph.forward(short)?;

    // S=1 时拆分与列优先的整体重排一致
    let expected: Matrix = Matrix::new(&seq(8), 2, 4);
    assert_eq!(graph.get_node_value(short)?.unwrap(), &expected);
    assert_eq!(graph.get_node_layout(short)?.unwrap().num_time_steps(), 4);
    Ok(())
}

/// 输入（D 行）→ Reshape（D·K 行）
fn stacking_graph(d: usize, k: usize, cols: usize) -> Result<(Graph, NodeId, NodeId), GraphError> {
    let mut graph: Graph = Graph::new();
    let input = graph.new_input_node(d, cols, Some("input"))?;
    let tall = graph.new_reshape_node(input, d * k, None, Some("tall"))?;
    Ok((graph, input, tall))
}

#[test]
fn test_reshape_forward_frame() -> Result<(), GraphError> {
    let (s, t, d, k) = (2, 2, 2, 3);
    let value: Matrix = Matrix::new_random(-1.0, 1.0, d, s * t * k);
    let layout = Arc::new(MbLayout::new(s, t * k));

    let (mut reference, input, tall) = stacking_graph(d, k, s * t * k)?;
    reference.set_input_value(input, &value, Some(layout.clone()))?;
    reference.forward(tall)?;
    let expected = reference.get_node_value(tall)?.unwrap().clone();

    let (mut graph, input, tall) = stacking_graph(d, k, s * t * k)?;
    graph.set_input_value(input, &value, Some(layout))?;
    assert_err!(
        graph.forward_frame(tall, FrameRange::at(0)),
        GraphError::InvalidOperation(_)
    );
    graph.begin_iteration(tall)?;
    for step in 0..t {
        for sequence in 0..s {
            graph.forward_frame(tall, FrameRange::at(step).with_sequence(sequence))?;
        }
    }
    assert_eq!(graph.get_node_value(tall)?.unwrap(), &expected);
    Ok(())
}

#[test]
fn test_reshape_stack_backward() -> Result<(), GraphError> {
    let (s, t, d, k) = (2, 3, 2, 2);
    let mut graph: Graph = Graph::new();
    let input = graph.new_input_node(d, s * t * k, None)?;
    let tall = graph.new_reshape_node(input, d * k, None, None)?;
    let short_layout = MbLayout::new(s, t * k);
    graph.set_input_value(
        input,
        &Matrix::new_random(-1.0, 1.0, d, s * t * k),
        Some(Arc::new(short_layout.clone())),
    )?;
    graph.forward(tall)?;

    let seed: Matrix = Matrix::new_random(-1.0, 1.0, d * k, s * t);
    graph.backward(tall, &seed)?;
    let mut expected = Matrix::zeros(d, s * t * k);
    unstack(FrameRange::AllFrames, &seed, &mut expected, &short_layout, k, false)?;
    assert_eq!(graph.get_node_grad(input)?.unwrap(), &expected);

    // 梯度总是累加：逐帧再传一遍，得到两倍
    for step in 0..t {
        graph.backward_frame(tall, FrameRange::at(step))?;
    }
    let grad = graph.get_node_grad(input)?.unwrap();
    for (&got, &want) in grad.to_col_major_vec().iter().zip(&expected.to_col_major_vec()) {
        assert_abs_diff_eq!(got, 2.0 * want, epsilon = 1e-6);
    }
    Ok(())
}

#[test]
fn test_reshape_unstack_backward() -> Result<(), GraphError> {
    let (s, t, d, k) = (3, 2, 1, 2);
    let mut graph: Graph = Graph::new();
    let input = graph.new_input_node(d * k, s * t, None)?;
    let short = graph.new_reshape_node(input, d, None, None)?;
    graph.set_input_value(
        input,
        &Matrix::new_random(-1.0, 1.0, d * k, s * t),
        Some(Arc::new(MbLayout::new(s, t))),
    )?;
    graph.forward(short)?;

    let seed: Matrix = Matrix::new_random(-1.0, 1.0, d, s * t * k);
    graph.backward(short, &seed)?;
    let mut expected = Matrix::zeros(d * k, s * t);
    stack(FrameRange::AllFrames, &seed, &mut expected, &MbLayout::new(s, t), k, false)?;
    assert_eq!(graph.get_node_grad(input)?.unwrap(), &expected);

    // 短网格的单步（不对齐整组）逐个累加
    for step in 0..t * k {
        graph.backward_frame(short, FrameRange::at(step))?;
    }
    let grad = graph.get_node_grad(input)?.unwrap();
    for (&got, &want) in grad.to_col_major_vec().iter().zip(&expected.to_col_major_vec()) {
        assert_abs_diff_eq!(got, 2.0 * want, epsilon = 1e-6);
    }
    Ok(())
}

#[test]
fn test_reshape_noop_is_alias() -> Result<(), GraphError> {
    let mut graph: Graph = Graph::new();
    let input = graph.new_input_node(3, 4, None)?;
    let same = graph.new_reshape_node(input, 3, None, Some("same"))?;
    let layout = Arc::new(MbLayout::new(2, 2));
    let value: Matrix = Matrix::new(&seq(12), 3, 4);
    graph.set_input_value(input, &value, Some(layout.clone()))?;
    graph.forward(same)?;

    let out = graph.get_node_value(same)?.unwrap();
    let input_value = graph.get_node_value(input)?.unwrap();
    assert!(std::ptr::eq(out, input_value));
    assert!(Arc::ptr_eq(&graph.get_node_layout(same)?.unwrap(), &layout));

    let seed: Matrix = Matrix::new(&[1.0; 12], 3, 4);
    graph.backward(same, &seed)?;
    assert_eq!(graph.get_node_grad(input)?.unwrap(), &seed);
    Ok(())
}

// ==================== 派生布局的标记 ====================

#[test]
fn test_reshape_stack_carries_flags() -> Result<(), GraphError> {
    let mut layout = MbLayout::new(2, 4);
    layout.set(0, 0, PackingFlags::SEQUENCE_START)?;
    layout.set(0, 3, PackingFlags::SEQUENCE_END)?;
    layout.set(1, 2, PackingFlags::NO_INPUT)?;
    layout.set(1, 3, PackingFlags::NO_INPUT)?;

    let mut graph: Graph = Graph::new();
    let input = graph.new_input_node(1, 8, None)?;
    let tall = graph.new_reshape_node(input, 2, None, None)?;
    graph.set_input_value(input, &Matrix::zeros(1, 8), Some(Arc::new(layout)))?;
    graph.forward(tall)?;

    let derived = graph.get_node_layout(tall)?.unwrap();
    assert_eq!(derived.num_time_steps(), 2);
    assert!(derived.is(0, 0, PackingFlags::SEQUENCE_START));
    assert!(derived.is(0, 1, PackingFlags::SEQUENCE_END));
    assert!(derived.is_gap(1, 1));
    assert!(!derived.is_gap(1, 0));
    Ok(())
}

#[test]
fn test_reshape_unstack_carries_flags() -> Result<(), GraphError> {
    let mut layout = MbLayout::new(1, 2);
    layout.set(0, 0, PackingFlags::SEQUENCE_START | PackingFlags::SEQUENCE_END)?;
    layout.set(0, 1, PackingFlags::NO_INPUT)?;

    let mut graph: Graph = Graph::new();
    let input = graph.new_input_node(6, 2, None)?;
    let short = graph.new_reshape_node(input, 2, None, None)?;
    graph.set_input_value(input, &Matrix::zeros(6, 2), Some(Arc::new(layout)))?;
    graph.forward(short)?;

    let derived = graph.get_node_layout(short)?.unwrap();
    assert_eq!(derived.num_time_steps(), 6);
    assert_eq!(derived.get(0, 0), Some(PackingFlags::SEQUENCE_START));
    assert_eq!(derived.get(0, 1), Some(PackingFlags::NONE));
    assert_eq!(derived.get(0, 2), Some(PackingFlags::SEQUENCE_END));
    assert!((3..6).all(|t| derived.is_gap(0, t)));
    Ok(())
}

#[test]
fn test_reshape_stack_flag_errors() -> Result<(), GraphError> {
    // 序列起点落在堆叠组内部
    let mut inside = MbLayout::new(1, 4);
    inside.set(0, 1, PackingFlags::SEQUENCE_START)?;
    // 同一组内混合空隙与真实帧
    let mut mixed = MbLayout::new(1, 4);
    mixed.set(0, 3, PackingFlags::NO_INPUT)?;

    let mut graph: Graph = Graph::new();
    let input = graph.new_input_node(1, 4, None)?;
    let tall = graph.new_reshape_node(input, 2, None, None)?;

    graph.set_input_value(input, &Matrix::zeros(1, 4), Some(Arc::new(inside)))?;
    assert_err!(graph.forward(tall), GraphError::InvalidArgument(_));

    graph.set_input_value(input, &Matrix::zeros(1, 4), Some(Arc::new(mixed)))?;
    assert_err!(graph.forward(tall), GraphError::LogicError(_));

    // 时间步数不能被 K 整除
    graph.set_input_value(input, &Matrix::zeros(1, 3), Some(Arc::new(MbLayout::new(1, 3))))?;
    assert_err!(graph.forward(tall), GraphError::LogicError(_));
    Ok(())
}

#[test]
fn test_reshape_follows_minibatch_size() -> Result<(), GraphError> {
    let mut graph: Graph = Graph::new();
    let input = graph.new_input_node(2, 8, None)?;
    let tall = graph.new_reshape_node(input, 4, None, None)?;

    graph.set_input_value(input, &Matrix::zeros(2, 8), Some(Arc::new(MbLayout::new(2, 4))))?;
    graph.forward(tall)?;
    assert_eq!(graph.get_node_shape(tall)?, [4, 4]);

    // 列数不变但序列数与时间步数改变：不必重新校验，每批刷新即可
    graph.set_input_value(input, &Matrix::zeros(2, 8), Some(Arc::new(MbLayout::new(4, 2))))?;
    assert!(graph.is_validated());
    graph.forward(tall)?;
    let derived = graph.get_node_layout(tall)?.unwrap();
    assert_eq!(derived.num_parallel_sequences(), 4);
    assert_eq!(derived.num_time_steps(), 1);

    graph.set_input_value(input, &Matrix::zeros(2, 12), Some(Arc::new(MbLayout::new(3, 4))))?;
    assert!(!graph.is_validated());
    graph.forward(tall)?;
    assert_eq!(graph.get_node_shape(tall)?, [4, 6]);
    Ok(())
}

// ==================== 图像标注 ====================

#[test]
fn test_reshape_image_layout_completion() -> Result<(), GraphError> {
    let mut graph: Graph = Graph::new();
    let input = graph.new_input_node(12, 2, None)?;
    let image = graph.new_reshape_node(input, 12, Some(ImageLayout::new(2, 0, 3)), None)?;
    let plain = graph.new_reshape_node(input, 6, None, None)?;
    graph.validate()?;

    assert_eq!(graph.get_node_image_layout(image)?, ImageLayout::new(2, 2, 3));
    assert_eq!(graph.get_node_image_layout(plain)?, ImageLayout::new(1, 1, 6));

    assert_err!(
        graph.new_reshape_node(input, 12, Some(ImageLayout::new(2, 2, 2)), None),
        GraphError::ShapeMismatch { .. }
    );
    assert_err!(
        graph.new_reshape_node(input, 12, Some(ImageLayout::new(0, 0, 3)), None),
        GraphError::InvalidArgument(_)
    );
    assert_err!(
        graph.new_reshape_node(input, 12, Some(ImageLayout::new(5, 0, 1)), None),
        GraphError::ShapeMismatch { .. }
    );
    Ok(())
}
