/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : RowSlice 节点单元测试
 */

use std::sync::Arc;

use crate::assert_err;
use crate::nn::{FrameRange, Graph, GraphError, ImageLayout, MbLayout};
use crate::tensor::Matrix;

#[test]
fn test_row_slice_forward() -> Result<(), GraphError> {
    let mut graph: Graph = Graph::new();
    let input = graph.new_input_node(4, 2, Some("input"))?;
    let slice = graph.new_row_slice_node(input, 1, 2, Some("slice"))?;

    let value: Matrix = Matrix::from_row_major(&[1., 2., 3., 4., 5., 6., 7., 8.], 4, 2);
    graph.set_input_value(input, &value, None)?;
    graph.forward(slice)?;

    let expected: Matrix = Matrix::from_row_major(&[3., 4., 5., 6.], 2, 2);
    assert_eq!(graph.get_node_value(slice)?.unwrap(), &expected);
    assert_eq!(graph.get_node_shape(slice)?, [2, 2]);
    Ok(())
}

#[test]
fn test_row_slice_identity() -> Result<(), GraphError> {
    let mut graph: Graph = Graph::new();
    let input = graph.new_input_node(5, 3, None)?;
    let slice = graph.new_row_slice_node(input, 0, 5, None)?;

    let value: Matrix = Matrix::new_random(-1.0, 1.0, 5, 3);
    graph.set_input_value(input, &value, None)?;
    graph.forward(slice)?;
    assert_eq!(graph.get_node_value(slice)?.unwrap(), &value);

    let seed: Matrix = Matrix::new_random(-1.0, 1.0, 5, 3);
    graph.backward(slice, &seed)?;
    assert_eq!(graph.get_node_grad(input)?.unwrap(), &seed);
    Ok(())
}

#[test]
fn test_row_slice_boundary() -> Result<(), GraphError> {
    let mut graph: Graph = Graph::new();
    let input = graph.new_input_node(4, 2, None)?;
    // 恰好到最后一行
    let flush = graph.new_row_slice_node(input, 2, 2, Some("flush"))?;
    graph.forward(flush)?;

    // 多出一行
    let over = graph.new_row_slice_node(input, 3, 2, Some("over"))?;
    assert_err!(
        graph.forward(over),
        GraphError::InvalidArgument(msg) if msg.contains("over")
    );

    assert_err!(
        graph.new_row_slice_node(input, 0, 0, None),
        GraphError::InvalidArgument("RowSlice 节点的行数必须大于 0")
    );
    Ok(())
}

#[test]
fn test_row_slice_backward_window() -> Result<(), GraphError> {
    let mut graph: Graph = Graph::new();
    let input = graph.new_input_node(4, 2, None)?;
    let slice = graph.new_row_slice_node(input, 1, 2, None)?;
    graph.forward(slice)?;

    let seed: Matrix = Matrix::from_row_major(&[1., 2., 3., 4.], 2, 2);
    graph.backward(slice, &seed)?;

    // 窗口之外的行没有梯度
    let expected: Matrix = Matrix::from_row_major(&[0., 0., 1., 2., 3., 4., 0., 0.], 4, 2);
    assert_eq!(graph.get_node_grad(input)?.unwrap(), &expected);
    Ok(())
}

#[test]
fn test_row_slice_with_layout_per_frame() -> Result<(), GraphError> {
    let mut graph: Graph = Graph::new();
    let input = graph.new_input_node(3, 4, None)?;
    let slice = graph.new_row_slice_node(input, 1, 1, None)?;
    let layout = Arc::new(MbLayout::new(2, 2));
    let value: Matrix = Matrix::from_row_major(
        &[
            1., 2., 3., 4., //
            5., 6., 7., 8., //
            9., 10., 11., 12.,
        ],
        3,
        4,
    );
    graph.set_input_value(input, &value, Some(layout.clone()))?;
    graph.begin_iteration(slice)?;
    assert!(Arc::ptr_eq(&graph.get_node_layout(slice)?.unwrap(), &layout));

    // 只求第 1 个时间步第 0 条序列，即第 2 列
    graph.forward_frame(slice, FrameRange::at(1).with_sequence(0))?;
    let out = graph.get_node_value(slice)?.unwrap();
    assert_eq!(out.to_row_major_vec(), vec![0., 0., 7., 0.]);

    assert_err!(
        graph.forward_frame(slice, FrameRange::at(2)),
        GraphError::InvalidArgument(_)
    );
    Ok(())
}

#[test]
fn test_row_slice_image_layout() -> Result<(), GraphError> {
    let mut graph: Graph = Graph::new();
    let image = graph.new_image_input_node(ImageLayout::new(2, 3, 2), 1, None)?;
    let slice = graph.new_row_slice_node(image, 0, 4, None)?;
    graph.validate()?;

    // 图像信息在此丢失，输出按列向量标注
    assert_eq!(graph.get_node_image_layout(slice)?, ImageLayout::column(4));
    Ok(())
}
