/*
 * @Author       : 老董
 * @Date         : 2026-02-06
 * @Description  : Input 节点：由外部逐个小批量提供值（及可选的小批量布局）
 *
 * 行数在创建时声明并固定，列数随每个小批量变化。
 */

use std::io::{Read, Write};

use crate::nn::GraphError;
use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::image_layout::ImageLayout;
use crate::nn::layout::{FrameRange, MbLayoutPtr};
use crate::nn::nodes::raw_node::{NodeBase, NodeView, TraitNode, read_u64, write_u64};
use crate::tensor::Matrix;
use crate::utils::traits::float::Element;

#[derive(Debug, Clone)]
pub(crate) struct Input<T: Element> {
    base: NodeBase<T>,
    /// 声明的行数
    declared_rows: usize,
    /// 用户显式给出的图像形状
    image_layout: Option<ImageLayout>,
}

impl<T: Element> Input<T> {
    pub(crate) fn new(
        rows: usize,
        cols: usize,
        image_layout: Option<ImageLayout>,
    ) -> Result<Self, GraphError> {
        if rows == 0 {
            return Err(GraphError::InvalidArgument(
                "Input 节点的行数必须大于 0".to_string(),
            ));
        }
        if let Some(image) = image_layout {
            if image.num_elements() != rows {
                return Err(GraphError::ShapeMismatch {
                    expected: vec![rows],
                    got: vec![image.width, image.height, image.channels],
                    message: "Input 节点的图像形状与行数不符".to_string(),
                });
            }
        }
        let mut base = NodeBase::new();
        base.set_value(Matrix::zeros(rows, cols));
        base.set_output_image_layout(image_layout.unwrap_or(ImageLayout::column(rows)));
        Ok(Self {
            base,
            declared_rows: rows,
            image_layout,
        })
    }

    /// 设置一个小批量的值；带布局时布局必须恰好覆盖所有列
    pub(crate) fn set_value(
        &mut self,
        value: Matrix<T>,
        layout: Option<MbLayoutPtr>,
    ) -> Result<(), GraphError> {
        if value.rows() != self.declared_rows {
            return Err(GraphError::ShapeMismatch {
                expected: vec![self.declared_rows, value.cols()],
                got: value.shape().to_vec(),
                message: format!(
                    "Input 节点{}的行数在创建时已固定为{}",
                    self.base.name(),
                    self.declared_rows
                ),
            });
        }
        if let Some(layout) = &layout {
            if layout.num_cols() != value.cols() {
                return Err(GraphError::ShapeMismatch {
                    expected: vec![layout.num_parallel_sequences(), layout.num_time_steps()],
                    got: vec![value.cols()],
                    message: format!(
                        "Input 节点{}的小批量布局（S×T）未恰好覆盖值的{}列",
                        self.base.name(),
                        value.cols()
                    ),
                });
            }
        }
        self.base.set_value(value);
        self.base.set_layout(layout);
        Ok(())
    }
}

impl<T: Element> TraitNode<T> for Input<T> {
    fn base(&self) -> &NodeBase<T> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase<T> {
        &mut self.base
    }

    fn op_name(&self) -> &'static str {
        "Input"
    }

    fn validate(
        &mut self,
        _inputs: &[NodeView<'_, T>],
        _is_final_pass: bool,
    ) -> Result<(), GraphError> {
        Ok(())
    }

    fn on_begin_iteration(&mut self, _inputs: &[NodeView<'_, T>]) -> Result<(), GraphError> {
        Ok(())
    }

    fn evaluate(
        &mut self,
        _frame: FrameRange,
        _inputs: &[NodeView<'_, T>],
    ) -> Result<(), GraphError> {
        // 值由外部设置
        Ok(())
    }

    fn compute_input_partial(
        &self,
        index: usize,
        _frame: FrameRange,
        _inputs: &[NodeView<'_, T>],
        _input_grad: &mut Matrix<T>,
    ) -> Result<(), GraphError> {
        Err(GraphError::InvalidOperation(format!(
            "Input 节点{}没有第{index}个输入",
            self.base.name()
        )))
    }

    fn save_params(&self, writer: &mut dyn Write) -> Result<(), GraphError> {
        write_u64(writer, self.declared_rows)
    }

    fn load_params(
        &mut self,
        reader: &mut dyn Read,
        _model_version: u32,
    ) -> Result<(), GraphError> {
        let rows = read_u64(reader)?;
        if rows != self.declared_rows {
            return Err(GraphError::ShapeMismatch {
                expected: vec![self.declared_rows],
                got: vec![rows],
                message: format!("参数文件中 Input 节点{}的行数不一致", self.base.name()),
            });
        }
        Ok(())
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::Input {
            rows: self.declared_rows,
            cols: self.base.cols(),
            image_layout: self.image_layout,
        }
    }
}
