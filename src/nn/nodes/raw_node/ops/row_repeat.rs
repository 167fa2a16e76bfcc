/*
 * @Author       : 老董
 * @Date         : 2026-02-08
 * @Description  : RowRepeat 节点 - 沿行方向把输入平铺 n 次
 */

use std::io::{Read, Write};

use crate::nn::GraphError;
use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::image_layout::ImageLayout;
use crate::nn::layout::FrameRange;
use crate::nn::nodes::raw_node::{NodeBase, NodeView, TraitNode, read_u64, write_u64};
use crate::tensor::Matrix;
use crate::utils::traits::float::Element;

/// 输出第`i`行 = 输入第`i mod r`行；`num_repeat == 1`时值是输入的别名
#[derive(Debug, Clone)]
pub(crate) struct RowRepeat<T: Element> {
    base: NodeBase<T>,
    num_repeat: usize,
}

impl<T: Element> RowRepeat<T> {
    pub(crate) fn new(num_repeat: usize) -> Result<Self, GraphError> {
        if num_repeat == 0 {
            return Err(GraphError::InvalidArgument(
                "RowRepeat 节点的重复次数必须至少为 1".to_string(),
            ));
        }
        Ok(Self {
            base: NodeBase::new(),
            num_repeat,
        })
    }
}

impl<T: Element> TraitNode<T> for RowRepeat<T> {
    fn base(&self) -> &NodeBase<T> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase<T> {
        &mut self.base
    }

    fn op_name(&self) -> &'static str {
        "RowRepeat"
    }

    fn param_summary(&self) -> String {
        format!("num_repeat={}", self.num_repeat)
    }

    fn validate(
        &mut self,
        inputs: &[NodeView<'_, T>],
        is_final_pass: bool,
    ) -> Result<(), GraphError> {
        let [input] = inputs else {
            return Err(GraphError::InvalidOperation(format!(
                "RowRepeat 节点只需要 1 个父节点，实际为{}个",
                inputs.len()
            )));
        };
        let rows = input.rows * self.num_repeat;
        if self.num_repeat == 1 {
            self.base.set_alias_dims(rows, input.cols);
        } else {
            self.base.set_owned_dims(rows, input.cols);
        }
        self.base.infer_mb_layout_from_inputs(inputs)?;

        self.base.infer_image_dims_from_input(inputs, 0, false);
        let in_height = self.base.input_image_layout().height;
        self.base
            .set_output_image_layout(ImageLayout::column(in_height * self.num_repeat));
        if is_final_pass {
            self.base.warn_if_image_lost(self.op_name());
        }
        Ok(())
    }

    fn evaluate(
        &mut self,
        frame: FrameRange,
        inputs: &[NodeView<'_, T>],
    ) -> Result<(), GraphError> {
        if self.num_repeat == 1 {
            return Ok(());
        }
        let input = inputs
            .first()
            .ok_or_else(|| GraphError::InvalidOperation("RowRepeat 节点缺少父节点".to_string()))?
            .value_or_err()?;
        let cols = frame.column_range(self.base.layout_ref(), self.base.cols())?;
        let num_repeat = self.num_repeat;
        self.base
            .owned_value_mut()?
            .assign_repeat_of(cols.clone(), input, cols, num_repeat)?;
        Ok(())
    }

    fn compute_input_partial(
        &self,
        index: usize,
        frame: FrameRange,
        _inputs: &[NodeView<'_, T>],
        input_grad: &mut Matrix<T>,
    ) -> Result<(), GraphError> {
        if index != 0 {
            return Err(GraphError::InvalidOperation(format!(
                "RowRepeat 节点只有 1 个父节点，不存在第{index}个"
            )));
        }
        let cols = frame.column_range(self.base.layout_ref(), self.base.cols())?;
        let grad = self.base.grad_or_err()?;
        if self.num_repeat == 1 {
            input_grad.assign_cols_of(cols.clone(), grad, cols, true)?;
        } else {
            input_grad.add_to_row_repeat_values_of(cols.clone(), grad, cols, self.num_repeat)?;
        }
        Ok(())
    }

    fn save_params(&self, writer: &mut dyn Write) -> Result<(), GraphError> {
        write_u64(writer, self.num_repeat)
    }

    fn load_params(
        &mut self,
        reader: &mut dyn Read,
        _model_version: u32,
    ) -> Result<(), GraphError> {
        let num_repeat = read_u64(reader)?;
        if num_repeat == 0 {
            return Err(GraphError::InvalidArgument(format!(
                "参数文件中 RowRepeat 节点{}的重复次数为 0",
                self.base.name()
            )));
        }
        self.num_repeat = num_repeat;
        Ok(())
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::RowRepeat {
            num_repeat: self.num_repeat,
        }
    }
}
