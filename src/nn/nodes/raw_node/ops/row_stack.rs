/*
 * @Author       : 老董
 * @Date         : 2026-02-08
 * @Description  : RowStack 节点 - 把任意多个输入按行拼接
 */

use std::io::{Read, Write};

use crate::nn::GraphError;
use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::image_layout::ImageLayout;
use crate::nn::layout::FrameRange;
use crate::nn::nodes::raw_node::{NodeBase, NodeView, TraitNode};
use crate::tensor::Matrix;
use crate::utils::traits::float::Element;

/// 第`i`个输入占据输出的行带`[start_row_indices[i], start_row_indices[i] + rows_i)`
#[derive(Debug, Clone)]
pub(crate) struct RowStack<T: Element> {
    base: NodeBase<T>,
    /// 每次校验时按输入顺序重新计算的前缀和
    start_row_indices: Vec<usize>,
}

impl<T: Element> RowStack<T> {
    pub(crate) fn new(num_inputs: usize) -> Result<Self, GraphError> {
        if num_inputs == 0 {
            return Err(GraphError::InvalidArgument(
                "RowStack 节点至少需要 1 个父节点".to_string(),
            ));
        }
        Ok(Self {
            base: NodeBase::new(),
            start_row_indices: Vec::with_capacity(num_inputs),
        })
    }

    fn start_row_of(&self, index: usize) -> Result<usize, GraphError> {
        self.start_row_indices.get(index).copied().ok_or_else(|| {
            GraphError::InvalidOperation(format!(
                "RowStack 节点{}没有第{index}个父节点",
                self.base.name()
            ))
        })
    }
}

impl<T: Element> TraitNode<T> for RowStack<T> {
    fn base(&self) -> &NodeBase<T> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase<T> {
        &mut self.base
    }

    fn op_name(&self) -> &'static str {
        "RowStack"
    }

    fn validate(
        &mut self,
        inputs: &[NodeView<'_, T>],
        is_final_pass: bool,
    ) -> Result<(), GraphError> {
        let first = inputs.first().ok_or_else(|| {
            GraphError::InvalidArgument("RowStack 节点至少需要 1 个父节点".to_string())
        })?;
        let cols = first.cols;
        self.start_row_indices.clear();
        let mut total_rows = 0;
        for input in inputs {
            if is_final_pass && input.cols != cols {
                return Err(GraphError::LogicError(format!(
                    "RowStack 节点{}：输入{}的列数{}与第一个输入{}的列数{cols}不一致",
                    self.base.name(),
                    input.name,
                    input.cols,
                    first.name
                )));
            }
            self.start_row_indices.push(total_rows);
            total_rows += input.rows;
        }
        self.base.set_owned_dims(total_rows, cols);
        self.base.infer_mb_layout_from_inputs(inputs)?;

        self.base.infer_image_dims_from_input(inputs, 0, false);
        self.base.set_output_image_layout(ImageLayout::column(total_rows));
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
        let cols = frame.column_range(self.base.layout_ref(), self.base.cols())?;
        for (index, input) in inputs.iter().enumerate() {
            let start_row = self.start_row_of(index)?;
            self.base.owned_value_mut()?.assign_to_row_slice_values_of(
                cols.clone(),
                input.value_or_err()?,
                cols.clone(),
                start_row,
            )?;
        }
        Ok(())
    }

    fn compute_input_partial(
        &self,
        index: usize,
        frame: FrameRange,
        _inputs: &[NodeView<'_, T>],
        input_grad: &mut Matrix<T>,
    ) -> Result<(), GraphError> {
        let cols = frame.column_range(self.base.layout_ref(), self.base.cols())?;
        input_grad.add_with_row_slice_values_of(
            cols.clone(),
            self.base.grad_or_err()?,
            cols,
            self.start_row_of(index)?,
        )?;
        Ok(())
    }

    fn save_params(&self, _writer: &mut dyn Write) -> Result<(), GraphError> {
        Ok(())
    }

    fn load_params(
        &mut self,
        _reader: &mut dyn Read,
        _model_version: u32,
    ) -> Result<(), GraphError> {
        Ok(())
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::RowStack
    }
}
