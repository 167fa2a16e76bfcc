/*
 * @Author       : 老董
 * @Date         : 2026-02-08
 * @Description  : RowSlice 节点 - 取输入中连续的若干行
 */

use std::io::{Read, Write};

use crate::nn::GraphError;
use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::image_layout::ImageLayout;
use crate::nn::layout::FrameRange;
use crate::nn::nodes::raw_node::{NodeBase, NodeView, TraitNode, read_u64, write_u64};
use crate::tensor::Matrix;
use crate::utils::traits::float::Element;

/// `out[:, frame] = in[start_index .. start_index + num_rows, frame]`
#[derive(Debug, Clone)]
pub(crate) struct RowSlice<T: Element> {
    base: NodeBase<T>,
    start_index: usize,
    num_rows: usize,
}

impl<T: Element> RowSlice<T> {
    pub(crate) fn new(start_index: usize, num_rows: usize) -> Result<Self, GraphError> {
        if num_rows == 0 {
            return Err(GraphError::InvalidArgument(
                "RowSlice 节点的行数必须大于 0".to_string(),
            ));
        }
        Ok(Self {
            base: NodeBase::new(),
            start_index,
            num_rows,
        })
    }
}

impl<T: Element> TraitNode<T> for RowSlice<T> {
    fn base(&self) -> &NodeBase<T> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase<T> {
        &mut self.base
    }

    fn op_name(&self) -> &'static str {
        "RowSlice"
    }

    fn param_summary(&self) -> String {
        format!("start={}, num_rows={}", self.start_index, self.num_rows)
    }

    fn validate(
        &mut self,
        inputs: &[NodeView<'_, T>],
        is_final_pass: bool,
    ) -> Result<(), GraphError> {
        let [input] = inputs else {
            return Err(GraphError::InvalidOperation(format!(
                "RowSlice 节点只需要 1 个父节点，实际为{}个",
                inputs.len()
            )));
        };
        if is_final_pass && self.start_index + self.num_rows > input.rows {
            return Err(GraphError::InvalidArgument(format!(
                "RowSlice 节点{}：行区间[{}, {})超出输入的行数{}",
                self.base.name(),
                self.start_index,
                self.start_index + self.num_rows,
                input.rows
            )));
        }
        self.base.set_owned_dims(self.num_rows, input.cols);
        self.base.infer_mb_layout_from_inputs(inputs)?;

        self.base.infer_image_dims_from_input(inputs, 0, false);
        self.base
            .set_output_image_layout(ImageLayout::column(self.num_rows));
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
        let input = inputs
            .first()
            .ok_or_else(|| GraphError::InvalidOperation("RowSlice 节点缺少父节点".to_string()))?
            .value_or_err()?;
        let cols = frame.column_range(self.base.layout_ref(), self.base.cols())?;
        let (start, num_rows) = (self.start_index, self.num_rows);
        self.base
            .owned_value_mut()?
            .assign_row_slice_values_of(cols.clone(), input, cols, start, num_rows)?;
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
                "RowSlice 节点只有 1 个父节点，不存在第{index}个"
            )));
        }
        let cols = frame.column_range(self.base.layout_ref(), self.base.cols())?;
        input_grad.add_to_row_slice_values_of(
            cols.clone(),
            self.base.grad_or_err()?,
            cols,
            self.start_index,
            self.num_rows,
        )?;
        Ok(())
    }

    fn save_params(&self, writer: &mut dyn Write) -> Result<(), GraphError> {
        write_u64(writer, self.start_index)?;
        write_u64(writer, self.num_rows)
    }

    fn load_params(
        &mut self,
        reader: &mut dyn Read,
        _model_version: u32,
    ) -> Result<(), GraphError> {
        let start_index = read_u64(reader)?;
        let num_rows = read_u64(reader)?;
        if num_rows == 0 {
            return Err(GraphError::InvalidArgument(format!(
                "参数文件中 RowSlice 节点{}的行数为 0",
                self.base.name()
            )));
        }
        self.start_index = start_index;
        self.num_rows = num_rows;
        Ok(())
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::RowSlice {
            start_index: self.start_index,
            num_rows: self.num_rows,
        }
    }
}
