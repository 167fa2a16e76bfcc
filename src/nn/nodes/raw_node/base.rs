/*
 * @Author       : 老董
 * @Date         : 2026-02-06
 * @Description  : 所有节点共有的状态：名称、值、梯度、形状、小批量布局与图像标注
 */

use crate::nn::GraphError;
use crate::nn::image_layout::ImageLayout;
use crate::nn::layout::{MbLayout, MbLayoutPtr, same_layout};
use crate::nn::nodes::raw_node::NodeView;
use crate::tensor::Matrix;
use crate::utils::traits::float::Element;

/// 节点的值槽
#[derive(Debug, Clone)]
pub(crate) enum ValueSlot<T: Element> {
    /// 尚未分配（例如复制节点时未复制值）
    Empty,
    Owned(Matrix<T>),
    /// 与第一个输入共用同一个值（无操作的 Reshape、重复 1 次的 RowRepeat），读取时由图解析
    AliasOfInput,
}

#[derive(Debug, Clone)]
pub(crate) struct NodeBase<T: Element> {
    name: String,
    value: ValueSlot<T>,
    grad: Option<Matrix<T>>,
    rows: usize,
    cols: usize,
    layout: Option<MbLayoutPtr>,
    input_image_layout: ImageLayout,
    output_image_layout: ImageLayout,
}

impl<T: Element> NodeBase<T> {
    pub(crate) fn new() -> Self {
        Self {
            name: String::new(),
            value: ValueSlot::Empty,
            grad: None,
            rows: 0,
            cols: 0,
            layout: None,
            input_image_layout: ImageLayout::default(),
            output_image_layout: ImageLayout::default(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub(crate) const fn rows(&self) -> usize {
        self.rows
    }

    pub(crate) const fn cols(&self) -> usize {
        self.cols
    }

    pub(crate) const fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓值与梯度↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    pub(crate) const fn value(&self) -> &ValueSlot<T> {
        &self.value
    }

    pub(crate) fn set_value(&mut self, value: Matrix<T>) {
        [self.rows, self.cols] = value.shape();
        self.value = ValueSlot::Owned(value);
    }

    pub(crate) fn clear_value(&mut self) {
        self.value = ValueSlot::Empty;
    }

    /// 本节点自有的值缓冲区；别名或未分配时报错
    pub(crate) fn owned_value_mut(&mut self) -> Result<&mut Matrix<T>, GraphError> {
        match &mut self.value {
            ValueSlot::Owned(value) => Ok(value),
            ValueSlot::AliasOfInput => Err(GraphError::InvalidOperation(format!(
                "节点{}的值是输入的别名，不能直接写入",
                self.name
            ))),
            ValueSlot::Empty => Err(GraphError::ComputationError(format!(
                "节点{}的值尚未分配，请先校验计算图",
                self.name
            ))),
        }
    }

    /// 确定输出形状并确保值槽是一块该形状的自有缓冲区（形状未变时保留内容）
    pub(crate) fn set_owned_dims(&mut self, rows: usize, cols: usize) {
        self.rows = rows;
        self.cols = cols;
        match &mut self.value {
            ValueSlot::Owned(value) => value.resize(rows, cols),
            _ => self.value = ValueSlot::Owned(Matrix::zeros(rows, cols)),
        }
    }

    /// 确定输出形状，并把值槽标记为输入的别名
    pub(crate) fn set_alias_dims(&mut self, rows: usize, cols: usize) {
        self.rows = rows;
        self.cols = cols;
        self.value = ValueSlot::AliasOfInput;
    }

    pub(crate) fn is_alias(&self) -> bool {
        matches!(self.value, ValueSlot::AliasOfInput)
    }

    /// 检查当前形状是否为`rows × cols`
    pub(crate) fn verify_size(&self, rows: usize, cols: usize) -> Result<(), GraphError> {
        if self.shape() != [rows, cols] {
            return Err(GraphError::LogicError(format!(
                "节点{}的形状应为[{rows}, {cols}]，实际为{:?}",
                self.name,
                self.shape()
            )));
        }
        Ok(())
    }

    pub(crate) const fn grad(&self) -> Option<&Matrix<T>> {
        self.grad.as_ref()
    }

    /// 本节点的梯度，尚未分配时报错
    pub(crate) fn grad_or_err(&self) -> Result<&Matrix<T>, GraphError> {
        self.grad.as_ref().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "节点{}没有梯度，请先调用 backward 或为其分配梯度",
                self.name
            ))
        })
    }

    pub(crate) fn set_grad(&mut self, grad: Option<Matrix<T>>) {
        self.grad = grad;
    }

    pub(crate) fn take_grad(&mut self) -> Option<Matrix<T>> {
        self.grad.take()
    }

    /// 梯度置为与值同形状的全零矩阵
    pub(crate) fn zero_grad(&mut self) {
        match &mut self.grad {
            Some(grad) => {
                grad.resize(self.rows, self.cols);
                grad.set_zero();
            }
            None => self.grad = Some(Matrix::zeros(self.rows, self.cols)),
        }
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑值与梯度↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓布局↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    pub(crate) const fn layout(&self) -> Option<&MbLayoutPtr> {
        self.layout.as_ref()
    }

    pub(crate) fn layout_ref(&self) -> Option<&MbLayout> {
        self.layout.as_deref()
    }

    pub(crate) fn set_layout(&mut self, layout: Option<MbLayoutPtr>) {
        self.layout = layout;
    }

    /// 带布局的节点要求布局覆盖全部列；无布局的节点不能做依赖布局的重排
    pub(crate) fn layout_or_err(&self) -> Result<&MbLayoutPtr, GraphError> {
        self.layout.as_ref().ok_or_else(|| {
            GraphError::LogicError(format!(
                "节点{}没有小批量布局，无法按布局重排",
                self.name
            ))
        })
    }

    /// 标准情形下的布局推断：取第一个带布局的输入的布局，其余带布局的输入必须与之一致
    pub(crate) fn infer_mb_layout_from_inputs(
        &mut self,
        inputs: &[NodeView<'_, T>],
    ) -> Result<(), GraphError> {
        let mut inferred: Option<&MbLayoutPtr> = None;
        for input in inputs {
            let Some(layout) = input.layout else {
                continue;
            };
            match inferred {
                None => inferred = Some(layout),
                Some(first) if !same_layout(first, layout) => {
                    return Err(GraphError::LogicError(format!(
                        "节点{}的输入{}与之前的输入具有不同的小批量布局",
                        self.name, input.name
                    )));
                }
                Some(_) => {}
            }
        }
        self.layout = inferred.cloned();
        Ok(())
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑布局↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓图像标注↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    pub(crate) const fn input_image_layout(&self) -> ImageLayout {
        self.input_image_layout
    }

    pub(crate) const fn output_image_layout(&self) -> ImageLayout {
        self.output_image_layout
    }

    pub(crate) fn set_output_image_layout(&mut self, layout: ImageLayout) {
        self.output_image_layout = layout;
    }

    /// 记录第`index`个输入的图像形状（`inherit_output`时输出沿用之）
    pub(crate) fn infer_image_dims_from_input(
        &mut self,
        inputs: &[NodeView<'_, T>],
        index: usize,
        inherit_output: bool,
    ) {
        if let Some(input) = inputs.get(index) {
            self.input_image_layout = input.image_layout;
            if inherit_output {
                self.output_image_layout = input.image_layout;
            }
        }
    }

    /// 输出只是普通列向量时，若输入是真正的图像则给出警告：图像信息在此丢失
    pub(crate) fn warn_if_image_lost(&self, op_name: &str) {
        if !self.input_image_layout.is_plain_column() {
            log::warn!(
                "{op_name} 节点{}无法继承输入的图像形状({})，图像信息在此丢失",
                self.name,
                self.input_image_layout
            );
        }
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑图像标注↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
}
