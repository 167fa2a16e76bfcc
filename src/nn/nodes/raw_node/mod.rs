mod base;
mod input;
mod ops;

pub(crate) use base::{NodeBase, ValueSlot};
pub(crate) use input::Input;
pub(crate) use ops::*;
pub use ops::{stack, unstack};

use std::io::{Read, Write};

use enum_dispatch::enum_dispatch;

use crate::nn::GraphError;
use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::image_layout::ImageLayout;
use crate::nn::layout::{FrameRange, MbLayoutPtr};
use crate::tensor::Matrix;
use crate::utils::traits::float::Element;

/// 节点计算时看到的某个输入：形状、布局、图像标注，以及（已解析别名的）值
#[derive(Debug, Clone, Copy)]
pub(crate) struct NodeView<'a, T: Element> {
    pub name: &'a str,
    pub rows: usize,
    pub cols: usize,
    pub layout: Option<&'a MbLayoutPtr>,
    pub image_layout: ImageLayout,
    pub value: Option<&'a Matrix<T>>,
}

impl<'a, T: Element> NodeView<'a, T> {
    /// 输入的值；尚未计算时报错
    pub(crate) fn value_or_err(&self) -> Result<&'a Matrix<T>, GraphError> {
        self.value.ok_or_else(|| {
            GraphError::ComputationError(format!(
                "输入节点{}没有值。不该触及本错误，否则说明 crate 代码有问题",
                self.name
            ))
        })
    }
}

#[enum_dispatch]
pub(crate) trait TraitNode<T: Element> {
    fn base(&self) -> &NodeBase<T>;

    fn base_mut(&mut self) -> &mut NodeBase<T>;

    /// 节点类型名，也用于自动生成节点名与参数文件中的类型校验
    fn op_name(&self) -> &'static str;

    /// 诊断输出中附在输入列表之后的参数说明
    fn param_summary(&self) -> String {
        String::new()
    }

    /// 根据输入推断输出形状、布局与图像标注。
    /// 非最终轮只做尽力推断；`is_final_pass`时执行全部检查
    fn validate(&mut self, inputs: &[NodeView<'_, T>], is_final_pass: bool)
    -> Result<(), GraphError>;

    /// 每个小批量开始时刷新列数与派生布局
    fn on_begin_iteration(&mut self, inputs: &[NodeView<'_, T>]) -> Result<(), GraphError> {
        let cols = inputs.first().map_or(self.base().cols(), |input| input.cols);
        let base = self.base_mut();
        if base.layout().is_some() {
            base.infer_mb_layout_from_inputs(inputs)?;
            let rows = base.rows();
            if base.is_alias() {
                base.set_alias_dims(rows, cols);
            } else {
                base.set_owned_dims(rows, cols);
            }
        }
        Ok(())
    }

    /// 计算`frame`范围内的输出值（所有输入的值都已就绪）
    fn evaluate(&mut self, frame: FrameRange, inputs: &[NodeView<'_, T>]) -> Result<(), GraphError>;

    /// 把本节点梯度在`frame`范围内对第`index`个输入的贡献累加进`input_grad`
    fn compute_input_partial(
        &self,
        index: usize,
        frame: FrameRange,
        inputs: &[NodeView<'_, T>],
        input_grad: &mut Matrix<T>,
    ) -> Result<(), GraphError>;

    /// 以小端定长整数写出本节点的持久化参数
    fn save_params(&self, writer: &mut dyn Write) -> Result<(), GraphError>;

    fn load_params(&mut self, reader: &mut dyn Read, model_version: u32)
    -> Result<(), GraphError>;

    fn descriptor(&self) -> NodeTypeDescriptor;

    /// 形如`Validating --> name = Op(child[r, c], ..., params)`的诊断行
    fn print_self_before_validation(&self, inputs: &[NodeView<'_, T>]) -> String {
        let mut args: Vec<String> = inputs
            .iter()
            .map(|input| format!("{}[{}, {}]", input.name, input.rows, input.cols))
            .collect();
        let params = self.param_summary();
        if !params.is_empty() {
            args.push(params);
        }
        format!(
            "Validating --> {} = {}({})",
            self.base().name(),
            self.op_name(),
            args.join(", ")
        )
    }
}

#[enum_dispatch(TraitNode<T>)]
#[derive(Debug, Clone)]
pub(crate) enum NodeType<T: Element> {
    Input(Input<T>),
    Reshape(Reshape<T>),
    RowSlice(RowSlice<T>),
    RowStack(RowStack<T>),
    RowRepeat(RowRepeat<T>),
}

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓参数块读写↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
pub(crate) fn write_u64(writer: &mut dyn Write, value: usize) -> Result<(), GraphError> {
    writer
        .write_all(&(value as u64).to_le_bytes())
        .map_err(|e| GraphError::ComputationError(format!("写入节点参数失败: {e}")))
}

pub(crate) fn read_u64(reader: &mut dyn Read) -> Result<usize, GraphError> {
    let mut bytes = [0u8; 8];
    reader
        .read_exact(&mut bytes)
        .map_err(|e| GraphError::ComputationError(format!("读取节点参数失败: {e}")))?;
    usize::try_from(u64::from_le_bytes(bytes))
        .map_err(|e| GraphError::ComputationError(format!("节点参数超出范围: {e}")))
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑参数块读写↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
