/*
 * @Author       : 老董
 * @Date         : 2026-02-07
 * @Description  : Reshape 节点 - 把 r 行的输入重新解释为 R 行
 *
 * 四种情形：
 * - R == r：无操作，值直接是输入的别名
 * - 无布局：按列优先整体重新解释形状
 * - 有布局且 R > r：把 K = R/r 个相邻时间步堆叠成一步（stack）
 * - 有布局且 R < r：把一步拆成 K = r/R 个时间步（unstack）
 */

use std::io::{Read, Write};
use std::sync::Arc;

use super::reshaping_base::{stack, stack_window, unstack, unstack_window};
use crate::nn::GraphError;
use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::image_layout::ImageLayout;
use crate::nn::layout::{FrameRange, MbLayout, PackingFlags, TimeWindow};
use crate::nn::nodes::raw_node::{NodeBase, NodeView, TraitNode, read_u64, write_u64};
use crate::tensor::Matrix;
use crate::utils::traits::float::Element;

/// 当前所处的重排情形
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReshapeMode {
    NoOp,
    Flat,
    Stack(usize),
    Unstack(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct Reshape<T: Element> {
    base: NodeBase<T>,
    /// 输出行数 R
    num_rows: usize,
    /// 补全后的输出图像形状；None 表示未指定
    image_layout: Option<ImageLayout>,
    /// 最近一次校验时输入的形状
    input_rows: usize,
    input_cols: usize,
}

impl<T: Element> Reshape<T> {
    pub(crate) fn new(
        num_rows: usize,
        image_layout: Option<ImageLayout>,
    ) -> Result<Self, GraphError> {
        if num_rows == 0 {
            return Err(GraphError::InvalidArgument(
                "Reshape 节点的输出行数必须大于 0".to_string(),
            ));
        }
        Ok(Self {
            base: NodeBase::new(),
            num_rows,
            image_layout: complete_image_layout(image_layout, num_rows)?,
            input_rows: 0,
            input_cols: 0,
        })
    }

    fn mode(&self) -> ReshapeMode {
        if self.base.is_alias() {
            ReshapeMode::NoOp
        } else if self.base.layout().is_none() {
            ReshapeMode::Flat
        } else if self.num_rows > self.input_rows {
            ReshapeMode::Stack(self.num_rows / self.input_rows)
        } else {
            ReshapeMode::Unstack(self.input_rows / self.num_rows)
        }
    }

    /// R 与 r 必须互为整数倍
    fn check_row_relationship(&self, input_rows: usize) -> Result<(), GraphError> {
        if input_rows == 0
            || (self.num_rows % input_rows != 0 && input_rows % self.num_rows != 0)
        {
            return Err(GraphError::InvalidArgument(format!(
                "Reshape 节点{}：输出行数{}必须是输入行数{}的整数倍或约数",
                self.base.name(),
                self.num_rows,
                input_rows
            )));
        }
        Ok(())
    }

    /// 由输入布局派生本节点的布局，并搬运序列起止与空隙标记
    fn derive_layout(&self, input: &MbLayout) -> Result<MbLayout, GraphError> {
        self.check_row_relationship(self.input_rows)?;
        let num_seqs = input.num_parallel_sequences();
        let input_steps = input.num_time_steps();
        if self.num_rows > self.input_rows {
            let k = self.num_rows / self.input_rows;
            if input_steps % k != 0 {
                return Err(GraphError::LogicError(format!(
                    "Reshape 节点{}：输入的时间步数{input_steps}不能被堆叠因子{k}整除",
                    self.base.name()
                )));
            }
            let mut derived = MbLayout::new(num_seqs, input_steps / k);
            for s in 0..num_seqs {
                for out_t in 0..input_steps / k {
                    self.stack_group_flags(input, &mut derived, s, out_t, k)?;
                }
            }
            Ok(derived)
        } else {
            let k = self.input_rows / self.num_rows;
            let mut derived = MbLayout::new(num_seqs, input_steps * k);
            for s in 0..num_seqs {
                for t in 0..input_steps {
                    let flags = input.get(s, t).unwrap_or_default();
                    for j in 0..k {
                        let mut out = PackingFlags::NONE;
                        if flags.contains(PackingFlags::NO_INPUT) {
                            out |= PackingFlags::NO_INPUT;
                        }
                        if j == 0 && flags.contains(PackingFlags::SEQUENCE_START) {
                            out |= PackingFlags::SEQUENCE_START;
                        }
                        if j == k - 1 && flags.contains(PackingFlags::SEQUENCE_END) {
                            out |= PackingFlags::SEQUENCE_END;
                        }
                        derived.set(s, t * k + j, out)?;
                    }
                }
            }
            Ok(derived)
        }
    }

    /// 第`s`条序列中被堆叠成第`out_t`步的那 K 步
    fn stack_group_flags(
        &self,
        input: &MbLayout,
        derived: &mut MbLayout,
        s: usize,
        out_t: usize,
        k: usize,
    ) -> Result<(), GraphError> {
        let group = out_t * k..(out_t + 1) * k;
        let gaps = group.clone().filter(|&t| input.is_gap(s, t)).count();
        if gaps == k {
            derived.add(s, out_t, PackingFlags::NO_INPUT)?;
        } else if gaps > 0 {
            return Err(GraphError::LogicError(format!(
                "Reshape 节点{}：序列{s}的第{}~{}步混合了空隙与真实帧，无法堆叠",
                self.base.name(),
                group.start,
                group.end - 1
            )));
        }
        for (j, t) in group.enumerate() {
            if input.is(s, t, PackingFlags::SEQUENCE_START) {
                if j != 0 {
                    return Err(self.flag_inside_group("起点", s, t));
                }
                derived.add(s, out_t, PackingFlags::SEQUENCE_START)?;
            }
            if input.is(s, t, PackingFlags::SEQUENCE_END) {
                if j != k - 1 {
                    return Err(self.flag_inside_group("终点", s, t));
                }
                derived.add(s, out_t, PackingFlags::SEQUENCE_END)?;
            }
        }
        Ok(())
    }

    fn flag_inside_group(&self, what: &str, s: usize, t: usize) -> GraphError {
        GraphError::InvalidArgument(format!(
            "Reshape 节点{}：序列{s}的{what}（第{t}步）落在堆叠组内部",
            self.base.name()
        ))
    }

    fn infer_image_dims(&mut self, inputs: &[NodeView<'_, T>], is_final_pass: bool) {
        self.base.infer_image_dims_from_input(inputs, 0, false);
        match self.image_layout {
            Some(image) => self.base.set_output_image_layout(image),
            None => {
                self.base
                    .set_output_image_layout(ImageLayout::new(1, 1, self.num_rows));
                if is_final_pass {
                    self.base.warn_if_image_lost(self.op_name());
                }
            }
        }
    }
}

fn complete_image_layout(
    image_layout: Option<ImageLayout>,
    num_rows: usize,
) -> Result<Option<ImageLayout>, GraphError> {
    match image_layout {
        Some(image) if !image.is_unspecified() => Ok(Some(image.completed_for_rows(num_rows)?)),
        _ => Ok(None),
    }
}

impl<T: Element> TraitNode<T> for Reshape<T> {
    fn base(&self) -> &NodeBase<T> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase<T> {
        &mut self.base
    }

    fn op_name(&self) -> &'static str {
        "Reshape"
    }

    fn param_summary(&self) -> String {
        match self.image_layout {
            Some(image) => format!("num_rows={}, image={image}", self.num_rows),
            None => format!("num_rows={}", self.num_rows),
        }
    }

    fn validate(
        &mut self,
        inputs: &[NodeView<'_, T>],
        is_final_pass: bool,
    ) -> Result<(), GraphError> {
        let [input] = inputs else {
            return Err(GraphError::InvalidOperation(format!(
                "Reshape 节点只需要 1 个父节点，实际为{}个",
                inputs.len()
            )));
        };
        let (r, c) = (input.rows, input.cols);
        self.input_rows = r;
        self.input_cols = c;
        self.infer_image_dims(inputs, is_final_pass);

        if is_final_pass {
            self.check_row_relationship(r)?;
        } else if r == 0 {
            self.base.set_layout(None);
            self.base.set_owned_dims(self.num_rows, 0);
            return Ok(());
        }

        if r == self.num_rows {
            self.base.set_layout(input.layout.cloned());
            self.base.set_alias_dims(r, c);
            return Ok(());
        }

        let new_cols = c * r / self.num_rows;
        match input.layout {
            None => {
                if is_final_pass && r * c != self.num_rows * new_cols {
                    return Err(GraphError::LogicError(format!(
                        "Reshape 节点{}：输入[{r}, {c}]的元素数无法整除输出行数{}",
                        self.base.name(),
                        self.num_rows
                    )));
                }
                self.base.set_layout(None);
                self.base.set_owned_dims(self.num_rows, new_cols);
            }
            Some(input_layout) => match self.derive_layout(input_layout) {
                Ok(derived) => {
                    self.base.set_owned_dims(self.num_rows, derived.num_cols());
                    self.base.set_layout(Some(Arc::new(derived)));
                }
                Err(e) if !is_final_pass => {
                    log::debug!("Reshape 节点{}的布局推迟到最终轮推断：{e}", self.base.name());
                    self.base.set_layout(None);
                    self.base.set_owned_dims(self.num_rows, new_cols);
                }
                Err(e) => return Err(e),
            },
        }
        Ok(())
    }

    fn on_begin_iteration(&mut self, inputs: &[NodeView<'_, T>]) -> Result<(), GraphError> {
        let input = inputs.first().ok_or_else(|| {
            GraphError::InvalidOperation("Reshape 节点缺少父节点".to_string())
        })?;
        if self.base.is_alias() {
            self.base.set_layout(input.layout.cloned());
            self.base.set_alias_dims(input.rows, input.cols);
            return Ok(());
        }
        match (input.layout, self.base.layout().is_some()) {
            (Some(input_layout), true) => {
                let derived = self.derive_layout(input_layout)?;
                self.base.set_owned_dims(self.num_rows, derived.num_cols());
                self.base.set_layout(Some(Arc::new(derived)));
                Ok(())
            }
            (None, false) => self
                .base
                .verify_size(self.num_rows, input.rows * input.cols / self.num_rows),
            _ => Err(GraphError::LogicError(format!(
                "Reshape 节点{}：输入的布局状态与校验时不一致，请重新校验计算图",
                self.base.name()
            ))),
        }
    }

    fn evaluate(
        &mut self,
        frame: FrameRange,
        inputs: &[NodeView<'_, T>],
    ) -> Result<(), GraphError> {
        let input_value = inputs
            .first()
            .ok_or_else(|| GraphError::InvalidOperation("Reshape 节点缺少父节点".to_string()))?
            .value_or_err()?;
        match self.mode() {
            ReshapeMode::NoOp => Ok(()),
            ReshapeMode::Flat => {
                if !frame.is_all_frames() {
                    return Err(GraphError::Unsupported(format!(
                        "无布局的 Reshape 节点{}只能对全部帧求值",
                        self.base.name()
                    )));
                }
                let [rows, cols] = self.base.shape();
                let reshaped = input_value.reshaped(rows, cols)?;
                self.base.owned_value_mut()?.assign(&reshaped)?;
                Ok(())
            }
            ReshapeMode::Stack(k) => {
                let layout = Arc::clone(self.base.layout_or_err()?);
                let out = self.base.owned_value_mut()?;
                stack(frame, input_value, out, &layout, k, false)
            }
            ReshapeMode::Unstack(k) => {
                let layout = Arc::clone(self.base.layout_or_err()?);
                let out = self.base.owned_value_mut()?;
                unstack(frame, input_value, out, &layout, k, false)
            }
        }
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
                "Reshape 节点只有 1 个父节点，不存在第{index}个"
            )));
        }
        let grad = self.base.grad_or_err()?;
        match self.mode() {
            ReshapeMode::NoOp => {
                let cols = frame.column_range(self.base.layout_ref(), self.base.cols())?;
                input_grad.assign_cols_of(cols.clone(), grad, cols, true)?;
            }
            ReshapeMode::Flat => {
                if !frame.is_all_frames() {
                    return Err(GraphError::Unsupported(format!(
                        "无布局的 Reshape 节点{}只能对全部帧求梯度",
                        self.base.name()
                    )));
                }
                input_grad.add_assign(&grad.reshaped(self.input_rows, self.input_cols)?)?;
            }
            ReshapeMode::Stack(k) => {
                let layout = self.base.layout_or_err()?;
                let window = TimeWindow::from_tall_frame(frame, layout, k)?;
                let num_seqs = layout.num_parallel_sequences();
                unstack_window(window, grad, input_grad, num_seqs, k, true)?;
            }
            ReshapeMode::Unstack(k) => {
                let layout = self.base.layout_or_err()?;
                let window = TimeWindow::from_short_frame(frame, layout)?;
                let num_seqs = layout.num_parallel_sequences();
                stack_window(window, grad, input_grad, num_seqs, k, true)?;
            }
        }
        Ok(())
    }

    fn save_params(&self, writer: &mut dyn Write) -> Result<(), GraphError> {
        let image = self.image_layout.unwrap_or_default();
        write_u64(writer, self.num_rows)?;
        write_u64(writer, image.width)?;
        write_u64(writer, image.height)?;
        write_u64(writer, image.channels)
    }

    fn load_params(
        &mut self,
        reader: &mut dyn Read,
        _model_version: u32,
    ) -> Result<(), GraphError> {
        let num_rows = read_u64(reader)?;
        let image = ImageLayout::new(read_u64(reader)?, read_u64(reader)?, read_u64(reader)?);
        if num_rows == 0 {
            return Err(GraphError::InvalidArgument(format!(
                "参数文件中 Reshape 节点{}的输出行数为 0",
                self.base.name()
            )));
        }
        self.image_layout = complete_image_layout(Some(image), num_rows)?;
        self.num_rows = num_rows;
        Ok(())
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::Reshape {
            num_rows: self.num_rows,
            image_layout: self.image_layout,
        }
    }
}
