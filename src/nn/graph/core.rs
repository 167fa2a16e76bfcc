/*
 * @Author       : 老董
 * @Date         : 2026-02-09
 * @Description  : Graph 基础操作：创建、访问器、校验、每批刷新与前向传播
 */

use std::collections::{BTreeSet, HashMap};

use super::Graph;
use super::error::GraphError;
use crate::nn::image_layout::ImageLayout;
use crate::nn::layout::{FrameRange, MbLayoutPtr};
use crate::nn::nodes::raw_node::{TraitNode, ValueSlot};
use crate::nn::nodes::{NodeHandle, NodeId, NodeView};
use crate::tensor::Matrix;
use crate::utils::traits::float::Element;

impl<T: Element> Graph<T> {
    // ========== 创建 ==========

    pub fn new() -> Self {
        Self::with_name("default_graph")
    }

    pub fn with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nodes: HashMap::new(),
            forward_edges: HashMap::new(),
            backward_edges: HashMap::new(),
            next_id: 0,
            is_validated: false,
        }
    }

    // ========== 基础访问器 ==========

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 所有节点 ID（升序，即拓扑序）
    pub fn nodes(&self) -> Vec<NodeId> {
        self.sorted_node_ids()
    }

    pub fn nodes_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_validated(&self) -> bool {
        self.is_validated
    }

    pub(in crate::nn) fn get_node(&self, id: NodeId) -> Result<&NodeHandle<T>, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub(in crate::nn) fn get_node_mut(
        &mut self,
        id: NodeId,
    ) -> Result<&mut NodeHandle<T>, GraphError> {
        self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub fn get_node_parents(&self, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        // 先检查节点是否存在
        let _ = self.get_node(id)?;
        Ok(self.backward_edges.get(&id).cloned().unwrap_or_default())
    }

    pub fn get_node_children(&self, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let _ = self.get_node(id)?;
        Ok(self.forward_edges.get(&id).cloned().unwrap_or_default())
    }

    pub fn get_node_name(&self, id: NodeId) -> Result<&str, GraphError> {
        Ok(self.get_node(id)?.name())
    }

    /// 按名称查找节点
    pub fn get_node_id(&self, name: &str) -> Result<NodeId, GraphError> {
        self.nodes
            .values()
            .find(|node| node.name() == name)
            .map(NodeHandle::id)
            .ok_or_else(|| {
                GraphError::InvalidOperation(format!("图{}中没有名为{name}的节点", self.name))
            })
    }

    /// 最近一次校验（或刷新）后的输出形状`[rows, cols]`
    pub fn get_node_shape(&self, id: NodeId) -> Result<[usize; 2], GraphError> {
        Ok(self.get_node(id)?.shape())
    }

    /// 节点的值；别名节点返回其输入的值
    pub fn get_node_value(&self, id: NodeId) -> Result<Option<&Matrix<T>>, GraphError> {
        let mut current = id;
        loop {
            match self.get_node(current)?.value_slot() {
                ValueSlot::Owned(value) => return Ok(Some(value)),
                ValueSlot::Empty => return Ok(None),
                ValueSlot::AliasOfInput => {
                    current = *self
                        .backward_edges
                        .get(&current)
                        .and_then(|parents| parents.first())
                        .ok_or_else(|| {
                            GraphError::ComputationError(format!(
                                "别名节点{current:?}没有父节点。不该触及本错误，否则说明 crate 代码有问题"
                            ))
                        })?;
                }
            }
        }
    }

    pub fn get_node_grad(&self, id: NodeId) -> Result<Option<&Matrix<T>>, GraphError> {
        Ok(self.get_node(id)?.grad())
    }

    pub fn get_node_layout(&self, id: NodeId) -> Result<Option<MbLayoutPtr>, GraphError> {
        Ok(self.get_node(id)?.layout().cloned())
    }

    pub fn get_node_image_layout(&self, id: NodeId) -> Result<ImageLayout, GraphError> {
        Ok(self.get_node(id)?.image_layout())
    }

    /// 为 Input 节点设置一个小批量的值及其布局。
    /// 列数或布局的有无发生变化时，下次 forward 前会重新校验
    pub fn set_input_value(
        &mut self,
        id: NodeId,
        value: &Matrix<T>,
        layout: Option<MbLayoutPtr>,
    ) -> Result<(), GraphError> {
        let node = self.get_node_mut(id)?;
        let old_shape = node.shape();
        let had_layout = node.layout().is_some();
        let has_layout = layout.is_some();
        node.as_input_mut()?.set_value(value.clone(), layout)?;
        if old_shape != value.shape() || had_layout != has_layout {
            self.is_validated = false;
        }
        Ok(())
    }

    // ========== ID/名称生成 ==========

    pub(in crate::nn::graph) fn generate_valid_node_id(&mut self) -> NodeId {
        // 先递增再返回，所以第一个节点 ID 是 1
        self.next_id += 1;
        NodeId(self.next_id)
    }

    pub(in crate::nn::graph) fn check_duplicate_node_name(
        &self,
        name: &str,
    ) -> Result<(), GraphError> {
        if self.nodes.values().any(|node| node.name() == name) {
            return Err(GraphError::DuplicateNodeName(format!(
                "节点{}在图{}中重复",
                name,
                self.name()
            )));
        }
        Ok(())
    }

    pub(in crate::nn::graph) fn generate_valid_new_node_name(
        &self,
        base_name: &str,
        node_type: &str,
    ) -> Result<String, GraphError> {
        if !base_name.is_empty() {
            self.check_duplicate_node_name(base_name)?;
            return Ok(base_name.to_string());
        }

        let mut counter = 1;
        loop {
            let name = format!("{node_type}_{counter}");
            if self.check_duplicate_node_name(&name).is_ok() {
                return Ok(name);
            }
            counter += 1;
        }
    }

    // ========== 遍历 ==========

    pub(in crate::nn::graph) fn sorted_node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// `root`及其所有祖先，按拓扑序排列
    pub(in crate::nn::graph) fn ancestors_in_order(
        &self,
        root: NodeId,
    ) -> Result<Vec<NodeId>, GraphError> {
        let _ = self.get_node(root)?;
        let mut visited = BTreeSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if visited.insert(id) {
                stack.extend(self.backward_edges.get(&id).into_iter().flatten().copied());
            }
        }
        Ok(visited.into_iter().collect())
    }

    /// 按给定顺序构造若干节点的视图（值已解析别名）
    pub(in crate::nn::graph) fn views_of(
        &self,
        ids: &[NodeId],
    ) -> Result<Vec<NodeView<'_, T>>, GraphError> {
        ids.iter()
            .map(|&id| Ok(self.get_node(id)?.view(self.get_node_value(id)?)))
            .collect()
    }

    /// 暂时把节点从图中取出，使其能在读取父节点的同时被修改
    pub(in crate::nn::graph) fn with_detached_node<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut NodeHandle<T>, &[NodeView<'_, T>]) -> Result<R, GraphError>,
    ) -> Result<R, GraphError> {
        let parents = self.get_node_parents(id)?;
        let mut node = self.nodes.remove(&id).ok_or(GraphError::NodeNotFound(id))?;
        let result = self
            .views_of(&parents)
            .and_then(|inputs| f(&mut node, &inputs));
        self.nodes.insert(id, node);
        result
    }

    // ========== 校验 ==========

    /// 两轮校验：非最终轮尽力推断各节点形状，最终轮执行全部检查
    pub fn validate(&mut self) -> Result<(), GraphError> {
        self.is_validated = false;
        let order = self.sorted_node_ids();
        for is_final_pass in [false, true] {
            for &id in &order {
                self.with_detached_node(id, |node, inputs| {
                    if is_final_pass {
                        log::debug!(
                            "{}",
                            node.node_type().print_self_before_validation(inputs)
                        );
                    }
                    node.node_type_mut().validate(inputs, is_final_pass)
                })?;
            }
        }
        log::debug!("图{}校验完成，共{}个节点", self.name, order.len());
        self.is_validated = true;
        Ok(())
    }

    // ========== 前向传播 ==========

    /// 小批量开始时，按拓扑序刷新`root`及其祖先的列数与派生布局
    pub fn begin_iteration(&mut self, root: NodeId) -> Result<(), GraphError> {
        if !self.is_validated {
            self.validate()?;
        }
        for id in self.ancestors_in_order(root)? {
            self.with_detached_node(id, |node, inputs| {
                node.node_type_mut().on_begin_iteration(inputs)
            })?;
        }
        Ok(())
    }

    /// 对全部帧前向计算`root`（必要时先重新校验）
    pub fn forward(&mut self, root: NodeId) -> Result<(), GraphError> {
        self.begin_iteration(root)?;
        for id in self.ancestors_in_order(root)? {
            self.with_detached_node(id, |node, inputs| {
                node.node_type_mut().evaluate(FrameRange::AllFrames, inputs)
            })?;
        }
        Ok(())
    }

    /// 只对单个节点在`frame`范围内求值，输入的值须已就绪
    pub fn forward_frame(&mut self, id: NodeId, frame: FrameRange) -> Result<(), GraphError> {
        if !self.is_validated {
            return Err(GraphError::InvalidOperation(
                "按帧求值前须先校验计算图并调用 begin_iteration".to_string(),
            ));
        }
        self.with_detached_node(id, |node, inputs| {
            node.node_type_mut().evaluate(frame, inputs)
        })
    }

    // ========== 复制 ==========

    /// 复制节点（连同其父节点连接）；`copy_value`为 false 时新节点的值需重新计算
    pub fn copy_node(
        &mut self,
        id: NodeId,
        new_name: Option<&str>,
        copy_value: bool,
    ) -> Result<NodeId, GraphError> {
        let source = self.get_node(id)?;
        let op_name = source.op_name();
        let mut node = source.clone();
        let parents = self.get_node_parents(id)?;
        let name = self.generate_valid_new_node_name(new_name.unwrap_or_default(), op_name)?;
        let new_id = self.generate_valid_node_id();
        node.set_id(new_id);
        node.set_name(&name);
        node.set_grad(None);
        if !copy_value && !matches!(node.value_slot(), ValueSlot::AliasOfInput) {
            node.node_type_mut().base_mut().clear_value();
        }
        self.insert_node(node, &parents);
        Ok(new_id)
    }

    /// 把节点加入图中并连好边
    pub(in crate::nn::graph) fn insert_node(&mut self, node: NodeHandle<T>, parents: &[NodeId]) {
        let id = node.id();
        for &parent in parents {
            self.forward_edges.entry(parent).or_default().push(id);
        }
        self.backward_edges.insert(id, parents.to_vec());
        self.nodes.insert(id, node);
        self.is_validated = false;
    }
}
