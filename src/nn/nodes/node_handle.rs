use std::fmt;

use serde::{Deserialize, Serialize};

use super::raw_node::{Input, NodeType, NodeView, TraitNode, ValueSlot};
use crate::nn::GraphError;
use crate::nn::image_layout::ImageLayout;
use crate::nn::layout::MbLayoutPtr;
use crate::tensor::Matrix;
use crate::utils::traits::float::Element;

/// 图中的一个节点：编号 + 具体节点
#[derive(Debug, Clone)]
pub(crate) struct NodeHandle<T: Element> {
    id: NodeId,
    raw_node: NodeType<T>,
}

impl<T: Element> NodeHandle<T> {
    pub(crate) fn new<N: Into<NodeType<T>>>(id: NodeId, raw_node: N) -> Self {
        Self {
            id,
            raw_node: raw_node.into(),
        }
    }

    pub(crate) const fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: NodeId) {
        self.id = id;
    }

    pub(crate) const fn node_type(&self) -> &NodeType<T> {
        &self.raw_node
    }

    pub(crate) fn node_type_mut(&mut self) -> &mut NodeType<T> {
        &mut self.raw_node
    }

    pub(crate) fn name(&self) -> &str {
        self.raw_node.base().name()
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.raw_node.base_mut().set_name(name);
    }

    pub(crate) fn op_name(&self) -> &'static str {
        self.raw_node.op_name()
    }

    pub(crate) fn shape(&self) -> [usize; 2] {
        self.raw_node.base().shape()
    }

    pub(crate) fn layout(&self) -> Option<&MbLayoutPtr> {
        self.raw_node.base().layout()
    }

    pub(crate) fn image_layout(&self) -> ImageLayout {
        self.raw_node.base().output_image_layout()
    }

    pub(crate) fn value_slot(&self) -> &ValueSlot<T> {
        self.raw_node.base().value()
    }

    pub(crate) fn grad(&self) -> Option<&Matrix<T>> {
        self.raw_node.base().grad()
    }

    pub(crate) fn set_grad(&mut self, grad: Option<Matrix<T>>) {
        self.raw_node.base_mut().set_grad(grad);
    }

    pub(crate) fn take_grad(&mut self) -> Option<Matrix<T>> {
        self.raw_node.base_mut().take_grad()
    }

    pub(crate) fn zero_grad(&mut self) {
        self.raw_node.base_mut().zero_grad();
    }

    pub(crate) fn as_input_mut(&mut self) -> Result<&mut Input<T>, GraphError> {
        match &mut self.raw_node {
            NodeType::Input(input) => Ok(input),
            other => Err(GraphError::InvalidOperation(format!(
                "{}节点{}的值由父节点计算得出，不能手动设置",
                other.op_name(),
                other.base().name()
            ))),
        }
    }

    /// 供子节点读取的视图；`value`是已解析别名后的值
    pub(crate) fn view<'a>(&'a self, value: Option<&'a Matrix<T>>) -> NodeView<'a, T> {
        let [rows, cols] = self.shape();
        NodeView {
            name: self.name(),
            rows,
            cols,
            layout: self.layout(),
            image_layout: self.image_layout(),
            value,
        }
    }
}

impl<T: Element> fmt::Display for NodeHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "节点[id={}, name={}, type={}]", self.id.0, self.name(), self.op_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);
