/*
 * @Author       : 老董
 * @Date         : 2026-02-09
 * @Description  : 反向传播：按逆拓扑序把每个节点的梯度累加进其输入的梯度
 */

use super::Graph;
use super::error::GraphError;
use crate::nn::layout::FrameRange;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Matrix;
use crate::utils::traits::float::Element;

impl<T: Element> Graph<T> {
    /// 从`root`开始反向传播，`seed`是 root 自身的梯度（形状须与其值一致）。
    ///
    /// 先把`root`及其所有祖先的梯度清零，再按逆拓扑序逐个累加
    pub fn backward(&mut self, root: NodeId, seed: &Matrix<T>) -> Result<(), GraphError> {
        let root_shape = self.get_node(root)?.shape();
        if seed.shape() != root_shape {
            return Err(GraphError::ShapeMismatch {
                expected: root_shape.to_vec(),
                got: seed.shape().to_vec(),
                message: format!("{}的梯度种子形状与其值不一致", self.get_node(root)?),
            });
        }
        let order = self.ancestors_in_order(root)?;
        for &id in &order {
            self.get_node_mut(id)?.zero_grad();
        }
        self.get_node_mut(root)?.set_grad(Some(seed.clone()));
        for &id in order.iter().rev() {
            self.backward_node(id, FrameRange::AllFrames)?;
        }
        Ok(())
    }

    /// 只对单个节点在`frame`范围内把梯度累加进其输入（本节点的梯度须已就绪）
    pub fn backward_frame(&mut self, id: NodeId, frame: FrameRange) -> Result<(), GraphError> {
        self.backward_node(id, frame)
    }

    /// 把所有节点的梯度清零
    pub fn zero_grad(&mut self) {
        for node in self.nodes.values_mut() {
            node.zero_grad();
        }
    }

    fn backward_node(&mut self, id: NodeId, frame: FrameRange) -> Result<(), GraphError> {
        let parents = self.get_node_parents(id)?;
        if parents.is_empty() {
            return Ok(());
        }
        let node = self.nodes.remove(&id).ok_or(GraphError::NodeNotFound(id))?;
        let result = self.accumulate_input_partials(&node, &parents, frame);
        self.nodes.insert(id, node);
        result
    }

    fn accumulate_input_partials(
        &mut self,
        node: &NodeHandle<T>,
        parents: &[NodeId],
        frame: FrameRange,
    ) -> Result<(), GraphError> {
        for (index, &parent_id) in parents.iter().enumerate() {
            let parent = self.get_node_mut(parent_id)?;
            let [rows, cols] = parent.shape();
            let mut input_grad = parent
                .take_grad()
                .unwrap_or_else(|| Matrix::zeros(rows, cols));
            let result = self.views_of(parents).and_then(|inputs| {
                node.node_type()
                    .compute_input_partial(index, frame, &inputs, &mut input_grad)
            });
            self.get_node_mut(parent_id)?.set_grad(Some(input_grad));
            result?;
        }
        Ok(())
    }
}
