/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : Graph 描述（describe）与按描述重建（from_descriptor）
 */

use std::collections::HashMap;

use super::Graph;
use super::error::GraphError;
use crate::nn::descriptor::{GraphDescriptor, NodeDescriptor, NodeTypeDescriptor};
use crate::nn::nodes::NodeId;
use crate::nn::nodes::raw_node::TraitNode;
use crate::utils::traits::float::Element;

impl<T: Element> Graph<T> {
    /// 导出整张图的描述（节点按 ID 升序，父节点总在前）
    pub fn describe(&self) -> GraphDescriptor {
        let mut descriptor = GraphDescriptor::new(&self.name);
        for id in self.sorted_node_ids() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let parents = self
                .backward_edges
                .get(&id)
                .map(|ids| ids.iter().map(|p| p.0).collect())
                .unwrap_or_default();
            descriptor.add_node(NodeDescriptor::new(
                id.0,
                node.name(),
                node.node_type().descriptor(),
                node.shape().to_vec(),
                parents,
            ));
        }
        descriptor
    }

    /// 按描述重建一张结构相同的图（节点名保持不变，ID 重新分配）
    pub fn from_descriptor(descriptor: &GraphDescriptor) -> Result<Self, GraphError> {
        let mut graph = Self::with_name(&descriptor.name);
        let mut id_map: HashMap<u64, NodeId> = HashMap::new();
        for node in &descriptor.nodes {
            let parents = node
                .parents
                .iter()
                .map(|p| {
                    id_map.get(p).copied().ok_or_else(|| {
                        GraphError::InvalidOperation(format!(
                            "节点{}的父节点{p}未在其之前描述",
                            node.name
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let name = Some(node.name.as_str());
            let new_id = match &node.node_type {
                NodeTypeDescriptor::Input {
                    rows,
                    cols,
                    image_layout,
                } => match image_layout {
                    Some(image) => graph.new_image_input_node(*image, *cols, name)?,
                    None => graph.new_input_node(*rows, *cols, name)?,
                },
                NodeTypeDescriptor::Reshape {
                    num_rows,
                    image_layout,
                } => graph.new_reshape_node(
                    single_parent(&parents, &node.name)?,
                    *num_rows,
                    *image_layout,
                    name,
                )?,
                NodeTypeDescriptor::RowSlice {
                    start_index,
                    num_rows,
                } => graph.new_row_slice_node(
                    single_parent(&parents, &node.name)?,
                    *start_index,
                    *num_rows,
                    name,
                )?,
                NodeTypeDescriptor::RowStack => graph.new_row_stack_node(&parents, name)?,
                NodeTypeDescriptor::RowRepeat { num_repeat } => graph.new_row_repeat_node(
                    single_parent(&parents, &node.name)?,
                    *num_repeat,
                    name,
                )?,
            };
            id_map.insert(node.id, new_id);
        }
        Ok(graph)
    }
}

fn single_parent(parents: &[NodeId], name: &str) -> Result<NodeId, GraphError> {
    match parents {
        [parent] => Ok(*parent),
        _ => Err(GraphError::InvalidOperation(format!(
            "节点{name}只需要 1 个父节点，描述中有{}个",
            parents.len()
        ))),
    }
}
