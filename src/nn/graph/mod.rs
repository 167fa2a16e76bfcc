/*
 * @Author       : 老董
 * @Date         : 2026-02-05
 * @Description  : Graph 模块：持有节点与边，驱动校验、前向与反向传播
 *
 * 各 impl 块分散在子模块中：
 * - core.rs: 基础操作 + 校验 + forward
 * - backward.rs: 反向传播（梯度累加）
 * - node_builders.rs: new_*_node
 * - serialization.rs: save_params/load_params 底层参数序列化
 * - model_io.rs: save_model/load_model 高层模型 I/O
 * - describe.rs: describe/from_descriptor
 */

mod backward;
mod core;
mod describe;
mod error;
mod model_io;
mod node_builders;
mod serialization;

pub use error::GraphError;

use std::collections::HashMap;

use crate::nn::nodes::{NodeHandle, NodeId};
use crate::utils::traits::float::Element;

/// 计算图
///
/// 节点按创建顺序编号，父节点总是先于子节点创建，
/// 因此按`NodeId`升序遍历即为一个合法的拓扑序。
pub struct Graph<T: Element = f32> {
    pub(in crate::nn::graph) name: String,
    pub(in crate::nn::graph) nodes: HashMap<NodeId, NodeHandle<T>>,
    /// 正向边：parent_id -> child_ids（父节点指向子节点）
    pub(in crate::nn::graph) forward_edges: HashMap<NodeId, Vec<NodeId>>,
    /// 反向边：child_id -> parent_ids（子节点指向父节点，按输入顺序）
    pub(in crate::nn::graph) backward_edges: HashMap<NodeId, Vec<NodeId>>,
    pub(in crate::nn::graph) next_id: u64,
    /// 图结构或输入形状变化后置为 false，下次 forward 前重新校验
    pub(in crate::nn::graph) is_validated: bool,
}

impl<T: Element> std::fmt::Debug for Graph<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .field("is_validated", &self.is_validated)
            .finish()
    }
}

impl<T: Element> Default for Graph<T> {
    fn default() -> Self {
        Self::new()
    }
}
