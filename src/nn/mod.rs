/*
 * @Author       : 老董
 * @Date         : 2026-02-05
 * @Description  : 负责计算图的构建：按小批量布局重排矩阵的节点及其梯度
 */

mod descriptor;
mod graph;
mod image_layout;
mod layout;
mod nodes;

pub use descriptor::{GraphDescriptor, NodeDescriptor, NodeTypeDescriptor};
pub use graph::{Graph, GraphError};
pub use image_layout::ImageLayout;
pub use layout::{FrameRange, MbLayout, MbLayoutPtr, PackingFlags};
pub use nodes::{NodeId, stack, unstack};

#[cfg(test)]
mod tests;
