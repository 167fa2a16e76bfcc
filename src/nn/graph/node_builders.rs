/*
 * @Author       : 老董
 * @Date         : 2026-02-09
 * @Description  : Graph 节点构建方法（new_*_node）
 */

use super::Graph;
use super::error::GraphError;
use crate::nn::image_layout::ImageLayout;
use crate::nn::nodes::raw_node::{Input, Reshape, RowRepeat, RowSlice, RowStack, TraitNode};
use crate::nn::nodes::{NodeHandle, NodeId, NodeType};
use crate::utils::traits::float::Element;

impl<T: Element> Graph<T> {
    /// 加入一个已构建好的节点：检查父节点、生成名称与 ID、连好边
    pub(in crate::nn::graph) fn add_node_to_list(
        &mut self,
        raw_node: NodeType<T>,
        name: Option<&str>,
        parents: &[NodeId],
    ) -> Result<NodeId, GraphError> {
        for &parent in parents {
            let _ = self.get_node(parent)?;
        }
        let name = self.generate_valid_new_node_name(name.unwrap_or_default(), raw_node.op_name())?;
        let id = self.generate_valid_node_id();
        let mut node = NodeHandle::new(id, raw_node);
        node.set_name(&name);
        self.insert_node(node, parents);
        Ok(id)
    }

    /// 创建`rows`行的输入节点，`cols`为初始列数（之后随每个小批量变化）
    pub fn new_input_node(
        &mut self,
        rows: usize,
        cols: usize,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = Input::new(rows, cols, None)?;
        self.add_node_to_list(node.into(), name, &[])
    }

    /// 创建每列为一张`image_layout`图像的输入节点
    pub fn new_image_input_node(
        &mut self,
        image_layout: ImageLayout,
        cols: usize,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = Input::new(image_layout.num_elements(), cols, Some(image_layout))?;
        self.add_node_to_list(node.into(), name, &[])
    }

    /// 把输入重新解释为`num_rows`行；`image_layout`只用于输出的图像标注
    pub fn new_reshape_node(
        &mut self,
        input: NodeId,
        num_rows: usize,
        image_layout: Option<ImageLayout>,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = Reshape::new(num_rows, image_layout)?;
        self.add_node_to_list(node.into(), name, &[input])
    }

    /// 取输入的第`start_index`行起的`num_rows`行
    pub fn new_row_slice_node(
        &mut self,
        input: NodeId,
        start_index: usize,
        num_rows: usize,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = RowSlice::new(start_index, num_rows)?;
        self.add_node_to_list(node.into(), name, &[input])
    }

    /// 按`inputs`的顺序按行拼接
    pub fn new_row_stack_node(
        &mut self,
        inputs: &[NodeId],
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = RowStack::new(inputs.len())?;
        self.add_node_to_list(node.into(), name, inputs)
    }

    /// 沿行方向把输入平铺`num_repeat`次
    pub fn new_row_repeat_node(
        &mut self,
        input: NodeId,
        num_repeat: usize,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = RowRepeat::new(num_repeat)?;
        self.add_node_to_list(node.into(), name, &[input])
    }
}
