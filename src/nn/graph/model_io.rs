/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : Graph 高层模型 I/O（save_model/load_model）
 *
 * 职责：完整模型的保存/加载（拓扑 JSON + 参数 bin）
 * 依赖：describe()/from_descriptor() + save_params()/load_params()
 */

use std::path::Path;

use super::Graph;
use super::error::GraphError;
use crate::nn::descriptor::GraphDescriptor;
use crate::utils::traits::float::Element;

impl<T: Element> Graph<T> {
    /// 保存完整模型（拓扑 JSON + 参数 bin）
    ///
    /// 自动生成两个文件：
    /// - `{path}.json`: 图的拓扑描述（可读）
    /// - `{path}.bin`: 各节点的参数块
    ///
    /// # 示例
    /// ```ignore
    /// graph.save_model("models/frames")?;
    /// // 生成：models/frames.json + models/frames.bin
    /// ```
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> Result<(), GraphError> {
        let path = path.as_ref();
        let json_path = path.with_extension("json");
        let bin_path = path.with_extension("bin");

        // 1. 保存参数到 bin 文件
        self.save_params(&bin_path)?;

        // 2. 生成描述符并设置 params_file
        let mut descriptor = self.describe();
        descriptor.params_file = Some(bin_path.file_name().map_or_else(
            || "params.bin".to_string(),
            |s| s.to_string_lossy().to_string(),
        ));

        // 3. 保存 JSON
        let json = descriptor
            .to_json()
            .map_err(|e| GraphError::ComputationError(format!("序列化图描述失败: {e}")))?;
        std::fs::write(&json_path, json)
            .map_err(|e| GraphError::ComputationError(format!("写入 JSON 文件失败: {e}")))?;

        Ok(())
    }

    /// 从`{path}.json`重建图结构，再从参数文件加载各节点的参数
    pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Self, GraphError> {
        let path = path.as_ref();
        let json_path = path.with_extension("json");

        // 1. 读取并解析 JSON
        let json = std::fs::read_to_string(&json_path)
            .map_err(|e| GraphError::ComputationError(format!("读取 JSON 文件失败: {e}")))?;
        let descriptor = GraphDescriptor::from_json(&json)
            .map_err(|e| GraphError::ComputationError(format!("解析图描述失败: {e}")))?;

        // 2. 重建图结构
        let mut graph = Self::from_descriptor(&descriptor)?;

        // 3. 确定参数文件路径并加载
        let bin_path = if let Some(ref params_file) = descriptor.params_file {
            path.parent().map_or_else(
                || Path::new(params_file).to_path_buf(),
                |p| p.join(params_file),
            )
        } else {
            path.with_extension("bin")
        };
        graph.load_params(&bin_path)?;

        Ok(graph)
    }
}
