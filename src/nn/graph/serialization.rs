/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : Graph 底层参数序列化（save_params/load_params）
 *
 * 职责：纯二进制序列化，只处理各节点持久化参数块的读写
 *
 * 文件布局（全部小端）：
 * 魔数 "FRPR" | 格式版本 u32 | 模型版本 u32 | 节点数 u32 |
 * 每个节点：名称长度 u32 + 名称 | 类型名长度 u32 + 类型名 | 参数块长度 u64 + 参数块
 */

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::Graph;
use super::error::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::utils::traits::float::Element;

impl<T: Element> Graph<T> {
    /// 参数文件魔数
    const PARAMS_MAGIC: &'static [u8; 4] = b"FRPR";
    /// 参数文件格式版本
    const PARAMS_VERSION: u32 = 1;
    /// 写入的模型版本，加载时原样传给各节点
    pub const MODEL_VERSION: u32 = 1;

    /// 保存所有节点的参数到二进制文件
    pub fn save_params<P: AsRef<Path>>(&self, path: P) -> Result<(), GraphError> {
        let file = File::create(path.as_ref())
            .map_err(|e| GraphError::ComputationError(format!("无法创建参数文件: {e}")))?;
        let mut writer = BufWriter::new(file);
        self.write_params(&mut writer)?;
        writer
            .flush()
            .map_err(|e| GraphError::ComputationError(format!("刷新缓冲区失败: {e}")))
    }

    /// 从二进制文件加载参数：按名称匹配节点，类型不符时报错，图中没有的节点被忽略
    pub fn load_params<P: AsRef<Path>>(&mut self, path: P) -> Result<(), GraphError> {
        let file = File::open(path.as_ref())
            .map_err(|e| GraphError::ComputationError(format!("无法打开参数文件: {e}")))?;
        self.read_params(&mut BufReader::new(file))
    }

    pub(in crate::nn) fn write_params(&self, writer: &mut dyn Write) -> Result<(), GraphError> {
        writer
            .write_all(Self::PARAMS_MAGIC)
            .map_err(|e| GraphError::ComputationError(format!("写入魔数失败: {e}")))?;
        write_u32(writer, Self::PARAMS_VERSION, "版本")?;
        write_u32(writer, Self::MODEL_VERSION, "模型版本")?;
        write_u32(writer, self.nodes.len() as u32, "节点数量")?;

        for id in self.sorted_node_ids() {
            let node = self.get_node(id)?;
            let mut block = Vec::new();
            node.node_type().save_params(&mut block)?;

            write_bytes(writer, node.name().as_bytes(), "名称")?;
            write_bytes(writer, node.op_name().as_bytes(), "节点类型")?;
            writer
                .write_all(&(block.len() as u64).to_le_bytes())
                .map_err(|e| GraphError::ComputationError(format!("写入参数块长度失败: {e}")))?;
            writer
                .write_all(&block)
                .map_err(|e| GraphError::ComputationError(format!("写入参数块失败: {e}")))?;
        }
        Ok(())
    }

    pub(in crate::nn) fn read_params(&mut self, reader: &mut dyn Read) -> Result<(), GraphError> {
        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|e| GraphError::ComputationError(format!("读取魔数失败: {e}")))?;
        if &magic != Self::PARAMS_MAGIC {
            return Err(GraphError::ComputationError(
                "无效的参数文件：这不是 frame_reshape 格式的参数文件。请确保使用 save_params() 保存的文件。"
                    .to_string(),
            ));
        }
        let version = read_u32(reader, "版本")?;
        if version != Self::PARAMS_VERSION {
            return Err(GraphError::ComputationError(format!(
                "不支持的参数文件版本: {version}"
            )));
        }
        let model_version = read_u32(reader, "模型版本")?;
        let node_count = read_u32(reader, "节点数量")?;

        for _ in 0..node_count {
            let name = read_string(reader, "名称")?;
            let op_name = read_string(reader, "节点类型")?;
            let mut len_bytes = [0u8; 8];
            reader
                .read_exact(&mut len_bytes)
                .map_err(|e| GraphError::ComputationError(format!("读取参数块长度失败: {e}")))?;
            let block = read_exact_len(reader, u64::from_le_bytes(len_bytes), "参数块")?;

            let Ok(id) = self.get_node_id(&name) else {
                log::warn!("参数文件中的节点{name}不在图{}中，已忽略", self.name);
                continue;
            };
            let node = self.get_node_mut(id)?;
            if node.op_name() != op_name {
                return Err(GraphError::InvalidOperation(format!(
                    "节点{name}在参数文件中的类型为{op_name}，而图中为{}",
                    node.op_name()
                )));
            }
            node.node_type_mut()
                .load_params(&mut block.as_slice(), model_version)?;
            self.is_validated = false;
        }
        Ok(())
    }
}

fn write_u32(writer: &mut dyn Write, value: u32, what: &str) -> Result<(), GraphError> {
    writer
        .write_all(&value.to_le_bytes())
        .map_err(|e| GraphError::ComputationError(format!("写入{what}失败: {e}")))
}

fn read_u32(reader: &mut dyn Read, what: &str) -> Result<u32, GraphError> {
    let mut bytes = [0u8; 4];
    reader
        .read_exact(&mut bytes)
        .map_err(|e| GraphError::ComputationError(format!("读取{what}失败: {e}")))?;
    Ok(u32::from_le_bytes(bytes))
}

fn write_bytes(writer: &mut dyn Write, bytes: &[u8], what: &str) -> Result<(), GraphError> {
    write_u32(writer, bytes.len() as u32, what)?;
    writer
        .write_all(bytes)
        .map_err(|e| GraphError::ComputationError(format!("写入{what}失败: {e}")))
}

/// 读取`len`个字节。长度来自文件本身，不可信：按实际读到的字节分配，不足时报错
fn read_exact_len(reader: &mut dyn Read, len: u64, what: &str) -> Result<Vec<u8>, GraphError> {
    let mut bytes = Vec::new();
    Read::take(&mut *reader, len)
        .read_to_end(&mut bytes)
        .map_err(|e| GraphError::ComputationError(format!("读取{what}失败: {e}")))?;
    if bytes.len() as u64 != len {
        return Err(GraphError::ComputationError(format!(
            "读取{what}失败: 声明的长度为{len}字节，实际只有{}字节",
            bytes.len()
        )));
    }
    Ok(bytes)
}

fn read_string(reader: &mut dyn Read, what: &str) -> Result<String, GraphError> {
    let len = read_u32(reader, what)?;
    let bytes = read_exact_len(reader, u64::from(len), what)?;
    String::from_utf8(bytes)
        .map_err(|e| GraphError::ComputationError(format!("{what}编码无效: {e}")))
}
