use std::io::{Read, Write};

use super::Matrix;
use crate::errors::TensorError;
use crate::utils::traits::float::Element;

// 保存和加载矩阵
impl<T: Element> Matrix<T> {
    /// 将单个矩阵写入`writer`：8 字节小端长度 + bincode 编码的数据
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<(), TensorError> {
        let serialized_data = bincode::serialize(&self.data)
            .map_err(|e| TensorError::Serialization(e.to_string()))?;
        writer
            .write_all(&(serialized_data.len() as u64).to_le_bytes())
            .map_err(|e| TensorError::Serialization(e.to_string()))?;
        writer
            .write_all(&serialized_data)
            .map_err(|e| TensorError::Serialization(e.to_string()))
    }

    /// 从`reader`加载单个矩阵（与[`Matrix::save`]配对）
    pub fn load<R: Read>(reader: &mut R) -> Result<Self, TensorError> {
        let mut len_bytes = [0u8; 8];
        reader
            .read_exact(&mut len_bytes)
            .map_err(|e| TensorError::Serialization(e.to_string()))?;
        let len = u64::from_le_bytes(len_bytes);
        // 长度字段不可信，按实际读到的字节分配
        let mut serialized_data = Vec::new();
        reader
            .take(len)
            .read_to_end(&mut serialized_data)
            .map_err(|e| TensorError::Serialization(e.to_string()))?;
        if serialized_data.len() as u64 != len {
            return Err(TensorError::Serialization(format!(
                "数据不完整：声明的长度为{len}字节，实际只有{}字节",
                serialized_data.len()
            )));
        }
        let data: ndarray::Array2<T> = bincode::deserialize(&serialized_data)
            .map_err(|e| TensorError::Serialization(e.to_string()))?;
        // 反序列化得到的是行优先内存，这里统一回列优先存储
        let (rows, cols) = data.dim();
        Self::from_col_major_vec(data.t().iter().copied().collect(), rows, cols)
    }
}
