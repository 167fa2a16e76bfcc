/*
 * @Author       : 老董
 * @Date         : 2026-02-05
 * @Description  : 图像形状标注（宽 × 高 × 通道），只用于元数据，不参与数值计算
 */

use serde::{Deserialize, Serialize};

use super::GraphError;

/// 节点输出的每一列可被解读为`width × height × channels`的图像；任一维为 0 表示“未指定”
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ImageLayout {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
}

impl ImageLayout {
    pub const fn new(width: usize, height: usize, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
        }
    }

    /// 把`rows`行的列向量看作宽 1、高`rows`、单通道的图像
    pub const fn column(rows: usize) -> Self {
        Self::new(1, rows, 1)
    }

    pub const fn num_elements(&self) -> usize {
        self.width * self.height * self.channels
    }

    /// 三个维度都未指定
    pub const fn is_unspecified(&self) -> bool {
        self.width == 0 && self.height == 0 && self.channels == 0
    }

    /// 三个维度都已指定
    pub const fn is_complete(&self) -> bool {
        self.width > 0 && self.height > 0 && self.channels > 0
    }

    /// 宽和通道都是 1，即退化为普通列向量；否则按行重排时会丢失图像信息
    pub const fn is_plain_column(&self) -> bool {
        self.width * self.channels == 1
    }

    /// 已知三维中的两维（或全部三维），按总行数`num_rows`补全剩余一维并校验
    pub fn completed_for_rows(&self, num_rows: usize) -> Result<Self, GraphError> {
        let Self {
            width,
            height,
            channels,
        } = *self;
        let given = [width, height, channels].iter().filter(|&&d| d > 0).count();
        if given < 2 {
            return Err(GraphError::InvalidArgument(format!(
                "图像形状({width}, {height}, {channels})至少需要指定两个维度"
            )));
        }
        if given == 3 {
            if self.num_elements() != num_rows {
                return Err(self.mismatch(num_rows, "图像形状的元素数与行数不符"));
            }
            return Ok(*self);
        }
        // 恰好缺一维
        let known = [width, height, channels]
            .iter()
            .filter(|&&d| d > 0)
            .product::<usize>();
        if num_rows % known != 0 {
            return Err(self.mismatch(num_rows, "行数不是已指定图像维度乘积的整数倍"));
        }
        let missing = num_rows / known;
        Ok(match (width, height, channels) {
            (0, _, _) => Self::new(missing, height, channels),
            (_, 0, _) => Self::new(width, missing, channels),
            _ => Self::new(width, height, missing),
        })
    }

    fn mismatch(&self, num_rows: usize, message: &str) -> GraphError {
        GraphError::ShapeMismatch {
            expected: vec![num_rows],
            got: vec![self.width, self.height, self.channels],
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for ImageLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} x {} x {}", self.width, self.height, self.channels)
    }
}
