/*
 * @Author       : 老董
 * @Date         : 2026-02-05
 * @Description  : 小批量布局（MbLayout）与帧区间（FrameRange）
 *
 * 带布局的矩阵有 S 条并行序列、T 个时间步，共 S×T 列，
 * 第 t 个时间步第 s 条序列位于第 `t*S + s` 列。
 */

use std::ops::{BitOr, BitOrAssign, Range};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::GraphError;

/// 单个（序列, 时间步）格子的打包标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PackingFlags(u8);

impl PackingFlags {
    pub const NONE: Self = Self(0);
    /// 序列从该帧开始
    pub const SEQUENCE_START: Self = Self(1);
    /// 序列在该帧结束
    pub const SEQUENCE_END: Self = Self(1 << 1);
    /// 空隙：该帧没有真实数据
    pub const NO_INPUT: Self = Self(1 << 2);

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `other`中的所有标记都已置位
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for PackingFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PackingFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

/// 小批量布局：`S`条并行序列 × `T`个时间步，外加每个格子的打包标记
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MbLayout {
    num_parallel_sequences: usize,
    num_time_steps: usize,
    /// 按`t * S + s`存放
    flags: Vec<PackingFlags>,
}

/// 布局在同一批数据的所有节点之间只读共享
pub type MbLayoutPtr = Arc<MbLayout>;

impl MbLayout {
    pub fn new(num_parallel_sequences: usize, num_time_steps: usize) -> Self {
        Self {
            num_parallel_sequences,
            num_time_steps,
            flags: vec![PackingFlags::NONE; num_parallel_sequences * num_time_steps],
        }
    }

    /// 重新初始化为`S × T`，所有标记清空
    pub fn init(&mut self, num_parallel_sequences: usize, num_time_steps: usize) {
        *self = Self::new(num_parallel_sequences, num_time_steps);
    }

    pub const fn num_parallel_sequences(&self) -> usize {
        self.num_parallel_sequences
    }

    pub const fn num_time_steps(&self) -> usize {
        self.num_time_steps
    }

    /// 该布局对应的矩阵列数`S × T`
    pub const fn num_cols(&self) -> usize {
        self.num_parallel_sequences * self.num_time_steps
    }

    /// 第`seq`条序列第`t`步的标记，越界返回None
    pub fn get(&self, seq: usize, t: usize) -> Option<PackingFlags> {
        if seq >= self.num_parallel_sequences || t >= self.num_time_steps {
            return None;
        }
        Some(self.flags[t * self.num_parallel_sequences + seq])
    }

    /// 覆盖第`seq`条序列第`t`步的标记
    pub fn set(&mut self, seq: usize, t: usize, flags: PackingFlags) -> Result<(), GraphError> {
        let index = self.index_of(seq, t)?;
        self.flags[index] = flags;
        Ok(())
    }

    /// 在第`seq`条序列第`t`步上追加标记
    pub fn add(&mut self, seq: usize, t: usize, flags: PackingFlags) -> Result<(), GraphError> {
        let index = self.index_of(seq, t)?;
        self.flags[index].insert(flags);
        Ok(())
    }

    pub fn is(&self, seq: usize, t: usize, flags: PackingFlags) -> bool {
        self.get(seq, t).is_some_and(|f| f.contains(flags))
    }

    pub fn is_gap(&self, seq: usize, t: usize) -> bool {
        self.is(seq, t, PackingFlags::NO_INPUT)
    }

    /// 是否存在任何空隙帧
    pub fn has_gaps(&self) -> bool {
        self.flags
            .iter()
            .any(|f| f.contains(PackingFlags::NO_INPUT))
    }

    fn index_of(&self, seq: usize, t: usize) -> Result<usize, GraphError> {
        if seq >= self.num_parallel_sequences || t >= self.num_time_steps {
            return Err(GraphError::InvalidArgument(format!(
                "布局位置(序列{seq}, 时间步{t})超出范围：布局为{}条序列×{}个时间步",
                self.num_parallel_sequences, self.num_time_steps
            )));
        }
        Ok(t * self.num_parallel_sequences + seq)
    }
}

/// 两个布局是同一对象，或内容完全相同
pub(crate) fn same_layout(a: &MbLayoutPtr, b: &MbLayoutPtr) -> bool {
    Arc::ptr_eq(a, b) || **a == **b
}

/// 帧区间：要么是全部帧，要么是单个时间步（可再限定到某一条序列）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameRange {
    #[default]
    AllFrames,
    Frame { t: usize, seq: Option<usize> },
}

impl FrameRange {
    pub const fn all() -> Self {
        Self::AllFrames
    }

    pub const fn at(t: usize) -> Self {
        Self::Frame { t, seq: None }
    }

    /// 限定到第`seq`条序列；对全部帧无效
    pub const fn with_sequence(self, seq: usize) -> Self {
        match self {
            Self::AllFrames => Self::AllFrames,
            Self::Frame { t, .. } => Self::Frame { t, seq: Some(seq) },
        }
    }

    pub const fn is_all_frames(&self) -> bool {
        matches!(self, Self::AllFrames)
    }

    /// 在列数为`num_cols`、布局为`layout`的矩阵上，本帧区间对应的列区间
    pub fn column_range(
        &self,
        layout: Option<&MbLayout>,
        num_cols: usize,
    ) -> Result<Range<usize>, GraphError> {
        match *self {
            Self::AllFrames => Ok(0..num_cols),
            Self::Frame { t, seq } => {
                let layout = layout.ok_or_else(|| {
                    GraphError::Unsupported(format!(
                        "无布局的矩阵不支持按帧访问（时间步{t}）"
                    ))
                })?;
                let s_count = layout.num_parallel_sequences();
                check_frame(layout, t, seq)?;
                Ok(match seq {
                    None => t * s_count..(t + 1) * s_count,
                    Some(s) => t * s_count + s..t * s_count + s + 1,
                })
            }
        }
    }
}

fn check_frame(layout: &MbLayout, t: usize, seq: Option<usize>) -> Result<(), GraphError> {
    if t >= layout.num_time_steps() {
        return Err(GraphError::InvalidArgument(format!(
            "时间步{t}超出布局的时间步数{}",
            layout.num_time_steps()
        )));
    }
    match seq {
        Some(s) if s >= layout.num_parallel_sequences() => Err(GraphError::InvalidArgument(
            format!("序列{s}超出布局的并行序列数{}", layout.num_parallel_sequences()),
        )),
        _ => Ok(()),
    }
}

/// 短网格（堆叠前）上的一段连续时间步`[begin, begin + len)`，可限定到单条序列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TimeWindow {
    pub begin: usize,
    pub len: usize,
    pub seq: Option<usize>,
}

impl TimeWindow {
    /// 帧区间按短网格`short_layout`解释
    pub(crate) fn from_short_frame(
        frame: FrameRange,
        short_layout: &MbLayout,
    ) -> Result<Self, GraphError> {
        match frame {
            FrameRange::AllFrames => Ok(Self {
                begin: 0,
                len: short_layout.num_time_steps(),
                seq: None,
            }),
            FrameRange::Frame { t, seq } => {
                check_frame(short_layout, t, seq)?;
                Ok(Self { begin: t, len: 1, seq })
            }
        }
    }

    /// 帧区间按高网格`tall_layout`解释：高网格的 1 步对应短网格的`k`步
    pub(crate) fn from_tall_frame(
        frame: FrameRange,
        tall_layout: &MbLayout,
        k: usize,
    ) -> Result<Self, GraphError> {
        match frame {
            FrameRange::AllFrames => Ok(Self {
                begin: 0,
                len: tall_layout.num_time_steps() * k,
                seq: None,
            }),
            FrameRange::Frame { t, seq } => {
                check_frame(tall_layout, t, seq)?;
                Ok(Self {
                    begin: t * k,
                    len: k,
                    seq,
                })
            }
        }
    }
}
