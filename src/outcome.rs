use std::fmt;

use serde::{Deserialize, Serialize};

/// 记录处理结果的标签，与批次响应中的 `result` 字段一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformState {
    Ok,
    Dropped,
    ProcessingFailed,
}

/// 一条记录的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 转换成功，携带序列化后的文档
    Ok(Vec<u8>),
    /// 没有需要输出的内容
    Dropped,
    /// 记录无法处理
    ProcessingFailed,
}

impl Outcome {
    pub fn state(&self) -> TransformState {
        match self {
            Outcome::Ok(_) => TransformState::Ok,
            Outcome::Dropped => TransformState::Dropped,
            Outcome::ProcessingFailed => TransformState::ProcessingFailed,
        }
    }
}

/// 带关联 ID 的处理结果，每条批次记录恰好产生一个
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub record_id: String,
    pub outcome: Outcome,
}

/// ok/dropped/failed 计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub ok: usize,
    pub dropped: usize,
    pub failed: usize,
}

impl OutcomeCounts {
    pub fn tally<I>(states: I) -> Self
    where
        I: IntoIterator<Item = TransformState>,
    {
        let mut counts = Self::default();
        for state in states {
            match state {
                TransformState::Ok => counts.ok += 1,
                TransformState::Dropped => counts.dropped += 1,
                TransformState::ProcessingFailed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.ok + self.dropped + self.failed
    }
}

impl fmt::Display for OutcomeCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ok={} dropped={} failed={}", self.ok, self.dropped, self.failed)
    }
}
