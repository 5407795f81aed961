//! 多条查询日志的选择策略
//!
//! 一条批次记录可能包含多条查询日志。策略在构建转换器时确定一次，
//! 之后对每条记录使用同一个策略。

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::query_log::QueryLogEntry;

/// 从一条记录解析出的全部条目中选出要输出的条目
pub trait SelectionPolicy: fmt::Debug + Send + Sync {
    /// `entries` 按日志行原始顺序排列且非空
    fn select(&self, record_id: &str, entries: Vec<QueryLogEntry>) -> Vec<QueryLogEntry>;
}

/// 只保留第一条
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstOnly;

impl SelectionPolicy for FirstOnly {
    fn select(&self, record_id: &str, mut entries: Vec<QueryLogEntry>) -> Vec<QueryLogEntry> {
        if entries.len() > 1 {
            warn!(
                record_id,
                ignored = entries.len() - 1,
                "record contains multiple query logs, only the first is used"
            );
        }
        entries.truncate(1);
        entries
    }
}

/// 只保留耗时最长的一条，耗时相同时取靠前的一条
#[derive(Debug, Clone, Copy, Default)]
pub struct LongestDuration;

impl SelectionPolicy for LongestDuration {
    fn select(&self, _record_id: &str, mut entries: Vec<QueryLogEntry>) -> Vec<QueryLogEntry> {
        // sort_by 是稳定排序
        entries.sort_by(|a, b| b.duration.total_cmp(&a.duration));
        entries.truncate(1);
        entries
    }
}

/// 全部保留，每条生成一个文档
#[derive(Debug, Clone, Copy, Default)]
pub struct FanOut;

impl SelectionPolicy for FanOut {
    fn select(&self, _record_id: &str, entries: Vec<QueryLogEntry>) -> Vec<QueryLogEntry> {
        entries
    }
}

/// 可配置的策略名称
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    FirstOnly,
    LongestDuration,
    #[default]
    FanOut,
}

impl SelectionStrategy {
    pub fn policy(self) -> Box<dyn SelectionPolicy> {
        match self {
            SelectionStrategy::FirstOnly => Box::new(FirstOnly),
            SelectionStrategy::LongestDuration => Box::new(LongestDuration),
            SelectionStrategy::FanOut => Box::new(FanOut),
        }
    }
}
