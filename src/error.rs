//! 错误类型定义
//!
//! 按失败范围划分：单行解析错误只跳过该行，记录级错误只影响当前记录，
//! 批次级错误使整个批次失败。

use thiserror::Error;

/// 单行日志解析错误
///
/// 只有在行前缀已经确认这是一条查询日志之后才会出现，
/// 不匹配的行不是错误而是 `Ok(None)`。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// 耗时字段无法解析为有限的浮点数
    #[error("failed to parse duration '{value}' in line: {raw}")]
    InvalidDuration {
        /// 耗时字段原文
        value: String,
        /// 整行原文
        raw: String,
    },
}

/// 载荷解码错误
#[derive(Debug, Error)]
pub enum DecodeError {
    /// gzip 解压失败
    #[error("failed to decompress payload: {0}")]
    Decompress(#[from] std::io::Error),

    /// 解压后的内容不是合法的日志信封
    #[error("failed to decode log envelope: {0}")]
    Json(#[from] serde_json::Error),
}

/// 记录级错误，所有变体都会把记录标记为 `ProcessingFailed`
#[derive(Debug, Error)]
pub enum TransformError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("unknown message type: {0}")]
    UnknownMessageKind(String),

    #[error("failed to serialize document: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// 批次级错误
#[derive(Debug, Error)]
pub enum BatchError {
    /// 批次处理超过截止时间，不返回任何部分结果
    #[error("deadline exceeded after {processed} of {total} records")]
    DeadlineExceeded { processed: usize, total: usize },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// 配置加载与校验错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("index prefix must not be empty")]
    EmptyIndexPrefix,

    #[error("worker_threads must be greater than zero")]
    ZeroWorkerThreads,

    /// 标识符提取规则无效（分隔符为空、正则无法编译或缺少 `identifier` 分组）
    #[error("invalid identifier rule: {0}")]
    InvalidIdentifierRule(String),

    #[error(transparent)]
    Batch(#[from] BatchError),
}
