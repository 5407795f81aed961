use chrono::{DateTime, FixedOffset};

/// 查询日志条目
///
/// 表示从一行 PostgreSQL 日志中解析出的一次语句执行事件。
/// 只有错误级别为 `LOG` 且带有 `duration:` 的行才会产生条目。
#[derive(Debug, Clone, PartialEq)]
pub struct QueryLogEntry {
    /// 事件时间，日志中的时间戳无法解析时回退为摄入时间
    pub timestamp: DateTime<FixedOffset>,

    /// 客户端地址
    pub remote_host: String,

    /// 客户端端口（可选）
    pub remote_port: Option<String>,

    /// 用户名
    pub user: String,

    /// 数据库名（可选）
    pub database: Option<String>,

    /// 后端进程 ID
    pub process_id: String,

    /// 错误级别，始终为 `LOG`
    pub error_level: String,

    /// 执行耗时（毫秒），非负
    pub duration: f64,

    /// 语句原文，不会输出到文档中
    pub statement: String,

    pub statement_md5: String,
    pub statement_len: usize,

    /// 语句指纹，字面量被替换为 `?`
    pub fingerprint: String,

    pub fingerprint_md5: String,
    pub fingerprint_len: usize,
}
