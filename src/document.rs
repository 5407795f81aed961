use chrono::{NaiveDate, SecondsFormat};
use serde::Serialize;

use crate::envelope::LogEnvelope;
use crate::query_log::QueryLogEntry;

/// 输出到索引的文档
///
/// 语句原文不会输出。缺失的端口和数据库输出为空字符串。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputDocument<'a> {
    /// RFC 3339 格式的事件时间
    pub timestamp: String,
    pub remote_host: &'a str,
    pub remote_port: &'a str,
    pub user: &'a str,
    pub database: &'a str,
    pub process_id: &'a str,
    pub error_level: &'a str,
    pub duration: f64,
    pub statement_md5: &'a str,
    pub statement_len: usize,
    pub fingerprint: &'a str,
    pub fingerprint_md5: &'a str,
    pub fingerprint_len: usize,
    pub log_group: &'a str,
    pub log_stream: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<&'a str>,

    /// 事件日期（按事件自身的时区），用于计算索引名
    #[serde(skip)]
    pub event_date: NaiveDate,
}

impl<'a> OutputDocument<'a> {
    pub fn new(
        entry: &'a QueryLogEntry,
        envelope: &'a LogEnvelope,
        identifier: Option<&'a str>,
    ) -> Self {
        Self {
            timestamp: entry.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            remote_host: &entry.remote_host,
            remote_port: entry.remote_port.as_deref().unwrap_or_default(),
            user: &entry.user,
            database: entry.database.as_deref().unwrap_or_default(),
            process_id: &entry.process_id,
            error_level: &entry.error_level,
            duration: entry.duration,
            statement_md5: &entry.statement_md5,
            statement_len: entry.statement_len,
            fingerprint: &entry.fingerprint,
            fingerprint_md5: &entry.fingerprint_md5,
            fingerprint_len: entry.fingerprint_len,
            log_group: &envelope.log_group,
            log_stream: &envelope.log_stream,
            identifier,
            event_date: entry.timestamp.date_naive(),
        }
    }
}
