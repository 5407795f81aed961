//! 核心解析函数
//!
//! 将一行 PostgreSQL 日志解析为 `QueryLogEntry`。

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use memchr::memchr;
use tracing::debug;

use crate::error::ParseError;
use crate::fingerprint::StatementDigest;
use crate::parser::constants::*;
use crate::query_log::QueryLogEntry;

/// 解析一行日志
///
/// # 参数
///
/// * `message` - 日志行原文，可以包含多行语句
/// * `ingested_at_ms` - 日志的摄入时间（Unix 毫秒），时间戳无法解析时使用
///
/// # 返回
///
/// * `Ok(Some(entry))` - 查询事件
/// * `Ok(None)` - 不是查询事件（前缀不匹配、级别不是 `LOG` 或没有耗时）
/// * `Err(ParseError)` - 前缀匹配但耗时无法解析
///
/// # 示例
///
/// ```
/// use pg_querylog_transform::parser::parse_line;
///
/// let line = "2024-01-01 12:00:00 UTC:10.0.0.1(5432):alice@mydb:1234:LOG:  duration: 12.340 ms  statement: SELECT 1";
/// let entry = parse_line(line, 0).unwrap().unwrap();
///
/// assert_eq!(entry.remote_port.as_deref(), Some("5432"));
/// assert_eq!(entry.duration, 12.34);
/// assert_eq!(entry.fingerprint, "select ?");
/// ```
pub fn parse_line(message: &str, ingested_at_ms: i64) -> Result<Option<QueryLogEntry>, ParseError> {
    let Some(prefix) = PREFIX_PATTERN.captures(message) else {
        return Ok(None);
    };

    let error_level = &prefix["level"];
    if error_level != NORMAL_LEVEL {
        return Ok(None);
    }

    let Some(body) = DURATION_PATTERN.captures(&prefix["rest"]) else {
        return Ok(None);
    };

    let duration_str = &body["duration"];
    let duration = parse_duration(duration_str).ok_or_else(|| ParseError::InvalidDuration {
        value: duration_str.to_string(),
        raw: message.to_string(),
    })?;

    let ts = &prefix["ts"];
    let timestamp = parse_timestamp(ts).unwrap_or_else(|| {
        debug!(timestamp = ts, "failed to parse timestamp, using ingestion time");
        ingestion_timestamp(ingested_at_ms)
    });

    let (remote_host, remote_port) = split_host_port(&prefix["host"]);
    let (user, database) = split_user_database(&prefix["user"]);

    let statement = body["statement"].to_string();
    let digest = StatementDigest::of(&statement);

    Ok(Some(QueryLogEntry {
        timestamp,
        remote_host,
        remote_port,
        user,
        database,
        process_id: prefix["pid"].to_string(),
        error_level: error_level.to_string(),
        duration,
        statement,
        statement_md5: digest.statement_md5,
        statement_len: digest.statement_len,
        fingerprint: digest.fingerprint,
        fingerprint_md5: digest.fingerprint_md5,
        fingerprint_len: digest.fingerprint_len,
    }))
}

#[inline]
fn parse_duration(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// 解析 `YYYY-MM-DD HH:MM:SS <时区>` 格式的时间戳
///
/// 时区缩写（`UTC`、`GMT`、`JST` 等三到五个大写字母）按零偏移处理，
/// 数字偏移（`+09`、`-0330`、`+05:30`）按实际偏移处理。
pub fn parse_timestamp(ts: &str) -> Option<DateTime<FixedOffset>> {
    let (datetime, zone) = ts.trim().rsplit_once(char::is_whitespace)?;
    let naive = NaiveDateTime::parse_from_str(datetime.trim_end(), TIMESTAMP_FORMAT).ok()?;
    let offset = parse_zone(zone)?;
    naive.and_local_timezone(offset).single()
}

fn parse_zone(zone: &str) -> Option<FixedOffset> {
    if let Some(digits) = zone.strip_prefix('+') {
        return parse_offset_seconds(digits).and_then(FixedOffset::east_opt);
    }
    if let Some(digits) = zone.strip_prefix('-') {
        return parse_offset_seconds(digits).and_then(FixedOffset::west_opt);
    }

    let is_abbreviation =
        (3..=5).contains(&zone.len()) && zone.bytes().all(|b| b.is_ascii_uppercase());
    if is_abbreviation || zone == "Z" {
        return FixedOffset::east_opt(0);
    }
    None
}

/// `09`、`0930`、`09:30` 转换为秒数
fn parse_offset_seconds(digits: &str) -> Option<i32> {
    let digits = digits.replace(':', "");
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 3600 + minutes * 60)
}

/// 摄入时间（Unix 毫秒）转换为 UTC 时间，超出范围时为 Unix 纪元
pub(crate) fn ingestion_timestamp(ms: i64) -> DateTime<FixedOffset> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .unwrap_or_default()
        .fixed_offset()
}

/// `10.0.0.1(5432)` 拆分为地址和端口
pub(crate) fn split_host_port(token: &str) -> (String, Option<String>) {
    match memchr(b'(', token.as_bytes()) {
        Some(idx) => {
            let port = token[idx + 1..].trim_end_matches(')');
            (
                token[..idx].to_string(),
                (!port.is_empty()).then(|| port.to_string()),
            )
        }
        None => (token.to_string(), None),
    }
}

/// `alice@mydb` 拆分为用户名和数据库名
pub(crate) fn split_user_database(token: &str) -> (String, Option<String>) {
    match memchr(b'@', token.as_bytes()) {
        Some(idx) => {
            let database = &token[idx + 1..];
            (
                token[..idx].to_string(),
                (!database.is_empty()).then(|| database.to_string()),
            )
        }
        None => (token.to_string(), None),
    }
}
