//! 集成测试公用的数据构造

#![allow(dead_code)]

use pg_querylog_transform::{BatchRecord, LogEnvelope, LogEvent, MessageKind, encode_envelope};

pub const LOG_GROUP: &str = "/aws/rds/cluster/orders-prod/postgresql";
pub const LOG_STREAM: &str = "/aws/rds/cluster/orders-prod/postgresql";

/// 构造一行慢查询日志
pub fn query_line(time: &str, pid: u32, duration: &str, statement: &str) -> String {
    format!(
        "2024-01-01 {} UTC:10.0.0.1(5432):alice@mydb:{}:LOG:  duration: {} ms  statement: {}",
        time, pid, duration, statement
    )
}

pub fn envelope(kind: MessageKind, lines: &[&str]) -> LogEnvelope {
    LogEnvelope {
        message_type: kind,
        owner: "123456789012".to_string(),
        log_group: LOG_GROUP.to_string(),
        log_stream: LOG_STREAM.to_string(),
        subscription_filters: vec!["querylog".to_string()],
        log_events: lines
            .iter()
            .enumerate()
            .map(|(i, line)| LogEvent {
                id: i.to_string(),
                timestamp: 1_704_110_400_000 + i as i64,
                message: line.to_string(),
            })
            .collect(),
    }
}

pub fn record(record_id: &str, envelope: &LogEnvelope) -> BatchRecord {
    BatchRecord {
        record_id: record_id.to_string(),
        data: encode_envelope(envelope).unwrap(),
    }
}

pub fn data_record(record_id: &str, lines: &[&str]) -> BatchRecord {
    record(record_id, &envelope(MessageKind::Data, lines))
}

/// 按行拆分载荷并解析每一行
pub fn payload_lines(payload: &[u8]) -> Vec<serde_json::Value> {
    std::str::from_utf8(payload)
        .unwrap()
        .split('\n')
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}
