//! 日志信封解码
//!
//! 批次记录的载荷是 gzip 压缩的 CloudWatch Logs 订阅数据（JSON）。

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, ParseError};
use crate::parser::parse_line;
use crate::query_log::QueryLogEntry;

const DATA_MESSAGE: &str = "DATA_MESSAGE";
const CONTROL_MESSAGE: &str = "CONTROL_MESSAGE";

/// 信封的消息类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    /// 携带日志数据
    Data,
    /// 订阅通道的控制消息，不携带日志
    Control,
    /// 未知类型
    Other(String),
}

impl From<String> for MessageKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            DATA_MESSAGE => MessageKind::Data,
            CONTROL_MESSAGE => MessageKind::Control,
            _ => MessageKind::Other(kind),
        }
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Data => DATA_MESSAGE.to_string(),
            MessageKind::Control => CONTROL_MESSAGE.to_string(),
            MessageKind::Other(kind) => kind,
        }
    }
}

/// 解码后的日志信封
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEnvelope {
    pub message_type: MessageKind,

    #[serde(default)]
    pub owner: String,

    /// 来源日志组
    #[serde(default)]
    pub log_group: String,

    /// 来源日志流
    #[serde(default)]
    pub log_stream: String,

    #[serde(default)]
    pub subscription_filters: Vec<String>,

    /// 按顺序排列的原始日志行
    #[serde(default)]
    pub log_events: Vec<LogEvent>,
}

/// 一行原始日志
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(default)]
    pub id: String,

    /// 摄入时间（Unix 毫秒）
    pub timestamp: i64,

    pub message: String,
}

impl LogEvent {
    /// 将该行解析为查询日志条目
    pub fn parse(&self) -> Result<Option<QueryLogEntry>, ParseError> {
        parse_line(&self.message, self.timestamp)
    }
}

/// 解压并解码载荷
///
/// # 错误
///
/// * `DecodeError::Decompress` - 载荷不是合法的 gzip 数据
/// * `DecodeError::Json` - 解压后的内容不符合信封结构
pub fn decode_envelope(data: &[u8]) -> Result<LogEnvelope, DecodeError> {
    let mut json = Vec::with_capacity(data.len() * 4);
    MultiGzDecoder::new(data).read_to_end(&mut json)?;
    Ok(serde_json::from_slice(&json)?)
}

/// 将信封编码为 gzip 压缩的 JSON，与 `decode_envelope` 互逆
pub fn encode_envelope(envelope: &LogEnvelope) -> Result<Vec<u8>, DecodeError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    serde_json::to_writer(&mut encoder, envelope)?;
    encoder.flush()?;
    Ok(encoder.finish()?)
}
