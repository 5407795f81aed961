//! 单条批次记录的转换
//!
//! 解码 → 逐行解析 → 选择 → 构建文档 → 序列化，并给出记录的处理结果。
//! 单行解析失败只跳过该行，不影响记录中其他行。

use std::fmt;

use tracing::{debug, warn};

use crate::batch::BatchRecord;
use crate::bulk::{BulkSerializer, DEFAULT_INDEX_PREFIX};
use crate::document::OutputDocument;
use crate::envelope::{LogEnvelope, MessageKind, decode_envelope};
use crate::error::TransformError;
use crate::identifier::IdentifierRule;
use crate::outcome::{Outcome, RecordOutcome};
use crate::query_log::QueryLogEntry;
use crate::selection::{FanOut, SelectionPolicy};

/// 记录被丢弃的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    ControlMessage,
    NoLogEvents,
    NoQueryLogs,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            DropReason::ControlMessage => "control message",
            DropReason::NoLogEvents => "record does not contain log events",
            DropReason::NoQueryLogs => "log events do not contain a query",
        };
        f.write_str(reason)
    }
}

/// 记录转换的成功结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformed {
    /// 序列化后的文档，以及文档数量
    Documents { payload: Vec<u8>, count: usize },
    Dropped(DropReason),
}

#[derive(Debug)]
pub struct RecordTransformer {
    policy: Box<dyn SelectionPolicy>,
    serializer: BulkSerializer,
    identifier_rule: Option<IdentifierRule>,
}

impl RecordTransformer {
    pub fn new(policy: Box<dyn SelectionPolicy>, serializer: BulkSerializer) -> Self {
        Self {
            policy,
            serializer,
            identifier_rule: None,
        }
    }

    pub fn with_identifier_rule(mut self, rule: IdentifierRule) -> Self {
        self.identifier_rule = Some(rule);
        self
    }

    /// 转换一条批次记录，任何情况下都返回一个结果
    pub fn transform(&self, record: &BatchRecord) -> RecordOutcome {
        let record_id = record.record_id.as_str();
        let outcome = match self.transform_payload(record_id, &record.data) {
            Ok(Transformed::Documents { payload, count }) => {
                debug!(record_id, documents = count, "record transformed");
                Outcome::Ok(payload)
            }
            Ok(Transformed::Dropped(reason)) => {
                debug!(record_id, %reason, "drop record");
                Outcome::Dropped
            }
            Err(e) => {
                warn!(record_id, error = %e, "failed to process record");
                Outcome::ProcessingFailed
            }
        };

        RecordOutcome {
            record_id: record.record_id.clone(),
            outcome,
        }
    }

    /// 转换记录载荷
    ///
    /// # 错误
    ///
    /// 载荷无法解码、消息类型未知或文档序列化失败时返回 `TransformError`。
    pub fn transform_payload(
        &self,
        record_id: &str,
        data: &[u8],
    ) -> Result<Transformed, TransformError> {
        let envelope = decode_envelope(data)?;

        match &envelope.message_type {
            MessageKind::Data => {}
            MessageKind::Control => return Ok(Transformed::Dropped(DropReason::ControlMessage)),
            MessageKind::Other(kind) => {
                return Err(TransformError::UnknownMessageKind(kind.clone()));
            }
        }

        if envelope.log_events.is_empty() {
            return Ok(Transformed::Dropped(DropReason::NoLogEvents));
        }

        let entries = parse_entries(record_id, &envelope);
        if entries.is_empty() {
            return Ok(Transformed::Dropped(DropReason::NoQueryLogs));
        }

        let selected = self.policy.select(record_id, entries);
        let identifier = self.identifier(record_id, &envelope.log_stream);
        let docs: Vec<OutputDocument<'_>> = selected
            .iter()
            .map(|entry| OutputDocument::new(entry, &envelope, identifier))
            .collect();

        let payload = self
            .serializer
            .serialize(&docs)
            .map_err(TransformError::Serialize)?;

        Ok(Transformed::Documents {
            payload,
            count: docs.len(),
        })
    }

    fn identifier<'a>(&self, record_id: &str, log_stream: &'a str) -> Option<&'a str> {
        let rule = self.identifier_rule.as_ref()?;
        let identifier = rule.extract(log_stream);
        if identifier.is_none() {
            warn!(record_id, log_stream, "no identifier in log stream name");
        }
        identifier
    }
}

impl Default for RecordTransformer {
    fn default() -> Self {
        Self::new(Box::new(FanOut), BulkSerializer::new(DEFAULT_INDEX_PREFIX))
    }
}

/// 解析信封中的所有行，解析失败的行记录日志后跳过
fn parse_entries(record_id: &str, envelope: &LogEnvelope) -> Vec<QueryLogEntry> {
    envelope
        .log_events
        .iter()
        .enumerate()
        .filter_map(|(index, event)| match event.parse() {
            Ok(entry) => entry,
            Err(e) => {
                warn!(record_id, index, error = %e, "failed to parse query log");
                None
            }
        })
        .collect()
}
