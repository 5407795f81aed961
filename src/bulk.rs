//! 批量索引载荷
//!
//! 单个文档直接输出 JSON。多个文档时，第一个之后的每个文档前都有一行
//! `{"index":{"_index":"<prefix>-<YYYY-MM-DD>"}}`，行之间以 `\n` 分隔：
//!
//! ```text
//! {doc1}
//! {"index":{"_index":"querylog-2024-01-01"}}
//! {doc2}
//! ```
//!
//! 下游未提供默认索引时，可以让第一个文档也带上索引行。

use chrono::NaiveDate;
use serde::Serialize;

use crate::document::OutputDocument;

pub const DEFAULT_INDEX_PREFIX: &str = "querylog";

#[derive(Serialize)]
struct IndexAction<'a> {
    index: IndexTarget<'a>,
}

#[derive(Serialize)]
struct IndexTarget<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkSerializer {
    index_prefix: String,
    leading_action: bool,
}

impl BulkSerializer {
    pub fn new(index_prefix: impl Into<String>) -> Self {
        Self {
            index_prefix: index_prefix.into(),
            leading_action: false,
        }
    }

    /// 多文档载荷的第一个文档是否也带索引行
    pub fn with_leading_action(mut self, leading_action: bool) -> Self {
        self.leading_action = leading_action;
        self
    }

    pub fn index_prefix(&self) -> &str {
        &self.index_prefix
    }

    /// 按日期分区的索引名
    pub fn index_name(&self, date: NaiveDate) -> String {
        format!("{}-{}", self.index_prefix, date.format("%Y-%m-%d"))
    }

    pub fn serialize(&self, docs: &[OutputDocument<'_>]) -> Result<Vec<u8>, serde_json::Error> {
        match docs {
            [] => Ok(Vec::new()),
            [doc] => serde_json::to_vec(doc),
            _ => {
                let mut buf = Vec::with_capacity(docs.len() * 512);
                for (i, doc) in docs.iter().enumerate() {
                    if i > 0 {
                        buf.push(b'\n');
                    }
                    if i > 0 || self.leading_action {
                        self.write_action(&mut buf, doc)?;
                        buf.push(b'\n');
                    }
                    serde_json::to_writer(&mut buf, doc)?;
                }
                Ok(buf)
            }
        }
    }

    fn write_action(
        &self,
        buf: &mut Vec<u8>,
        doc: &OutputDocument<'_>,
    ) -> Result<(), serde_json::Error> {
        let index = self.index_name(doc.event_date);
        serde_json::to_writer(buf, &IndexAction {
            index: IndexTarget { index: &index },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{LogEnvelope, MessageKind};
    use crate::parser::parse_line;
    use crate::query_log::QueryLogEntry;

    fn envelope() -> LogEnvelope {
        LogEnvelope {
            message_type: MessageKind::Data,
            owner: String::new(),
            log_group: "group".to_string(),
            log_stream: "stream".to_string(),
            subscription_filters: vec![],
            log_events: vec![],
        }
    }

    fn entry(date: &str, statement: &str) -> QueryLogEntry {
        let line = format!(
            "{} 12:00:00 UTC:10.0.0.1(5432):alice@mydb:1:LOG:  duration: 1.000 ms  statement: {}",
            date, statement
        );
        parse_line(&line, 0).unwrap().unwrap()
    }

    #[test]
    fn single_document_is_bare_json() {
        let env = envelope();
        let e = entry("2024-01-01", "SELECT 1");
        let docs = [OutputDocument::new(&e, &env, None)];

        let bytes = BulkSerializer::new("querylog").serialize(&docs).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(!text.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["fingerprint"], "select ?");
        assert_eq!(value["timestamp"], "2024-01-01T12:00:00Z");
        assert!(value.get("identifier").is_none());
    }

    #[test]
    fn single_document_ignores_leading_action() {
        let env = envelope();
        let e = entry("2024-01-01", "SELECT 1");
        let docs = [OutputDocument::new(&e, &env, None)];

        let bytes = BulkSerializer::new("querylog")
            .with_leading_action(true)
            .serialize(&docs)
            .unwrap();
        assert!(!bytes.contains(&b'\n'));
    }

    #[test]
    fn multiple_documents_alternate_action_lines() {
        let env = envelope();
        let entries = [
            entry("2024-01-01", "SELECT 1"),
            entry("2024-01-02", "SELECT 2"),
            entry("2024-01-03", "SELECT 3"),
        ];
        let docs: Vec<_> = entries
            .iter()
            .map(|e| OutputDocument::new(e, &env, Some("tenant")))
            .collect();

        let bytes = BulkSerializer::new("querylog").serialize(&docs).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.split('\n').collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], r#"{"index":{"_index":"querylog-2024-01-02"}}"#);
        assert_eq!(lines[3], r#"{"index":{"_index":"querylog-2024-01-03"}}"#);
        for doc_line in [lines[0], lines[2], lines[4]] {
            let value: serde_json::Value = serde_json::from_str(doc_line).unwrap();
            assert_eq!(value["identifier"], "tenant");
        }
    }

    #[test]
    fn leading_action_prefixes_first_document() {
        let env = envelope();
        let entries = [entry("2024-01-01", "SELECT 1"), entry("2024-01-01", "SELECT 2")];
        let docs: Vec<_> = entries
            .iter()
            .map(|e| OutputDocument::new(e, &env, None))
            .collect();

        let bytes = BulkSerializer::new("pg")
            .with_leading_action(true)
            .serialize(&docs)
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.split('\n').collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], r#"{"index":{"_index":"pg-2024-01-01"}}"#);
        assert_eq!(lines[2], r#"{"index":{"_index":"pg-2024-01-01"}}"#);
    }

    #[test]
    fn index_name_uses_event_date() {
        let serializer = BulkSerializer::new("querylog");
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(serializer.index_name(date), "querylog-2024-02-29");
    }
}
