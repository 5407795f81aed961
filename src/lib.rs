//! # PG Query Log Transform
//!
//! 将 CloudWatch Logs 订阅推送的 RDS PostgreSQL 慢查询日志转换为可批量索引的文档。
//!
//! ## 功能特性
//!
//! - **逐条记录处理**: 每条批次记录独立转换，结果为 `Ok`、`Dropped` 或 `ProcessingFailed`
//! - **语句指纹**: 字面量替换为占位符，得到稳定的分组键，并计算 MD5
//! - **可配置的选择策略**: 一条记录包含多条查询时，只取第一条、取耗时最长的一条或全部输出
//! - **批量索引格式**: 多个文档时输出交替的索引行与文档行
//! - **并行处理**: 批次内的记录在线程池中并行转换
//!
//! ## 快速开始
//!
//! ### 解析单行日志
//!
//! ```rust
//! use pg_querylog_transform::parse_line;
//!
//! let line = "2024-01-01 12:00:00 UTC:10.0.0.1(5432):alice@mydb:1234:LOG:  duration: 12.340 ms  statement: SELECT 1";
//! let entry = parse_line(line, 0).unwrap().unwrap();
//!
//! assert_eq!(entry.user, "alice");
//! assert_eq!(entry.duration, 12.34);
//! assert_eq!(entry.fingerprint, "select ?");
//! ```
//!
//! ### 处理一个批次
//!
//! ```rust
//! use pg_querylog_transform::{BatchEvent, Settings, TransformState};
//!
//! let processor = Settings::default().build_processor().unwrap();
//! let event: BatchEvent = serde_json::from_str(
//!     r#"{"invocationId":"inv-1","records":[{"recordId":"r-1","data":"bm90IGd6aXA="}]}"#,
//! )
//! .unwrap();
//!
//! let response = processor.process(&event);
//! assert_eq!(response.records[0].record_id, "r-1");
//! assert_eq!(response.records[0].result, TransformState::ProcessingFailed);
//! ```
//!
//! ## 日志格式
//!
//! 使用 RDS 默认的 `log_line_prefix`：
//!
//! ```text
//! 2024-01-01 12:00:00 UTC:10.0.0.1(5432):alice@mydb:1234:LOG:  duration: 12.340 ms  statement: SELECT 1
//! ```
//!
//! 只有 `LOG` 级别且带 `duration:` 的行被视为查询日志，其他行直接忽略。

pub mod batch;
pub mod bulk;
pub mod config;
pub mod document;
pub mod envelope;
pub mod error;
pub mod fingerprint;
pub mod identifier;
pub mod outcome;
pub mod parser;
pub mod query_log;
pub mod selection;
pub mod telemetry;
pub mod transformer;

pub use batch::{BatchEvent, BatchProcessor, BatchRecord, BatchResponse, ResponseRecord};
pub use bulk::BulkSerializer;
pub use config::Settings;
pub use document::OutputDocument;
pub use envelope::{LogEnvelope, LogEvent, MessageKind, decode_envelope, encode_envelope};
pub use error::{BatchError, ConfigError, DecodeError, ParseError, TransformError};
pub use fingerprint::{StatementDigest, fingerprint};
pub use identifier::IdentifierRule;
pub use outcome::{Outcome, OutcomeCounts, RecordOutcome, TransformState};
pub use parser::{parse_line, parse_timestamp};
pub use query_log::QueryLogEntry;
pub use selection::{SelectionPolicy, SelectionStrategy};
pub use transformer::{DropReason, RecordTransformer, Transformed};
