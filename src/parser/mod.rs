//! 日志行解析器
//!
//! 识别 RDS PostgreSQL 默认 `log_line_prefix`（`%t:%r:%u@%d:%p:`）格式的日志，
//! 提取慢查询日志中的耗时与语句。

pub mod constants;
pub mod parse_functions;

pub use parse_functions::{parse_line, parse_timestamp};
