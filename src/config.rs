//! 运行配置
//!
//! 从 `QUERYLOG_` 前缀的环境变量（以及可选的 TOML 文件）加载，启动时校验。

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::batch::BatchProcessor;
use crate::bulk::{BulkSerializer, DEFAULT_INDEX_PREFIX};
use crate::error::ConfigError;
use crate::identifier::IdentifierRule;
use crate::selection::SelectionStrategy;
use crate::telemetry::LogFormat;
use crate::transformer::RecordTransformer;

/// 环境变量前缀
pub const ENV_PREFIX: &str = "QUERYLOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// 日志级别（trace, debug, info, warn, error）
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// 一条记录包含多条查询时的选择策略
    #[serde(default)]
    pub selection: SelectionStrategy,

    /// 批量索引名前缀
    #[serde(default = "default_index_prefix")]
    pub index_prefix: String,

    /// 多文档载荷的第一个文档是否也带索引行
    #[serde(default)]
    pub leading_index_action: bool,

    #[serde(default = "default_identifier_delimiter")]
    pub identifier_delimiter: String,

    /// 按分隔符切分日志流名称后取第几段作为标识符
    #[serde(default)]
    pub identifier_segment: Option<usize>,

    /// 带 `identifier` 命名分组的正则，优先于 `identifier_segment`
    #[serde(default)]
    pub identifier_pattern: Option<String>,

    /// 线程池大小，未设置时使用 CPU 核心数
    #[serde(default)]
    pub worker_threads: Option<usize>,

    /// 整个批次的处理时限（毫秒）
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_index_prefix() -> String {
    DEFAULT_INDEX_PREFIX.to_string()
}

fn default_identifier_delimiter() -> String {
    "/".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            selection: SelectionStrategy::default(),
            index_prefix: default_index_prefix(),
            leading_index_action: false,
            identifier_delimiter: default_identifier_delimiter(),
            identifier_segment: None,
            identifier_pattern: None,
            worker_threads: None,
            deadline_ms: None,
        }
    }
}

impl Settings {
    /// 仅从环境变量加载
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None, Environment::with_prefix(ENV_PREFIX))
    }

    /// 从可选的配置文件和环境变量加载，环境变量优先
    ///
    /// # 错误
    ///
    /// 配置无法读取、字段类型不匹配或校验失败时返回 `ConfigError`。
    pub fn load(file: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }
        let settings: Settings = builder.add_source(env).build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index_prefix.trim().is_empty() {
            return Err(ConfigError::EmptyIndexPrefix);
        }
        if self.worker_threads == Some(0) {
            return Err(ConfigError::ZeroWorkerThreads);
        }
        self.identifier_rule()?;
        Ok(())
    }

    /// 标识符提取规则，未配置时为 `None`
    pub fn identifier_rule(&self) -> Result<Option<IdentifierRule>, ConfigError> {
        if let Some(pattern) = &self.identifier_pattern {
            return IdentifierRule::pattern(pattern).map(Some);
        }
        self.identifier_segment
            .map(|index| IdentifierRule::segment(self.identifier_delimiter.as_str(), index))
            .transpose()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    pub fn build_transformer(&self) -> Result<RecordTransformer, ConfigError> {
        if self.index_prefix.trim().is_empty() {
            return Err(ConfigError::EmptyIndexPrefix);
        }
        let serializer = BulkSerializer::new(self.index_prefix.as_str())
            .with_leading_action(self.leading_index_action);
        let transformer = RecordTransformer::new(self.selection.policy(), serializer);

        Ok(match self.identifier_rule()? {
            Some(rule) => transformer.with_identifier_rule(rule),
            None => transformer,
        })
    }

    pub fn build_processor(&self) -> Result<BatchProcessor, ConfigError> {
        self.validate()?;
        let transformer = self.build_transformer()?;
        Ok(BatchProcessor::new(transformer, self.worker_threads)?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn defaults() {
        let settings = Settings::load(None, env(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.selection, SelectionStrategy::FanOut);
        assert_eq!(settings.index_prefix, "querylog");
        assert!(settings.identifier_rule().unwrap().is_none());
        assert!(settings.deadline().is_none());
    }

    #[test]
    fn environment_overrides() {
        let settings = Settings::load(
            None,
            env(&[
                ("QUERYLOG_SELECTION", "longest_duration"),
                ("QUERYLOG_INDEX_PREFIX", "pg"),
                ("QUERYLOG_LEADING_INDEX_ACTION", "true"),
                ("QUERYLOG_WORKER_THREADS", "2"),
                ("QUERYLOG_DEADLINE_MS", "1500"),
                ("QUERYLOG_LOG_FORMAT", "json"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.selection, SelectionStrategy::LongestDuration);
        assert_eq!(settings.index_prefix, "pg");
        assert!(settings.leading_index_action);
        assert_eq!(settings.worker_threads, Some(2));
        assert_eq!(settings.deadline(), Some(Duration::from_millis(1500)));
        assert_eq!(settings.log_format, LogFormat::Json);
    }

    #[test]
    fn empty_index_prefix_is_rejected() {
        let result = Settings::load(None, env(&[("QUERYLOG_INDEX_PREFIX", " ")]));
        assert!(matches!(result, Err(ConfigError::EmptyIndexPrefix)));
    }

    #[test]
    fn zero_worker_threads_is_rejected() {
        let result = Settings::load(None, env(&[("QUERYLOG_WORKER_THREADS", "0")]));
        assert!(matches!(result, Err(ConfigError::ZeroWorkerThreads)));
    }

    #[test]
    fn invalid_identifier_pattern_is_rejected_at_startup() {
        let result = Settings::load(None, env(&[("QUERYLOG_IDENTIFIER_PATTERN", "^[a-z]+$")]));
        assert!(matches!(result, Err(ConfigError::InvalidIdentifierRule(_))));
    }

    #[test]
    fn identifier_segment_rule() {
        let settings = Settings {
            identifier_segment: Some(4),
            ..Settings::default()
        };
        let rule = settings.identifier_rule().unwrap().unwrap();
        assert_eq!(rule.extract("/aws/rds/cluster/orders/postgresql"), Some("orders"));
    }

    #[test]
    fn load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "selection = \"first_only\"\nindex_prefix = \"from-file\"\nidentifier_pattern = \"^(?P<identifier>[a-z]+)\\\\.\\\\d+$\""
        )
        .unwrap();

        let settings = Settings::load(
            Some(file.path()),
            env(&[("QUERYLOG_INDEX_PREFIX", "from-env")]),
        )
        .unwrap();

        assert_eq!(settings.selection, SelectionStrategy::FirstOnly);
        assert_eq!(settings.index_prefix, "from-env");
        let rule = settings.identifier_rule().unwrap().unwrap();
        assert_eq!(rule.extract("orders.0"), Some("orders"));
    }

    #[test]
    fn build_processor_from_settings() {
        let settings = Settings {
            worker_threads: Some(1),
            ..Settings::default()
        };
        assert!(settings.build_processor().is_ok());
    }
}
