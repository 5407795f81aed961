//! 从日志流名称中提取标识符
//!
//! 规则在启动时校验，提取失败时文档不带 `identifier` 字段。

use regex::Regex;

use crate::error::ConfigError;

/// 正则规则中必须存在的命名分组
pub const IDENTIFIER_GROUP: &str = "identifier";

#[derive(Debug, Clone)]
pub enum IdentifierRule {
    /// 按分隔符切分后取第 `index` 段（从 0 开始）
    Segment { delimiter: String, index: usize },
    /// 取正则中 `identifier` 分组匹配的内容
    Pattern(Regex),
}

impl IdentifierRule {
    pub fn segment(delimiter: impl Into<String>, index: usize) -> Result<Self, ConfigError> {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Err(ConfigError::InvalidIdentifierRule(
                "delimiter must not be empty".to_string(),
            ));
        }
        Ok(IdentifierRule::Segment { delimiter, index })
    }

    pub fn pattern(pattern: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern)
            .map_err(|e| ConfigError::InvalidIdentifierRule(e.to_string()))?;
        if !regex.capture_names().flatten().any(|name| name == IDENTIFIER_GROUP) {
            return Err(ConfigError::InvalidIdentifierRule(format!(
                "pattern '{}' has no named group '{}'",
                pattern, IDENTIFIER_GROUP
            )));
        }
        Ok(IdentifierRule::Pattern(regex))
    }

    /// 提取标识符，没有对应的段或分组为空时返回 `None`
    pub fn extract<'a>(&self, label: &'a str) -> Option<&'a str> {
        let value = match self {
            IdentifierRule::Segment { delimiter, index } => {
                label.split(delimiter.as_str()).nth(*index)?
            }
            IdentifierRule::Pattern(regex) => {
                regex.captures(label)?.name(IDENTIFIER_GROUP)?.as_str()
            }
        };
        (!value.is_empty()).then_some(value)
    }
}
