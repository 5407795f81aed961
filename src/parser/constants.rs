//! 解析器使用的常量定义
//!
//! 正则表达式在首次使用时编译一次，之后只读共享。

use once_cell::sync::Lazy;
use regex::Regex;

/// 只有该级别的日志才可能是查询事件
pub const NORMAL_LEVEL: &str = "LOG";

/// 时间戳中日期时间部分的格式，时区缩写单独处理
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 行前缀：`时间戳:客户端:用户@数据库:进程:级别:剩余部分`
///
/// 只切分前五个冒号分隔的字段，剩余部分可以包含冒号和换行。
pub static PREFIX_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)^(?P<ts>\d{4}-\d{2}-\d{2}\s+\d{2}:\d{2}:\d{2}\s+[^:]+):(?P<host>[^:]*):(?P<user>[^:]*):(?P<pid>[^:]*):(?P<level>[^:]*):(?P<rest>.*)",
    )
    .expect("prefix pattern is valid")
});

/// 剩余部分：`duration: <毫秒> ms statement: <语句>` 或 `execute <名称>: <语句>`
pub static DURATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)^\s+duration:\s+(?P<duration>\d[\d.]*)\s+ms\s+(?:statement|execute\s+[^:]+):(?P<statement>.*)",
    )
    .expect("duration pattern is valid")
});
