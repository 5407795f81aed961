//! 命令行入口
//!
//! 从文件或标准输入读取一个批次（JSON），转换后把响应写到标准输出。
//!
//! 环境变量：
//!  - `QUERYLOG_*` : 运行配置，例如 `QUERYLOG_SELECTION=longest_duration`
//!  - `QUERYLOG_CONFIG` : 可选的 TOML 配置文件路径
//!  - `RUST_LOG` : 覆盖配置中的日志级别

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use config::Environment;
use pg_querylog_transform::config::ENV_PREFIX;
use pg_querylog_transform::{BatchEvent, Settings, telemetry};
use tracing::info;

#[derive(Parser, Debug)]
#[clap(name = "querylog-transform")]
#[clap(about = "Transform a batch of PostgreSQL query log records into bulk index documents", version)]
struct Cli {
    /// 批次 JSON 文件，省略时从标准输入读取
    #[clap(long, short)]
    input: Option<PathBuf>,

    #[clap(long, env = "QUERYLOG_CONFIG")]
    config: Option<PathBuf>,

    /// 只输出 ok/dropped/failed 计数
    #[clap(long)]
    summary: bool,
}

fn read_event(input: Option<&PathBuf>) -> Result<BatchEvent> {
    let event = match input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))?
        }
        None => {
            let mut buf = Vec::new();
            io::stdin().lock().read_to_end(&mut buf)?;
            serde_json::from_slice(&buf)?
        }
    };
    Ok(event)
}

fn main() -> Result<()> {
    let started = Instant::now();
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref(), Environment::with_prefix(ENV_PREFIX))
        .context("failed to load settings")?;
    telemetry::init(&settings.log_level, settings.log_format);

    let processor = settings.build_processor()?;
    let event = read_event(cli.input.as_ref()).context("failed to read batch event")?;

    let response = match settings.deadline() {
        Some(limit) => processor.process_with_deadline(&event, started + limit)?,
        None => processor.process(&event),
    };
    info!(elapsed_ms = started.elapsed().as_millis() as u64, "batch done");

    let mut out = BufWriter::new(io::stdout().lock());
    if cli.summary {
        writeln!(out, "{}", response.counts())?;
    } else {
        serde_json::to_writer(&mut out, &response)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}
