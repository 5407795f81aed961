//! 批次的输入输出格式与并行处理
//!
//! 批次中每条记录独立转换，记录之间没有共享的可变状态，因此在线程池中并行处理。
//! 结果按输入顺序返回，但调用方应以 `recordId` 关联结果。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::BatchError;
use crate::outcome::{Outcome, OutcomeCounts, RecordOutcome, TransformState};
use crate::transformer::RecordTransformer;

/// 一次调用收到的批次
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEvent {
    #[serde(default, rename = "invocationId")]
    pub invocation_id: String,

    #[serde(default)]
    pub records: Vec<BatchRecord>,
}

/// 批次中的一条记录，`data` 是 gzip 压缩的日志信封
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRecord {
    #[serde(rename = "recordId")]
    pub record_id: String,

    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub records: Vec<ResponseRecord>,
}

impl BatchResponse {
    pub fn counts(&self) -> OutcomeCounts {
        OutcomeCounts::tally(self.records.iter().map(|r| r.result))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    #[serde(rename = "recordId")]
    pub record_id: String,

    pub result: TransformState,

    /// 只有 `Ok` 的记录携带数据
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u8>,
}

impl From<RecordOutcome> for ResponseRecord {
    fn from(outcome: RecordOutcome) -> Self {
        let result = outcome.outcome.state();
        let data = match outcome.outcome {
            Outcome::Ok(payload) => payload,
            Outcome::Dropped | Outcome::ProcessingFailed => Vec::new(),
        };
        Self {
            record_id: outcome.record_id,
            result,
            data,
        }
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}

/// 批次处理器
///
/// 持有一个转换器和一个固定大小的线程池，可以在多次调用之间复用。
#[derive(Debug)]
pub struct BatchProcessor {
    transformer: RecordTransformer,
    pool: ThreadPool,
}

impl BatchProcessor {
    /// 创建处理器，`worker_threads` 为 `None` 时使用 CPU 核心数
    pub fn new(
        transformer: RecordTransformer,
        worker_threads: Option<usize>,
    ) -> Result<Self, BatchError> {
        let mut builder =
            ThreadPoolBuilder::new().thread_name(|i| format!("querylog-worker-{}", i));
        if let Some(threads) = worker_threads {
            builder = builder.num_threads(threads);
        }
        Ok(Self {
            transformer,
            pool: builder.build()?,
        })
    }

    pub fn transformer(&self) -> &RecordTransformer {
        &self.transformer
    }

    /// 并行转换所有记录，结果与输入一一对应
    pub fn transform_all(&self, records: &[BatchRecord]) -> Vec<RecordOutcome> {
        self.pool.install(|| {
            records
                .par_iter()
                .map(|record| self.transformer.transform(record))
                .collect()
        })
    }

    pub fn process(&self, event: &BatchEvent) -> BatchResponse {
        info!(
            invocation_id = %event.invocation_id,
            records = event.records.len(),
            "start handling requests"
        );
        let outcomes = self.transform_all(&event.records);
        finish(&event.invocation_id, outcomes)
    }

    /// 在截止时间内处理批次
    ///
    /// 每条记录开始前检查截止时间。超时后整个批次失败，不返回部分结果。
    ///
    /// # 错误
    ///
    /// 超过截止时间时返回 `BatchError::DeadlineExceeded`。
    pub fn process_with_deadline(
        &self,
        event: &BatchEvent,
        deadline: Instant,
    ) -> Result<BatchResponse, BatchError> {
        let total = event.records.len();
        info!(
            invocation_id = %event.invocation_id,
            records = total,
            "start handling requests"
        );

        let processed = AtomicUsize::new(0);
        let outcomes: Option<Vec<RecordOutcome>> = self.pool.install(|| {
            event
                .records
                .par_iter()
                .map(|record| {
                    if Instant::now() >= deadline {
                        return None;
                    }
                    let outcome = self.transformer.transform(record);
                    processed.fetch_add(1, Ordering::Relaxed);
                    Some(outcome)
                })
                .collect()
        });

        match outcomes {
            Some(outcomes) => Ok(finish(&event.invocation_id, outcomes)),
            None => {
                let processed = processed.into_inner();
                warn!(
                    invocation_id = %event.invocation_id,
                    processed,
                    total,
                    "deadline exceeded, abandoning batch"
                );
                Err(BatchError::DeadlineExceeded { processed, total })
            }
        }
    }
}

fn finish(invocation_id: &str, outcomes: Vec<RecordOutcome>) -> BatchResponse {
    let counts = OutcomeCounts::tally(outcomes.iter().map(|o| o.outcome.state()));
    info!(
        invocation_id,
        ok = counts.ok,
        dropped = counts.dropped,
        failed = counts.failed,
        "finish handling requests"
    );
    BatchResponse {
        records: outcomes.into_iter().map(ResponseRecord::from).collect(),
    }
}
