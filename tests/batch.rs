//! 批次处理的集成测试

mod common;

use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::{data_record, envelope, query_line, record};
use pg_querylog_transform::{
    BatchError, BatchEvent, BatchProcessor, BatchRecord, BatchResponse, MessageKind,
    OutcomeCounts, RecordTransformer, Settings, TransformState,
};

fn mixed_batch() -> BatchEvent {
    let line = query_line("12:00:00", 1, "1.000", "SELECT * FROM orders WHERE id = 42");
    BatchEvent {
        invocation_id: "inv-1".to_string(),
        records: vec![
            data_record("ok-1", &[&line]),
            record("control", &envelope(MessageKind::Control, &[])),
            BatchRecord {
                record_id: "broken".to_string(),
                data: b"garbage".to_vec(),
            },
            data_record("empty", &[]),
            data_record("ok-2", &[&line, &line]),
        ],
    }
}

#[test]
fn test_outcomes_keep_record_ids() {
    let processor = BatchProcessor::new(RecordTransformer::default(), Some(2)).unwrap();
    let response = processor.process(&mixed_batch());

    let results: Vec<(&str, TransformState)> = response
        .records
        .iter()
        .map(|r| (r.record_id.as_str(), r.result))
        .collect();
    assert_eq!(
        results,
        vec![
            ("ok-1", TransformState::Ok),
            ("control", TransformState::Dropped),
            ("broken", TransformState::ProcessingFailed),
            ("empty", TransformState::Dropped),
            ("ok-2", TransformState::Ok),
        ]
    );
    assert_eq!(
        response.counts(),
        OutcomeCounts {
            ok: 2,
            dropped: 2,
            failed: 1
        }
    );
    assert!(response.records[1].data.is_empty());
    assert!(!response.records[4].data.is_empty());
}

#[test]
fn test_wire_round_trip() {
    let event = mixed_batch();
    let json = serde_json::to_string(&event).unwrap();
    let wire: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(wire["invocationId"], "inv-1");
    assert_eq!(wire["records"][2]["recordId"], "broken");
    assert_eq!(wire["records"][2]["data"], STANDARD.encode(b"garbage"));

    let decoded: BatchEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, event);
}

#[test]
fn test_response_wire_format() {
    let processor = Settings::default().build_processor().unwrap();
    let response = processor.process(&mixed_batch());
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["records"][0]["result"], "Ok");
    assert_eq!(json["records"][1]["result"], "Dropped");
    assert!(json["records"][1].get("data").is_none());
    assert_eq!(json["records"][2]["result"], "ProcessingFailed");

    let encoded = json["records"][0]["data"].as_str().unwrap();
    let doc: serde_json::Value = serde_json::from_slice(&STANDARD.decode(encoded).unwrap()).unwrap();
    assert_eq!(doc["fingerprint"], "select * from orders where id = ?");

    let back: BatchResponse = serde_json::from_value(json).unwrap();
    assert_eq!(back, response);
}

#[test]
fn test_deadline_in_time() {
    let processor = BatchProcessor::new(RecordTransformer::default(), Some(1)).unwrap();
    let deadline = Instant::now() + Duration::from_secs(60);
    let response = processor.process_with_deadline(&mixed_batch(), deadline).unwrap();
    assert_eq!(response.records.len(), 5);
}

#[test]
fn test_deadline_exceeded_aborts_batch() {
    let processor = BatchProcessor::new(RecordTransformer::default(), Some(1)).unwrap();
    let result = processor.process_with_deadline(&mixed_batch(), Instant::now());

    match result {
        Err(BatchError::DeadlineExceeded { processed, total }) => {
            assert_eq!(total, 5);
            assert!(processed < total);
        }
        other => panic!("expected DeadlineExceeded, got {:?}", other),
    }
}

#[test]
fn test_large_batch_in_parallel() {
    let records: Vec<BatchRecord> = (0..64)
        .map(|i| {
            let line = query_line("12:00:00", i, "2.500", &format!("SELECT {} FROM t", i));
            data_record(&format!("r-{}", i), &[&line])
        })
        .collect();
    let event = BatchEvent {
        invocation_id: String::new(),
        records,
    };

    let processor = BatchProcessor::new(RecordTransformer::default(), Some(4)).unwrap();
    let response = processor.process(&event);

    assert_eq!(response.counts().ok, 64);
    for (i, rec) in response.records.iter().enumerate() {
        assert_eq!(rec.record_id, format!("r-{}", i));
    }
}
