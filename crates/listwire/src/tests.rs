//! Tests for frames, the operation registry, and the error chain codec.

use std::collections::BTreeMap;

use serde_json::json;

use crate::chain::{ErrorChain, RemoteError};
use crate::error::Error;
use crate::frame::{Handle, MessageId, Request, Response};
use crate::op;
use crate::snapshot::{ItemSnapshot, ListSnapshot};

fn sample_snapshot() -> ListSnapshot {
    let mut items = BTreeMap::new();
    items.insert(
        7,
        ItemSnapshot {
            id: 7,
            list_id: 3,
            description: "buy milk".into(),
            is_completed: false,
            created_at: 1_700_000_100,
        },
    );
    items.insert(
        9,
        ItemSnapshot {
            id: 9,
            list_id: 3,
            description: "walk dog".into(),
            is_completed: true,
            created_at: 1_700_000_200,
        },
    );
    ListSnapshot {
        id: 3,
        title: "chores".into(),
        created_at: 1_700_000_000,
        item_ids: vec![7, 9],
        items,
    }
}

#[test]
fn test_request_round_trip() {
    let request = Request::new(
        op::ADD_ITEM,
        op::AddItemParams {
            handle: Handle::from(4),
            description: "buy milk".into(),
        },
    )
    .unwrap();

    let bytes = request.encode().unwrap();
    let decoded = Request::decode(&bytes).unwrap();

    assert_eq!(decoded.id, request.id);
    assert_eq!(decoded.op, op::ADD_ITEM);

    let params: op::AddItemParams = decoded.params().unwrap();
    assert_eq!(params.handle, Handle::from(4));
    assert_eq!(params.description, "buy milk");
}

#[test]
fn test_request_wire_shape_uses_type_field() {
    let request = Request::new(op::LIST_ALL, json!({})).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&request.encode().unwrap()).unwrap();

    assert!(value.get("type").is_some());
    assert!(value.get("op").is_none());
    assert_eq!(value["type"], op::LIST_ALL);
}

#[test]
fn test_request_params_mismatch() {
    let request = Request::new(op::CREATE_LIST, json!({"wrong": true})).unwrap();

    let err = request.params::<op::CreateListParams>().unwrap_err();
    match err {
        Error::PayloadMismatch { op, .. } => assert_eq!(op, op::CREATE_LIST),
        other => panic!("expected PayloadMismatch, got {:?}", other),
    }
}

#[test]
fn test_malformed_frame() {
    let err = Request::decode(&[0xFF, 0xFF, 0xFF]).unwrap_err();
    assert!(matches!(err, Error::MalformedFrame(_)));
}

#[test]
fn test_message_ids_are_unique() {
    let a = MessageId::mint();
    let b = MessageId::mint();
    assert_ne!(a, b);
}

#[test]
fn test_response_success_round_trip() {
    let id = MessageId::mint();
    let payload = serde_json::to_value(op::ListState {
        snapshot: sample_snapshot(),
    })
    .unwrap();

    let response = Response::ok(id.clone(), payload);
    let decoded = Response::decode(&response.encode().unwrap()).unwrap();

    assert_eq!(decoded.id, id);
    assert!(decoded.success);

    let value = decoded.into_result().unwrap();
    let state: op::ListState = serde_json::from_value(value).unwrap();
    assert_eq!(state.snapshot, sample_snapshot());
}

#[test]
fn test_response_failure_round_trip() {
    let id = MessageId::mint();
    let response = Response::fail(id.clone(), ErrorChain::leaf("invalid handle: 12"));
    let decoded = Response::decode(&response.encode().unwrap()).unwrap();

    assert!(!decoded.success);
    let err = decoded.into_result().unwrap_err();
    assert_eq!(err.message(), "invalid handle: 12");
}

#[test]
fn test_snapshot_preserves_child_order_and_fields() {
    let snapshot = sample_snapshot();
    let bytes = serde_json::to_vec(&snapshot).unwrap();
    let decoded: ListSnapshot = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(decoded, snapshot);
    assert_eq!(decoded.item_ids, vec![7, 9]);
    assert_eq!(decoded.item(7).unwrap().description, "buy milk");
    assert!(decoded.item(9).unwrap().is_completed);
    assert_eq!(decoded.item_count(), 2);
}

#[test]
fn test_known_operations() {
    assert!(op::is_known(op::INIT));
    assert!(op::is_known(op::EXPORT_DB));
    assert!(!op::is_known("frobnicate"));
}

// ============================================================================
//  ERROR CHAIN CODEC
// ============================================================================

#[test]
fn test_chain_from_anyhow_preserves_order() {
    let err = anyhow::anyhow!("disk is full")
        .context("writing item row")
        .context("saving todo list");

    let chain = ErrorChain::from_anyhow(&err);
    assert_eq!(chain.len(), 3);

    let messages: Vec<&str> = chain.nodes().iter().map(|n| n.message.as_str()).collect();
    assert_eq!(messages, vec!["saving todo list", "writing item row", "disk is full"]);
}

#[test]
fn test_chain_from_std_error_source_chain() {
    let root = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
    let err = anyhow::Error::from(root).context("opening database");

    let chain = ErrorChain::from_error(err.as_ref());
    assert_eq!(chain.first().message, "opening database");
    assert_eq!(chain.nodes().last().unwrap().message, "no such file");
}

#[test]
fn test_chain_from_structured_value() {
    let value = json!({
        "msg": "saving failed",
        "stack": "at save_list",
        "source": {
            "msg": "constraint violated",
            "source": { "msg": "disk is full" }
        }
    });

    let chain = ErrorChain::from_value(&value);
    assert_eq!(chain.len(), 3);
    assert_eq!(chain.first().message, "saving failed");
    assert_eq!(chain.first().stack.as_deref(), Some("at save_list"));
    assert_eq!(chain.nodes()[2].message, "disk is full");
}

#[test]
fn test_chain_from_generic_object_summarizes_scalars() {
    let value = json!({
        "code": 500,
        "reason": "boom",
        "nested": { "ignored": true }
    });

    let chain = ErrorChain::from_value(&value);
    assert_eq!(chain.len(), 1);
    assert!(chain.first().message.contains("code: 500"));
    assert!(chain.first().message.contains("reason: boom"));
    assert!(!chain.first().message.contains("ignored"));
}

#[test]
fn test_chain_from_useless_value_gets_placeholder() {
    let chain = ErrorChain::from_value(&serde_json::Value::Null);
    assert_eq!(chain.len(), 1);
    assert!(chain.first().message.contains("null"));

    let chain = ErrorChain::from_value(&json!(""));
    assert!(chain.first().message.contains("string"));
}

#[test]
fn test_chain_from_plain_string() {
    let chain = ErrorChain::from_value(&json!("it broke"));
    assert_eq!(chain.len(), 1);
    assert_eq!(chain.first().message, "it broke");
}

#[test]
fn test_remote_error_display_and_detail() {
    let err = anyhow::anyhow!("root cause")
        .context("middle layer")
        .context("top layer");
    let remote = RemoteError::new(ErrorChain::from_anyhow(&err));

    // short message for inline display
    assert_eq!(remote.to_string(), "top layer");
    assert_eq!(remote.message(), "top layer");

    // full chain for diagnostic logs, original order
    let detail = remote.detail();
    let top = detail.find("top layer").unwrap();
    let middle = detail.find("middle layer").unwrap();
    let root = detail.find("root cause").unwrap();
    assert!(top < middle && middle < root);
}

#[test]
fn test_chain_round_trip_through_response() {
    let err = anyhow::anyhow!("root cause")
        .context("middle layer")
        .context("top layer");
    let response = Response::fail(MessageId::mint(), ErrorChain::from_anyhow(&err));

    let decoded = Response::decode(&response.encode().unwrap()).unwrap();
    let remote = decoded.into_result().unwrap_err();

    assert_eq!(remote.chain().len(), 3);
    assert_eq!(remote.message(), "top layer");
    assert_eq!(remote.chain().nodes()[2].message, "root cause");
}
