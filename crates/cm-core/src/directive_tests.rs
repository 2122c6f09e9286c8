// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn continue_has_no_reason_or_trigger() {
    let d = Directive::continue_();
    assert_eq!(d.action, DirectiveAction::Continue);
    assert!(d.reason.is_none());
    assert!(d.trigger_agent_id.is_none());
    assert!(d.is_continue());
}

#[test]
fn default_equals_continue() {
    assert_eq!(Directive::default(), Directive::continue_());
}

#[test]
fn missing_fields_deserialize_to_none() {
    let parsed: Directive = serde_json::from_str(r#"{"action":"stop"}"#).unwrap();
    assert_eq!(parsed.action, DirectiveAction::Stop);
    assert_eq!(parsed.reason, None);
}

#[test]
fn trigger_round_trips_with_agent_id() {
    let d = Directive {
        action: DirectiveAction::Trigger,
        reason: None,
        trigger_agent_id: Some("qa".to_string()),
    };
    let json = serde_json::to_string(&d).unwrap();
    let parsed: Directive = serde_json::from_str(&json).unwrap();
    assert_eq!(d, parsed);
    assert!(json.contains("\"triggerAgentId\":\"qa\""));
}

#[test]
fn wire_shape_uses_snake_case_action() {
    let d = Directive {
        action: DirectiveAction::Checkpoint,
        reason: Some("needs review".to_string()),
        trigger_agent_id: None,
    };
    let value: serde_json::Value = serde_json::to_value(&d).unwrap();
    assert_eq!(value["action"], "checkpoint");
    assert_eq!(value["reason"], "needs review");
    assert!(value.get("triggerAgentId").is_none());
}

#[test]
fn unknown_action_fails_to_parse() {
    let result: Result<Directive, _> = serde_json::from_str(r#"{"action":"nonsense"}"#);
    assert!(result.is_err());
}
