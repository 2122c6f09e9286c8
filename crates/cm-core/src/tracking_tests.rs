// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fresh_record_is_not_completed() {
    let record = StepTrackingRecord::started("abc", 7);
    assert!(!record.is_completed());
    assert!(record.has_started());
}

#[test]
fn mark_completed_sets_completed_at() {
    let mut record = StepTrackingRecord::started("abc", 7);
    record.mark_completed("2026-07-28T00:00:00Z");
    assert!(record.is_completed());
}

#[test]
fn completed_at_is_authoritative_over_completed_chains() {
    let mut record = StepTrackingRecord::started("abc", 7);
    record.mark_chain_completed(0);
    assert!(record.has_incomplete_chain_progress());
    record.mark_completed("now");
    assert!(!record.has_incomplete_chain_progress());
}

#[test]
fn mark_chain_completed_is_idempotent() {
    let mut record = StepTrackingRecord::started("abc", 7);
    record.mark_chain_completed(1);
    record.mark_chain_completed(1);
    assert_eq!(record.completed_chains, Some(vec![1]));
}

#[test]
fn default_record_has_no_session() {
    let record = StepTrackingRecord::default();
    assert!(!record.has_started());
}

#[test]
fn started_record_with_empty_session_id_is_still_started() {
    // A step that crashes before the adapter returns a session id must
    // still be detectable as started, independent of `session_id` content.
    let record = StepTrackingRecord::started("", 7);
    assert!(record.has_started());
    assert_eq!(record.session_id, "");
}

#[test]
fn set_session_id_does_not_touch_started_or_completion() {
    let mut record = StepTrackingRecord::started("", 7);
    record.set_session_id("abc");
    assert!(record.has_started());
    assert!(!record.is_completed());
    assert_eq!(record.session_id, "abc");
}

#[test]
fn resume_info_start_index_matches_each_variant() {
    assert_eq!(ResumeInfo::StartFresh.start_index(), 0);
    assert_eq!(
        ResumeInfo::ResumeFromChain {
            index: 3,
            chain_index: 1
        }
        .start_index(),
        3
    );
    assert_eq!(ResumeInfo::ResumeFromCrash { index: 2 }.start_index(), 2);
    assert_eq!(
        ResumeInfo::ContinueAfterCompleted { index: 5 }.start_index(),
        5
    );
}

#[test]
fn serde_round_trip_skips_empty_session() {
    let record = StepTrackingRecord::default();
    let value = serde_json::to_value(&record).unwrap();
    assert!(value.get("session_id").is_none());
}
