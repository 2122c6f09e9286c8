// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn signal_names_match_wire_format() {
    assert_eq!(WorkflowSignal::Pause.name(), "workflow:pause");
    assert_eq!(WorkflowSignal::Skip.name(), "workflow:skip");
    assert_eq!(WorkflowSignal::Stop.name(), "workflow:stop");
    assert_eq!(
        WorkflowSignal::ModeChange { autonomous_mode: true }.name(),
        "workflow:mode-change"
    );
    assert_eq!(
        WorkflowSignal::Error { reason: "boom".to_string() }.name(),
        "workflow:error"
    );
}

#[tokio::test]
async fn subscribers_receive_published_signals() {
    let bus = SignalBus::new();
    let mut rx1 = bus.subscribe();
    let mut rx2 = bus.subscribe();

    bus.publish(WorkflowSignal::Pause);

    assert_eq!(rx1.recv().await.unwrap(), WorkflowSignal::Pause);
    assert_eq!(rx2.recv().await.unwrap(), WorkflowSignal::Pause);
}

#[test]
fn publish_without_subscribers_does_not_panic() {
    let bus = SignalBus::new();
    bus.publish(WorkflowSignal::Stop);
}
