//! Tests for the per-agent offer holder

use std::collections::BTreeMap;

use prometheus_offer_engine::core::{
    sufficient_for, AgentDescriptor, DriverStatus, HolderState, Offer, OfferError, OfferHolder,
    OfferId, ResourceSet, TaskRequest,
};
use prometheus_offer_engine::infra::RecordingDriver;

fn holder_for(offers: Vec<Offer>) -> OfferHolder {
    let agent = AgentDescriptor::from_offer(&offers[0], "rack", "DEFAULT", &BTreeMap::new());
    OfferHolder::new(offers, 4, agent).expect("holder")
}

#[test]
fn test_greedy_loop_over_one_holder() {
    let mut holder = holder_for(vec![
        Offer::new("o1", "agent-1", "host-1", ResourceSet::cpus_mem(2.0, 2048.0))
            .with_attribute("rack", "rack-b"),
    ]);
    let tasks = [
        TaskRequest::new("p1", "a", ResourceSet::cpus_mem(1.0, 1024.0)),
        TaskRequest::new("p2", "b", ResourceSet::cpus_mem(4.0, 1.0)),
        TaskRequest::new("p3", "c", ResourceSet::cpus_mem(1.0, 1024.0)),
    ];

    for task in &tasks {
        if holder.has_rejected_pending_task_already(&task.pending_id) {
            continue;
        }
        if sufficient_for(&holder.profile(), task) {
            holder.add_matched_task(task.clone()).expect("fits");
        } else {
            holder.add_rejected_task(task.pending_id.clone());
        }
    }

    assert_eq!(holder.accepted_tasks().len(), 2);
    assert!(holder.has_rejected_pending_task_already(&tasks[1].pending_id));
    assert!(holder.current_resources().is_empty());
    assert_eq!(holder.rack_id(), "rack-b");
    assert_eq!(holder.sanitized_rack_id(), "rack_b");
    assert!(holder.to_string().contains("accepted=2"));
}

#[test]
fn test_task_ids_embed_pending_id_and_sanitized_host() {
    let mut holder = holder_for(vec![Offer::new(
        "o1",
        "agent-1",
        "ip-10-0-0-1",
        ResourceSet::cpus_mem(1.0, 1.0),
    )]);
    let matched = holder
        .add_matched_task(TaskRequest::new("deploy-7", "web", ResourceSet::cpus_mem(1.0, 1.0)))
        .expect("fits");
    assert!(matched.task_id.starts_with("deploy-7-ip_10_0_0_1-"));
}

#[test]
fn test_rejected_launch_still_commits() {
    let driver = RecordingDriver::new();
    driver.set_launch_status(DriverStatus::Stopped);
    let mut holder = holder_for(vec![Offer::new(
        "o1",
        "agent-1",
        "host-1",
        ResourceSet::cpus_mem(1.0, 1.0),
    )]);
    holder
        .add_matched_task(TaskRequest::new("p1", "a", ResourceSet::cpus_mem(0.5, 0.5)))
        .expect("fits");

    let err = holder.launch_tasks(&driver).expect_err("driver stopped");
    match err {
        OfferError::CommitFailure { status, offers } => {
            assert_eq!(status, DriverStatus::Stopped);
            assert_eq!(offers, vec![OfferId::new("o1")]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(holder.state(), HolderState::Committed);
    assert_eq!(driver.launches().len(), 1);
}

#[test]
fn test_launch_without_matches_is_an_integrity_violation() {
    let driver = RecordingDriver::new();
    let mut holder = holder_for(vec![Offer::new(
        "o1",
        "agent-1",
        "host-1",
        ResourceSet::cpus_mem(1.0, 1.0),
    )]);
    assert!(matches!(
        holder.launch_tasks(&driver),
        Err(OfferError::IntegrityViolation(_))
    ));
    assert!(driver.launches().is_empty());
    assert_eq!(holder.release().expect("release"), vec![OfferId::new("o1")]);
    assert_eq!(holder.state(), HolderState::Released);
}
