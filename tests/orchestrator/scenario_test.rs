/*!
 * End-to-end Scenarios
 * A plain directory, a held file, a foreign-owned directory
 */

use crate::fakes::{World, SELF_PID};
use force_reclaim::process::TerminationOutcome;
use force_reclaim::{FailureKind, Outcome, ReclaimConfig, ReclaimEngine, TargetKind};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn engine(world: &Arc<World>) -> ReclaimEngine {
    ReclaimEngine::builder()
        .with_config(ReclaimConfig::for_testing())
        .with_capabilities(world.capabilities())
        .build()
}

#[tokio::test]
async fn test_plain_directory_removed_directly() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("build-output");
    std::fs::create_dir_all(target.join("nested/deeper")).unwrap();
    std::fs::write(target.join("nested/a.txt"), b"alpha").unwrap();
    std::fs::write(target.join("nested/deeper/b.bin"), vec![0u8; 1024]).unwrap();

    let engine = ReclaimEngine::new(ReclaimConfig::for_testing());
    let report = engine.reclaim(&target, true).await.unwrap();

    assert_eq!(report.outcome, Outcome::Deleted);
    assert_eq!(report.strategy_names(), vec!["direct-removal"]);
    assert!(report.attempts[0].succeeded);
    assert_eq!(report.kind, TargetKind::Directory);
    assert_eq!(report.size_bytes, 1029);
    assert!(report.residual_entries.is_none());
    assert!(!target.exists());
    assert!(dir.path().exists());
}

#[tokio::test]
async fn test_held_file_needs_termination() {
    let world = World::new(TargetKind::File);
    world.hold(4242, "editor");
    world.spawn(5000, "bystander");

    let report = engine(&world)
        .reclaim("/virtual/locked.db", true)
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Deleted);
    assert_eq!(
        report.strategy_names(),
        vec!["direct-removal", "terminate-holders"]
    );
    assert!(!report.attempts[0].succeeded);
    assert!(report.attempts[1].succeeded);

    assert_eq!(report.terminated_pids(), vec![4242]);
    assert_eq!(report.terminated[0].outcome, TerminationOutcome::Graceful);
    assert_eq!(world.signalled_pids().into_iter().collect::<Vec<_>>(), vec![4242]);
    assert!(!world.is_present());
}

#[tokio::test]
async fn test_foreign_owned_directory_needs_escalation() {
    let world = World::new(TargetKind::Directory);
    world.owned_by_someone_else();

    let report = engine(&world)
        .reclaim("/virtual/someone-elses", true)
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Deleted);
    assert_eq!(
        report.strategy_names(),
        vec!["direct-removal", "terminate-holders", "escalate-ownership"]
    );
    assert_eq!(report.attempts[0].error_kind, Some(FailureKind::Privilege));
    assert!(report.attempts[1]
        .diagnostic
        .contains("no lock holders found"));
    assert!(report.attempts[2].succeeded);
    assert!(report.escalated);
    assert!(report.terminated.is_empty());
    assert!(!world.signalled_pids().contains(&SELF_PID));
}

#[tokio::test]
async fn test_missing_path_is_already_deleted() {
    let world = World::new(TargetKind::Absent);

    let report = engine(&world).reclaim("/virtual/gone", true).await.unwrap();

    assert_eq!(report.outcome, Outcome::Deleted);
    assert!(report.attempts.is_empty());
    assert_eq!(world.state.lock().removals, 0);
    assert_eq!(world.state.lock().registrations, 0);
}

#[tokio::test]
async fn test_missing_real_path_is_already_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let engine = ReclaimEngine::new(ReclaimConfig::for_testing());

    let report = engine
        .reclaim(dir.path().join("never-existed"), true)
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Deleted);
    assert!(report.attempts.is_empty());
}
