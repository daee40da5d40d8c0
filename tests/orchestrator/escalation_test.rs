/*!
 * Escalation Tests
 * Ordering, fault isolation, timeouts, cancellation, and the deferred fallback
 */

use crate::fakes::{Overlap, Script, ScriptedStrategy, World, SELF_PID};
use force_reclaim::strategy::{DeferredDeletion, Strategy, StrategyCatalog};
use force_reclaim::{
    FailureKind, Outcome, ReclaimConfig, ReclaimEngine, StrategyTimeouts, TargetKind,
    TimeoutPolicy,
};
use pretty_assertions::assert_eq;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const CANONICAL: [&str; 7] = [
    "direct-removal",
    "terminate-holders",
    "escalate-ownership",
    "rename-then-delete",
    "neutralize-contents",
    "alternate-removal",
    "mirror-to-empty",
];

fn fallback() -> Arc<dyn Strategy> {
    Arc::new(DeferredDeletion::new(TimeoutPolicy::Strategy(
        Duration::from_secs(5),
    )))
}

fn scripted_engine(
    world: &Arc<World>,
    strategies: Vec<ScriptedStrategy>,
    config: ReclaimConfig,
) -> ReclaimEngine {
    let strategies: Vec<Arc<dyn Strategy>> = strategies
        .into_iter()
        .map(|s| Arc::new(s) as Arc<dyn Strategy>)
        .collect();
    ReclaimEngine::builder()
        .with_config(config)
        .with_capabilities(world.capabilities())
        .with_catalog(StrategyCatalog::from_parts(strategies, fallback()))
        .build()
}

fn all_failing() -> Vec<ScriptedStrategy> {
    CANONICAL
        .iter()
        .map(|&name| ScriptedStrategy::new(name, Script::Fail))
        .collect()
}

#[tokio::test]
async fn test_exhaustion_runs_canonical_order_then_schedules() {
    // The holder is the test process itself: never signalled, never released
    let world = World::new(TargetKind::Directory);
    world.state.lock().holders.insert(SELF_PID);

    let engine = ReclaimEngine::builder()
        .with_config(ReclaimConfig::for_testing())
        .with_capabilities(world.capabilities())
        .build();
    let report = engine.reclaim("/virtual/pinned", true).await.unwrap();

    let mut expected = CANONICAL.to_vec();
    expected.push("deferred-deletion");
    assert_eq!(report.strategy_names(), expected);
    assert!(report.attempts[..7].iter().all(|a| !a.succeeded));
    assert!(report.attempts[7].succeeded);

    assert_eq!(report.outcome, Outcome::ScheduledForDeferredDeletion);
    assert!(report.needs_restart());
    assert_eq!(report.residual_entries, Some(3));
    assert!(world.signalled_pids().is_empty());
    assert_eq!(world.state.lock().registrations, 1);
}

#[tokio::test]
async fn test_fallback_accepted() {
    let world = World::new(TargetKind::File);
    let report = scripted_engine(&world, all_failing(), ReclaimConfig::for_testing())
        .reclaim("/virtual/f", true)
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::ScheduledForDeferredDeletion);
    assert_eq!(report.attempts.len(), 8);
    assert_eq!(report.attempts[7].strategy, "deferred-deletion");
}

#[tokio::test]
async fn test_fallback_refused() {
    let world = World::refusing_registrar(TargetKind::File);
    let report = scripted_engine(&world, all_failing(), ReclaimConfig::for_testing())
        .reclaim("/virtual/f", true)
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Failed);
    assert_eq!(report.attempts.len(), 8);
    assert_eq!(report.attempts[7].error_kind, Some(FailureKind::Privilege));
    assert_eq!(report.residual_entries, Some(3));
}

#[tokio::test]
async fn test_fallback_disabled() {
    let world = World::new(TargetKind::File);
    let config = ReclaimConfig {
        defer_on_failure: false,
        ..ReclaimConfig::for_testing()
    };
    let report = scripted_engine(&world, all_failing(), config)
        .reclaim("/virtual/f", true)
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Failed);
    assert_eq!(report.attempts.len(), 7);
    assert_eq!(world.state.lock().registrations, 0);
}

#[tokio::test]
async fn test_fault_does_not_stop_later_strategies() {
    let world = World::new(TargetKind::Directory);
    let strategies = vec![
        ScriptedStrategy::new("first", Script::Fail),
        ScriptedStrategy::new("exploding", Script::Panic),
        ScriptedStrategy::new("third", Script::Fail),
        ScriptedStrategy::new("fourth", Script::Remove),
    ];
    let report = scripted_engine(&world, strategies, ReclaimConfig::for_testing())
        .reclaim("/virtual/d", true)
        .await
        .unwrap();

    assert_eq!(
        report.strategy_names(),
        vec!["first", "exploding", "third", "fourth"]
    );
    assert_eq!(report.attempts[1].error_kind, Some(FailureKind::Fault));
    assert!(report.attempts[1].diagnostic.contains("exploding blew up"));
    assert_eq!(report.outcome, Outcome::Deleted);
    assert_eq!(report.succeeded_by(), Some("fourth"));
}

#[tokio::test]
async fn test_early_stop_skips_the_rest() {
    let world = World::new(TargetKind::Directory);
    let last = ScriptedStrategy::new("never", Script::Fail);
    let never_calls = last.calls.clone();
    let strategies = vec![ScriptedStrategy::new("works", Script::Remove), last];

    let report = scripted_engine(&world, strategies, ReclaimConfig::for_testing())
        .reclaim("/virtual/d", true)
        .await
        .unwrap();

    assert_eq!(report.attempts.len(), 1);
    assert_eq!(never_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_timeout_is_recorded_and_escalation_continues() {
    let world = World::new(TargetKind::Directory);
    let strategies = vec![
        ScriptedStrategy::new("slow", Script::Hang(Duration::from_millis(600)))
            .with_timeout(Duration::from_millis(50)),
        ScriptedStrategy::new("fast", Script::Remove),
    ];
    let report = scripted_engine(&world, strategies, ReclaimConfig::for_testing())
        .reclaim("/virtual/d", true)
        .await
        .unwrap();

    assert_eq!(report.attempts[0].error_kind, Some(FailureKind::Timeout));
    assert!(report.attempts[0].duration < Duration::from_millis(600));
    assert_eq!(report.outcome, Outcome::Deleted);
}

#[tokio::test]
async fn test_timed_out_strategy_never_overlaps_the_next() {
    let world = World::new(TargetKind::Directory);
    let overlap = Arc::new(Overlap::default());
    let strategies = vec![
        ScriptedStrategy::new("slow", Script::Hang(Duration::from_millis(600)))
            .with_timeout(Duration::from_millis(50))
            .with_overlap(overlap.clone()),
        ScriptedStrategy::new("fast", Script::Remove).with_overlap(overlap.clone()),
    ];
    let report = scripted_engine(&world, strategies, ReclaimConfig::for_testing())
        .reclaim("/virtual/d", true)
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Deleted);
    assert_eq!(report.strategy_names(), vec!["slow", "fast"]);
    assert_eq!(overlap.peak(), 1);
}

#[tokio::test]
async fn test_straggler_halts_escalation() {
    let world = World::new(TargetKind::Directory);
    let next = ScriptedStrategy::new("next", Script::Remove);
    let next_calls = next.calls.clone();
    let strategies = vec![
        ScriptedStrategy::new("stuck", Script::Hang(Duration::from_secs(3)))
            .with_timeout(Duration::from_millis(50)),
        next,
    ];
    let config = ReclaimConfig {
        straggler_wait: Duration::from_millis(100),
        ..ReclaimConfig::for_testing()
    };
    let report = scripted_engine(&world, strategies, config)
        .reclaim("/virtual/d", true)
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Failed);
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(report.attempts[0].error_kind, Some(FailureKind::Timeout));
    assert!(report.attempts[0].diagnostic.contains("escalation halted"));
    assert_eq!(next_calls.load(Ordering::SeqCst), 0);
    assert_eq!(world.state.lock().registrations, 0);
    assert!(world.is_present());
}

#[tokio::test]
async fn test_success_claim_is_verified() {
    let world = World::new(TargetKind::File);
    let strategies = vec![
        ScriptedStrategy::new("liar", Script::Lie),
        ScriptedStrategy::new("honest", Script::Remove),
    ];
    let report = scripted_engine(&world, strategies, ReclaimConfig::for_testing())
        .reclaim("/virtual/f", true)
        .await
        .unwrap();

    assert!(!report.attempts[0].succeeded);
    assert_eq!(report.attempts[0].error_kind, Some(FailureKind::StillPresent));
    assert!(report.attempts[1].succeeded);
}

#[tokio::test]
async fn test_absence_wins_over_reported_error() {
    let world = World::new(TargetKind::File);
    let strategies = vec![
        ScriptedStrategy::new("grumpy", Script::RemoveAndComplain),
        ScriptedStrategy::new("unused", Script::Fail),
    ];
    let report = scripted_engine(&world, strategies, ReclaimConfig::for_testing())
        .reclaim("/virtual/f", true)
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Deleted);
    assert_eq!(report.attempts.len(), 1);
    assert!(report.attempts[0].succeeded);
    assert!(report.attempts[0].diagnostic.contains("cleanup after removal failed"));
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let world = World::new(TargetKind::Directory);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = scripted_engine(&world, all_failing(), ReclaimConfig::for_testing())
        .reclaim_with_cancel("/virtual/d", true, cancel)
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Failed);
    assert!(report.cancelled);
    assert!(report.attempts.is_empty());
    assert_eq!(world.state.lock().registrations, 0);
}

#[tokio::test]
async fn test_cancel_honored_between_strategies() {
    let world = World::new(TargetKind::Directory);
    let second = ScriptedStrategy::new("second", Script::Remove);
    let second_calls = second.calls.clone();
    let strategies = vec![
        ScriptedStrategy::new("first", Script::Hang(Duration::from_millis(200))),
        second,
    ];
    let engine = scripted_engine(&world, strategies, ReclaimConfig::for_testing());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let report = engine
        .reclaim_with_cancel("/virtual/d", true, cancel)
        .await
        .unwrap();

    // The running strategy finished; nothing after it started
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(report.attempts[0].error_kind, Some(FailureKind::StillPresent));
    assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    assert!(report.cancelled);
    assert_eq!(report.outcome, Outcome::Failed);
    assert_eq!(world.state.lock().registrations, 0);
    assert!(world.is_present());
}

#[tokio::test]
async fn test_unconfirmed_is_rejected() {
    let world = World::new(TargetKind::Directory);
    let engine = scripted_engine(&world, all_failing(), ReclaimConfig::for_testing());

    let err = engine.reclaim("/virtual/d", false).await.unwrap_err();
    assert!(matches!(err, force_reclaim::ReclaimError::NotConfirmed(_)));
    assert_eq!(world.state.lock().removals, 0);
}

#[test]
fn test_canonical_catalog_matches_uniform_timeouts() {
    let catalog = StrategyCatalog::canonical(&StrategyTimeouts::uniform(Duration::from_secs(2)));
    assert_eq!(catalog.names(), CANONICAL.to_vec());
    assert!(catalog
        .strategies()
        .iter()
        .all(|s| s.timeout().duration() == Some(Duration::from_secs(2))));
}
