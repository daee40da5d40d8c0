/*!
 * Service Entry Contract Tests
 */

use crate::fakes::{Script, ScriptedStrategy, World};
use force_reclaim::strategy::{DeferredDeletion, Strategy, StrategyCatalog};
use force_reclaim::core::Invasiveness;
use force_reclaim::{
    Outcome, ReclaimConfig, ReclaimEngine, ReclaimError, ReclaimService, TargetKind,
    TimeoutPolicy,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn service(world: &Arc<World>, config: ReclaimConfig) -> ReclaimService {
    let engine = ReclaimEngine::builder()
        .with_config(config)
        .with_capabilities(world.capabilities())
        .build();
    ReclaimService::new(engine).with_elevation_check(|| true)
}

fn slow_service(world: &Arc<World>) -> ReclaimService {
    let strategies: Vec<Arc<dyn Strategy>> = vec![
        Arc::new(ScriptedStrategy::new("slow", Script::Hang(Duration::from_millis(300)))),
        Arc::new(ScriptedStrategy::new("finish", Script::Remove)),
    ];
    let fallback: Arc<dyn Strategy> = Arc::new(DeferredDeletion::new(TimeoutPolicy::Strategy(
        Duration::from_secs(5),
    )));
    let engine = ReclaimEngine::builder()
        .with_config(ReclaimConfig::for_testing())
        .with_capabilities(world.capabilities())
        .with_catalog(StrategyCatalog::from_parts(strategies, fallback))
        .build();
    ReclaimService::new(engine).with_elevation_check(|| true)
}

#[tokio::test]
async fn test_unconfirmed_touches_nothing() {
    let world = World::new(TargetKind::File);
    let err = service(&world, ReclaimConfig::for_testing())
        .reclaim("/virtual/f", false)
        .await
        .unwrap_err();

    assert!(matches!(err, ReclaimError::NotConfirmed(_)));
    assert_eq!(world.state.lock().removals, 0);
    assert!(world.is_present());
}

#[tokio::test]
async fn test_empty_path_is_invalid() {
    let world = World::new(TargetKind::File);
    let err = service(&world, ReclaimConfig::for_testing())
        .reclaim("", true)
        .await
        .unwrap_err();

    assert!(matches!(err, ReclaimError::InvalidTarget(_)));
}

#[tokio::test]
async fn test_filesystem_root_is_protected() {
    let world = World::new(TargetKind::Directory);
    let err = service(&world, ReclaimConfig::for_testing())
        .reclaim("/", true)
        .await
        .unwrap_err();

    assert!(matches!(err, ReclaimError::ProtectedPath(_)));
    assert_eq!(world.state.lock().removals, 0);
}

#[tokio::test]
async fn test_protected_path_allowed_when_configured() {
    let world = World::new(TargetKind::Directory);
    let config = ReclaimConfig {
        allow_protected: true,
        ..ReclaimConfig::for_testing()
    };
    let report = service(&world, config).reclaim("/", true).await.unwrap();

    assert_eq!(report.outcome, Outcome::Deleted);
    assert!(!world.is_present());
}

#[tokio::test]
async fn test_elevation_required_refuses() {
    let world = World::new(TargetKind::File);
    let config = ReclaimConfig {
        require_elevation: true,
        ..ReclaimConfig::for_testing()
    };
    let service = service(&world, config).with_elevation_check(|| false);

    let err = service.reclaim("/virtual/f", true).await.unwrap_err();
    assert!(matches!(err, ReclaimError::InsufficientPrivilege(_)));
    assert_eq!(world.state.lock().removals, 0);
}

#[tokio::test]
async fn test_elevation_optional_proceeds() {
    let world = World::new(TargetKind::File);
    let service = service(&world, ReclaimConfig::for_testing()).with_elevation_check(|| false);

    let report = service.reclaim("/virtual/f", true).await.unwrap();
    assert_eq!(report.outcome, Outcome::Deleted);
}

#[tokio::test]
async fn test_concurrent_session_on_same_path_is_busy() {
    let world = World::new(TargetKind::Directory);
    let service = slow_service(&world);
    let second = service.clone();

    let (first, busy) = tokio::join!(service.reclaim("/virtual/shared", true), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        second.reclaim("/virtual/shared", true).await
    });

    assert_eq!(first.unwrap().outcome, Outcome::Deleted);
    assert!(matches!(busy.unwrap_err(), ReclaimError::Busy(_)));
    assert_eq!(service.in_flight(), 0);
}

#[tokio::test]
async fn test_equivalent_spellings_share_a_slot() {
    let world = World::new(TargetKind::Directory);
    let service = slow_service(&world);
    let second = service.clone();

    let (first, busy) = tokio::join!(service.reclaim("/virtual/shared", true), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        second.reclaim("/virtual/./other/../shared/", true).await
    });

    assert!(first.is_ok());
    assert!(matches!(busy.unwrap_err(), ReclaimError::Busy(_)));
}

#[tokio::test]
async fn test_slot_released_after_session() {
    let world = World::new(TargetKind::File);
    let service = service(&world, ReclaimConfig::for_testing());

    service.reclaim("/virtual/f", true).await.unwrap();
    assert_eq!(service.in_flight(), 0);

    // Second run finds nothing left and reports success without attempts
    let again = service.reclaim("/virtual/f", true).await.unwrap();
    assert_eq!(again.outcome, Outcome::Deleted);
    assert!(again.attempts.is_empty());
}

#[tokio::test]
async fn test_reclaim_all_reports_each_path() {
    let world = World::new(TargetKind::File);
    let service = service(&world, ReclaimConfig::for_testing());
    let paths = vec![
        PathBuf::from("/virtual/f"),
        PathBuf::new(),
        PathBuf::from("/virtual/f"),
    ];

    let results = service
        .reclaim_all(&paths, true, CancellationToken::new())
        .await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].1.as_ref().unwrap().outcome, Outcome::Deleted);
    assert!(matches!(results[1].1, Err(ReclaimError::InvalidTarget(_))));
    assert!(results[2].1.as_ref().unwrap().attempts.is_empty());
}

#[tokio::test]
async fn test_host_service_removes_real_tree() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("cache");
    std::fs::create_dir_all(target.join("a/b")).unwrap();
    std::fs::write(target.join("a/b/c.txt"), b"payload").unwrap();

    let service = ReclaimService::host(ReclaimConfig::for_testing());
    let report = service.reclaim(&target, true).await.unwrap();

    assert_eq!(report.outcome, Outcome::Deleted);
    assert_eq!(report.succeeded_by(), Some("direct-removal"));
    assert_eq!(report.size_bytes, 7);
    assert!(!target.exists());
}

#[tokio::test]
async fn test_dry_run_reports_without_acting() {
    let world = World::new(TargetKind::Directory);
    world.hold(4242, "editor");
    world.owned_by_someone_else();
    let service = service(&world, ReclaimConfig::for_testing()).with_elevation_check(|| false);

    let plan = service.plan("/virtual/stuck").await.unwrap();

    assert_eq!(plan.kind, TargetKind::Directory);
    assert_eq!(plan.size_bytes, 4096);
    assert_eq!(plan.entries, 3);
    assert_eq!(plan.holders.len(), 1);
    assert_eq!(plan.holders[0].pid, 4242);
    assert_eq!(
        plan.strategy_names(),
        vec![
            "direct-removal",
            "terminate-holders",
            "escalate-ownership",
            "rename-then-delete",
            "neutralize-contents",
            "alternate-removal",
            "mirror-to-empty",
        ]
    );
    assert_eq!(
        plan.fallback.as_ref().map(|f| f.invasiveness),
        Some(Invasiveness::Terminal)
    );
    assert_eq!(plan.elevated, Some(false));

    let state = world.state.lock();
    assert_eq!(state.removals, 0);
    assert!(state.signalled.is_empty());
    assert!(!state.escalated);
    assert_eq!(state.registrations, 0);
    assert!(state.present);
}

#[tokio::test]
async fn test_dry_run_honors_path_checks() {
    let world = World::new(TargetKind::Directory);
    let service = service(&world, ReclaimConfig::for_testing());

    assert!(matches!(
        service.plan("/").await.unwrap_err(),
        ReclaimError::ProtectedPath(_)
    ));
    assert!(matches!(
        service.plan("").await.unwrap_err(),
        ReclaimError::InvalidTarget(_)
    ));
}

#[tokio::test]
async fn test_dry_run_without_fallback_and_absent_target() {
    let world = World::new(TargetKind::File);
    let config = ReclaimConfig {
        defer_on_failure: false,
        ..ReclaimConfig::for_testing()
    };
    let service = service(&world, config);

    let plan = service.plan("/virtual/f").await.unwrap();
    assert!(plan.fallback.is_none());

    world.vanish();
    let plans = service.plan_all(&["/virtual/f"]).await;
    assert!(plans[0].1.as_ref().unwrap().is_noop());
    assert_eq!(service.in_flight(), 0);
}
