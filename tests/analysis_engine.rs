mod common;
use crate::common::{PROJECT, TestResult, engine_fixture, init_tracing, with_timeout};

use backstage::analysis::AnalysisPhase;
use backstage::backend::AnalysisEvent;
use backstage::errors::BackstageError;
use backstage::types::{AnalysisOutcome, AnalysisTarget, DaemonReachability, DaemonStatus, ItemKind};
use backstage_test_utils::builders::sample_items;
use backstage_test_utils::fakes::AnalysisCall;

fn completed(kind: ItemKind, id: &str, success: bool, error: Option<&str>) -> AnalysisEvent {
    AnalysisEvent::Completed {
        kind: Some(kind),
        target: AnalysisTarget::Item(id.to_string()),
        project_path: Some(PROJECT.to_string()),
        success,
        error: error.map(str::to_string),
    }
}

#[tokio::test]
async fn load_project_derives_phases_and_reachability() -> TestResult {
    init_tracing();
    let mut fx = engine_fixture(sample_items());
    fx.index.insert(ItemKind::Scene, "scn_003");

    fx.engine.load_project(PROJECT).await?;

    assert_eq!(fx.engine.project(), Some(PROJECT));
    assert_eq!(fx.engine.reachability(), DaemonReachability::Absent);
    assert!(!fx.engine.is_subscribed());
    assert!(!fx.engine.is_live());
    assert_eq!(fx.engine.phase(ItemKind::Scene, "scn_003"), Some(AnalysisPhase::Analyzed));

    let progress = fx.engine.progress();
    assert_eq!((progress.analyzed, progress.total), (1, 3));

    let listed: Vec<_> = fx.engine.items_with_state().into_iter().map(|i| i.id).collect();
    assert_eq!(listed, ["scn_001", "scn_002", "scn_003"]);
    Ok(())
}

#[tokio::test]
async fn failing_catalog_records_error() {
    init_tracing();
    let mut fx = engine_fixture(sample_items());
    fx.backend.fail_listing("tools exited with code 2");

    let err = fx.engine.load_project(PROJECT).await.unwrap_err();

    assert_eq!(err.message(), "tools exited with code 2");
    assert_eq!(fx.engine.error(), Some("tools exited with code 2"));
    assert!(fx.engine.states().is_empty());
}

#[tokio::test]
async fn failing_index_on_load_starts_everything_pending() -> TestResult {
    init_tracing();
    let mut fx = engine_fixture(sample_items());
    fx.index.insert(ItemKind::Scene, "scn_001");
    fx.index.set_failure(Some("permission denied"));

    fx.engine.load_project(PROJECT).await?;

    assert_eq!(fx.engine.phase(ItemKind::Scene, "scn_001"), Some(AnalysisPhase::Pending));
    Ok(())
}

#[tokio::test]
async fn daemon_absent_analyze_all_converges_to_analyzed() -> TestResult {
    init_tracing();
    let mut fx = engine_fixture(sample_items());
    fx.engine.load_project(PROJECT).await?;

    fx.engine.analyze_all(ItemKind::Scene).await?;

    for id in ["scn_001", "scn_002", "scn_003"] {
        assert_eq!(fx.engine.phase(ItemKind::Scene, id), Some(AnalysisPhase::Analyzed));
    }
    assert!(!fx.engine.is_live());
    assert_eq!(fx.engine.error(), None);
    assert!(fx.backend.calls().contains(&AnalysisCall::All { kind: ItemKind::Scene }));
    Ok(())
}

#[tokio::test]
async fn daemon_absent_batch_failure_sets_collection_error_and_reconciles() -> TestResult {
    init_tracing();
    let mut fx = engine_fixture(sample_items());
    fx.index.insert(ItemKind::Scene, "scn_002");
    fx.backend
        .set_batch_outcome(AnalysisOutcome::failed("quota exceeded"));
    fx.engine.load_project(PROJECT).await?;

    fx.engine.analyze_all(ItemKind::Scene).await?;

    assert_eq!(fx.engine.error(), Some("quota exceeded"));
    assert_eq!(fx.engine.phase(ItemKind::Scene, "scn_001"), Some(AnalysisPhase::Pending));
    assert_eq!(fx.engine.phase(ItemKind::Scene, "scn_002"), Some(AnalysisPhase::Analyzed));
    assert!(!fx.engine.is_live());
    Ok(())
}

#[tokio::test]
async fn batch_gateway_error_rolls_back_optimistic_marks() -> TestResult {
    init_tracing();
    let mut fx = engine_fixture(sample_items());
    fx.backend.fail_batch_request("connection refused");
    fx.engine.load_project(PROJECT).await?;

    fx.engine.analyze_all(ItemKind::Scene).await?;

    assert_eq!(fx.engine.error(), Some("connection refused"));
    for id in ["scn_001", "scn_002", "scn_003"] {
        assert_eq!(fx.engine.phase(ItemKind::Scene, id), Some(AnalysisPhase::Pending));
    }
    assert!(!fx.engine.is_live());
    Ok(())
}

#[tokio::test]
async fn daemon_present_leaves_items_analyzing_until_events() -> TestResult {
    init_tracing();
    let mut fx = engine_fixture(sample_items());
    fx.backend.with_daemon(true);
    fx.engine.load_project(PROJECT).await?;
    assert_eq!(fx.engine.reachability(), DaemonReachability::Present);
    assert!(fx.engine.is_subscribed());

    fx.engine.analyze_one("scn_001").await?;
    assert_eq!(fx.engine.phase(ItemKind::Scene, "scn_001"), Some(AnalysisPhase::Analyzing));
    assert!(fx.engine.is_live());

    fx.bus
        .analysis()
        .publish(completed(ItemKind::Scene, "scn_001", true, None));
    with_timeout(fx.engine.drive_until_idle()).await;

    // The fake backend recorded the result in the index, so the
    // reconciliation pass agrees.
    assert_eq!(fx.engine.phase(ItemKind::Scene, "scn_001"), Some(AnalysisPhase::Analyzed));
    assert!(!fx.engine.is_live());
    Ok(())
}

#[tokio::test]
async fn daemon_absent_analyze_one_is_decided_by_index() -> TestResult {
    init_tracing();
    let mut fx = engine_fixture(sample_items());
    fx.backend.never_indexes("scn_002");
    fx.engine.load_project(PROJECT).await?;

    fx.engine.analyze_one("scn_001").await?;
    fx.engine.analyze_one("scn_002").await?;

    assert_eq!(fx.engine.phase(ItemKind::Scene, "scn_001"), Some(AnalysisPhase::Analyzed));
    // Reported success but nothing landed in the index.
    assert_eq!(fx.engine.phase(ItemKind::Scene, "scn_002"), Some(AnalysisPhase::Pending));
    assert!(!fx.engine.is_live());
    Ok(())
}

#[tokio::test]
async fn item_failures_are_scoped_to_the_item() -> TestResult {
    init_tracing();
    let mut fx = engine_fixture(sample_items());
    fx.backend.with_daemon(true);
    fx.backend
        .set_item_outcome("scn_001", AnalysisOutcome { success: false, error: None });
    fx.backend.fail_item_request("scn_002", "broken pipe");
    fx.engine.load_project(PROJECT).await?;

    fx.engine.analyze_one("scn_001").await?;
    fx.engine.analyze_one("scn_002").await?;
    fx.engine.analyze_one("scn_003").await?;

    let first = fx.engine.states().get(ItemKind::Scene, "scn_001").unwrap();
    assert_eq!(first.phase, AnalysisPhase::Failed);
    assert_eq!(first.error.as_deref(), Some("Analysis failed"));

    let second = fx.engine.states().get(ItemKind::Scene, "scn_002").unwrap();
    assert_eq!(second.phase, AnalysisPhase::Failed);
    assert_eq!(second.error.as_deref(), Some("broken pipe"));

    assert_eq!(fx.engine.phase(ItemKind::Scene, "scn_003"), Some(AnalysisPhase::Analyzing));
    Ok(())
}

#[tokio::test]
async fn analyze_without_project_or_for_unknown_item_is_an_error() -> TestResult {
    init_tracing();
    let mut fx = engine_fixture(sample_items());

    let err = fx.engine.analyze_one("scn_001").await.unwrap_err();
    assert!(matches!(err, BackstageError::NoProject));

    fx.engine.load_project(PROJECT).await?;
    let err = fx.engine.analyze_one("scn_404").await.unwrap_err();
    assert!(matches!(err, BackstageError::UnknownItem { .. }));
    Ok(())
}

#[tokio::test]
async fn stale_completion_event_changes_nothing() -> TestResult {
    init_tracing();
    let mut fx = engine_fixture(sample_items());
    fx.backend.with_daemon(true);
    fx.engine.load_project(PROJECT).await?;
    let before = fx.engine.states().clone();
    let scans = fx.index.scans();

    let step = fx
        .engine
        .handle_event(completed(ItemKind::Scene, "scn_001", false, Some("late")))
        .await;

    assert!(!step.changed);
    assert_eq!(fx.engine.states(), &before);
    assert_eq!(fx.index.scans(), scans, "no reconciliation for a stale event");
    Ok(())
}

#[tokio::test]
async fn events_for_other_projects_are_ignored() -> TestResult {
    init_tracing();
    let mut fx = engine_fixture(sample_items());
    fx.backend.with_daemon(true);
    fx.engine.load_project(PROJECT).await?;

    let step = fx
        .engine
        .handle_event(AnalysisEvent::Started {
            kind: Some(ItemKind::Scene),
            target: AnalysisTarget::All,
            project_path: Some("/projects/other.kspd".into()),
        })
        .await;

    assert!(!step.changed);
    assert!(!fx.engine.is_live());
    Ok(())
}

#[tokio::test]
async fn batch_events_drive_the_whole_kind() -> TestResult {
    init_tracing();
    let mut fx = engine_fixture(sample_items());
    fx.backend.with_daemon(true);
    fx.engine.load_project(PROJECT).await?;

    fx.engine
        .handle_event(AnalysisEvent::Started {
            kind: None,
            target: AnalysisTarget::All,
            project_path: None,
        })
        .await;
    assert!(fx.engine.is_live());

    fx.engine
        .handle_event(AnalysisEvent::Progress {
            kind: Some(ItemKind::Scene),
            target: AnalysisTarget::All,
            project_path: Some(PROJECT.into()),
            completed: 1,
            total: 3,
        })
        .await;

    for id in ["scn_001", "scn_002", "scn_003"] {
        fx.index.insert(ItemKind::Scene, id);
    }
    fx.engine
        .handle_event(AnalysisEvent::Completed {
            kind: Some(ItemKind::Scene),
            target: AnalysisTarget::All,
            project_path: Some(PROJECT.into()),
            success: true,
            error: None,
        })
        .await;

    assert_eq!(fx.engine.progress().analyzed, 3);
    assert!(!fx.engine.is_live());
    Ok(())
}

#[tokio::test]
async fn live_flag_tracks_the_active_kind_only() -> TestResult {
    init_tracing();
    let mut fx = engine_fixture(sample_items());
    fx.backend.with_daemon(true);
    fx.engine.load_project(PROJECT).await?;

    fx.engine.on_started(ItemKind::Character, &AnalysisTarget::Item("chr_anna".into()));
    assert!(!fx.engine.is_live(), "scenes are active");

    fx.engine.switch_kind(ItemKind::Character);
    assert!(fx.engine.is_live());
    Ok(())
}

#[tokio::test]
async fn completion_refetches_open_detail() -> TestResult {
    init_tracing();
    let mut fx = engine_fixture(sample_items());
    fx.backend.with_daemon(true);
    fx.engine.load_project(PROJECT).await?;

    fx.engine.select_item("scn_002").await?;
    let first = fx.engine.detail().and_then(|d| d.detail.clone()).unwrap();
    assert_eq!(first["revision"], 1);

    fx.engine.analyze_one("scn_002").await?;
    fx.engine
        .on_completed(ItemKind::Scene, &AnalysisTarget::Item("scn_002".into()), true, None)
        .await;

    let view = fx.engine.detail().unwrap();
    assert_eq!(view.item_id, "scn_002");
    assert_eq!(view.detail.as_ref().unwrap()["revision"], 2);
    assert_eq!(fx.backend.detail_calls(), 2);

    fx.engine.close_detail();
    assert!(fx.engine.detail().is_none());
    Ok(())
}

#[tokio::test]
async fn refresh_failure_keeps_current_phases() -> TestResult {
    init_tracing();
    let mut fx = engine_fixture(sample_items());
    fx.index.insert(ItemKind::Scene, "scn_001");
    fx.engine.load_project(PROJECT).await?;

    fx.index.remove(ItemKind::Scene, "scn_001");
    fx.index.set_failure(Some("index locked"));

    assert!(!fx.engine.refresh().await);
    assert_eq!(fx.engine.phase(ItemKind::Scene, "scn_001"), Some(AnalysisPhase::Analyzed));

    fx.index.set_failure(None);
    assert!(fx.engine.refresh().await);
    assert_eq!(fx.engine.phase(ItemKind::Scene, "scn_001"), Some(AnalysisPhase::Pending));
    Ok(())
}

#[tokio::test]
async fn failed_status_query_is_rechecked_before_next_analyze() -> TestResult {
    init_tracing();
    let mut fx = engine_fixture(sample_items());
    fx.backend.fail_daemon_status("socket missing");
    fx.engine.load_project(PROJECT).await?;

    assert_eq!(fx.engine.reachability(), DaemonReachability::Absent);
    assert!(fx.engine.needs_daemon_recheck());

    fx.backend.with_daemon(true);
    fx.engine.analyze_one("scn_001").await?;

    assert_eq!(fx.engine.reachability(), DaemonReachability::Present);
    assert!(!fx.engine.needs_daemon_recheck());
    assert!(fx.engine.is_subscribed());
    assert_eq!(fx.engine.phase(ItemKind::Scene, "scn_001"), Some(AnalysisPhase::Analyzing));
    Ok(())
}

#[tokio::test]
async fn daemon_serving_another_project_counts_as_absent() -> TestResult {
    init_tracing();
    let mut fx = engine_fixture(sample_items());
    fx.backend.set_daemon_status(DaemonStatus {
        running: true,
        project_path: Some("/projects/other.kspd".into()),
        busy: false,
        queue_depth: 0,
    });

    fx.engine.load_project(PROJECT).await?;

    assert_eq!(fx.engine.reachability(), DaemonReachability::Absent);
    assert!(!fx.engine.is_subscribed());
    Ok(())
}

#[tokio::test]
async fn loading_another_project_rebuilds_state() -> TestResult {
    init_tracing();
    let mut fx = engine_fixture(sample_items());
    fx.backend.with_daemon(true);
    fx.backend.never_indexes("scn_001");
    fx.engine.load_project(PROJECT).await?;
    fx.engine.analyze_one("scn_001").await?;
    assert!(fx.engine.is_live());

    fx.backend.with_daemon(false);
    fx.engine.load_project(PROJECT).await?;

    assert!(!fx.engine.is_live());
    assert!(!fx.engine.is_subscribed());
    assert_eq!(fx.engine.phase(ItemKind::Scene, "scn_001"), Some(AnalysisPhase::Pending));
    Ok(())
}
