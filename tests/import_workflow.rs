mod common;
use crate::common::{SCRIPT, TestResult, import_at_confirm, import_fixture, init_tracing, with_timeout};

use backstage::backend::StartImport;
use backstage::import::{
    EventDisposition, ImportError, ImportStatus, ImportStep, MAX_TITLE_CHARS, validate_title,
};
use backstage::types::CollisionInfo;
use backstage_test_utils::fakes::{FakeImportGateway, ImportCall};

#[test]
fn title_validation_trims_and_counts_characters() {
    assert_eq!(validate_title("  My Script \n"), Ok("My Script"));
    assert_eq!(validate_title(" \t "), Err(ImportError::EmptyTitle));

    let multibyte = "é".repeat(MAX_TITLE_CHARS);
    assert_eq!(validate_title(&multibyte), Ok(multibyte.as_str()));

    let too_long = "a".repeat(MAX_TITLE_CHARS + 1);
    assert_eq!(validate_title(&too_long), Err(ImportError::TitleTooLong));

    assert_eq!(ImportError::EmptyTitle.to_string(), "Title cannot be empty");
    assert_eq!(
        ImportError::TitleTooLong.to_string(),
        "Title cannot exceed 255 characters"
    );
}

#[tokio::test]
async fn accepted_file_advances_to_title_entry() -> TestResult {
    init_tracing();
    let mut fx = import_fixture();
    fx.controller.open().await;

    assert!(fx.controller.is_open());
    assert_eq!(fx.controller.session().step(), ImportStep::FileSelect);
    assert!(!fx.controller.can_go_back());

    fx.controller.submit_file(SCRIPT).await?;

    let session = fx.controller.session();
    assert_eq!(session.step(), ImportStep::TitleEntry);
    assert_eq!(session.file_path(), SCRIPT);
    assert_eq!(session.error(), None);
    assert_eq!(fx.gateway.calls(), vec![ImportCall::Validate(SCRIPT.to_string())]);
    Ok(())
}

#[tokio::test]
async fn rejected_file_stays_with_gateway_message() {
    init_tracing();
    let mut fx = import_fixture();
    fx.gateway.fail_validation("File not found: /nope.fountain");
    fx.controller.open().await;

    let err = fx.controller.submit_file("/nope.fountain").await.unwrap_err();

    assert_eq!(err, ImportError::Gateway("File not found: /nope.fountain".into()));
    let session = fx.controller.session();
    assert_eq!(session.step(), ImportStep::FileSelect);
    assert_eq!(session.error(), Some("File not found: /nope.fountain"));
    assert_eq!(session.file_path(), "");
}

#[tokio::test]
async fn empty_title_fails_locally_without_backend_call() -> TestResult {
    init_tracing();
    let mut fx = import_fixture();
    fx.controller.open().await;
    fx.controller.submit_file(SCRIPT).await?;

    let err = fx.controller.submit_title("   ").await.unwrap_err();

    assert_eq!(err, ImportError::EmptyTitle);
    assert_eq!(fx.controller.session().step(), ImportStep::TitleEntry);
    assert_eq!(fx.controller.session().error(), Some("Title cannot be empty"));
    assert_eq!(fx.gateway.calls().len(), 1, "only the file validation reached the backend");
    Ok(())
}

#[tokio::test]
async fn title_of_256_chars_fails_locally_without_backend_call() -> TestResult {
    init_tracing();
    let mut fx = import_fixture();
    fx.controller.open().await;
    fx.controller.submit_file(SCRIPT).await?;

    let err = fx.controller.submit_title(&"x".repeat(256)).await.unwrap_err();

    assert_eq!(err, ImportError::TitleTooLong);
    assert_eq!(fx.controller.session().step(), ImportStep::TitleEntry);
    assert_eq!(
        fx.controller.session().error(),
        Some("Title cannot exceed 255 characters")
    );
    assert_eq!(fx.gateway.calls().len(), 1);
    Ok(())
}

#[tokio::test]
async fn free_title_resolves_path_and_confirms() -> TestResult {
    init_tracing();
    let fx = import_at_confirm("  Night Shift ").await;
    let session = fx.controller.session();

    assert_eq!(session.step(), ImportStep::Confirm);
    assert_eq!(session.title(), "Night Shift");
    assert_eq!(
        session.output_path(),
        FakeImportGateway::resolved_path("Night Shift")
    );
    assert!(session.collision().is_none());
    assert!(fx.controller.can_go_back());
    Ok(())
}

#[tokio::test]
async fn colliding_title_goes_to_collision_resolve() -> TestResult {
    init_tracing();
    let mut fx = import_fixture();
    let collision = CollisionInfo {
        existing_path: "/projects/Night_Shift.kspd".into(),
        suggested_names: vec!["Night_Shift_1".into(), "Night_Shift_2".into()],
    };
    fx.gateway.with_collision(collision.clone());

    fx.controller.open().await;
    fx.controller.submit_file(SCRIPT).await?;
    fx.controller.submit_title("Night Shift").await?;

    let session = fx.controller.session();
    assert_eq!(session.step(), ImportStep::CollisionResolve);
    assert_eq!(session.collision(), Some(&collision));
    assert_eq!(session.output_path(), "/projects/Night_Shift.kspd");

    // Back-navigation leaves CollisionResolve and drops the collision.
    assert!(fx.controller.go_back());
    assert_eq!(fx.controller.session().step(), ImportStep::TitleEntry);
    assert!(fx.controller.session().collision().is_none());

    // A later title that does not collide goes straight to confirm.
    fx.gateway.clear_collision();
    fx.controller.submit_title("Day Shift").await?;
    assert_eq!(fx.controller.session().step(), ImportStep::Confirm);
    assert!(fx.controller.session().collision().is_none());
    Ok(())
}

#[tokio::test]
async fn titles_are_only_accepted_at_title_entry() -> TestResult {
    init_tracing();
    let mut fx = import_at_confirm("Free").await;
    let calls = fx.gateway.calls().len();

    let confirmed = fx.controller.session().clone();
    let err = fx.controller.submit_title("Other").await.unwrap_err();
    assert_eq!(
        err,
        ImportError::InvalidStep {
            operation: "enter a title",
            step: ImportStep::Confirm,
        }
    );
    assert_eq!(fx.controller.session(), &confirmed);
    assert_eq!(fx.gateway.calls().len(), calls, "rejected before any backend call");

    fx.gateway.with_collision(CollisionInfo {
        existing_path: "/projects/Taken.kspd".into(),
        suggested_names: vec!["Taken_1".into()],
    });
    assert!(fx.controller.go_back());
    fx.controller.submit_title("Taken").await?;
    assert_eq!(fx.controller.session().step(), ImportStep::CollisionResolve);

    let colliding = fx.controller.session().clone();
    let err = fx.controller.submit_title("   ").await.unwrap_err();
    assert_eq!(
        err,
        ImportError::InvalidStep {
            operation: "enter a title",
            step: ImportStep::CollisionResolve,
        }
    );
    assert_eq!(fx.controller.session(), &colliding);

    // Going back first puts a rejected title on TitleEntry.
    assert!(fx.controller.go_back());
    let err = fx.controller.submit_title("   ").await.unwrap_err();
    assert_eq!(err, ImportError::EmptyTitle);
    assert_eq!(fx.controller.session().step(), ImportStep::TitleEntry);
    assert!(fx.controller.session().collision().is_none());
    Ok(())
}

#[tokio::test]
async fn collision_check_failure_stays_on_title_entry() -> TestResult {
    init_tracing();
    let mut fx = import_fixture();
    fx.gateway.fail_collision_check("Invalid path encoding");
    fx.controller.open().await;
    fx.controller.submit_file(SCRIPT).await?;

    let err = fx.controller.submit_title("Pilot").await.unwrap_err();

    assert_eq!(err, ImportError::Gateway("Invalid path encoding".into()));
    assert_eq!(fx.controller.session().step(), ImportStep::TitleEntry);
    assert_eq!(fx.controller.session().error(), Some("Invalid path encoding"));
    Ok(())
}

#[tokio::test]
async fn back_navigation_clears_error() -> TestResult {
    init_tracing();
    let mut fx = import_fixture();
    fx.controller.open().await;
    fx.controller.submit_file(SCRIPT).await?;
    let _ = fx.controller.submit_title("").await;
    assert!(fx.controller.session().error().is_some());

    assert!(fx.controller.go_back());

    assert_eq!(fx.controller.session().step(), ImportStep::FileSelect);
    assert_eq!(fx.controller.session().error(), None);
    assert!(!fx.controller.go_back(), "nothing before FileSelect");
    Ok(())
}

#[tokio::test]
async fn execute_then_completion_reaches_success() -> TestResult {
    init_tracing();
    let mut fx = import_at_confirm("Pilot").await;
    fx.gateway
        .complete_on_start(&["Parsing scenes", "", "Writing project"], true, None);

    fx.controller.confirm_and_execute(None, false).await?;

    let session = fx.controller.session();
    assert_eq!(session.step(), ImportStep::Executing);
    assert_eq!(session.status(), ImportStatus::InProgress);
    assert_eq!(session.request_id(), Some("req-1"));
    assert!(fx.controller.is_subscribed());
    assert!(!fx.controller.can_go_back());

    let status = with_timeout(fx.controller.drive_to_result()).await;

    let session = fx.controller.session();
    assert_eq!(status, ImportStatus::Success);
    assert_eq!(session.step(), ImportStep::Result);
    assert_eq!(session.request_id(), None);
    assert_eq!(session.project_id(), Some("project-1"));
    assert_eq!(
        session.log(),
        ["Starting import...", "Parsing scenes", "Writing project"]
    );
    assert!(fx.controller.is_complete());
    assert!(!fx.controller.is_subscribed());
    assert!(!fx.bus.import().has_subscriber());

    assert_eq!(
        fx.gateway.start_calls(),
        vec![StartImport {
            file_path: SCRIPT.into(),
            title: "Pilot".into(),
            output_path: FakeImportGateway::resolved_path("Pilot"),
            overwrite: false,
        }]
    );
    Ok(())
}

#[tokio::test]
async fn failed_completion_defaults_error_message() -> TestResult {
    init_tracing();
    let mut fx = import_at_confirm("Pilot").await;
    fx.gateway.complete_on_start(&[], false, None);

    fx.controller.confirm_and_execute(None, false).await?;
    let status = with_timeout(fx.controller.drive_to_result()).await;

    assert_eq!(status, ImportStatus::Failed);
    assert_eq!(fx.controller.session().error(), Some("Import failed"));
    assert_eq!(fx.controller.session().step(), ImportStep::Result);
    Ok(())
}

#[tokio::test]
async fn override_path_and_overwrite_are_forwarded() -> TestResult {
    init_tracing();
    let mut fx = import_fixture();
    fx.gateway.with_collision(CollisionInfo {
        existing_path: "/projects/Pilot.kspd".into(),
        suggested_names: vec!["Pilot_1".into()],
    });
    fx.controller.open().await;
    fx.controller.submit_file(SCRIPT).await?;
    fx.controller.submit_title("Pilot").await?;

    fx.controller
        .confirm_and_execute(Some("/projects/Pilot_1.kspd"), true)
        .await?;

    let start = fx.gateway.start_calls();
    assert_eq!(start.len(), 1);
    assert_eq!(start[0].output_path, "/projects/Pilot_1.kspd");
    assert!(start[0].overwrite);
    assert_eq!(fx.controller.session().output_path(), "/projects/Pilot_1.kspd");
    assert!(fx.controller.session().collision().is_none());
    Ok(())
}

#[tokio::test]
async fn start_failure_ends_at_result_and_unsubscribes() {
    init_tracing();
    let mut fx = import_at_confirm("Pilot").await;
    fx.gateway.fail_start(
        "Project already exists at target path. Confirm overwrite or choose a different name.",
    );

    let err = fx.controller.confirm_and_execute(None, false).await.unwrap_err();

    assert!(matches!(err, ImportError::Gateway(_)));
    let session = fx.controller.session();
    assert_eq!(session.step(), ImportStep::Result);
    assert_eq!(session.status(), ImportStatus::Failed);
    assert_eq!(session.request_id(), None);
    assert!(session.error().is_some_and(|e| e.starts_with("Project already exists")));
    assert!(!fx.bus.import().has_subscriber());
}

#[tokio::test]
async fn confirm_outside_confirm_steps_is_rejected_without_change() -> TestResult {
    init_tracing();
    let mut fx = import_fixture();
    fx.controller.open().await;
    fx.controller.submit_file(SCRIPT).await?;
    let before = fx.controller.session().clone();

    let err = fx.controller.confirm_and_execute(None, false).await.unwrap_err();

    assert_eq!(
        err,
        ImportError::InvalidStep {
            operation: "confirm the import",
            step: ImportStep::TitleEntry,
        }
    );
    assert_eq!(fx.controller.session(), &before);
    assert!(fx.gateway.start_calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn second_confirm_while_running_is_rejected() -> TestResult {
    init_tracing();
    let mut fx = import_at_confirm("Pilot").await;
    fx.controller.confirm_and_execute(None, false).await?;

    let err = fx.controller.confirm_and_execute(None, false).await.unwrap_err();

    assert_eq!(err, ImportError::AlreadyRunning);
    assert_eq!(fx.gateway.start_calls().len(), 1);
    assert_eq!(fx.controller.session().request_id(), Some("req-1"));
    Ok(())
}

#[tokio::test]
async fn events_for_other_requests_are_stale() -> TestResult {
    init_tracing();
    let mut fx = import_at_confirm("Pilot").await;
    fx.controller.confirm_and_execute(None, false).await?;

    fx.gateway.publish_progress("req-99", Some("not ours"));
    fx.gateway.publish_completion("req-99", true, None);
    fx.gateway.publish_progress("req-1", Some("ours"));

    assert_eq!(
        with_timeout(fx.controller.recv_event()).await,
        Some(EventDisposition::Stale)
    );
    assert_eq!(
        with_timeout(fx.controller.recv_event()).await,
        Some(EventDisposition::Stale)
    );
    assert_eq!(
        with_timeout(fx.controller.recv_event()).await,
        Some(EventDisposition::Progress)
    );

    let session = fx.controller.session();
    assert_eq!(session.status(), ImportStatus::InProgress);
    assert_eq!(session.log(), ["Starting import...", "ours"]);
    Ok(())
}

#[tokio::test]
async fn reopening_resets_a_finished_session() -> TestResult {
    init_tracing();
    let mut fx = import_at_confirm("Pilot").await;
    fx.gateway.complete_on_start(&["done"], true, None);
    fx.controller.confirm_and_execute(None, false).await?;
    with_timeout(fx.controller.drive_to_result()).await;

    fx.controller.open().await;

    let session = fx.controller.session();
    assert_eq!(session.step(), ImportStep::FileSelect);
    assert_eq!(session.status(), ImportStatus::Idle);
    assert!(session.log().is_empty());
    assert_eq!(session.title(), "");
    Ok(())
}
