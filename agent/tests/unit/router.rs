//! Task routing and manifest deployment through the production router.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use hostpilot_agent::application::ports::TaskExecutor;
use hostpilot_agent::application::services::dispatch::execute_task;
use hostpilot_agent::application::services::router::TaskRouter;
use hostpilot_agent::application::services::workdir::{
    DeploySettings, LABELS_FILE, MANIFEST_FILE, read_labels,
};
use hostpilot_agent::domain::{LabelSet, TaskCommand, TaskError};
use serde_json::json;

use crate::mocks::{FakeGit, FakePortProbe, FakeRuntime, apps_root};

const MANIFEST: &str = "services:\n  web:\n    image: nginx:alpine\n";

#[tokio::test]
async fn manifest_deploy_writes_files_and_applies() {
    let (_tmp, root) = apps_root();
    let settings = DeploySettings::new(root.clone(), "vps-1", "localhost");
    let runtime = FakeRuntime::new();
    let (git, probe) = (FakeGit::default(), FakePortProbe::default());
    let router = TaskRouter::new(&runtime, &git, &probe, &settings);

    let outcome = execute_task(
        &router,
        "deploy_compose",
        &json!({"app_id": "blog", "app_name": "Blog", "compose_file": MANIFEST}),
    )
    .await;

    assert!(outcome.success, "error: {}", outcome.error);
    assert_eq!(outcome.result["status"], "deployed");
    assert_eq!(outcome.result["app_name"], "Blog");
    let dir = root.join("blog");
    assert_eq!(std::fs::read_to_string(dir.join(MANIFEST_FILE)).expect("manifest"), MANIFEST);
    let labels = read_labels(&dir).expect("read").expect("labels");
    assert_eq!(labels.get("hostpilot.type"), Some("compose"));
    assert_eq!(runtime.calls(), ["compose up hostpilot-blog"]);
}

#[tokio::test]
async fn manifest_deploy_refuses_sanitize_collision() {
    let (_tmp, root) = apps_root();
    let settings = DeploySettings::new(root.clone(), "vps-1", "localhost");
    let runtime = FakeRuntime::new();
    let (git, probe) = (FakeGit::default(), FakePortProbe::default());
    let router = TaskRouter::new(&runtime, &git, &probe, &settings);

    // "a/b" and "ab" share the working directory "ab".
    let first = execute_task(
        &router,
        "deploy_compose",
        &json!({"app_id": "a/b", "compose_file": "A"}),
    )
    .await;
    assert!(first.success, "error: {}", first.error);

    let second = execute_task(
        &router,
        "deploy_compose",
        &json!({"app_id": "ab", "compose_file": "B"}),
    )
    .await;
    assert!(!second.success);
    assert!(second.error.contains("already belongs to application a/b"));

    let dir = root.join("ab");
    assert_eq!(std::fs::read_to_string(dir.join(MANIFEST_FILE)).expect("manifest"), "A");
    let labels = read_labels(&dir).expect("read").expect("labels");
    assert_eq!(labels.app_id(), Some("a/b"));
    assert_eq!(runtime.calls(), ["compose up hostpilot-ab"]);
}

#[tokio::test]
async fn manifest_project_name_is_lowercase_without_dots() {
    let (_tmp, root) = apps_root();
    let settings = DeploySettings::new(root, "vps-1", "localhost");
    let runtime = FakeRuntime::new();
    let (git, probe) = (FakeGit::default(), FakePortProbe::default());
    let router = TaskRouter::new(&runtime, &git, &probe, &settings);

    let outcome = execute_task(
        &router,
        "deploy_compose",
        &json!({"app_id": "Shop.v2", "compose_file": MANIFEST}),
    )
    .await;

    assert!(outcome.success, "error: {}", outcome.error);
    assert_eq!(runtime.calls(), ["compose up hostpilot-shop-v2"]);
}

#[tokio::test]
async fn manifest_redeploy_keeps_existing_files() {
    let (_tmp, root) = apps_root();
    let dir = root.join("blog");
    std::fs::create_dir_all(&dir).expect("dir");
    std::fs::write(dir.join(".env"), "SECRET=1").expect("env file");
    let settings = DeploySettings::new(root, "vps-1", "localhost");
    let runtime = FakeRuntime::new();
    let (git, probe) = (FakeGit::default(), FakePortProbe::default());

    TaskRouter::new(&runtime, &git, &probe, &settings)
        .execute(TaskCommand::parse(
            "deploy-manifest",
            &json!({"app_id": "blog", "compose_file": MANIFEST}),
        )
        .expect("parse"))
        .await
        .expect("deploy");

    assert!(dir.join(".env").is_file());
    assert!(dir.join(LABELS_FILE).is_file());
}

#[tokio::test]
async fn lifecycle_tasks_reach_the_runtime() {
    let (_tmp, root) = apps_root();
    let settings = DeploySettings::new(root, "vps-1", "localhost");
    let runtime = FakeRuntime::new().with_container("web", "exited", LabelSet::default());
    let (git, probe) = (FakeGit::default(), FakePortProbe::default());
    let router = TaskRouter::new(&runtime, &git, &probe, &settings);

    let started = router
        .execute(TaskCommand::Start("web".into()))
        .await
        .expect("start");
    assert_eq!(started, json!({"status": "started"}));
    let scanned = router.execute(TaskCommand::Enumerate).await.expect("scan");
    assert_eq!(scanned["total_count"], 1);
}

#[tokio::test]
async fn unknown_command_is_an_error() {
    let (_tmp, root) = apps_root();
    let settings = DeploySettings::new(root, "vps-1", "localhost");
    let runtime = FakeRuntime::new();
    let (git, probe) = (FakeGit::default(), FakePortProbe::default());
    let err = TaskRouter::new(&runtime, &git, &probe, &settings)
        .execute(TaskCommand::Unknown("format_disk".into()))
        .await
        .expect_err("unknown");
    assert!(matches!(
        err.downcast_ref::<TaskError>(),
        Some(TaskError::UnknownType(tag)) if tag == "format_disk"
    ));
    assert!(runtime.calls().is_empty());
}
