//! Client calls against a live API instance

use futures::StreamExt;
use std::sync::Arc;
use terravision_api::api::{AppState, create_router};
use terravision_api::config::Config;
use terravision_api::service::TracingObserver;
use terravision_client::TerravisionClient;
use terravision_core::domain::config_file::ConfigFileName;
use terravision_core::dto::write::WriteFiles;

async fn serve(workspace: &std::path::Path) -> TerravisionClient {
    let config = Config::new(workspace).with_transform_command("cat");
    let app = create_router(AppState::new(&config, Arc::new(TracingObserver)).unwrap());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TerravisionClient::new(format!("http://{}/", addr))
}

#[tokio::test]
async fn test_write_files() {
    let dir = tempfile::tempdir().unwrap();
    let client = serve(dir.path()).await;

    let mut files = WriteFiles::new();
    files.insert(ConfigFileName::Main, "resource \"null_resource\" \"a\" {}\n");
    files.insert(ConfigFileName::VariableValues, "region = \"eu-west-1\"\n");
    client.write_files(&files).await.unwrap();

    assert_eq!(
        std::fs::read_to_string(dir.path().join("main.tf")).unwrap(),
        "resource \"null_resource\" \"a\" {}\n"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("terraform.tfvars")).unwrap(),
        "region = \"eu-west-1\"\n"
    );
    assert!(!dir.path().join("variables.tf").exists());
}

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let client = serve(dir.path()).await;

    let health = client.health().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.service, "terravision-api");
}

#[tokio::test]
async fn test_missing_diagram_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let client = serve(dir.path()).await;

    let err = client.download_output().await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_download_output() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("output")).unwrap();
    std::fs::write(dir.path().join("output/diagram.dot.png"), b"\x89PNG").unwrap();
    let client = serve(dir.path()).await;

    assert_eq!(client.download_output().await.unwrap(), b"\x89PNG");
}

#[tokio::test]
async fn test_validate_streams_lines() {
    let dir = tempfile::tempdir().unwrap();
    let client = serve(dir.path()).await;

    let mut lines = client.validate().await.unwrap();
    let first = lines.next().await.unwrap().unwrap();
    assert_eq!(first, "Initializing Terraform...");

    // Drain the rest so the run completes before the workspace goes away.
    while let Some(line) = lines.next().await {
        line.unwrap();
    }
}

#[tokio::test]
async fn test_pipeline_without_workspace_is_a_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let client = serve(&dir.path().join("absent")).await;

    let err = match client.graph().await {
        Ok(_) => panic!("graph started without a workspace"),
        Err(err) => err,
    };
    assert!(err.is_server_error());
    assert!(err.to_string().contains("Unexpected error"));
}
