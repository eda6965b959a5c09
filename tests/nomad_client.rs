use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use nomad_job_monitor::config::NomadConfig;
use nomad_job_monitor::error::MonitorError;
use nomad_job_monitor::nomad::{
    AllocationSource, AllocationStatus, InventorySource, Node, NomadClient,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

const TOKEN: &str = "s3cr3t-token";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("X-Nomad-Token")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == TOKEN)
        .unwrap_or(false)
}

async fn nodes(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::FORBIDDEN, Json(json!("Permission denied")));
    }
    (
        StatusCode::OK,
        Json(json!([
            {"ID": "a1", "Name": "node-a", "Status": "ready", "Datacenter": "dc1"},
            {"ID": "b1", "Name": "node-b", "Status": "ready", "Datacenter": "dc1"}
        ])),
    )
}

async fn allocations(
    Path(job): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::FORBIDDEN, Json(json!("Permission denied")));
    }
    if job != "signoz-logspout" {
        return (StatusCode::NOT_FOUND, Json(json!("job not found")));
    }
    if query.get("all").map(String::as_str) != Some("true") {
        return (StatusCode::BAD_REQUEST, Json(json!("expected all=true")));
    }
    (
        StatusCode::OK,
        Json(json!([
            {"ID": "x1", "JobID": &job, "NodeName": "node-a", "ClientStatus": "running"},
            {"ID": "x2", "JobID": &job, "NodeName": "node-b", "ClientStatus": "complete"}
        ])),
    )
}

async fn fake_nomad() -> SocketAddr {
    let app = Router::new()
        .route("/v1/nodes", get(nodes))
        .route("/v1/job/{job}/allocations", get(allocations))
        .route(
            "/slow/v1/nodes",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!([]))
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr, token: Option<&str>) -> NomadClient {
    NomadClient::new(&NomadConfig {
        address: format!("http://{}", addr),
        token: token.map(str::to_string),
        ..NomadConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_list_nodes() {
    let addr = fake_nomad().await;

    let nodes = client(addr, Some(TOKEN)).list_nodes().await.unwrap();

    assert_eq!(
        nodes,
        vec![Node::new("a1", "node-a"), Node::new("b1", "node-b")]
    );
}

#[tokio::test]
async fn test_list_allocations() {
    let addr = fake_nomad().await;

    let allocs = client(addr, Some(TOKEN))
        .list_allocations("signoz-logspout")
        .await
        .unwrap();

    assert_eq!(allocs.len(), 2);
    assert_eq!(allocs[0].node_name, "node-a");
    assert_eq!(allocs[0].status, AllocationStatus::Running);
    assert_eq!(allocs[1].status, AllocationStatus::Complete);
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let addr = fake_nomad().await;

    let err = client(addr, None).list_nodes().await.unwrap_err();

    match err {
        MonitorError::UnexpectedStatus { status, endpoint, .. } => {
            assert_eq!(status, 403);
            assert_eq!(endpoint, "/v1/nodes");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_unknown_job_is_an_error() {
    let addr = fake_nomad().await;

    let err = client(addr, Some(TOKEN))
        .list_allocations("no-such-job")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MonitorError::UnexpectedStatus { status: 404, .. }
    ));
}

#[tokio::test]
async fn test_request_timeout() {
    let addr = fake_nomad().await;
    let client = NomadClient::new(&NomadConfig {
        address: format!("http://{}/slow", addr),
        request_timeout: Duration::from_millis(50),
        ..NomadConfig::default()
    })
    .unwrap();

    let err = client.list_nodes().await.unwrap_err();

    assert!(matches!(err, MonitorError::HttpError(ref e) if e.is_timeout()));
}

#[tokio::test]
async fn test_unreachable_nomad() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(addr, Some(TOKEN)).list_nodes().await.unwrap_err();

    assert!(matches!(err, MonitorError::HttpError(_)));
}
