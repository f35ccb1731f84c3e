use super::*;
use axum::{
    body::{Body, to_bytes},
    http::{Request, header},
};
use casket_core::{CasketClient, MemoryBackend};
use tower::ServiceExt;

const ALPHA_KEY: &str = "be76331b95dfc399cd776d2fc68021e0db03cc4f";

fn test_router(strict_status: bool) -> Router {
    let store = BlobStore::open(MemoryBackend::default(), StoreOptions::default()).unwrap();
    let state = Arc::new(ServerState {
        store: Arc::new(store),
        gateway: GatewayConfig {
            strict_status,
            ..GatewayConfig::default()
        },
        backend_name: "memory".to_string(),
    });
    build_router(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8_lossy(&body).into_owned())
}

fn post_set(value: &'static str) -> Request<Body> {
    Request::post("/set")
        .header(header::CONTENT_LENGTH, value.len())
        .body(Body::from(value))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_set_get_info_flow() {
    let app = test_router(false);

    let (status, body) = send(&app, post_set("alpha")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ALPHA_KEY);

    let (status, body) = send(&app, get(&format!("/get/{}", ALPHA_KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "alpha");

    let (status, body) = send(&app, get("/info")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "object-cnt:1 - totsize:5");
}

#[tokio::test]
async fn test_duplicate_set_rejected() {
    let app = test_router(false);
    let (status, _) = send(&app, post_set("alpha")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, post_set("alpha")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "existing entry");

    let (_, body) = send(&app, get("/info")).await;
    assert_eq!(body, "object-cnt:1 - totsize:5");
}

#[tokio::test]
async fn test_nil_and_zero_values() {
    let app = test_router(false);

    let request = Request::post("/set").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "nil value error");

    let request = Request::post("/set")
        .header(header::CONTENT_LENGTH, 0)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "zero value error");
}

#[tokio::test]
async fn test_wrong_method_rejected() {
    let app = test_router(false);

    let (status, body) = send(&app, get("/set")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "expect POST method - have GET");

    let request = Request::post(format!("/get/{}", ALPHA_KEY))
        .body(Body::from("x"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "expect GET method - have POST");

    let request = Request::delete("/info").body(Body::empty()).unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bad_and_missing_keys() {
    let app = test_router(false);

    let (status, body) = send(&app, get("/get/not-hex")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with("invalid key"));

    let (status, _) = send(&app, get("/get/be76331b")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, get(&format!("/get/{}", ALPHA_KEY))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "entry not found");
}

#[tokio::test]
async fn test_del_is_not_implemented() {
    let app = test_router(false);

    let (status, body) = send(&app, get(&format!("/del/{}", ALPHA_KEY))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "entry not found");

    send(&app, post_set("alpha")).await;
    let (status, body) = send(&app, get(&format!("/del/{}", ALPHA_KEY))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "not implemented: delete");

    // still readable afterwards
    let (status, body) = send(&app, get(&format!("/get/{}", ALPHA_KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "alpha");
}

#[tokio::test]
async fn test_strict_status_codes() {
    let app = test_router(true);

    let (status, _) = send(&app, get(&format!("/get/{}", ALPHA_KEY))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(&app, post_set("alpha")).await;
    let (status, _) = send(&app, post_set("alpha")).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, get(&format!("/del/{}", ALPHA_KEY))).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);

    let (status, _) = send(&app, get("/get/zz")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // method errors stay 400 regardless
    let (status, _) = send(&app, get("/set")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_reports_stats() {
    let app = test_router(false);
    send(&app, post_set("alpha")).await;
    send(&app, post_set("beta")).await;

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["backend"], "memory");
    assert_eq!(json["segments"], 8);
    assert_eq!(json["stats"]["object_count"], 2);
    assert_eq!(json["stats"]["total_bytes"], 9);
}

#[tokio::test]
async fn test_body_limit_enforced() {
    let store = BlobStore::open(MemoryBackend::default(), StoreOptions::default()).unwrap();
    let app = build_router(Arc::new(ServerState {
        store: Arc::new(store),
        gateway: GatewayConfig {
            strict_status: false,
            max_value_bytes: 4,
        },
        backend_name: "memory".to_string(),
    }));

    let (status, _) = send(&app, post_set("alpha")).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let (status, _) = send(&app, post_set("beta")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_empty_key_rejected() {
    let app = test_router(false);

    for uri in ["/get/", "/del/"] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "invalid key: key not provided");
    }
}

#[test]
fn test_status_mapping() {
    assert_eq!(status_for(&StoreError::DiskFull, false), StatusCode::BAD_REQUEST);
    assert_eq!(status_for(&StoreError::NotFound, false), StatusCode::BAD_REQUEST);
    assert_eq!(
        status_for(&StoreError::Backend("boom".to_string()), false),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        status_for(&StoreError::Io("broken pipe".to_string()), false),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        status_for(&StoreError::Abandoned, false),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        status_for(&StoreError::DiskFull, true),
        StatusCode::INSUFFICIENT_STORAGE
    );
    assert_eq!(
        status_for(&StoreError::Backend("boom".to_string()), true),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(status_for(&StoreError::NilValue, true), StatusCode::BAD_REQUEST);
}

async fn spawn_gateway() -> CasketClient {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let app = test_router(false);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    CasketClient::new("127.0.0.1", port).unwrap()
}

#[tokio::test]
async fn test_client_round_trip() {
    let client = spawn_gateway().await;

    let key = client.put(b"alpha").await.unwrap();
    assert_eq!(&key[..], ALPHA_KEY.as_bytes());

    let value = client.get(ALPHA_KEY).await.unwrap();
    assert_eq!(&value[..], b"alpha");

    let info = client.info().await.unwrap();
    assert_eq!(&info[..], b"object-cnt:1 - totsize:5");

    match client.put(b"alpha").await {
        Err(StoreError::Http(message)) => {
            assert!(message.starts_with("400"));
            assert!(message.ends_with("existing entry"));
        }
        other => panic!("expected http error, got {:?}", other),
    }

    match client.del(ALPHA_KEY).await {
        Err(StoreError::Http(message)) => assert!(message.contains("not implemented")),
        other => panic!("expected http error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_client_concurrent_puts() {
    let client = spawn_gateway().await;

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..16u32 {
        let client = client.clone();
        tasks.spawn(async move { client.put(format!("value-{}", i).as_bytes()).await });
    }
    while let Some(result) = tasks.join_next().await {
        assert!(result.unwrap().is_ok());
    }

    let info = client.info().await.unwrap();
    let expected: usize = (0..16).map(|i| format!("value-{}", i).len()).sum();
    assert_eq!(
        String::from_utf8_lossy(&info),
        format!("object-cnt:16 - totsize:{}", expected)
    );
}
