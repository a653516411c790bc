//! Router-level tests for the device API

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http_body_util::BodyExt;
use qlight_config::{AppConfig, AuthConfig};
use qlight_registry::{routes, DeviceMode, DeviceRegistry, JsonFileSnapshot, SnapshotRepository};
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    registry: Arc<DeviceRegistry>,
    dir: TempDir,
}

fn setup(configure: impl FnOnce(&mut AppConfig)) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.storage.snapshot_path = dir.path().join("appList.json").display().to_string();
    configure(&mut config);

    let snapshot = Arc::new(JsonFileSnapshot::new(&config.storage.snapshot_path));
    let (registry, _writer) = DeviceRegistry::open(snapshot);
    let registry = Arc::new(registry);
    let router = routes(Arc::new(config), Arc::clone(&registry));
    TestApp {
        router,
        registry,
        dir,
    }
}

fn from_peer(mut request: Request<Body>, peer: &str) -> Request<Body> {
    let addr: SocketAddr = peer.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

fn form_request(method: Method, uri: &str, form: &str, peer: &str) -> Request<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap();
    from_peer(request, peer)
}

fn check_in(form: &str, peer: &str) -> Request<Body> {
    form_request(Method::POST, "/post/appInfo/", form, peer)
}

fn discover(query: &str, peer: &str) -> Request<Body> {
    let request = Request::builder()
        .uri(format!("/get/controllerIP/?{query}"))
        .body(Body::empty())
        .unwrap();
    from_peer(request, peer)
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, String) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_banner() {
    let app = setup(|_| {});
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "qlightAPI v0.1.0");
}

#[tokio::test]
async fn test_check_in_creates_then_updates() {
    let app = setup(|_| {});
    let form = "ID=dev1&Name=Pixel&PrivateIP=192.168.1.5&Mode=clientSP";

    let first = send(&app, check_in(form, "1.2.3.4:50000")).await;
    let second = send(&app, check_in(form, "1.2.3.4:50001")).await;

    assert_eq!(first, (StatusCode::OK, "OK:New Entry".to_string()));
    assert_eq!(second, (StatusCode::OK, "OK:Updated Entry".to_string()));
    let record = app.registry.get("dev1").unwrap();
    assert_eq!(record.login_count, 2);
    assert_eq!(record.last_public_ip, "1.2.3.4");
    assert_eq!(record.mode, DeviceMode::ClientSmartphone);
}

#[tokio::test]
async fn test_discovery_finds_controller_on_same_lan() {
    let app = setup(|_| {});
    send(
        &app,
        check_in("ID=ctrl1&PrivateIP=192.168.1.9&Mode=ctrlPro", "1.2.3.4:4000"),
    )
    .await;
    send(
        &app,
        check_in("ID=dev1&PrivateIP=192.168.1.5&Mode=clientSP", "1.2.3.4:4001"),
    )
    .await;

    let (status, body) = send(&app, discover("ID=dev1&privateIP=192.168.1.5", "1.2.3.4:4002")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK:192.168.1.9");
}

#[tokio::test]
async fn test_discovery_on_other_subnet_is_not_found() {
    let app = setup(|_| {});
    send(
        &app,
        check_in("ID=ctrl1&PrivateIP=192.168.1.9&Mode=ctrlLite", "1.2.3.4:4000"),
    )
    .await;

    let (status, body) = send(&app, discover("privateIP=10.0.0.5", "1.2.3.4:4002")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ERROR:Not Found");
}

#[tokio::test]
async fn test_discovery_without_controller_on_public_ip() {
    let app = setup(|_| {});
    send(
        &app,
        check_in("ID=ctrl1&PrivateIP=192.168.1.9&Mode=ctrlPro", "9.9.9.9:4000"),
    )
    .await;

    let (status, body) = send(&app, discover("privateIP=192.168.1.5", "1.2.3.4:4002")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ERROR:No LAN server found on IP\n1.2.3.4");
}

#[tokio::test]
async fn test_discovery_rejects_empty_private_ip() {
    let app = setup(|_| {});

    let (status, body) = send(&app, discover("ID=dev1&privateIP=", "1.2.3.4:4002")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "ERROR:empty query");
}

#[tokio::test]
async fn test_discovery_rejects_illegal_characters() {
    let app = setup(|_| {});

    let (status, body) = send(&app, discover("privateIP=192.168.1.5%3B", "1.2.3.4:4002")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "ERROR:Message contain illegal character!");
}

#[tokio::test]
async fn test_check_in_rejects_invalid_id() {
    let app = setup(|_| {});

    let (empty_status, empty_body) = send(&app, check_in("Name=nobody", "1.2.3.4:1")).await;
    let (slash_status, slash_body) = send(&app, check_in("ID=..%2Fetc", "1.2.3.4:1")).await;

    assert_eq!(empty_status, StatusCode::BAD_REQUEST);
    assert_eq!(empty_body, "ERROR:empty query");
    assert_eq!(slash_status, StatusCode::BAD_REQUEST);
    assert_eq!(slash_body, "ERROR:Message contain illegal character!");
    assert!(app.registry.is_empty());
}

#[tokio::test]
async fn test_check_in_rejects_illegal_private_ip() {
    let app = setup(|_| {});
    let update = |form: &str| form_request(Method::PUT, "/put/appInfo/", form, "1.2.3.4:1");

    let (status, body) = send(&app, check_in("ID=dev1&PrivateIP=10.0.0.1%27", "1.2.3.4:1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "ERROR:Message contain illegal character!");
    assert!(app.registry.is_empty());

    send(&app, check_in("ID=dev1&PrivateIP=10.0.0.1", "1.2.3.4:1")).await;
    let (status, _) = send(&app, update("ID=dev1&PrivateIP=10.0.0.1%3Bdrop")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.registry.get("dev1").unwrap().last_private_ip, "10.0.0.1");
}

#[tokio::test]
async fn test_malformed_form_is_wrong_data_format() {
    let app = setup(|_| {});

    let (status, body) = send(&app, check_in("ID=a&ID=b", "1.2.3.4:1")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with("ERROR:Wrong data format, "), "{body}");
}

#[tokio::test]
async fn test_update_of_unknown_device_does_not_create() {
    let app = setup(|_| {});
    let update = |form: &str| form_request(Method::PUT, "/put/appInfo/", form, "1.2.3.4:1");

    let missing = send(&app, update("ID=ghost&PrivateIP=10.0.0.1")).await;
    assert_eq!(missing, (StatusCode::OK, "ERROR:No Entry Found".to_string()));
    assert!(app.registry.is_empty());

    send(&app, check_in("ID=dev1&PrivateIP=10.0.0.1", "1.2.3.4:1")).await;
    let updated = send(&app, update("ID=dev1&PrivateIP=10.0.0.2&Mode=ctrlLite")).await;

    assert_eq!(updated, (StatusCode::OK, "OK:Updated Entry".to_string()));
    let record = app.registry.get("dev1").unwrap();
    assert_eq!(record.last_private_ip, "10.0.0.2");
    assert_eq!(record.mode, DeviceMode::ControllerLite);
}

#[tokio::test]
async fn test_wrong_method_is_405() {
    let app = setup(|_| {});
    let request = from_peer(
        Request::builder()
            .uri("/post/appInfo/")
            .body(Body::empty())
            .unwrap(),
        "1.2.3.4:1",
    );

    let (status, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_missing_peer_address_is_rejected() {
    let app = setup(|_| {});
    let request = Request::builder()
        .method(Method::POST)
        .uri("/post/appInfo/")
        .body(Body::from("ID=dev1"))
        .unwrap();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "ERROR:Unknown remote address");
}

#[tokio::test]
async fn test_forwarded_for_used_only_when_trusted() {
    let trusted = setup(|config| config.server.trust_forwarded_for = true);
    let untrusted = setup(|_| {});
    let proxied = || {
        let mut request = check_in("ID=dev1&PrivateIP=10.0.0.1", "127.0.0.1:9000");
        request
            .headers_mut()
            .insert("x-forwarded-for", "5.6.7.8, 10.1.1.1".parse().unwrap());
        request
    };

    send(&trusted, proxied()).await;
    send(&untrusted, proxied()).await;

    assert_eq!(trusted.registry.get("dev1").unwrap().last_public_ip, "5.6.7.8");
    assert_eq!(untrusted.registry.get("dev1").unwrap().last_public_ip, "127.0.0.1");
}

#[tokio::test]
async fn test_ipv4_mapped_peer_is_normalized() {
    let app = setup(|_| {});

    send(&app, check_in("ID=dev1&PrivateIP=10.0.0.1", "[::ffff:1.2.3.4]:5000")).await;

    assert_eq!(app.registry.get("dev1").unwrap().last_public_ip, "1.2.3.4");
}

#[tokio::test]
async fn test_api_requires_basic_auth_when_configured() {
    let app = setup(|config| {
        config.auth = Some(AuthConfig {
            name: "qlight".to_string(),
            key: "hunter2".to_string(),
        })
    });

    let (status, body) = send(&app, check_in("ID=dev1", "1.2.3.4:1")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "ERROR:Unauthorized");

    let mut request = check_in("ID=dev1", "1.2.3.4:1");
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Basic {}", STANDARD.encode("qlight:hunter2"))
            .parse()
            .unwrap(),
    );
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK:New Entry");

    // the banner stays public
    let banner = Request::builder().uri("/").body(Body::empty()).unwrap();
    assert_eq!(send(&app, banner).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_check_ins_reach_the_snapshot_file() {
    let app = setup(|_| {});
    send(
        &app,
        check_in("ID=ctrl1&PrivateIP=192.168.1.9&Mode=ctrlPro", "1.2.3.4:1"),
    )
    .await;

    app.registry.flush().await.unwrap();

    let snapshot = JsonFileSnapshot::new(app.dir.path().join("appList.json"));
    let records = snapshot.load_snapshot().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "ctrl1");
    assert_eq!(records[0].mode, DeviceMode::ControllerPro);
}
