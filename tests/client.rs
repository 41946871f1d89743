//! End-to-end tests for the client contract.
//!
//! An `UploadPage` with an `HttpTransport` talks to a real relay bound on an
//! ephemeral port, which in turn forwards to a `wiremock::MockServer`.

use chrono::NaiveDate;
use scrptbl::client::CLIENT_TRANSPORT_ERROR;
use scrptbl::{server, ConversionResult, HttpTransport, ProxyConfig, SelectedImage, UploadPage};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WEBHOOK_PATH: &str = "/webhook/convert";

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Route library logs through the test harness; `RUST_LOG` overrides.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scrptbl=debug")),
        )
        .with_line_number(true)
        .with_test_writer()
        .try_init();
}

/// Serve the relay on 127.0.0.1:0 and return its base URL.
async fn spawn_relay(config: ProxyConfig) -> String {
    init_tracing();
    let app = server::router(&config).expect("router should build");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn relay_for(mock: &MockServer) -> String {
    let config = ProxyConfig::builder()
        .webhook_url(format!("{}{WEBHOOK_PATH}", mock.uri()))
        .build()
        .unwrap();
    spawn_relay(config).await
}

async fn webhook_replying(status: u16, body: &str, calls: u64) -> MockServer {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(WEBHOOK_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .expect(calls)
        .mount(&mock)
        .await;
    mock
}

fn page_for(base: &str) -> UploadPage<HttpTransport> {
    UploadPage::new(HttpTransport::new(base).unwrap())
}

fn jpeg(name: &str) -> SelectedImage {
    SelectedImage::new(name, "image/jpeg", b"JFIF fake-jpeg".to_vec())
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn converts_and_downloads_text() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(WEBHOOK_PATH))
        .and(body_string_contains(r#"name="data"; filename="scan.jpg""#))
        .and(body_string_contains("JFIF fake-jpeg"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Hello World"))
        .expect(1)
        .mount(&mock)
        .await;
    let base = relay_for(&mock).await;

    let mut page = page_for(&base);
    assert!(page.select_file(jpeg("scan.jpg")));
    let result = page.submit().await.cloned().unwrap();

    assert_eq!(
        result,
        ConversionResult::Success {
            text: "Hello World".into()
        }
    );
    assert!(!page.is_busy());

    let download = page.download_on(date()).unwrap();
    assert_eq!(download.file_name, "converted-text-2026-10-15.txt");
    assert_eq!(download.contents, "Hello World");

    let dir = tempfile::tempdir().unwrap();
    let saved = download.save_in(dir.path()).await.unwrap();
    assert_eq!(std::fs::read(saved).unwrap(), b"Hello World");
}

#[tokio::test]
async fn submit_without_selection_calls_nothing() {
    let mock = webhook_replying(200, "never", 0).await;
    let base = relay_for(&mock).await;

    let mut page = page_for(&base);
    assert!(!page.select_file(SelectedImage::new("a.gif", "image/gif", vec![0u8])));
    assert!(page.submit().await.is_none());
    assert!(page.result().is_none());
}

#[tokio::test]
async fn upstream_failure_is_shown_but_not_downloadable() {
    let mock = webhook_replying(503, "busy", 1).await;
    let base = relay_for(&mock).await;

    let mut page = page_for(&base);
    page.select_file(jpeg("scan.jpg"));
    page.submit().await;

    assert_eq!(
        page.result(),
        Some(&ConversionResult::Failure {
            reason: "busy".into()
        })
    );
    assert!(page.download_on(date()).is_none());
}

#[tokio::test]
async fn missing_webhook_surfaces_configuration_error() {
    let base = spawn_relay(ProxyConfig::default()).await;

    let mut page = page_for(&base);
    page.select_file(jpeg("scan.jpg"));
    let result = page.submit().await.cloned().unwrap();

    assert!(!result.is_success());
    assert_eq!(
        result.text(),
        "Error: N8N_WEBHOOK_URL environment variable is not configured"
    );
    assert!(page.download_on(date()).is_none());
}

#[tokio::test]
async fn unreachable_relay_records_fixed_message() {
    // Bind then drop to get a port nothing is listening on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut page = page_for(&format!("http://{addr}"));
    page.select_file(jpeg("scan.jpg"));
    page.submit().await;

    assert_eq!(page.result().unwrap().text(), CLIENT_TRANSPORT_ERROR);
    assert!(!page.is_busy());
}

#[tokio::test]
async fn health_reports_configuration_state() {
    let missing = spawn_relay(ProxyConfig::default()).await;
    let line = HttpTransport::new(&missing).unwrap().health().await.unwrap();
    assert_eq!(line, "convert route up | env:missing");

    let mock = webhook_replying(200, "unused", 0).await;
    let configured = relay_for(&mock).await;
    let line = HttpTransport::new(&configured).unwrap().health().await.unwrap();
    assert_eq!(line, "convert route up | env:ok");
}
