//! Integration tests for the lead intake HTTP endpoint.
//!
//! Each test spins up an Axum server on a random port backed by a real
//! libSQL file and a recording mailer, then talks to it over HTTP.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use lead_intake::api::{CorsPolicy, LeadResponse, lead_routes};
use lead_intake::config::NotifyConfig;
use lead_intake::error::EmailError;
use lead_intake::notify::{Mailer, OutgoingEmail};
use lead_intake::pipeline::IntakeDeps;
use lead_intake::pipeline::types::LeadStatus;
use lead_intake::ratelimit::FixedWindowLimiter;
use lead_intake::store::{LeadStore, LibSqlBackend};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const SITE_ORIGIN: &str = "https://www.example.com";

/// Mailer that records every email and optionally fails all of them.
#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: bool,
}

impl RecordingMailer {
    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(email.clone());
        if self.fail {
            return Err(EmailError::Rejected {
                provider: "recording".into(),
                status: 422,
                body: "domain not verified".into(),
            });
        }
        Ok(())
    }
}

struct TestServer {
    base: String,
    store: Arc<LibSqlBackend>,
    mailer: Arc<RecordingMailer>,
    _dir: tempfile::TempDir,
}

/// Start an Axum server on a random port.
async fn start_server(mailer: RecordingMailer) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        LibSqlBackend::new_local(&dir.path().join("leads.db"))
            .await
            .unwrap(),
    );
    let mailer = Arc::new(mailer);

    let deps = IntakeDeps {
        store: store.clone(),
        mailer: mailer.clone(),
        limiter: Arc::new(FixedWindowLimiter::new(5, Duration::from_secs(60))),
        notify: NotifyConfig {
            operations_to: "ops@example.com".into(),
            from: "MAQON <noreply@example.com>".into(),
            brand: "MAQON".into(),
        },
        stage_timeout: Duration::from_secs(2),
    };
    let app = lead_routes(deps, CorsPolicy::new([SITE_ORIGIN]));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        base: format!("http://127.0.0.1:{port}"),
        store,
        mailer,
        _dir: dir,
    }
}

fn valid_lead() -> Value {
    json!({
        "full_name": "Jo Bloggs",
        "work_email": "jo@x.com",
        "company_name": "Acme",
        "current_stage": "Seed",
        "primary_goal": "need funding fast",
        "utm_params": {"utm_source": "newsletter", "utm_campaign": "autumn"}
    })
}

async fn post_lead(server: &TestServer, body: &Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}/api/lead", server.base))
        .json(body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn valid_submission_is_stored_and_notified() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(RecordingMailer::default()).await;

        let resp = post_lead(&server, &valid_lead()).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["cache-control"], "no-store");
        let body: LeadResponse = resp.json().await.unwrap();
        assert_eq!(body, LeadResponse::success());

        let leads = server.store.list_recent(10).await.unwrap();
        assert_eq!(leads.len(), 1);
        let lead = &leads[0];
        assert_eq!(lead.full_name, "Jo Bloggs");
        assert_eq!(lead.status, LeadStatus::New);
        assert_eq!(lead.request_type, "Diagnostic");
        assert_eq!(lead.utm.utm_source.as_deref(), Some("newsletter"));
        assert_eq!(lead.utm.utm_campaign.as_deref(), Some("autumn"));
        // No proxy headers: the socket peer identifies the client.
        assert_eq!(lead.ip_address, "127.0.0.1");
        assert_eq!(server.mailer.count(), 2);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn platform_ip_header_identifies_client() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(RecordingMailer::default()).await;

        let resp = reqwest::Client::new()
            .post(format!("{}/.netlify/functions/lead", server.base))
            .header("x-nf-client-connection-ip", "198.51.100.23")
            .header("x-forwarded-for", "10.0.0.1")
            .header("user-agent", "integration-test")
            .json(&valid_lead())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let leads = server.store.list_recent(10).await.unwrap();
        assert_eq!(leads[0].ip_address, "198.51.100.23");
        assert_eq!(leads[0].user_agent, "integration-test");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn missing_fields_are_listed() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(RecordingMailer::default()).await;

        let resp = post_lead(&server, &json!({"full_name": "J"})).await;
        assert_eq!(resp.status(), 400);
        let body: LeadResponse = resp.json().await.unwrap();
        assert!(!body.ok);
        let errors = body.errors.unwrap();
        for field in [
            "full_name",
            "work_email",
            "company_name",
            "current_stage",
            "primary_goal",
        ] {
            assert!(errors.contains_key(field), "missing error for {field}");
        }

        assert!(server.store.list_recent(10).await.unwrap().is_empty());
        assert_eq!(server.mailer.count(), 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn honeypot_submission_is_silently_dropped() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(RecordingMailer::default()).await;

        let mut body = valid_lead();
        body["_gotcha"] = json!("I am a bot");
        let resp = post_lead(&server, &body).await;
        assert_eq!(resp.status(), 200);
        let body: LeadResponse = resp.json().await.unwrap();
        assert!(body.ok);

        assert!(server.store.list_recent(10).await.unwrap().is_empty());
        assert_eq!(server.mailer.count(), 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn sixth_submission_in_window_is_rate_limited() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(RecordingMailer::default()).await;

        for _ in 0..5 {
            assert_eq!(post_lead(&server, &valid_lead()).await.status(), 200);
        }

        let resp = post_lead(&server, &json!({})).await;
        assert_eq!(resp.status(), 429);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(
            body,
            json!({
                "ok": false,
                "errors": {"global": "Too many requests. Please try again shortly."}
            })
        );
        assert_eq!(server.store.list_recent(10).await.unwrap().len(), 5);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn get_is_method_not_allowed() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(RecordingMailer::default()).await;

        let resp = reqwest::get(format!("{}/api/submit-lead", server.base))
            .await
            .unwrap();
        assert_eq!(resp.status(), 405);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["errors"]["global"], "Method not allowed");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn preflight_from_site_origin() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(RecordingMailer::default()).await;

        let resp = reqwest::Client::new()
            .request(reqwest::Method::OPTIONS, format!("{}/api/lead", server.base))
            .header("origin", SITE_ORIGIN)
            .header("access-control-request-method", "POST")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 204);
        assert_eq!(resp.headers()["access-control-allow-origin"], SITE_ORIGIN);
        assert_eq!(resp.headers()["access-control-allow-headers"], "Content-Type");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn email_failure_still_succeeds() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(RecordingMailer {
            fail: true,
            ..Default::default()
        })
        .await;

        let resp = post_lead(&server, &valid_lead()).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(server.store.list_recent(10).await.unwrap().len(), 1);
        assert_eq!(server.mailer.count(), 2);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn health_endpoint() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(RecordingMailer::default()).await;

        let body: Value = reqwest::get(format!("{}/health", server.base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, json!({"status": "ok", "service": "lead-intake"}));
    })
    .await
    .expect("test timed out");
}
