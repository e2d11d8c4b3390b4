//! Integration tests for Civic Pulse.
//!
//! The full router is driven in-process with `tower::ServiceExt::oneshot`,
//! over in-memory stores and a memory session store. No database or network
//! is needed:
//!
//! ```bash
//! cargo test -p civic-pulse-integration-tests
//! ```
//!
//! [`TestApp`] owns the router and the stores behind it, so tests can act
//! over HTTP and then inspect the stored state directly.

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, StatusCode, header};
use tempfile::TempDir;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use civic_pulse_core::{Issue, IssueId};
use civic_pulse_web::config::WebConfig;
use civic_pulse_web::db::seed::seed_demo_data;
use civic_pulse_web::db::{IssueStore, MemoryIssueStore, MemoryUserStore};
use civic_pulse_web::middleware::create_memory_session_layer;
use civic_pulse_web::middleware::session::SESSION_COOKIE_NAME;
use civic_pulse_web::services::auth::hash_password;
use civic_pulse_web::services::storage::MemoryObjectStorage;
use civic_pulse_web::state::AppState;

/// Password of every seeded demo account.
pub const DEMO_PASSWORD: &str = "demo-password";

/// Seeded demo accounts.
pub const CITIZEN_EMAIL: &str = "jane@civicpulse.test";
pub const ADMIN_EMAIL: &str = "admin@civicpulse.test";

/// Multipart boundary used by [`multipart_body`].
pub const BOUNDARY: &str = "civic-pulse-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub users: Arc<MemoryUserStore>,
    pub issues: Arc<MemoryIssueStore>,
    pub storage: Arc<MemoryObjectStorage>,
    _uploads: TempDir,
}

impl TestApp {
    /// App over empty stores.
    pub fn new() -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let config = WebConfig::local(uploads.path());

        let users = Arc::new(MemoryUserStore::new());
        let issues = Arc::new(MemoryIssueStore::new());
        let storage = Arc::new(MemoryObjectStorage::new());

        let session_layer = create_memory_session_layer(&config);
        let state = AppState::from_parts(config, users.clone(), issues.clone(), storage.clone());
        let router = civic_pulse_web::app::<MemoryStore>(state, session_layer, None);

        Self {
            router,
            users,
            issues,
            storage,
            _uploads: uploads,
        }
    }

    /// App over the demo data; every account uses [`DEMO_PASSWORD`].
    pub async fn seeded() -> Self {
        let app = Self::new();
        let hash = hash_password(DEMO_PASSWORD).unwrap();
        seed_demo_data(app.users.as_ref(), app.issues.as_ref(), &hash)
            .await
            .unwrap();
        app
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, form: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(form.to_owned())).unwrap())
            .await
    }

    pub async fn post_multipart(&self, uri: &str, body: Vec<u8>, cookie: &str) -> Response<Body> {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(header::COOKIE, cookie)
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Sign in through the form and return the session cookie.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post_form(
                "/auth/login",
                &format!("email={}&password={password}", email.replace('@', "%40")),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "login failed for {email}");
        session_cookie(&response).expect("login sets a session cookie")
    }

    pub async fn issue(&self, id: i32) -> Issue {
        self.issues.get(IssueId::new(id)).await.unwrap().unwrap()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// `name=value` of the session cookie set by `response`, if any.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with(&format!("{SESSION_COOKIE_NAME}=")))
        .map(str::to_owned)
}

/// Redirect target of `response`.
pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// A part of a multipart form.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

/// Encode `parts` as `multipart/form-data` with [`BOUNDARY`].
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
