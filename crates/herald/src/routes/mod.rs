//! HTTP route handlers for Herald.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::rate_limit::limit_issue_requests;
use crate::state::AppState;

mod error;
mod health;
mod otp;

pub use error::ApiError;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let issue_limit = middleware::from_fn_with_state(state.clone(), limit_issue_requests);

    Router::new()
        // Health & Status
        .route("/health", get(health::health_check))

        // OTP lifecycle (only issuing is rate limited)
        .route("/api/request-otp", post(otp::request_otp).layer(issue_limit))
        .route("/api/verify-otp", post(otp::verify_otp))

        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())

        // Add shared state
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::AppConfig;
    use crate::otp::RecordingGateway;
    use axum::{
        body::Body,
        extract::ConnectInfo,
        http::{Request, StatusCode},
        response::Response,
    };
    use chrono::Duration;
    use serde_json::{Value, json};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tower::ServiceExt;

    const PHONE: &str = "+15551234567";

    struct TestApp {
        router: Router,
        clock: Arc<ManualClock>,
        sms: Arc<RecordingGateway>,
        email: Arc<RecordingGateway>,
    }

    fn app_with(config: AppConfig, sms: RecordingGateway, email: RecordingGateway) -> TestApp {
        let clock = Arc::new(ManualClock::default());
        let sms = Arc::new(sms);
        let email = Arc::new(email);
        let state = AppState::with_parts(config, clock.clone(), sms.clone(), email.clone());
        TestApp {
            router: create_router(state),
            clock,
            sms,
            email,
        }
    }

    fn app() -> TestApp {
        app_with(
            AppConfig::default(),
            RecordingGateway::default(),
            RecordingGateway::default(),
        )
    }

    fn post_json(uri: &str, body: Value, peer: &str) -> Request<Body> {
        let mut req = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        req
    }

    async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
        let response: Response = app.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn issue(app: &TestApp, contact: &str, method: &str) -> (StatusCode, Value) {
        let req = post_json(
            "/api/request-otp",
            json!({ "contact": contact, "method": method }),
            "10.0.0.1:4000",
        );
        send(app, req).await
    }

    async fn verify(app: &TestApp, contact: &str, otp: &str) -> (StatusCode, Value) {
        let req = post_json(
            "/api/verify-otp",
            json!({ "contact": contact, "otp": otp }),
            "10.0.0.1:4000",
        );
        send(app, req).await
    }

    #[tokio::test]
    async fn test_issue_and_verify_once() {
        let app = app();

        let (status, body) = issue(&app, PHONE, "sms").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "message": format!("OTP sent to {PHONE}") }));

        let code = app.sms.last_code();
        assert_eq!(code.len(), 6);

        let (status, body) = verify(&app, PHONE, &code).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "message": "OTP verified successfully" }));

        let (status, body) = verify(&app, PHONE, &code).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "OTP not found or expired");
    }

    #[tokio::test]
    async fn test_verify_without_issue() {
        let app = app();
        let (status, body) = verify(&app, "fresh@example.com", "123456").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "OTP not found or expired");
    }

    #[tokio::test]
    async fn test_wrong_code_then_right_code() {
        let app = app();
        issue(&app, "alice@example.com", "email").await;
        let code = app.email.last_code();
        let wrong = if code == "999999" { "100000" } else { "999999" };

        let (status, body) = verify(&app, "alice@example.com", wrong).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid OTP");

        let (status, _) = verify(&app, "alice@example.com", &code).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_expired_then_not_found() {
        let app = app();
        issue(&app, PHONE, "sms").await;
        let code = app.sms.last_code();

        app.clock.advance(Duration::seconds(601));

        let (status, body) = verify(&app, PHONE, &code).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "OTP has expired");

        let (_, body) = verify(&app, PHONE, &code).await;
        assert_eq!(body["error"], "OTP not found or expired");
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let app = app();

        let req = post_json("/api/request-otp", json!({ "contact": PHONE }), "10.0.0.1:4000");
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Contact and method are required");

        let req = post_json(
            "/api/verify-otp",
            json!({ "contact": "", "otp": "123456" }),
            "10.0.0.1:4000",
        );
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Contact and OTP are required");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = app();
        let mut req = Request::post("/api/verify-otp")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("10.0.0.1:4000".parse::<SocketAddr>().unwrap()));

        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Contact and OTP are required");
    }

    #[tokio::test]
    async fn test_numeric_otp_is_checked_not_missing() {
        let app = app();
        issue(&app, PHONE, "sms").await;
        let code: u32 = app.sms.last_code().parse().unwrap();

        let wrong = if code == 999_999 { 100_000 } else { code + 1 };
        let req = post_json(
            "/api/verify-otp",
            json!({ "contact": PHONE, "otp": wrong }),
            "10.0.0.1:4000",
        );
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid OTP");

        let req = post_json(
            "/api/verify-otp",
            json!({ "contact": PHONE, "otp": code }),
            "10.0.0.1:4000",
        );
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_non_string_method_is_invalid_method() {
        let app = app();
        let req = post_json(
            "/api/request-otp",
            json!({ "contact": PHONE, "method": 7 }),
            "10.0.0.1:4000",
        );
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid method. Use sms or email");
    }

    #[tokio::test]
    async fn test_invalid_method() {
        let app = app();
        let (status, body) = issue(&app, PHONE, "fax").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid method. Use sms or email");

        let (_, body) = verify(&app, PHONE, "123456").await;
        assert_eq!(body["error"], "OTP not found or expired");
    }

    #[tokio::test]
    async fn test_gateway_failure_is_500() {
        let app = app_with(
            AppConfig::default(),
            RecordingGateway::failing(),
            RecordingGateway::default(),
        );

        let (status, body) = issue(&app, PHONE, "sms").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to send OTP");

        // Challenge survives the failed dispatch
        let code = app.sms.last_code();
        let (status, _) = verify(&app, PHONE, &code).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rate_limit_per_caller() {
        let app = app();

        for i in 0..5 {
            let contact = format!("user{i}@example.com");
            let req = post_json(
                "/api/request-otp",
                json!({ "contact": contact, "method": "email" }),
                "10.0.0.1:4000",
            );
            let response = app.router.clone().oneshot(req).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                response.headers()["x-ratelimit-remaining"],
                (4 - i).to_string().as_str()
            );
        }

        // Sixth request from the same caller is blocked whatever it targets
        let req = post_json(
            "/api/request-otp",
            json!({ "contact": PHONE, "method": "sms" }),
            "10.0.0.1:5000",
        );
        let response = app.router.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Too many OTP requests, please try again later");
        assert!(app.sms.sent().is_empty());

        // Another caller is unaffected
        let req = post_json(
            "/api/request-otp",
            json!({ "contact": PHONE, "method": "sms" }),
            "10.0.0.2:4000",
        );
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);

        // Verification is never limited
        let (status, _) = verify(&app, "user0@example.com", "000000").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        app.clock.advance(Duration::minutes(15));
        let (status, _) = issue(&app, PHONE, "sms").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rate_limit_uses_forwarded_for_when_trusted() {
        let mut config = AppConfig::default();
        config.rate_limit.trust_forwarded_for = true;
        config.rate_limit.max_requests = 1;
        let app = app_with(config, RecordingGateway::default(), RecordingGateway::default());

        let forwarded = |client: &str| {
            let mut req = post_json(
                "/api/request-otp",
                json!({ "contact": PHONE, "method": "sms" }),
                "127.0.0.1:4000",
            );
            req.headers_mut()
                .insert("x-forwarded-for", client.parse().unwrap());
            req
        };

        assert_eq!(send(&app, forwarded("203.0.113.1")).await.0, StatusCode::OK);
        assert_eq!(
            send(&app, forwarded("203.0.113.1")).await.0,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(send(&app, forwarded("203.0.113.2")).await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_reissue_supersedes_first_code() {
        let app = app();
        issue(&app, PHONE, "sms").await;
        let first = app.sms.last_code();
        issue(&app, PHONE, "sms").await;
        let second = app.sms.last_code();

        if first != second {
            let (_, body) = verify(&app, PHONE, &first).await;
            assert_eq!(body["error"], "Invalid OTP");
        }
        let (status, _) = verify(&app, PHONE, &second).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health() {
        let app = app();
        issue(&app, PHONE, "sms").await;

        let req = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["pending_challenges"], 1);
        assert_eq!(body["tracked_callers"], 1);
    }
}
