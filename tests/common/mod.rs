#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use rowgate::config::AppConfig;
use rowgate::middleware::Claims;
use rowgate::server::{app, build_store, AppState};
use rowgate::testing::MockExecutor;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-secret";

pub struct TestApp {
    pub mock: Arc<MockExecutor>,
    pub state: AppState,
    pub router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.jwt_secret = JWT_SECRET.to_string();
    config.api.enable_request_logging = false;
    config
}

pub fn test_app() -> TestApp {
    test_app_with(test_config())
}

pub fn test_app_with(config: AppConfig) -> TestApp {
    test_app_with_executor(config, MockExecutor::new())
}

pub fn test_app_with_executor(config: AppConfig, mock: MockExecutor) -> TestApp {
    let mock = Arc::new(mock);
    let store = build_store(mock.clone(), &config);
    let state = AppState::new(store, Arc::new(config));
    let router = app(state.clone());
    TestApp { mock, state, router }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(TestResponse {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec())?,
        })
    }

    pub async fn get(&self, uri: &str) -> Result<TestResponse> {
        self.send(request(Method::GET, uri, None, Body::empty())?).await
    }

    pub async fn get_as(&self, uri: &str, token: &str) -> Result<TestResponse> {
        self.send(request(Method::GET, uri, Some(token), Body::empty())?).await
    }

    pub async fn send_json(&self, method: Method, uri: &str, body: &str) -> Result<TestResponse> {
        self.send(request(method, uri, None, Body::from(body.to_string()))?).await
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Body) -> Result<Request<Body>> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    Ok(builder.header(header::CONTENT_TYPE, "application/json").body(body)?)
}

pub fn token(user_id: &str, role: Option<&str>) -> String {
    let claims = Claims {
        user_id: user_id.to_string(),
        role: role.map(str::to_string),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes()))
        .unwrap_or_default()
}
