//! Shared harness: the full router over in-memory stores and a fixed clock.

use anyhow::Context;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use ppdb_server::{
    api::create_router,
    config::{Config, StorageBackend},
    db::{BatchStore, Stores},
    models::{Batch, NewBatch},
    services::FixedClock,
    state::AppState,
};
use serde::Serialize;
use serde_json::Value;
use std::{future::Future, pin::Pin, sync::Arc};
use tower::ServiceExt;

pub type TestFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>>>>;

pub struct TestApp {
    pub state: AppState,
    pub stores: Stores,
    router: Router,
}

impl TestApp {
    pub fn new(config: Config, now: DateTime<Utc>) -> Self {
        let stores = Stores::memory();
        let state = AppState::with_stores(config, stores.clone(), Arc::new(FixedClock(now)));
        let router = create_router(state.clone());
        Self {
            state,
            stores,
            router,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Vec<u8>>,
    ) -> anyhow::Result<(StatusCode, HeaderMap, Vec<u8>)> {
        self.request_with_extra_headers(method, uri, body, &[]).await
    }

    pub async fn request_with_extra_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Vec<u8>>,
        extra_headers: &[(&str, &str)],
    ) -> anyhow::Result<(StatusCode, HeaderMap, Vec<u8>)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        for (name, value) in extra_headers {
            builder = builder.header(*name, *value);
        }
        let request = builder
            .body(body.map(Body::from).unwrap_or_else(Body::empty))
            .context("build request")?;

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .context("router call")?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .context("read body")?;
        Ok((status, headers, bytes.to_vec()))
    }

    /// Insert a batch directly through the store.
    pub async fn seed_batch(
        &self,
        year: i32,
        is_active: bool,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> anyhow::Result<Batch> {
        let batch = self
            .stores
            .batches
            .create(&NewBatch {
                name: format!("Gelombang {year}"),
                year: Some(year),
                is_active,
                start_date: window.map(|(start, _)| start),
                end_date: window.map(|(_, end)| end),
            })
            .await?;
        Ok(batch)
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.storage.backend = StorageBackend::Memory;
    config.database.run_migrations = false;
    config
}

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .expect("valid date")
}

/// 2024-06-01 through 2024-06-30.
pub fn june_window() -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    Some((at(2024, 6, 1), at(2024, 6, 30)))
}

/// Mid-June 2024, inside [`june_window`].
pub fn default_now() -> DateTime<Utc> {
    at(2024, 6, 15)
}

pub async fn with_test_app<F>(f: F) -> anyhow::Result<()>
where
    F: FnOnce(TestApp) -> TestFuture,
{
    with_test_app_with_config(|_| {}, f).await
}

pub async fn with_test_app_with_config<C, F>(configure: C, f: F) -> anyhow::Result<()>
where
    C: FnOnce(&mut Config),
    F: FnOnce(TestApp) -> TestFuture,
{
    with_test_app_at(default_now(), configure, f).await
}

pub async fn with_test_app_at<C, F>(now: DateTime<Utc>, configure: C, f: F) -> anyhow::Result<()>
where
    C: FnOnce(&mut Config),
    F: FnOnce(TestApp) -> TestFuture,
{
    let mut config = test_config();
    configure(&mut config);
    f(TestApp::new(config, now)).await
}

pub fn assert_status(actual: StatusCode, expected: StatusCode, context: &str) {
    assert_eq!(actual, expected, "unexpected status for {context}");
}

pub fn to_json_body<T: Serialize>(value: &T) -> anyhow::Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

pub fn parse_json(body: &[u8]) -> anyhow::Result<Value> {
    serde_json::from_slice(body).with_context(|| {
        format!("response body is not JSON: {}", String::from_utf8_lossy(body))
    })
}

/// A minimal valid admissions payload.
pub fn applicant(name: &str, nisn: Option<&str>) -> Value {
    let mut body = serde_json::json!({
        "full_name": name,
        "gender": "FEMALE",
        "asal_sekolah": "SDN 1 Sukamaju",
    });
    if let Some(nisn) = nisn {
        body["nisn"] = Value::String(nisn.to_string());
    }
    body
}
