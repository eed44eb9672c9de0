//! Completion waiting with optional progress reporting.
//!
//! The `wait` call is authoritative. A status poller may run next to it to
//! feed a progress display; its errors are logged and dropped, and it is
//! dropped as soon as `wait` resolves or the caller's future is dropped.

use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::family::{JobFamily, JobSnapshot};
use crate::api::{ApiClient, ApiError};

/// Shortest poll period; smaller values, zero included, are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Wait for `job_id` while polling its status every `every` for progress.
///
/// The poller stops on its own once it observes a terminal status; the
/// function still returns whatever `wait` returns.
pub async fn wait_with_progress<F, P>(
    client: &ApiClient,
    job_id: &str,
    every: Duration,
    mut on_progress: P,
) -> Result<F::Response, ApiError>
where
    F: JobFamily,
    P: FnMut(&F::Response),
{
    let wait = client.wait_job::<F>(job_id);
    tokio::pin!(wait);

    let poller = poll_status::<F, _>(client, job_id, every, &mut on_progress);

    tokio::select! {
        biased;
        result = &mut wait => return result,
        () = poller => debug!(family = F::NAME, job_id, "progress poller finished"),
    }

    wait.await
}

async fn poll_status<F, P>(client: &ApiClient, job_id: &str, every: Duration, on_progress: &mut P)
where
    F: JobFamily,
    P: FnMut(&F::Response),
{
    let every = every.max(MIN_POLL_INTERVAL);
    let mut ticker = time::interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match client.job_status::<F>(job_id).await {
            Ok(snapshot) => {
                let terminal = snapshot.status().is_terminal();
                on_progress(&snapshot);
                if terminal {
                    return;
                }
            }
            Err(e) => warn!(family = F::NAME, job_id, error = %e, "progress poll failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::family::VideoGeneration;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_wait(server: &MockServer, delay_ms: u64, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/api/generate-video/wait/V1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(body)
                    .set_delay(Duration::from_millis(delay_ms)),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn reports_progress_until_wait_resolves() {
        let server = MockServer::start().await;
        mount_wait(
            &server,
            300,
            json!({"id": "V1", "status": "succeeded", "video_url": "v.mp4"}),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/api/generate-video/status/V1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "V1", "status": "processing", "progress": 50
            })))
            .mount(&server)
            .await;

        let client = ApiClient::with_base_url(server.uri()).unwrap();
        let mut seen = Vec::new();
        let result = wait_with_progress::<VideoGeneration, _>(
            &client,
            "V1",
            Duration::from_millis(50),
            |snap| seen.push(snap.progress),
        )
        .await
        .unwrap();

        assert_eq!(result.video_url.as_deref(), Some("v.mp4"));
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|p| *p == Some(50.0)));
    }

    #[tokio::test]
    async fn poll_errors_are_swallowed() {
        let server = MockServer::start().await;
        mount_wait(
            &server,
            200,
            json!({"id": "V1", "status": "failed", "error": "motion model crashed"}),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/api/generate-video/status/V1"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let client = ApiClient::with_base_url(server.uri()).unwrap();
        let mut calls = 0;
        let result = wait_with_progress::<VideoGeneration, _>(
            &client,
            "V1",
            Duration::from_millis(40),
            |_| calls += 1,
        )
        .await
        .unwrap();

        assert_eq!(result.status.as_str(), "failed");
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn poller_stops_after_terminal_status() {
        let server = MockServer::start().await;
        mount_wait(
            &server,
            400,
            json!({"id": "V1", "status": "succeeded", "video_url": "v.mp4"}),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/api/generate-video/status/V1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "V1", "status": "succeeded", "video_url": "v.mp4", "progress": 100
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::with_base_url(server.uri()).unwrap();
        let result = wait_with_progress::<VideoGeneration, _>(
            &client,
            "V1",
            Duration::from_millis(20),
            |_| {},
        )
        .await
        .unwrap();
        assert_eq!(result.video_url.as_deref(), Some("v.mp4"));
    }

    #[tokio::test]
    async fn zero_interval_is_raised_to_minimum() {
        let server = MockServer::start().await;
        mount_wait(
            &server,
            50,
            json!({"id": "V1", "status": "succeeded", "video_url": "v.mp4"}),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/api/generate-video/status/V1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "V1", "status": "processing", "progress": 10
            })))
            .mount(&server)
            .await;

        let client = ApiClient::with_base_url(server.uri()).unwrap();
        let result = wait_with_progress::<VideoGeneration, _>(&client, "V1", Duration::ZERO, |_| {})
            .await
            .unwrap();
        assert_eq!(result.video_url.as_deref(), Some("v.mp4"));
    }

    #[tokio::test]
    async fn wait_failure_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/generate-video/wait/V1"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "boom"})))
            .mount(&server)
            .await;

        let client = ApiClient::with_base_url(server.uri()).unwrap();
        let err = wait_with_progress::<VideoGeneration, _>(
            &client,
            "V1",
            Duration::from_secs(2),
            |_| {},
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
