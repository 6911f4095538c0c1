use anyhow::Context;
use reqwest::multipart::Form;
use serde::Deserialize;
use serde_json::json;

use crate::api::error::ApiError;
use crate::api::models::Video;
use crate::device::DeviceClass;

/// Base used when no explicit API base is configured, matching the dev
/// topology where the backend listens on the same host.
pub const DEFAULT_DEV_BASE: &str = "http://localhost:5000";

/// Resolve the effective API base from an environment/config supplied value.
///
/// The hosted frontend uses relative URLs for local and same-origin setups; a
/// native process has no origin to be relative to, so unset and
/// localhost-style values all land on the local dev server.
pub fn resolve_base_url(configured: Option<&str>) -> String {
    match configured.map(str::trim) {
        None | Some("") => DEFAULT_DEV_BASE.to_string(),
        Some(base) => base.trim_end_matches('/').to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct ServerMessage {
    message: String,
}

/// Typed contract layer over the StreamFlex HTTP API.
///
/// One method per remote operation, no retry or backoff anywhere: failures
/// are surfaced as [`ApiError`] and policy lives with the caller.
#[derive(Debug, Clone)]
pub struct SyncClient {
    http: reqwest::Client,
    base_url: String,
}

impl SyncClient {
    pub fn new(configured_base: Option<&str>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("build reqwest client")?;
        Ok(Self {
            http,
            base_url: resolve_base_url(configured_base),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        debug_assert!(path.starts_with('/'));
        format!("{}{}", self.base_url, path)
    }

    /// GET /api/videos — the server's current list, newest first.
    pub async fn list_videos(&self) -> Result<Vec<Video>, ApiError> {
        let resp = self.http.get(self.url("/api/videos")).send().await?;
        Self::expect_json(resp).await
    }

    /// POST /api/videos — multipart create; the form is assembled by the
    /// upload flow so this layer stays free of file handling.
    pub async fn create_video(&self, form: Form) -> Result<Video, ApiError> {
        let resp = self
            .http
            .post(self.url("/api/videos"))
            .multipart(form)
            .send()
            .await?;
        Self::expect_json(resp).await
    }

    /// POST /api/videos/{id}/view — attribute one view to a device bucket.
    pub async fn record_view(&self, id: &str, device: DeviceClass) -> Result<Video, ApiError> {
        let resp = self
            .http
            .post(self.url(&format!("/api/videos/{id}/view")))
            .json(&json!({ "device": device }))
            .send()
            .await?;
        Self::expect_json(resp).await
    }

    /// POST /api/videos/{id}/duration — persist a measured duration (seconds).
    pub async fn update_duration(&self, id: &str, seconds: u64) -> Result<Video, ApiError> {
        let resp = self
            .http
            .post(self.url(&format!("/api/videos/{id}/duration")))
            .json(&json!({ "duration": seconds }))
            .send()
            .await?;
        Self::expect_json(resp).await
    }

    /// POST /api/videos/{id}/like
    pub async fn record_like(&self, id: &str) -> Result<Video, ApiError> {
        let resp = self
            .http
            .post(self.url(&format!("/api/videos/{id}/like")))
            .send()
            .await?;
        Self::expect_json(resp).await
    }

    /// DELETE /api/videos/{id}
    pub async fn delete_video(&self, id: &str) -> Result<(), ApiError> {
        let resp = self
            .http
            .delete(self.url(&format!("/api/videos/{id}")))
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Self::read_error(resp).await)
        }
    }

    async fn expect_json<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, ApiError> {
        if resp.status().is_success() {
            Ok(resp.json::<T>().await?)
        } else {
            Err(Self::read_error(resp).await)
        }
    }

    async fn read_error(resp: reqwest::Response) -> ApiError {
        let status = resp.status();
        let message = match resp.json::<ServerMessage>().await {
            Ok(m) => m.message,
            Err(_) => format!("request failed with status {status}"),
        };
        ApiError::Server { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_base_url_defaults_to_dev() {
        assert_eq!(resolve_base_url(None), DEFAULT_DEV_BASE);
        assert_eq!(resolve_base_url(Some("")), DEFAULT_DEV_BASE);
        assert_eq!(resolve_base_url(Some("  ")), DEFAULT_DEV_BASE);
    }

    #[test]
    fn test_resolve_base_url_strips_trailing_slash() {
        assert_eq!(
            resolve_base_url(Some("https://api.example.com/")),
            "https://api.example.com"
        );
    }

    mod wire {
        use super::*;
        use wiremock::matchers::{body_json, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn video_json(id: &str, views: u64, likes: u64) -> serde_json::Value {
            json!({
                "_id": id,
                "title": "Mountain Expedition 4K",
                "description": "Alps.",
                "originalUrl": "https://cdn.example.com/v.mp4",
                "thumbnailUrl": "https://cdn.example.com/t.jpg",
                "uploadedBy": "Admin",
                "createdAt": "2024-01-10T12:00:00.000Z",
                "duration": 596,
                "likes": likes,
                "analytics": {
                    "views": views,
                    "devices": { "desktop": views, "tablet": 0, "mobile": 0 }
                },
                "cloudinaryPublicId": "streamflex/videos/v"
            })
        }

        #[tokio::test]
        async fn test_list_videos_parses_server_list() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/videos"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                    video_json("65a1", 1205, 3),
                    video_json("65a2", 7, 0),
                ])))
                .mount(&server)
                .await;

            let client = SyncClient::new(Some(&server.uri())).unwrap();
            let videos = client.list_videos().await.unwrap();
            assert_eq!(videos.len(), 2);
            assert_eq!(videos[0].id, "65a1");
            assert_eq!(videos[0].analytics.views, 1205);
        }

        #[tokio::test]
        async fn test_record_view_sends_device_class() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/videos/65a1/view"))
                .and(body_json(json!({ "device": "mobile" })))
                .respond_with(ResponseTemplate::new(200).set_body_json(video_json("65a1", 1206, 3)))
                .expect(1)
                .mount(&server)
                .await;

            let client = SyncClient::new(Some(&server.uri())).unwrap();
            let video = client
                .record_view("65a1", DeviceClass::Mobile)
                .await
                .unwrap();
            assert_eq!(video.analytics.views, 1206);
        }

        #[tokio::test]
        async fn test_update_duration_sends_seconds() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/videos/65a1/duration"))
                .and(body_json(json!({ "duration": 305 })))
                .respond_with(ResponseTemplate::new(200).set_body_json(video_json("65a1", 1205, 3)))
                .expect(1)
                .mount(&server)
                .await;

            let client = SyncClient::new(Some(&server.uri())).unwrap();
            client.update_duration("65a1", 305).await.unwrap();
        }

        #[tokio::test]
        async fn test_server_message_carried_in_error() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/videos/65a1/like"))
                .respond_with(
                    ResponseTemplate::new(500)
                        .set_body_json(json!({ "message": "Database unavailable" })),
                )
                .mount(&server)
                .await;

            let client = SyncClient::new(Some(&server.uri())).unwrap();
            let err = client.record_like("65a1").await.unwrap_err();
            match err {
                ApiError::Server { status, message } => {
                    assert_eq!(status.as_u16(), 500);
                    assert_eq!(message, "Database unavailable");
                }
                other => panic!("expected server error, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_missing_video_is_not_found() {
            let server = MockServer::start().await;
            Mock::given(method("DELETE"))
                .and(path("/api/videos/gone"))
                .respond_with(
                    ResponseTemplate::new(404).set_body_json(json!({ "message": "Video not found" })),
                )
                .mount(&server)
                .await;

            let client = SyncClient::new(Some(&server.uri())).unwrap();
            let err = client.delete_video("gone").await.unwrap_err();
            assert!(err.is_not_found());
        }

        #[tokio::test]
        async fn test_delete_succeeds_on_2xx() {
            let server = MockServer::start().await;
            Mock::given(method("DELETE"))
                .and(path("/api/videos/65a1"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!({ "message": "Video deleted successfully" })),
                )
                .expect(1)
                .mount(&server)
                .await;

            let client = SyncClient::new(Some(&server.uri())).unwrap();
            client.delete_video("65a1").await.unwrap();
        }
    }
}
