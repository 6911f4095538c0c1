use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::StreamExt;
use reqwest::Body;
use reqwest::multipart::{Form, Part};
use tokio::sync::watch;
use tokio_util::io::ReaderStream;

use crate::api::error::ApiError;
use crate::api::models::Video;
use crate::api::SyncClient;

pub const MAX_UPLOAD_MB: u64 = 200;
pub const MAX_UPLOAD_BYTES: u64 = MAX_UPLOAD_MB * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Please select a video file to upload.")]
    MissingVideo,

    #[error("Video is too large. Maximum allowed size is {MAX_UPLOAD_MB}MB.")]
    TooLarge,

    #[error("could not read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Upload reached the network and failed; carries the server's message
    /// when one was sent, otherwise generic wording.
    #[error("{0}")]
    Failed(String),
}

impl From<ApiError> for UploadError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Transport(_) => UploadError::Failed("Network error during upload".into()),
            ApiError::Server { message, .. } => UploadError::Failed(message),
        }
    }
}

/// What the upload form submits.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub video_path: PathBuf,
    pub thumbnail_path: Option<PathBuf>,
    pub title: String,
    pub description: String,
    pub uploader: String,
}

/// Validates and transmits a new video with progress reporting.
///
/// Validation happens before any network traffic; once the request is in
/// flight there is no cancellation path and no automatic retry. Progress is
/// published over a watch channel as an integer percentage of bytes sent.
pub struct UploadController {
    client: SyncClient,
    progress: watch::Sender<Option<u8>>,
}

impl UploadController {
    pub fn new(client: SyncClient) -> Self {
        let (progress, _) = watch::channel(None);
        Self { client, progress }
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<Option<u8>> {
        self.progress.subscribe()
    }

    /// Run the whole flow: validate, transmit, parse the created record.
    /// The caller prepends the returned `Video` to the store.
    pub async fn upload(&self, req: &UploadRequest) -> Result<Video, UploadError> {
        let video_len = video_len(&req.video_path).await?;
        if video_len > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge);
        }
        let thumb_len = match &req.thumbnail_path {
            Some(p) => Some(thumbnail_len(p).await?),
            None => None,
        };

        let total = video_len + thumb_len.unwrap_or(0);
        let sent = Arc::new(AtomicU64::new(0));
        self.progress.send_replace(Some(0));

        let result = self.transmit(req, video_len, thumb_len, total, &sent).await;

        // Progress resets to "not uploading" on completion or failure alike.
        self.progress.send_replace(None);
        result
    }

    async fn transmit(
        &self,
        req: &UploadRequest,
        video_len: u64,
        thumb_len: Option<u64>,
        total: u64,
        sent: &Arc<AtomicU64>,
    ) -> Result<Video, UploadError> {
        let video_part = self
            .counted_part(&req.video_path, video_len, total, sent)
            .await?;

        let mut form = Form::new()
            .part("video", video_part)
            .text("title", req.title.clone())
            .text("description", req.description.clone())
            .text("uploader", req.uploader.clone());

        if let (Some(path), Some(len)) = (&req.thumbnail_path, thumb_len) {
            let thumb_part = self.counted_part(path, len, total, sent).await?;
            form = form.part("thumbnail", thumb_part);
        }

        Ok(self.client.create_video(form).await?)
    }

    /// A multipart file part whose stream counts bytes into the shared total
    /// and republishes the integer percentage whenever it changes.
    async fn counted_part(
        &self,
        path: &Path,
        len: u64,
        total: u64,
        sent: &Arc<AtomicU64>,
    ) -> Result<Part, UploadError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|source| UploadError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;

        let sent = Arc::clone(sent);
        let progress = self.progress.clone();
        let stream = ReaderStream::new(file).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                let so_far = sent.fetch_add(bytes.len() as u64, Ordering::Relaxed)
                    + bytes.len() as u64;
                let pct = percent(so_far, total);
                progress.send_if_modified(|cur| {
                    if *cur == Some(pct) {
                        false
                    } else {
                        *cur = Some(pct);
                        true
                    }
                });
            }
            chunk
        });

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());

        let part = Part::stream_with_length(Body::wrap_stream(stream), len)
            .file_name(name)
            .mime_str(guess_mime(path))
            .map_err(|e| UploadError::Failed(format!("invalid upload part: {e}")))?;
        Ok(part)
    }
}

/// A missing or non-regular video path means nothing was selected.
async fn video_len(path: &Path) -> Result<u64, UploadError> {
    match tokio::fs::metadata(path).await {
        Ok(m) if m.is_file() => Ok(m.len()),
        Ok(_) => Err(UploadError::MissingVideo),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(UploadError::MissingVideo),
        Err(source) => Err(UploadError::Unreadable {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// The thumbnail is optional, so a bad path here is a read problem with that
/// path, never "no video selected".
async fn thumbnail_len(path: &Path) -> Result<u64, UploadError> {
    match tokio::fs::metadata(path).await {
        Ok(m) if m.is_file() => Ok(m.len()),
        Ok(_) => Err(UploadError::Unreadable {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        }),
        Err(source) => Err(UploadError::Unreadable {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (sent as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

fn guess_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_ceiling_names_the_limit() {
        let err = UploadError::TooLarge;
        let msg = err.to_string();
        assert!(msg.contains("200MB"), "message was: {msg}");
    }

    #[test]
    fn test_percent_is_rounded_integer() {
        assert_eq!(percent(0, 1000), 0);
        assert_eq!(percent(333, 1000), 33);
        assert_eq!(percent(335, 1000), 34);
        assert_eq!(percent(1000, 1000), 100);
        // Degenerate empty upload counts as done.
        assert_eq!(percent(0, 0), 100);
    }

    #[test]
    fn test_server_message_is_surfaced() {
        let api = ApiError::Server {
            status: reqwest::StatusCode::BAD_REQUEST,
            message: "Title and description are required".into(),
        };
        let err: UploadError = api.into();
        assert_eq!(err.to_string(), "Title and description are required");
    }

    #[tokio::test]
    async fn test_missing_video_rejected_before_any_request() {
        // Client points at a closed port; if validation ever let the request
        // through we would see a transport error instead.
        let client = SyncClient::new(Some("http://127.0.0.1:9")).unwrap();
        let controller = UploadController::new(client);

        let path = std::env::temp_dir().join("streamflex-test-missing.mp4");
        let _ = std::fs::remove_file(&path);
        let req = UploadRequest {
            video_path: path,
            thumbnail_path: None,
            title: "t".into(),
            description: "d".into(),
            uploader: "u".into(),
        };

        let err = controller.upload(&req).await.unwrap_err();
        assert!(matches!(err, UploadError::MissingVideo));
        assert_eq!(*controller.subscribe_progress().borrow(), None);
    }

    #[tokio::test]
    async fn test_250mb_file_rejected_locally() {
        let client = SyncClient::new(Some("http://127.0.0.1:9")).unwrap();
        let controller = UploadController::new(client);

        // Sparse file: 250 MB of reported length without the disk cost.
        let path = std::env::temp_dir().join("streamflex-test-huge.mp4");
        let f = std::fs::File::create(&path).unwrap();
        f.set_len(250 * 1024 * 1024).unwrap();

        let req = UploadRequest {
            video_path: path.clone(),
            thumbnail_path: None,
            title: "t".into(),
            description: "d".into(),
            uploader: "u".into(),
        };

        let err = controller.upload(&req).await.unwrap_err();
        assert!(matches!(err, UploadError::TooLarge));
        assert!(err.to_string().contains("200MB"));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_missing_thumbnail_not_reported_as_missing_video() {
        let client = SyncClient::new(Some("http://127.0.0.1:9")).unwrap();
        let controller = UploadController::new(client);

        let video_path = std::env::temp_dir().join("streamflex-test-has-video.mp4");
        std::fs::write(&video_path, b"clip").unwrap();
        let thumb_path = std::env::temp_dir().join("streamflex-test-no-thumb.jpg");
        let _ = std::fs::remove_file(&thumb_path);

        let req = UploadRequest {
            video_path: video_path.clone(),
            thumbnail_path: Some(thumb_path),
            title: "t".into(),
            description: "d".into(),
            uploader: "u".into(),
        };

        let err = controller.upload(&req).await.unwrap_err();
        assert!(matches!(err, UploadError::Unreadable { .. }), "got: {err}");
        assert!(err.to_string().contains("streamflex-test-no-thumb.jpg"));

        let _ = std::fs::remove_file(&video_path);
    }

    #[tokio::test]
    async fn test_upload_transmits_multipart_fields() {
        use wiremock::matchers::{body_string_contains, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/videos"))
            .and(body_string_contains("name=\"video\""))
            .and(body_string_contains("name=\"thumbnail\""))
            .and(body_string_contains("name=\"title\""))
            .and(body_string_contains("name=\"description\""))
            .and(body_string_contains("name=\"uploader\""))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "_id": "new1",
                "title": "Clip",
                "description": "d",
                "originalUrl": "https://cdn.example.com/new.mp4",
                "thumbnailUrl": "https://cdn.example.com/new.jpg",
                "uploadedBy": "User",
                "createdAt": "2024-02-01T00:00:00Z",
                "cloudinaryPublicId": "streamflex/videos/new"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let video_path = std::env::temp_dir().join("streamflex-test-clip.mp4");
        let thumb_path = std::env::temp_dir().join("streamflex-test-clip.jpg");
        std::fs::write(&video_path, b"tiny video bytes").unwrap();
        std::fs::write(&thumb_path, b"tiny jpeg bytes").unwrap();

        let client = SyncClient::new(Some(&server.uri())).unwrap();
        let controller = UploadController::new(client);
        let req = UploadRequest {
            video_path: video_path.clone(),
            thumbnail_path: Some(thumb_path.clone()),
            title: "Clip".into(),
            description: "d".into(),
            uploader: "User".into(),
        };

        let video = controller.upload(&req).await.unwrap();
        assert_eq!(video.id, "new1");
        assert_eq!(video.asset_id.as_deref(), Some("streamflex/videos/new"));
        // Back to "not uploading" once the flow completes.
        assert_eq!(*controller.subscribe_progress().borrow(), None);

        // The created record lands ahead of existing ones.
        let mut older = video.clone();
        older.id = "old1".to_string();
        let mut store = crate::store::VideoStore::new();
        store.replace_all(vec![older]);
        store.add(video);
        assert_eq!(store.videos()[0].id, "new1");

        let _ = std::fs::remove_file(&video_path);
        let _ = std::fs::remove_file(&thumb_path);
    }
}
