// src/api/client.rs
// =============================================================================
// Thin typed wrapper over the YouTube Data API v3.
//
// Three remote verbs, nothing else:
// - playlistItems.list: One page of the channel's uploads (ids + titles)
// - videos.list:        Full details for up to 50 ids in ONE call
// - videos.update:      Write a new description (the API requires the whole
//                       snippet on update, so title/tags/category ride along
//                       unchanged)
//
// The VideoApi trait is the seam between the engine and the network: tests
// implement it with scripted in-memory fakes, production uses YouTubeClient.
//
// Authentication is opaque to this module. It receives a ready-to-use bearer
// token and never acquires, inspects, or refreshes credentials.
//
// Rust concepts:
// - Traits with async fn: Mockable interface over async I/O
// - serde rename_all = "camelCase": The wire JSON uses camelCase field names
// =============================================================================

use std::collections::HashMap;
use std::fmt;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::error::EditorError;

/// The remote caps videos.list at 50 ids per call. The scanner chunks
/// batched detail fetches to this size.
pub const DETAIL_BATCH_SIZE: usize = 50;

const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// A video as seen during enumeration: identity plus display title.
/// Cheap to list; details are fetched separately in batches.
#[derive(Debug, Clone, Serialize)]
pub struct VideoRef {
    pub id: String,
    pub title: String,
}

/// One page of the uploads listing.
#[derive(Debug, Clone)]
pub struct VideoPage {
    pub items: Vec<VideoRef>,
    pub next_page_token: Option<String>,
}

/// Who can see a video. `Unknown` covers responses missing the status part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    Public,
    Unlisted,
    Private,
    Unknown,
}

impl Privacy {
    fn from_api(value: Option<&str>) -> Self {
        match value {
            Some("public") => Privacy::Public,
            Some("unlisted") => Privacy::Unlisted,
            Some("private") => Privacy::Private,
            _ => Privacy::Unknown,
        }
    }
}

impl fmt::Display for Privacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Privacy::Public => "public",
            Privacy::Unlisted => "unlisted",
            Privacy::Private => "private",
            Privacy::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// The full mutable record for one video.
///
/// Always treated as a fresh snapshot: the orchestrator re-fetches right
/// before every write because the remote may reject stale updates, so this
/// is never cached across a mutation.
#[derive(Debug, Clone, Serialize)]
pub struct VideoDetail {
    pub id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub privacy: Privacy,
}

/// The three remote verbs the engine needs. Implemented by YouTubeClient in
/// production and by scripted fakes in tests.
#[allow(async_fn_in_trait)]
pub trait VideoApi {
    /// Fetches one page of the channel's uploads.
    async fn list_page(&self, page_token: Option<&str>) -> Result<VideoPage, EditorError>;

    /// Fetches details for up to DETAIL_BATCH_SIZE ids in one call. Ids the
    /// remote does not return (deleted, restricted) are simply absent from
    /// the map - callers skip them, they do not fail the batch.
    async fn fetch_details(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, VideoDetail>, EditorError>;

    /// Writes a new description for the video in `detail`, carrying the rest
    /// of the snippet through unchanged.
    async fn update_description(
        &self,
        detail: &VideoDetail,
        new_description: &str,
    ) -> Result<(), EditorError>;
}

// -----------------------------------------------------------------------------
// Wire format
// -----------------------------------------------------------------------------

#[derive(Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelItem {
    content_details: ChannelContentDetails,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    related_playlists: RelatedPlaylists,
}

#[derive(Deserialize)]
struct RelatedPlaylists {
    uploads: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct PlaylistItem {
    snippet: PlaylistItemSnippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemSnippet {
    title: String,
    resource_id: PlaylistResourceId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistResourceId {
    video_id: String,
}

#[derive(Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
struct VideoItem {
    id: String,
    snippet: VideoSnippet,
    status: Option<VideoStatusPart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    category_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatusPart {
    privacy_status: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateBody<'a> {
    id: &'a str,
    snippet: UpdateSnippet<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSnippet<'a> {
    title: &'a str,
    description: &'a str,
    tags: &'a [String],
    category_id: &'a str,
}

// -----------------------------------------------------------------------------
// Production client
// -----------------------------------------------------------------------------

/// reqwest-backed implementation of VideoApi against the Data API v3.
pub struct YouTubeClient {
    http: Client,
    token: String,
    api_base: String,
    // The uploads playlist id is looked up once (channels.list mine=true)
    // and reused for every subsequent page.
    uploads_playlist: OnceCell<String>,
}

impl YouTubeClient {
    pub fn new(token: String) -> Result<Self, EditorError> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| EditorError::RemoteUnavailable(e.to_string()))?;

        Ok(Self {
            http,
            token,
            api_base: DEFAULT_API_BASE.to_string(),
            uploads_playlist: OnceCell::new(),
        })
    }

    async fn uploads_playlist_id(&self) -> Result<&str, EditorError> {
        let id = self
            .uploads_playlist
            .get_or_try_init(|| async {
                let url = format!("{}/channels", self.api_base);
                let response = self
                    .http
                    .get(&url)
                    .bearer_auth(&self.token)
                    .query(&[("part", "contentDetails"), ("mine", "true")])
                    .send()
                    .await
                    .map_err(|e| EditorError::RemoteUnavailable(e.to_string()))?;

                let response = check_read_status(response).await?;
                let channels: ChannelListResponse = response
                    .json()
                    .await
                    .map_err(|e| EditorError::RemoteUnavailable(e.to_string()))?;

                channels
                    .items
                    .into_iter()
                    .next()
                    .map(|c| c.content_details.related_playlists.uploads)
                    .ok_or_else(|| {
                        EditorError::RemoteUnavailable(
                            "authenticated account has no channel".to_string(),
                        )
                    })
            })
            .await?;
        Ok(id)
    }
}

impl VideoApi for YouTubeClient {
    async fn list_page(&self, page_token: Option<&str>) -> Result<VideoPage, EditorError> {
        let playlist_id = self.uploads_playlist_id().await?.to_string();

        let url = format!("{}/playlistItems", self.api_base);
        let mut request = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[
                ("part", "snippet"),
                ("playlistId", playlist_id.as_str()),
                ("maxResults", "50"),
            ]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EditorError::RemoteUnavailable(e.to_string()))?;
        let response = check_read_status(response).await?;
        let page: PlaylistItemsResponse = response
            .json()
            .await
            .map_err(|e| EditorError::RemoteUnavailable(e.to_string()))?;

        Ok(VideoPage {
            items: page
                .items
                .into_iter()
                .map(|item| VideoRef {
                    id: item.snippet.resource_id.video_id,
                    title: item.snippet.title,
                })
                .collect(),
            next_page_token: page.next_page_token,
        })
    }

    async fn fetch_details(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, VideoDetail>, EditorError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!("{}/videos", self.api_base);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("part", "snippet,status"), ("id", ids.join(",").as_str())])
            .send()
            .await
            .map_err(|e| EditorError::RemoteUnavailable(e.to_string()))?;
        let response = check_read_status(response).await?;
        let list: VideoListResponse = response
            .json()
            .await
            .map_err(|e| EditorError::RemoteUnavailable(e.to_string()))?;

        let mut details = HashMap::new();
        for item in list.items {
            let privacy = Privacy::from_api(
                item.status
                    .as_ref()
                    .and_then(|s| s.privacy_status.as_deref()),
            );
            details.insert(
                item.id.clone(),
                VideoDetail {
                    id: item.id,
                    title: item.snippet.title,
                    description: item.snippet.description,
                    tags: item.snippet.tags,
                    category_id: item.snippet.category_id,
                    privacy,
                },
            );
        }
        Ok(details)
    }

    async fn update_description(
        &self,
        detail: &VideoDetail,
        new_description: &str,
    ) -> Result<(), EditorError> {
        let url = format!("{}/videos", self.api_base);
        let body = UpdateBody {
            id: &detail.id,
            snippet: UpdateSnippet {
                title: &detail.title,
                description: new_description,
                tags: &detail.tags,
                category_id: &detail.category_id,
            },
        };

        let response = self
            .http
            .put(&url)
            .bearer_auth(&self.token)
            .query(&[("part", "snippet")])
            .json(&body)
            .send()
            .await
            .map_err(|e| EditorError::RemoteUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let detail_text = read_error_body(response).await;
        Err(classify_write_error(status, detail_text))
    }
}

// Read-path errors are all "remote unavailable" from the caller's point of
// view: the scan aborts, nothing committed so far is affected.
async fn check_read_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, EditorError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(EditorError::RemoteUnavailable(format!(
            "HTTP {}: {}",
            status,
            read_error_body(response).await
        )))
    }
}

// Write rejections are classified separately because 401/403/429 trigger the
// orchestrator's rollback path rather than aborting the batch.
fn classify_write_error(status: StatusCode, body: String) -> EditorError {
    match status.as_u16() {
        401 | 403 | 429 => {
            EditorError::QuotaOrPermission(format!("HTTP {}: {}", status, body))
        }
        _ => EditorError::RemoteUnavailable(format!("HTTP {}: {}", status, body)),
    }
}

async fn read_error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_playlist_page() {
        let json = r#"{
            "nextPageToken": "CAUQAA",
            "items": [
                {"snippet": {"title": "First video", "resourceId": {"videoId": "abc123"}}},
                {"snippet": {"title": "Second video", "resourceId": {"videoId": "def456"}}}
            ]
        }"#;
        let page: PlaylistItemsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("CAUQAA"));
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].snippet.resource_id.video_id, "abc123");
    }

    #[test]
    fn test_deserialize_last_page_has_no_token() {
        let json = r#"{"items": []}"#;
        let page: PlaylistItemsResponse = serde_json::from_str(json).unwrap();
        assert!(page.next_page_token.is_none());
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_deserialize_video_details() {
        let json = r#"{
            "items": [{
                "id": "abc123",
                "snippet": {
                    "title": "A video",
                    "description": "hello https://example.com",
                    "tags": ["one", "two"],
                    "categoryId": "22"
                },
                "status": {"privacyStatus": "unlisted"}
            }]
        }"#;
        let list: VideoListResponse = serde_json::from_str(json).unwrap();
        let item = &list.items[0];
        assert_eq!(item.snippet.description, "hello https://example.com");
        assert_eq!(item.snippet.tags, vec!["one", "two"]);
        assert_eq!(
            Privacy::from_api(item.status.as_ref().unwrap().privacy_status.as_deref()),
            Privacy::Unlisted
        );
    }

    #[test]
    fn test_deserialize_video_with_missing_optionals() {
        // Videos with no tags and no status part still parse.
        let json = r#"{
            "items": [{"id": "x", "snippet": {"title": "t", "categoryId": "1"}}]
        }"#;
        let list: VideoListResponse = serde_json::from_str(json).unwrap();
        let item = &list.items[0];
        assert_eq!(item.snippet.description, "");
        assert!(item.snippet.tags.is_empty());
        assert_eq!(Privacy::from_api(None), Privacy::Unknown);
    }

    #[test]
    fn test_update_body_wire_shape() {
        let detail = VideoDetail {
            id: "abc".to_string(),
            title: "Title".to_string(),
            description: "old".to_string(),
            tags: vec!["t".to_string()],
            category_id: "22".to_string(),
            privacy: Privacy::Public,
        };
        let body = UpdateBody {
            id: &detail.id,
            snippet: UpdateSnippet {
                title: &detail.title,
                description: "new text",
                tags: &detail.tags,
                category_id: &detail.category_id,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["id"], "abc");
        assert_eq!(json["snippet"]["description"], "new text");
        // The API rejects snake_case field names.
        assert_eq!(json["snippet"]["categoryId"], "22");
        assert_eq!(json["snippet"]["title"], "Title");
    }

    #[test]
    fn test_classify_write_error() {
        let quota = classify_write_error(StatusCode::FORBIDDEN, "quotaExceeded".to_string());
        assert!(matches!(quota, EditorError::QuotaOrPermission(_)));

        let server = classify_write_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "backendError".to_string(),
        );
        assert!(matches!(server, EditorError::RemoteUnavailable(_)));
    }
}
