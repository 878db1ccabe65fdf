use anyhow::{Context, Result};
use serde::Deserialize;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Result of a catalog query. Transient — only the id is remembered (in
/// memory) to suppress duplicate announcements.
#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub video_id: String,
    pub title: String,
    pub url: String,
    pub description: String,
    pub upload_date: String,
    pub duration_secs: u64,
}

/// The catalog seam: "newest item in the collection".
#[async_trait::async_trait]
pub trait VideoCatalog: Send + Sync {
    async fn latest(&self) -> Result<VideoInfo>;
}

/// YouTube Data API v3 client.
#[derive(Clone)]
pub struct YoutubeClient {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl YoutubeClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }

    /// Newest entry of a playlist: first playlist item, then a second call
    /// for the full description and duration.
    pub async fn latest_in_playlist(&self, playlist_id: &str) -> Result<VideoInfo> {
        let api_key = self
            .api_key
            .as_deref()
            .context("[youtube] api_key is not configured")?;

        let response = self
            .client
            .get(format!("{API_BASE}/playlistItems"))
            .query(&[
                ("part", "snippet"),
                ("playlistId", playlist_id),
                ("maxResults", "1"),
                ("key", api_key),
            ])
            .send()
            .await
            .context("playlistItems request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("YouTube API error ({status}): {body}");
        }
        let playlist: PlaylistItemsResponse = response
            .json()
            .await
            .context("Failed to parse playlistItems response")?;
        let video_id = playlist
            .items
            .into_iter()
            .next()
            .with_context(|| format!("Playlist {playlist_id} is empty"))?
            .snippet
            .resource_id
            .video_id;

        self.video_info(&video_id, api_key).await
    }

    async fn video_info(&self, video_id: &str, api_key: &str) -> Result<VideoInfo> {
        let response = self
            .client
            .get(format!("{API_BASE}/videos"))
            .query(&[
                ("part", "snippet,contentDetails"),
                ("id", video_id),
                ("key", api_key),
            ])
            .send()
            .await
            .context("videos request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("YouTube API error ({status}): {body}");
        }
        let videos: VideosResponse = response
            .json()
            .await
            .context("Failed to parse videos response")?;
        let item = videos
            .items
            .into_iter()
            .next()
            .with_context(|| format!("Video {video_id} not found"))?;

        Ok(VideoInfo {
            url: format!("https://www.youtube.com/watch?v={}", item.id),
            video_id: item.id,
            title: item.snippet.title,
            description: item.snippet.description,
            upload_date: item.snippet.published_at,
            duration_secs: parse_iso8601_duration(&item.content_details.duration)
                .unwrap_or(0),
        })
    }
}

/// [`VideoCatalog`] bound to the configured playlist.
pub struct PlaylistCatalog {
    client: YoutubeClient,
    playlist_id: String,
}

impl PlaylistCatalog {
    pub fn new(client: YoutubeClient, playlist_id: String) -> Self {
        Self {
            client,
            playlist_id,
        }
    }
}

#[async_trait::async_trait]
impl VideoCatalog for PlaylistCatalog {
    async fn latest(&self) -> Result<VideoInfo> {
        self.client.latest_in_playlist(&self.playlist_id).await
    }
}

// --- Data API types ---

#[derive(Deserialize)]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Deserialize)]
struct PlaylistItem {
    snippet: PlaylistItemSnippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemSnippet {
    resource_id: ResourceId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: String,
}

#[derive(Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    snippet: VideoSnippet,
    content_details: ContentDetails,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    title: String,
    #[serde(default)]
    description: String,
    published_at: String,
}

#[derive(Deserialize)]
struct ContentDetails {
    duration: String,
}

/// Parse an ISO-8601 duration as YouTube emits them ("PT1H23M45S", "P1DT2H").
fn parse_iso8601_duration(s: &str) -> Option<u64> {
    let rest = s.strip_prefix('P')?;
    let mut total = 0u64;
    let mut digits = String::new();
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            'T' => digits.clear(),
            'D' | 'H' | 'M' | 'S' => {
                let value: u64 = digits.parse().ok()?;
                digits.clear();
                total += value
                    * match c {
                        'D' => 86_400,
                        'H' => 3_600,
                        'M' => 60,
                        _ => 1,
                    };
            }
            _ => return None,
        }
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_parsing() {
        assert_eq!(parse_iso8601_duration("PT1H23M45S"), Some(5025));
        assert_eq!(parse_iso8601_duration("PT58M2S"), Some(3482));
        assert_eq!(parse_iso8601_duration("PT45S"), Some(45));
        assert_eq!(parse_iso8601_duration("P1DT2H"), Some(93_600));
        assert_eq!(parse_iso8601_duration("PT0S"), Some(0));
    }

    #[test]
    fn test_duration_parsing_rejects_garbage() {
        assert_eq!(parse_iso8601_duration(""), None);
        assert_eq!(parse_iso8601_duration("1H"), None);
        assert_eq!(parse_iso8601_duration("PTXM"), None);
    }

    #[test]
    fn test_playlist_response_shape() {
        let raw = r#"{
            "items": [
                {"snippet": {"resourceId": {"videoId": "abc123"}}}
            ]
        }"#;
        let parsed: PlaylistItemsResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.items[0].snippet.resource_id.video_id, "abc123");
    }

    #[test]
    fn test_video_response_shape() {
        let raw = r#"{
            "items": [{
                "id": "abc123",
                "snippet": {
                    "title": "Builder Call #12",
                    "description": "Notes",
                    "publishedAt": "2026-08-28T11:00:00Z"
                },
                "contentDetails": {"duration": "PT1H2M"}
            }]
        }"#;
        let parsed: VideosResponse = serde_json::from_str(raw).unwrap();
        let item = &parsed.items[0];
        assert_eq!(item.snippet.title, "Builder Call #12");
        assert_eq!(parse_iso8601_duration(&item.content_details.duration), Some(3720));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_an_error() {
        let client = YoutubeClient::new(None);
        let err = client.latest_in_playlist("PL123").await.unwrap_err();
        assert!(err.to_string().contains("api_key"));
    }
}
