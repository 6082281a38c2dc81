//! YouTube Videos API types.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Category sent when the fetched snippet has none; `videos.update` requires one.
///
/// `22` is "People & Blogs".
pub const DEFAULT_CATEGORY_ID: &str = "22";

/// Response structure for the `videos.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos/list>
#[derive(Debug, Deserialize)]
pub struct VideoListResponse {
    /// A list of videos that match the request criteria.
    #[serde(default)]
    pub items: VecDeque<Video>,
}

/// A `video` resource represents a YouTube video.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#resource>
#[derive(Debug, Deserialize)]
pub struct Video {
    /// The ID that YouTube uses to uniquely identify the video.
    pub id: String,
    /// Basic details about the video; present when `part` includes `snippet`.
    #[serde(default)]
    pub snippet: Option<VideoSnippet>,
}

/// The snippet fields read back from `videos.list`.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#snippet>
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: Option<String>,
    /// Writing the snippet replaces it wholesale, so these are carried over unchanged.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub default_language: Option<String>,
}

/// Request body for `videos.update` with `part=snippet`.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos/update>
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoUpdateRequest {
    pub id: String,
    pub snippet: VideoSnippetUpdate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippetUpdate {
    pub title: String,
    pub description: String,
    pub category_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,
}

impl VideoSnippetUpdate {
    /// Keeps everything from `snippet` except the description.
    pub fn with_description(snippet: VideoSnippet, description: String) -> Self {
        Self {
            title: snippet.title,
            description,
            category_id: snippet
                .category_id
                .unwrap_or_else(|| DEFAULT_CATEGORY_ID.to_string()),
            tags: snippet.tags,
            default_language: snippet.default_language,
        }
    }
}
