//! Core YouTube API client functionality.

use crate::youtube_api::VideoHost;
use crate::youtube_api::{
    broadcasts::{LiveBroadcast, LiveBroadcastListResponse},
    videos::{VideoListResponse, VideoSnippet, VideoSnippetUpdate, VideoUpdateRequest},
};
use eyre::Context;
use http::Method;
use serde::Serialize;
use tracing::instrument;

/// Client for interacting with the YouTube Data API v3.
///
/// The client holds an access token that the credential layer has already checked for
/// freshness; it never refreshes on its own. A run is short enough that the token cannot
/// expire between acquisition and the last call.
#[derive(Clone)]
pub struct YouTubeClient {
    access_token: String,
    /// Base URL of the Data API, without a trailing slash.
    api_base: String,
    /// HTTP client for API requests
    client: reqwest::Client,
}

impl std::fmt::Debug for YouTubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YouTubeClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl YouTubeClient {
    /// Creates a new YouTube API client.
    ///
    /// # Arguments
    ///
    /// * `access_token` - A currently valid OAuth2 access token
    /// * `api_base` - Base URL of the Data API, normally `https://www.googleapis.com/youtube/v3`
    /// * `client` - Shared HTTP client for making API requests
    pub fn new(
        access_token: impl Into<String>,
        api_base: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn endpoint(&self, resource: &str) -> String {
        format!("{}/{}", self.api_base, resource)
    }

    /// Makes an authenticated HTTP request to the YouTube API with common error handling.
    ///
    /// This method consolidates the shared logic across all YouTube API requests:
    /// - Authorization header setup
    /// - Query parameters
    /// - JSON body (for requests that need one)
    /// - Status code validation and error handling
    ///
    /// # Returns
    ///
    /// The raw [`reqwest::Response`] for method-specific JSON parsing.
    #[instrument(skip(self, json_body), level = tracing::Level::TRACE)]
    pub(crate) async fn make_authenticated_request(
        &self,
        method: Method,
        url: &str,
        query_params: Option<&[(&str, &str)]>,
        json_body: Option<&impl Serialize>,
    ) -> eyre::Result<reqwest::Response> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .bearer_auth(&self.access_token);

        if let Some(params) = query_params {
            request = request.query(params);
        }

        if let Some(body) = json_body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("send {} request to YouTube API: {}", method, url))?;

        let status_code = response.status();
        if !status_code.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(eyre::eyre!(
                "YouTube API {} request failed with status {}: {}",
                method,
                status_code,
                error_text
            ));
        }

        Ok(response)
    }

    /// Lists broadcasts that are live right now.
    ///
    /// `mine=true` cannot be combined with `broadcastStatus`, so the listing is scoped by the
    /// authorized account alone. Both scheduled events and the persistent "stream now"
    /// broadcast are included.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/live/docs/liveBroadcasts/list>
    #[instrument(skip(self))]
    pub async fn list_active_broadcasts(&self) -> eyre::Result<LiveBroadcastListResponse> {
        let url = self.endpoint("liveBroadcasts");
        let query_params = [
            ("part", "id,snippet"),
            ("broadcastStatus", "active"),
            ("broadcastType", "all"),
        ];

        let response = self
            .make_authenticated_request(Method::GET, &url, Some(&query_params), None::<&()>)
            .await?;

        let live_broadcasts: LiveBroadcastListResponse = response
            .json()
            .await
            .context("parse YouTube liveBroadcasts API response as JSON")?;

        tracing::debug!(
            total_results = live_broadcasts.page_info.total_results,
            returned_items = live_broadcasts.items.len(),
            "fetched active broadcasts"
        );

        Ok(live_broadcasts)
    }

    /// Fetches the snippet of a single video.
    ///
    /// Returns `Ok(None)` when the video does not exist (or is not visible to the account),
    /// or when it comes back without a snippet.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/videos/list>
    #[instrument(skip(self))]
    pub async fn get_video_snippet(&self, video_id: &str) -> eyre::Result<Option<VideoSnippet>> {
        let url = self.endpoint("videos");
        let query_params = [("part", "snippet,id"), ("id", video_id)];

        let response = self
            .make_authenticated_request(Method::GET, &url, Some(&query_params), None::<&()>)
            .await?;

        let videos: VideoListResponse = response
            .json()
            .await
            .context("parse YouTube videos API response as JSON")?;

        tracing::debug!(
            video_id,
            returned_items = videos.items.len(),
            "fetched video snippet"
        );

        Ok(videos.items.into_iter().next().and_then(|v| v.snippet))
    }

    /// Replaces the snippet of a video.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/videos/update>
    #[instrument(skip(self, snippet))]
    pub async fn update_video_snippet(
        &self,
        video_id: &str,
        snippet: VideoSnippetUpdate,
    ) -> eyre::Result<()> {
        let url = self.endpoint("videos");
        let query_params = [("part", "snippet")];
        let body = VideoUpdateRequest {
            id: video_id.to_string(),
            snippet,
        };

        self.make_authenticated_request(Method::PUT, &url, Some(&query_params), Some(&body))
            .await?;

        tracing::debug!(video_id, "updated video snippet");
        Ok(())
    }
}

impl VideoHost for YouTubeClient {
    async fn find_active_broadcast(&self) -> eyre::Result<Option<LiveBroadcast>> {
        Ok(self.list_active_broadcasts().await?.items.pop_front())
    }

    async fn video_snippet(&self, video_id: &str) -> eyre::Result<Option<VideoSnippet>> {
        self.get_video_snippet(video_id).await
    }

    async fn update_video_snippet(
        &self,
        video_id: &str,
        snippet: VideoSnippetUpdate,
    ) -> eyre::Result<()> {
        YouTubeClient::update_video_snippet(self, video_id, snippet).await
    }
}
