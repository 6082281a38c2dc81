//! YouTube Data API v3 client library.
//!
//! Only the three calls needed to stamp a description are covered: find the live broadcast,
//! read a video's snippet, and write it back.
//!
//! # Broadcasts and videos
//!
//! A [`broadcasts::LiveBroadcast`] is the viewer-facing live event, and each broadcast is
//! exactly one YouTube video with the same id. Description edits therefore go through the
//! `videos` resource, using the broadcast id as the video id.
//!
//! A `part=snippet` update replaces the whole snippet, so the title and category must always
//! be sent, and tags and default language are carried over from the fetched snippet (see
//! [`videos::VideoSnippetUpdate::with_description`]).

pub mod broadcasts;
pub mod client;
pub mod types;
pub mod videos;

pub use client::YouTubeClient;

pub use broadcasts::{LiveBroadcast, LiveBroadcastSnippet};
pub use videos::{DEFAULT_CATEGORY_ID, VideoSnippet, VideoSnippetUpdate};

/// The video hosting operations a stamp needs.
///
/// [`YouTubeClient`] is the real implementation; tests substitute an in-memory one.
#[allow(async_fn_in_trait)]
pub trait VideoHost {
    /// The first broadcast that is live right now, if any.
    async fn find_active_broadcast(&self) -> eyre::Result<Option<LiveBroadcast>>;

    /// The snippet of `video_id`, or `None` if there is no such video or it has no snippet.
    async fn video_snippet(&self, video_id: &str) -> eyre::Result<Option<VideoSnippet>>;

    async fn update_video_snippet(
        &self,
        video_id: &str,
        snippet: VideoSnippetUpdate,
    ) -> eyre::Result<()>;
}
