//! YouTube Live Broadcasts API types.
//!
//! A broadcast is the viewer-facing live event. Each broadcast corresponds to exactly one
//! YouTube video, and the broadcast id doubles as that video's id, which is what the
//! description update targets.

use crate::youtube_api::types::PageInfo;
use jiff::Timestamp;
use serde::Deserialize;
use std::collections::VecDeque;

/// Response structure for the `liveBroadcasts.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/live/docs/liveBroadcasts/list>
#[derive(Debug, Deserialize)]
pub struct LiveBroadcastListResponse {
    /// A list of broadcasts that match the request criteria.
    #[serde(default)]
    pub items: VecDeque<LiveBroadcast>,
    #[serde(rename = "pageInfo", default)]
    pub page_info: PageInfo,
}

/// A `liveBroadcast` resource represents a viewer-facing live streaming event on YouTube.
///
/// See: <https://developers.google.com/youtube/v3/live/docs/liveBroadcasts#resource>
#[derive(Debug, Clone, Deserialize)]
pub struct LiveBroadcast {
    /// The ID that YouTube assigns to uniquely identify the broadcast.
    pub id: String,
    /// Basic details about the broadcast; present when `part` includes `snippet`.
    #[serde(default)]
    pub snippet: Option<LiveBroadcastSnippet>,
}

/// The subset of the broadcast snippet this crate reads.
///
/// See: <https://developers.google.com/youtube/v3/live/docs/liveBroadcasts#snippet>
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveBroadcastSnippet {
    /// The broadcast's title.
    #[serde(default)]
    pub title: String,
    /// The channel the broadcast belongs to.
    #[serde(default)]
    pub channel_id: Option<String>,
    /// The date and time that the broadcast actually started.
    ///
    /// Unset until the broadcast has actually started.
    #[serde(default)]
    pub actual_start_time: Option<Timestamp>,
}
