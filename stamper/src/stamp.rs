//! One stamp: read the stream clock, then append `<elapsed> <label>` to the live video's
//! description.
//!
//! The steps run strictly in order and the first failure ends the run. Nothing remote is
//! touched until the elapsed time is known, so an inactive or unreachable OBS never leads to
//! a description edit.

use crate::credentials::Authenticate;
use crate::error::{ErrorKind, StampError, classify};
use crate::label::{description_line, sanitize_label};
use crate::obs::ElapsedTimeSource;
use crate::settings::Settings;
use crate::youtube_api::{VideoHost, VideoSnippetUpdate};
use eyre::Context;
use std::fmt;

/// Where the description line should go.
#[derive(Debug, Clone)]
pub struct Target {
    /// The channel the live broadcast is expected to belong to.
    pub channel_id: String,
    /// Used when no active broadcast is found.
    pub manual_video_id: Option<String>,
}

impl From<&Settings> for Target {
    fn from(settings: &Settings) -> Self {
        Self {
            channel_id: settings.channel_id.clone(),
            manual_video_id: settings.manual_video_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSource {
    ActiveBroadcast,
    ManualFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVideo {
    pub id: String,
    pub source: VideoSource,
}

/// Finds the video to stamp: the first active broadcast, else the configured fallback.
///
/// A failing broadcast lookup is not fatal as long as a fallback is configured.
pub async fn resolve_video_id<H: VideoHost>(
    host: &H,
    target: &Target,
) -> eyre::Result<ResolvedVideo> {
    match host.find_active_broadcast().await {
        Ok(Some(broadcast)) => {
            let title = broadcast.snippet.as_ref().map(|s| s.title.as_str());
            tracing::info!(video_id = %broadcast.id, title, "live broadcast found");
            if let Some(channel) = broadcast
                .snippet
                .as_ref()
                .and_then(|s| s.channel_id.as_deref())
            {
                if channel != target.channel_id {
                    tracing::warn!(
                        broadcast_channel = channel,
                        configured_channel = %target.channel_id,
                        "live broadcast belongs to a different channel than configured"
                    );
                }
            }
            return Ok(ResolvedVideo {
                id: broadcast.id,
                source: VideoSource::ActiveBroadcast,
            });
        }
        Ok(None) => tracing::info!("no active live broadcast"),
        Err(e) => {
            let error = format!("{e:#}");
            tracing::warn!(%error, "active broadcast lookup failed");
        }
    }

    match &target.manual_video_id {
        Some(id) => {
            tracing::info!(video_id = %id, "using manual video id");
            Ok(ResolvedVideo {
                id: id.clone(),
                source: VideoSource::ManualFallback,
            })
        }
        None => Err(StampError::NoBroadcast.into()),
    }
}

pub fn appended_description(old: &str, line: &str) -> String {
    format!("{old}\n{line}")
}

/// Appends `line` to the description of `video_id`, keeping the rest of the snippet.
pub async fn append_line<H: VideoHost>(host: &H, video_id: &str, line: &str) -> eyre::Result<()> {
    let Some(snippet) = host
        .video_snippet(video_id)
        .await
        .with_context(|| format!("fetch snippet of video {video_id}"))?
    else {
        return Err(StampError::VideoNotFound(video_id.to_string()).into());
    };
    let description = appended_description(&snippet.description, line);
    host.update_video_snippet(
        video_id,
        VideoSnippetUpdate::with_description(snippet, description),
    )
    .await
    .with_context(|| format!("update description of video {video_id}"))?;
    tracing::info!(video_id, line, "description updated");
    Ok(())
}

/// How far a run got. Each variant is reached only after all earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Start,
    ElapsedTimeObtained,
    LabelBuilt,
    Authenticated,
    VideoIdResolved,
    DescriptionUpdated,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::ElapsedTimeObtained => "elapsed time obtained",
            Self::LabelBuilt => "label built",
            Self::Authenticated => "authenticated",
            Self::VideoIdResolved => "video id resolved",
            Self::DescriptionUpdated => "description updated",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

/// A run that stopped early.
#[derive(Debug)]
pub struct StageFailure {
    /// The last stage that was reached before the failure.
    pub stage: Stage,
    pub report: eyre::Report,
}

impl StageFailure {
    pub fn kind(&self) -> ErrorKind {
        classify(&self.report)
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed after stage '{}': {:#}", self.stage, self.report)
    }
}

fn at(stage: Stage) -> impl FnOnce(eyre::Report) -> StageFailure {
    move |report| StageFailure { stage, report }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamped {
    pub video: ResolvedVideo,
    pub line: String,
}

/// Performs one complete stamp for `source_file`.
pub async fn run<C, A>(
    clock: &C,
    auth: &A,
    target: &Target,
    source_file: &str,
) -> Result<Stamped, StageFailure>
where
    C: ElapsedTimeSource,
    A: Authenticate,
{
    let elapsed = clock
        .fetch_elapsed_time()
        .await
        .map_err(at(Stage::Start))?;
    tracing::debug!(%elapsed, "stage: {}", Stage::ElapsedTimeObtained);

    let label = sanitize_label(source_file);
    let line = description_line(&elapsed, &label);
    tracing::debug!(%label, "stage: {}", Stage::LabelBuilt);

    let host = auth.acquire().await.map_err(at(Stage::LabelBuilt))?;
    tracing::debug!("stage: {}", Stage::Authenticated);

    let video = resolve_video_id(&host, target)
        .await
        .map_err(at(Stage::Authenticated))?;
    tracing::debug!(video_id = %video.id, "stage: {}", Stage::VideoIdResolved);

    append_line(&host, &video.id, &line)
        .await
        .map_err(at(Stage::VideoIdResolved))?;
    tracing::debug!("stage: {}", Stage::DescriptionUpdated);

    tracing::debug!("stage: {}", Stage::Done);
    Ok(Stamped { video, line })
}
