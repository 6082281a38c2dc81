//! Stream status over the OBS control socket (obs-websocket 5.x).
//!
//! Each query opens its own connection, performs the hello/identify handshake (answering the
//! challenge/salt authentication if the server asks for it), issues a single
//! `GetStreamStatus` request, and closes the connection again, whatever the outcome.

use crate::error::StampError;
use std::time::Duration;
use tracing::instrument;

pub mod auth;
pub mod protocol;
mod session;

#[cfg(test)]
mod mock;

use session::Session;

/// Something that can tell how long the current stream has been live.
#[allow(async_fn_in_trait)]
pub trait ElapsedTimeSource {
    /// Returns the elapsed stream time as `HH:MM:SS`.
    ///
    /// Fails if the stream is not active or the status could not be read.
    async fn fetch_elapsed_time(&self) -> eyre::Result<String>;
}

/// Output status as reported by `GetStreamStatus`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamStatus {
    pub active: bool,
    /// The output timecode with any fractional seconds removed.
    pub elapsed: Option<String>,
}

impl StreamStatus {
    pub fn new(active: bool, timecode: Option<&str>) -> Self {
        Self {
            active,
            elapsed: timecode.map(|tc| truncate_timecode(tc).to_string()),
        }
    }

    /// The elapsed time, provided the stream is live and reported a usable timecode.
    pub fn into_elapsed(self) -> Result<String, StampError> {
        if !self.active {
            return Err(StampError::StreamInactive);
        }
        match self.elapsed {
            Some(elapsed) if !elapsed.is_empty() => Ok(elapsed),
            _ => Err(StampError::MalformedMessage(
                "active stream reported no outputTimecode".into(),
            )),
        }
    }
}

/// Drops everything from the first `.` on, so `01:23:45.678` becomes `01:23:45`.
pub fn truncate_timecode(timecode: &str) -> &str {
    timecode
        .split_once('.')
        .map_or(timecode, |(whole, _)| whole)
}

/// Connection details for the OBS control socket.
#[derive(Clone)]
pub struct ObsClient {
    url: String,
    password: Option<String>,
    timeout: Duration,
}

impl ObsClient {
    /// `timeout` bounds the connect and every individual receive.
    pub fn new(url: impl Into<String>, password: Option<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            password,
            timeout,
        }
    }

    /// Runs one complete connect / identify / `GetStreamStatus` exchange.
    ///
    /// The connection is closed before this returns, on success and on every error path after
    /// the connection was established.
    pub async fn stream_status(&self) -> eyre::Result<StreamStatus> {
        let mut session = Session::connect(&self.url, self.timeout).await?;
        let result = async {
            session.handshake(self.password.as_deref()).await?;
            tracing::debug!(auth = ?session.auth_state(), "identified to OBS WebSocket");
            session.stream_status().await
        }
        .await;
        session.close().await;
        result
    }
}

impl ElapsedTimeSource for ObsClient {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_elapsed_time(&self) -> eyre::Result<String> {
        let status = self.stream_status().await?;
        Ok(status.into_elapsed()?)
    }
}
