//! Typed failures that the rest of the crate attaches to [`eyre::Report`] chains.
//!
//! Most errors in this crate are plain `eyre` reports with context. The variants here exist
//! for the failures a caller (or an operator reading the log) needs to tell apart, and
//! [`classify`] maps any report onto the coarse [`ErrorKind`] taxonomy by walking its chain.

use std::path::PathBuf;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification of everything that can abort a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid settings. Detected before any I/O with remote systems.
    Configuration,
    /// Token refresh denied, interactive grant failed, or client secret unusable.
    Authentication,
    /// Socket or HTTP connectivity, timeouts, closed connections.
    Transport,
    /// Unexpected message shape from the control socket or the hosting API.
    Protocol,
    /// No broadcast to update, or the video has no snippet.
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum StampError {
    #[error("cannot load settings file {}", path.display())]
    Settings {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("cannot use client secret file {}", path.display())]
    ClientSecret {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("cannot use stored token file {}", path.display())]
    TokenFile {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error(
        "the OAuth refresh token was rejected (expired or revoked); \
         remove the token file and run again to re-authorize"
    )]
    RefreshDenied,

    #[error("the OAuth token endpoint rejected the refresh: {0}")]
    RefreshRejected(String),

    #[error("interactive OAuth authorization failed")]
    AuthorizationFailed(#[source] BoxError),

    #[error("OBS WebSocket requires authentication, but no password was configured")]
    PasswordRequired,

    #[error("OBS WebSocket rejected identification")]
    IdentifyRejected,

    #[error("malformed message from OBS WebSocket: {0}")]
    MalformedMessage(String),

    #[error(
        "GetStreamStatus request failed (code {}): {}",
        code.map_or_else(|| "unknown".to_string(), |c| c.to_string()),
        comment.as_deref().unwrap_or("no comment")
    )]
    RequestFailed {
        code: Option<u16>,
        comment: Option<String>,
    },

    #[error("stream is not active")]
    StreamInactive,

    #[error("no active live broadcast found and no manual video id configured")]
    NoBroadcast,

    #[error("could not retrieve video details for video id {0}")]
    VideoNotFound(String),
}

impl StampError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Settings { .. } | Self::MissingSetting(_) => ErrorKind::Configuration,
            Self::ClientSecret { .. }
            | Self::TokenFile { .. }
            | Self::RefreshDenied
            | Self::RefreshRejected(_)
            | Self::AuthorizationFailed(_)
            | Self::PasswordRequired
            | Self::IdentifyRejected => ErrorKind::Authentication,
            Self::MalformedMessage(_) | Self::RequestFailed { .. } => ErrorKind::Protocol,
            Self::StreamInactive | Self::NoBroadcast | Self::VideoNotFound(_) => {
                ErrorKind::NotFound
            }
        }
    }
}

/// Classifies a report by the first typed failure found in its chain.
///
/// Reports without a [`StampError`] are decode failures ([`ErrorKind::Protocol`]) when they
/// carry a JSON or response-body error, and [`ErrorKind::Transport`] otherwise.
pub fn classify(report: &eyre::Report) -> ErrorKind {
    for cause in report.chain() {
        if let Some(e) = cause.downcast_ref::<StampError>() {
            return e.kind();
        }
        if cause.is::<serde_json::Error>() {
            return ErrorKind::Protocol;
        }
        if let Some(e) = cause.downcast_ref::<reqwest::Error>() {
            if e.is_decode() {
                return ErrorKind::Protocol;
            }
        }
    }
    ErrorKind::Transport
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::Context;

    #[test]
    fn classify_finds_typed_error_under_context() {
        let report: eyre::Report = Err::<(), _>(StampError::RefreshDenied)
            .context("refresh stored credential")
            .unwrap_err();
        assert_eq!(classify(&report), ErrorKind::Authentication);

        let report = eyre::Report::new(StampError::NoBroadcast).wrap_err("resolve video id");
        assert_eq!(classify(&report), ErrorKind::NotFound);
    }

    #[test]
    fn classify_json_errors_as_protocol() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let report = eyre::Report::new(json_err).wrap_err("parse hello message");
        assert_eq!(classify(&report), ErrorKind::Protocol);
    }

    #[test]
    fn untyped_errors_are_transport() {
        let report = eyre::eyre!("connection refused").wrap_err("connect to OBS");
        assert_eq!(classify(&report), ErrorKind::Transport);
    }

    #[test]
    fn request_failed_message_includes_code_and_comment() {
        let e = StampError::RequestFailed {
            code: Some(501),
            comment: Some("output not running".into()),
        };
        assert_eq!(
            e.to_string(),
            "GetStreamStatus request failed (code 501): output not running"
        );
        let e = StampError::RequestFailed {
            code: None,
            comment: None,
        };
        assert_eq!(
            e.to_string(),
            "GetStreamStatus request failed (code unknown): no comment"
        );
    }
}
