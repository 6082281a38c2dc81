//! Appends `<elapsed> <scene>` lines to the description of the live YouTube broadcast,
//! using the stream clock reported by OBS over its WebSocket control interface.
//!
//! A scene switcher calls the binary once per scene change with the path of the scene's
//! image file. See [`stamp::run`] for the sequence of a single invocation.

pub mod credentials;
pub mod error;
pub mod label;
pub mod logging;
pub mod oauth;
pub mod obs;
pub mod settings;
pub mod stamp;
pub mod youtube_api;

pub use credentials::{Authenticate, CredentialManager};
pub use error::{ErrorKind, StampError};
pub use obs::{ElapsedTimeSource, ObsClient};
pub use settings::Settings;
pub use youtube_api::{VideoHost, YouTubeClient};
