//! Obtaining an authorized YouTube client, reusing the credential stored on disk when possible.
//!
//! The token file uses the same field names as Google's `authorized_user` JSON (`token`,
//! `refresh_token`, `expiry`, `scopes`), so a file written by other Google tooling can be
//! picked up as-is. Fields this crate does not use are ignored on read and not written back.

use crate::error::StampError;
use crate::oauth::OAuthManager;
use crate::settings::Settings;
use crate::youtube_api::{VideoHost, YouTubeClient};
use eyre::Context;
use jiff::{SignedDuration, Timestamp};
use oauth2::basic::BasicTokenResponse;
use oauth2::{RefreshToken, TokenResponse};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Scopes requested on an interactive grant and required of a stored credential.
pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/youtube.force-ssl",
    "https://www.googleapis.com/auth/youtube.readonly",
];

/// A token this close to expiry is treated as already expired.
const EXPIRY_MARGIN: SignedDuration = SignedDuration::from_secs(300);

/// Something that can produce an authorized [`VideoHost`].
#[allow(async_fn_in_trait)]
pub trait Authenticate {
    type Host: VideoHost;

    async fn acquire(&self) -> eyre::Result<Self::Host>;
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    #[serde(rename = "token")]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// `None` means the issuer gave no lifetime; such a token is used until a call fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<Timestamp>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredential")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expiry", &self.expiry)
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl StoredCredential {
    /// Builds the credential to persist from a token endpoint response.
    ///
    /// Google omits the refresh token from refresh responses, so `previous_refresh` is kept
    /// unless a new one was issued. Scopes fall back to `requested` when the response does
    /// not list them.
    fn from_token(
        token: &BasicTokenResponse,
        previous_refresh: Option<String>,
        requested: &[String],
        now: Timestamp,
    ) -> Self {
        let expiry = token.expires_in().and_then(|ttl| {
            let ttl = SignedDuration::try_from(ttl).ok()?;
            now.checked_add(ttl).ok()
        });
        let scopes = match token.scopes() {
            Some(scopes) if !scopes.is_empty() => {
                scopes.iter().map(|s| s.to_string()).collect()
            }
            _ => requested.to_vec(),
        };
        Self {
            access_token: token.access_token().secret().clone(),
            refresh_token: token
                .refresh_token()
                .map(|t| t.secret().clone())
                .or(previous_refresh),
            expiry,
            scopes,
        }
    }

    fn is_valid_at(&self, now: Timestamp) -> bool {
        match self.expiry {
            None => true,
            Some(expiry) => now
                .checked_add(EXPIRY_MARGIN)
                .is_ok_and(|deadline| expiry > deadline),
        }
    }

    /// An empty scope list is taken as "whatever was granted", since older files omit it.
    fn covers(&self, required: &[&str]) -> bool {
        self.scopes.is_empty()
            || required
                .iter()
                .all(|r| self.scopes.iter().any(|s| s == r))
    }

    fn usable_refresh_token(&self) -> Option<RefreshToken> {
        self.refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| RefreshToken::new(t.to_string()))
    }
}

/// What to do with the credential found on disk.
#[derive(Debug)]
enum Plan {
    Reuse(StoredCredential),
    Refresh(StoredCredential, RefreshToken),
    Grant,
}

fn plan(stored: Option<StoredCredential>, required: &[&str], now: Timestamp) -> Plan {
    let Some(stored) = stored else {
        tracing::info!("no stored credential");
        return Plan::Grant;
    };
    if !stored.covers(required) {
        tracing::info!(granted = ?stored.scopes, "stored credential lacks required scopes");
        return Plan::Grant;
    }
    if stored.is_valid_at(now) {
        return Plan::Reuse(stored);
    }
    match stored.usable_refresh_token() {
        Some(refresh) => Plan::Refresh(stored, refresh),
        None => {
            tracing::info!("stored credential expired and cannot be refreshed");
            Plan::Grant
        }
    }
}

/// Reads the stored credential; `Ok(None)` if there is none yet.
///
/// A file that exists but cannot be read or parsed is an error rather than a reason to
/// start over.
fn load(path: &Path) -> eyre::Result<Option<StoredCredential>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StampError::TokenFile {
                path: path.to_path_buf(),
                source: e.into(),
            }
            .into());
        }
    };
    let credential = serde_json::from_str(&raw).map_err(|e| StampError::TokenFile {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    Ok(Some(credential))
}

fn save(path: &Path, credential: &StoredCredential) -> eyre::Result<()> {
    let json = serde_json::to_string_pretty(credential).context("serialize credential")?;
    std::fs::write(path, json)
        .with_context(|| format!("write token file {}", path.display()))?;
    tracing::debug!(path = %path.display(), "stored credential");
    Ok(())
}

/// Persists the credential from a fresh interactive grant.
fn store_grant(path: &Path, token: &BasicTokenResponse) -> eyre::Result<StoredCredential> {
    let requested: Vec<String> = SCOPES.iter().map(|s| s.to_string()).collect();
    let credential = StoredCredential::from_token(token, None, &requested, Timestamp::now());
    save(path, &credential)?;
    tracing::info!("stored new credential");
    Ok(credential)
}

/// Produces [`YouTubeClient`]s from the token file, refreshing or re-authorizing as needed.
#[derive(Debug, Clone)]
pub struct CredentialManager {
    token_path: PathBuf,
    client_secret_path: PathBuf,
    api_base: String,
    http: reqwest::Client,
}

impl CredentialManager {
    pub fn new(
        token_path: impl Into<PathBuf>,
        client_secret_path: impl Into<PathBuf>,
        api_base: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            token_path: token_path.into(),
            client_secret_path: client_secret_path.into(),
            api_base: api_base.into(),
            http,
        }
    }

    pub fn from_settings(settings: &Settings, http: reqwest::Client) -> Self {
        Self::new(
            &settings.token_path,
            &settings.client_secret_path,
            &settings.youtube_api_base,
            http,
        )
    }

    /// The client secret is only needed to talk to the token endpoint, so it is read lazily.
    fn oauth(&self) -> eyre::Result<OAuthManager> {
        OAuthManager::from_client_secret_file(&self.client_secret_path)
    }

    async fn credential(&self) -> eyre::Result<StoredCredential> {
        let stored = load(&self.token_path)?;
        let now = Timestamp::now();
        match plan(stored, &SCOPES, now) {
            Plan::Reuse(credential) => {
                tracing::info!(expiry = ?credential.expiry, "reusing stored credential");
                Ok(credential)
            }
            Plan::Refresh(stored, refresh) => {
                tracing::info!("refreshing expired credential");
                let token = self
                    .oauth()?
                    .refresh(&refresh)
                    .await
                    .context("refresh stored credential")?;
                let credential = StoredCredential::from_token(
                    &token,
                    stored.refresh_token,
                    &stored.scopes,
                    Timestamp::now(),
                );
                save(&self.token_path, &credential)?;
                Ok(credential)
            }
            Plan::Grant => {
                let token = self
                    .oauth()?
                    .authenticate(&SCOPES)
                    .await
                    .context("authorize YouTube access")?;
                store_grant(&self.token_path, &token)
            }
        }
    }
}

impl Authenticate for CredentialManager {
    type Host = YouTubeClient;

    #[instrument(skip(self), fields(token_path = %self.token_path.display()))]
    async fn acquire(&self) -> eyre::Result<YouTubeClient> {
        let credential = self.credential().await?;
        Ok(YouTubeClient::new(
            credential.access_token,
            self.api_base.clone(),
            self.http.clone(),
        ))
    }
}
