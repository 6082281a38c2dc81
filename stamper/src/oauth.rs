//! OAuth 2.0 management for YouTube API authentication.
//!
//! This module encapsulates the two ways of getting an access token from Google: the
//! interactive authorization-code flow (with a one-shot local redirect server) and the
//! refresh-token exchange.

use crate::error::StampError;
use bytes::Bytes;
use eyre::Context;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper::{Request, Response, body};
use oauth2::basic::{BasicClient, BasicErrorResponseType, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    RedirectUrl, RefreshToken, Scope, TokenUrl,
};
use oauth2::{RequestTokenError, reqwest};
use serde::Deserialize;
use std::future::Future;
use std::path::Path;

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const OAUTH_DONE_HTML: &str = "<!DOCTYPE html><html><head><title>scene-stamper</title></head>\
<body><p>Authorization complete. You can close this window.</p></body></html>";

/// The client secret file as downloaded from the Google Cloud console.
///
/// Desktop clients store their details under `installed`, web clients under `web`.
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecretDetails>,
    web: Option<ClientSecretDetails>,
}

#[derive(Debug, Deserialize)]
struct ClientSecretDetails {
    client_id: String,
    client_secret: Option<String>,
    auth_uri: Option<String>,
    token_uri: Option<String>,
}

/// Manages OAuth 2.0 authentication flows for YouTube API access.
#[derive(Debug, Clone)]
pub struct OAuthManager {
    client_id: ClientId,
    client_secret: Option<ClientSecret>,
    auth_url: AuthUrl,
    token_url: TokenUrl,
}

impl OAuthManager {
    /// Loads the OAuth client configuration from a Google client secret JSON file.
    pub fn from_client_secret_file(path: &Path) -> eyre::Result<Self> {
        let wrap = |source: Box<dyn std::error::Error + Send + Sync>| StampError::ClientSecret {
            path: path.to_path_buf(),
            source,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| wrap(e.into()))?;
        let file: ClientSecretFile = serde_json::from_str(&raw).map_err(|e| wrap(e.into()))?;
        let Some(details) = file.installed.or(file.web) else {
            return Err(wrap("neither an \"installed\" nor a \"web\" client".into()).into());
        };

        let auth_url = AuthUrl::new(
            details
                .auth_uri
                .unwrap_or_else(|| DEFAULT_AUTH_URI.to_string()),
        )
        .map_err(|e| wrap(e.into()))?;
        let token_url = TokenUrl::new(
            details
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        )
        .map_err(|e| wrap(e.into()))?;

        Ok(Self {
            client_id: ClientId::new(details.client_id),
            client_secret: details.client_secret.map(ClientSecret::new),
            auth_url,
            token_url,
        })
    }

    fn http_client() -> eyre::Result<reqwest::Client> {
        reqwest::ClientBuilder::new()
            // SSRF no thank you.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("build OAuth HTTP client")
    }

    /// Performs a complete OAuth 2.0 authorization flow to obtain a new access token.
    ///
    /// This method initiates the full OAuth flow, including:
    /// 1. Opening the user's browser for authorization
    /// 2. Setting up a local HTTP server to receive the authorization callback
    /// 3. Exchanging the authorization code for an access token
    ///
    /// Any failure is reported as [`StampError::AuthorizationFailed`].
    pub async fn authenticate(&self, scopes: &[&str]) -> eyre::Result<BasicTokenResponse> {
        self.authenticate_inner(scopes)
            .await
            .map_err(|e| StampError::AuthorizationFailed(e.into()).into())
    }

    async fn authenticate_inner(&self, scopes: &[&str]) -> eyre::Result<BasicTokenResponse> {
        let csrf = CsrfToken::new_random();
        let (redirect_url, eventually_authorization_code) = self
            .setup_redirect(csrf.clone())
            .await
            .context("set up redirect endpoint")?;

        let mut client = BasicClient::new(self.client_id.clone())
            .set_auth_uri(self.auth_url.clone())
            .set_token_uri(self.token_url.clone())
            .set_redirect_uri(redirect_url);
        if let Some(secret) = &self.client_secret {
            client = client.set_client_secret(secret.clone());
        }

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, _csrf_token) = client
            // We never re-use the CSRF since we only go through the flow exactly once.
            .authorize_url(move || csrf.clone())
            .add_scopes(scopes.iter().map(|s| Scope::new(s.to_string())))
            .set_pkce_challenge(pkce_challenge)
            .url();

        tracing::info!(url = %auth_url, "asking user to follow OAuth flow");
        if let Err(e) = webbrowser::open(auth_url.as_ref()) {
            tracing::warn!(error = %e, "could not open a browser; open the URL above manually");
        }
        let authorization_code = eventually_authorization_code
            .await
            .context("await user authorization code")?;

        let token_result = client
            .exchange_code(authorization_code)
            .set_pkce_verifier(pkce_verifier)
            .request_async(&Self::http_client()?)
            .await
            .context("exchange authorization code with access token")?;

        Ok(token_result)
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// An `invalid_grant` answer (the refresh token expired or was revoked) is reported as
    /// [`StampError::RefreshDenied`]; any other error answer from the token endpoint (such as
    /// `invalid_client`) as [`StampError::RefreshRejected`]. The caller should not fall back to
    /// the interactive flow on its own; the user has to re-authorize explicitly.
    ///
    /// The returned token may lack a refresh token, in which case the old one stays valid.
    pub async fn refresh(&self, refresh_token: &RefreshToken) -> eyre::Result<BasicTokenResponse> {
        tracing::debug!("attempting to refresh OAuth token");

        let mut client =
            BasicClient::new(self.client_id.clone()).set_token_uri(self.token_url.clone());
        if let Some(secret) = &self.client_secret {
            client = client.set_client_secret(secret.clone());
        }

        match client
            .exchange_refresh_token(refresh_token)
            .request_async(&Self::http_client()?)
            .await
        {
            Ok(new_token) => {
                tracing::debug!("successfully refreshed OAuth token");
                Ok(new_token)
            }
            Err(ref e @ RequestTokenError::ServerResponse(ref sr))
                if matches!(sr.error(), BasicErrorResponseType::InvalidGrant) =>
            {
                tracing::warn!("OAuth refresh token considered invalid grant: {}", e);
                Err(StampError::RefreshDenied.into())
            }
            Err(RequestTokenError::ServerResponse(sr)) => {
                tracing::warn!("OAuth token endpoint rejected refresh: {}", sr);
                Err(StampError::RefreshRejected(sr.to_string()).into())
            }
            Err(e) => Err(e).context("exchange refresh token"),
        }
    }

    /// Sets up a local HTTP server to receive the OAuth authorization callback.
    ///
    /// Creates a temporary HTTP server on a random local port to handle the OAuth
    /// redirect after user authorization. The server validates the CSRF token and
    /// extracts the authorization code from the callback.
    ///
    /// # Returns
    ///
    /// A tuple containing:
    /// - The redirect URL to use in the OAuth flow
    /// - A future that resolves to the authorization code when the callback is received
    async fn setup_redirect(
        &self,
        csrf: CsrfToken,
    ) -> eyre::Result<(
        RedirectUrl,
        impl Future<Output = eyre::Result<AuthorizationCode>>,
    )> {
        let socket = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind to localhost")?;
        let addr = socket.local_addr().context("get local address")?;
        let url = RedirectUrl::new(format!("http://{}:{}", addr.ip(), addr.port()))
            .context("construct redirect url")?;
        let (tx, rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let r = async move {
                let (conn, _) = socket.accept().await.context("accept")?;
                let conn = hyper_util::rt::TokioIo::new(conn);
                let (got, mut gotten) = tokio::sync::mpsc::channel(1);
                let service = service_fn(move |req: Request<body::Incoming>| {
                    let csrf = csrf.clone();
                    let got = got.clone();
                    async move {
                        let mut presented_state = None;
                        let mut presented_code = None;
                        for (k, v) in
                            form_urlencoded::parse(req.uri().query().unwrap_or("").as_bytes())
                        {
                            match &*k {
                                "state" => presented_state = Some(v),
                                "code" => presented_code = Some(v),
                                // space-separated
                                "scope" => tracing::debug!(granted = %v, "redirect carried scopes"),
                                _ => {}
                            }
                        }
                        if presented_state.as_deref() != Some(csrf.secret().as_str()) {
                            return Err("invalid csrf token");
                        }
                        let Some(code) = presented_code else {
                            return Err("no authorization code found");
                        };
                        let code = AuthorizationCode::new(code.into_owned());
                        let _ = got.send(code).await;
                        Ok(Response::new(Full::<Bytes>::from(OAUTH_DONE_HTML)))
                    }
                });
                let mut serve = std::pin::pin!(
                    hyper::server::conn::http1::Builder::new().serve_connection(conn, service)
                );

                tokio::select! {
                    exit = &mut serve => {
                        if let Err(e) = exit {
                            Err(e).context("redirect server got bad request")
                        } else {
                            eyre::bail!("redirect server exit prematurely");
                        }
                    }
                    code = gotten.recv() => {
                        serve.as_mut().graceful_shutdown();
                        // let the success page go out before the connection is dropped
                        if let Err(e) = serve.await {
                            tracing::debug!(error = %e, "redirect connection ended with error");
                        }
                        code.ok_or_else(|| eyre::eyre!("redirect handler went away without a code"))
                    }
                }
            };
            let _ = tx.send(r.await);
        });
        Ok((url, async move {
            rx.await.context("redirect future dropped prematurely")?
        }))
    }
}
