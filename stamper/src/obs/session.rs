//! One short-lived obs-websocket connection: hello, identify, one request.

use crate::error::StampError;
use crate::obs::StreamStatus;
use crate::obs::auth::authentication_response;
use crate::obs::protocol::{
    Envelope, GET_STREAM_STATUS, Hello, HelloAuthentication, Identify, OpCode, Outgoing,
    RPC_VERSION, Request, RequestResponse,
};
use eyre::Context;
use futures_util::SinkExt;
use serde::Serialize;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_stream::StreamExt;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// Close code obs-websocket uses when the identify payload fails authentication.
const CLOSE_AUTHENTICATION_FAILED: u16 = 4009;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What the server's hello asked of us, and how far we got.
#[derive(Debug)]
pub(crate) enum AuthState {
    None,
    ChallengeRequired { challenge: String, salt: String },
    Authenticated,
}

pub(crate) struct Session {
    ws: WsStream,
    auth: AuthState,
    /// The `requestId` of the single request in flight, if any.
    pending_request: Option<String>,
    timeout: Duration,
}

impl Session {
    pub(crate) async fn connect(url: &str, timeout: Duration) -> eyre::Result<Self> {
        let (ws, _) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .with_context(|| format!("timed out connecting to OBS WebSocket at {url}"))?
            .with_context(|| format!("connect to OBS WebSocket at {url}"))?;
        tracing::debug!(url, "connected to OBS WebSocket");
        Ok(Self {
            ws,
            auth: AuthState::None,
            pending_request: None,
            timeout,
        })
    }

    pub(crate) fn auth_state(&self) -> &AuthState {
        &self.auth
    }

    /// Reads the hello and identifies, authenticating if the server asked for it.
    pub(crate) async fn handshake(&mut self, password: Option<&str>) -> eyre::Result<()> {
        let hello = self.recv().await.context("receive hello")?;
        let Some(d) = hello.d else {
            return Err(StampError::MalformedMessage("hello has no `d` payload".into()).into());
        };
        let hello: Hello = serde_json::from_value(d).context("parse hello payload")?;

        self.auth = match hello.authentication {
            Some(HelloAuthentication {
                challenge: Some(challenge),
                salt,
            }) => {
                let salt = salt.ok_or_else(|| {
                    StampError::MalformedMessage("hello carries a challenge but no salt".into())
                })?;
                AuthState::ChallengeRequired { challenge, salt }
            }
            _ => AuthState::None,
        };

        let authentication = match &self.auth {
            AuthState::ChallengeRequired { challenge, salt } => {
                let password = password.ok_or(StampError::PasswordRequired)?;
                Some(authentication_response(password, salt, challenge))
            }
            AuthState::None | AuthState::Authenticated => None,
        };
        tracing::debug!(
            auth_required = authentication.is_some(),
            "identifying to OBS WebSocket"
        );

        self.send(&Outgoing::new(
            OpCode::Identify,
            Identify {
                rpc_version: RPC_VERSION,
                authentication,
            },
        ))
        .await
        .context("send identify")?;

        let reply = self.recv().await.context("receive identify result")?;
        if OpCode::Event.matches(reply.op) {
            return Err(StampError::IdentifyRejected.into());
        }
        if matches!(self.auth, AuthState::ChallengeRequired { .. }) {
            self.auth = AuthState::Authenticated;
        }
        Ok(())
    }

    /// Sends one `GetStreamStatus` request and waits for the response that carries its id.
    ///
    /// Anything else the server sends in the meantime (events, responses to other requests)
    /// is discarded.
    pub(crate) async fn stream_status(&mut self) -> eyre::Result<StreamStatus> {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.send(&Outgoing::new(
            OpCode::Request,
            Request {
                request_type: GET_STREAM_STATUS,
                request_id: &request_id,
            },
        ))
        .await
        .context("send GetStreamStatus request")?;
        self.pending_request = Some(request_id);

        let response = loop {
            let message = self
                .recv()
                .await
                .context("await GetStreamStatus response")?;
            if !OpCode::RequestResponse.matches(message.op) {
                tracing::trace!(op = ?message.op, "skipping unrelated message");
                continue;
            }
            let Some(d) = message.d else {
                return Err(
                    StampError::MalformedMessage("request response has no `d` payload".into())
                        .into(),
                );
            };
            let id = d.get("requestId").and_then(serde_json::Value::as_str);
            if id != self.pending_request.as_deref() {
                tracing::trace!(request_id = ?id, "skipping response to another request");
                continue;
            }
            break serde_json::from_value::<RequestResponse>(d)
                .context("parse GetStreamStatus response")?;
        };
        self.pending_request = None;

        let status = response.request_status;
        if !status.result {
            return Err(StampError::RequestFailed {
                code: status.code,
                comment: status.comment,
            }
            .into());
        }
        let data = response.response_data.ok_or_else(|| {
            StampError::MalformedMessage("GetStreamStatus response has no responseData".into())
        })?;
        Ok(StreamStatus::new(
            data.output_active,
            data.output_timecode.as_deref(),
        ))
    }

    /// Closes the connection. Errors are only logged: the server may already be gone.
    pub(crate) async fn close(mut self) {
        if let Err(e) = self.ws.close(None).await {
            tracing::debug!(error = %e, "closing OBS WebSocket");
        }
    }

    async fn send<T: Serialize>(&mut self, message: &Outgoing<T>) -> eyre::Result<()> {
        let json = serde_json::to_string(message).context("serialize OBS WebSocket message")?;
        self.ws
            .send(Message::text(json))
            .await
            .context("write to OBS WebSocket")
    }

    async fn recv(&mut self) -> eyre::Result<Envelope> {
        loop {
            let frame = tokio::time::timeout(self.timeout, self.ws.next())
                .await
                .with_context(|| format!("no message from OBS WebSocket within {:?}", self.timeout))?;
            let Some(frame) = frame else {
                eyre::bail!("OBS WebSocket connection ended unexpectedly");
            };
            match frame.context("read from OBS WebSocket")? {
                Message::Text(text) => {
                    return serde_json::from_str(&text).context("parse OBS WebSocket message");
                }
                Message::Close(frame) => return Err(closed_by_server(frame)),
                Message::Binary(_) => tracing::debug!("ignoring binary frame"),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }
}

fn closed_by_server(frame: Option<CloseFrame>) -> eyre::Report {
    let Some(frame) = frame else {
        return eyre::eyre!("OBS WebSocket closed the connection");
    };
    let code = u16::from(frame.code);
    let msg = format!(
        "OBS WebSocket closed the connection (code {code}): {}",
        &*frame.reason
    );
    if code == CLOSE_AUTHENTICATION_FAILED {
        eyre::Report::new(StampError::IdentifyRejected).wrap_err(msg)
    } else {
        eyre::eyre!(msg)
    }
}
