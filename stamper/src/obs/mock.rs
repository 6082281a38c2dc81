//! A scripted obs-websocket server for exercising [`super::ObsClient`] in tests.
//!
//! The server accepts exactly one connection, plays the script, and records what the client
//! did so that tests can assert on it after [`RunningMock::finish`].

use crate::obs::auth::authentication_response;
use futures_util::SinkExt;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

const SALT: &str = "lM1GncleQOaCu9lT1yeUZhFYnqhsLLP1G5lAGo3ixaI=";
const CHALLENGE: &str = "+IxH4CnCiqpX1rM9scsNynZzbOe4KhDeYcTNS3PDaeY=";

#[derive(Debug, Clone, Copy)]
pub(crate) enum IdentifyReply {
    Identified,
    Op5,
}

#[derive(Debug)]
pub(crate) struct MockObs {
    password: Option<String>,
    identify_reply: IdentifyReply,
    active: bool,
    timecode: String,
    failed_request: bool,
    noise: bool,
    malformed_hello: bool,
    silent: bool,
}

/// What the mock observed from the client.
#[derive(Debug, Default)]
pub(crate) struct Seen {
    /// `None` if the client never sent an authenticated identify.
    pub authentication_ok: Option<bool>,
    pub request_type: Option<String>,
    /// Whether the client sent a close frame.
    pub client_closed: bool,
}

pub(crate) struct RunningMock {
    url: String,
    handle: JoinHandle<Seen>,
}

impl RunningMock {
    pub(crate) fn url(&self) -> String {
        self.url.clone()
    }

    pub(crate) async fn finish(self) -> Seen {
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("mock OBS server did not finish")
            .expect("mock OBS server panicked")
    }
}

impl MockObs {
    pub(crate) fn new() -> Self {
        Self {
            password: None,
            identify_reply: IdentifyReply::Identified,
            active: true,
            timecode: "00:00:00.000".into(),
            failed_request: false,
            noise: false,
            malformed_hello: false,
            silent: false,
        }
    }

    pub(crate) fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.into());
        self
    }

    pub(crate) fn with_status(mut self, active: bool, timecode: &str) -> Self {
        self.active = active;
        self.timecode = timecode.into();
        self
    }

    pub(crate) fn with_identify_reply(mut self, reply: IdentifyReply) -> Self {
        self.identify_reply = reply;
        self
    }

    pub(crate) fn with_failed_request(mut self) -> Self {
        self.failed_request = true;
        self
    }

    /// Interleave an event and a response to some other request before the real response.
    pub(crate) fn with_noise(mut self) -> Self {
        self.noise = true;
        self
    }

    pub(crate) fn with_malformed_hello(mut self) -> Self {
        self.malformed_hello = true;
        self
    }

    /// Accept the connection but never say anything.
    pub(crate) fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    pub(crate) async fn spawn(self) -> RunningMock {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let mut seen = Seen::default();
            self.play(&mut ws, &mut seen).await;
            drain_until_close(&mut ws, &mut seen).await;
            seen
        });
        RunningMock { url, handle }
    }

    async fn play(&self, ws: &mut WebSocketStream<TcpStream>, seen: &mut Seen) {
        if self.silent {
            return;
        }

        if self.malformed_hello {
            send(ws, json!({"op": 0})).await;
            return;
        }
        let mut hello = json!({"obsWebSocketVersion": "5.5.0", "rpcVersion": 1});
        if self.password.is_some() {
            hello["authentication"] = json!({"challenge": CHALLENGE, "salt": SALT});
        }
        send(ws, json!({"op": 0, "d": hello})).await;

        let Some(identify) = next_json(ws, seen).await else {
            return;
        };
        assert_eq!(identify["op"], 1);
        assert_eq!(identify["d"]["rpcVersion"], 1);
        if let Some(password) = &self.password {
            let expected = authentication_response(password, SALT, CHALLENGE);
            let ok = identify["d"]["authentication"].as_str() == Some(expected.as_str());
            seen.authentication_ok = Some(ok);
            if !ok {
                let _ = ws
                    .close(Some(CloseFrame {
                        code: CloseCode::from(4009),
                        reason: "Authentication failed.".into(),
                    }))
                    .await;
                return;
            }
        }

        match self.identify_reply {
            IdentifyReply::Identified => {
                send(ws, json!({"op": 2, "d": {"negotiatedRpcVersion": 1}})).await;
            }
            IdentifyReply::Op5 => {
                send(
                    ws,
                    json!({"op": 5, "d": {"eventType": "ExitStarted", "eventIntent": 1}}),
                )
                .await;
                return;
            }
        }

        let Some(request) = next_json(ws, seen).await else {
            return;
        };
        assert_eq!(request["op"], 6);
        seen.request_type = request["d"]["requestType"].as_str().map(String::from);
        let request_id = request["d"]["requestId"].clone();

        if self.noise {
            send(
                ws,
                json!({"op": 5, "d": {"eventType": "CurrentProgramSceneChanged", "eventIntent": 4}}),
            )
            .await;
            send(
                ws,
                json!({"op": 7, "d": {
                    "requestType": "GetVersion",
                    "requestId": "someone-else",
                    "requestStatus": {"result": true, "code": 100},
                    "responseData": {"obsVersion": "30.1.2"}
                }}),
            )
            .await;
        }

        let response = if self.failed_request {
            json!({
                "requestType": "GetStreamStatus",
                "requestId": request_id,
                "requestStatus": {"result": false, "code": 501, "comment": "output unavailable"}
            })
        } else {
            json!({
                "requestType": "GetStreamStatus",
                "requestId": request_id,
                "requestStatus": {"result": true, "code": 100},
                "responseData": {
                    "outputActive": self.active,
                    "outputReconnecting": false,
                    "outputTimecode": self.timecode,
                    "outputDuration": 0,
                    "outputCongestion": 0.0,
                    "outputBytes": 0,
                    "outputSkippedFrames": 0,
                    "outputTotalFrames": 0
                }
            })
        };
        send(ws, json!({"op": 7, "d": response})).await;
    }
}

async fn send(ws: &mut WebSocketStream<TcpStream>, value: Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

/// The next text frame as JSON, or `None` once the client closed.
async fn next_json(ws: &mut WebSocketStream<TcpStream>, seen: &mut Seen) -> Option<Value> {
    while let Some(frame) = ws.next().await {
        match frame {
            Ok(Message::Text(text)) => return Some(serde_json::from_str(&text).unwrap()),
            Ok(Message::Close(_)) => {
                seen.client_closed = true;
                return None;
            }
            Ok(_) => {}
            Err(_) => return None,
        }
    }
    None
}

async fn drain_until_close(ws: &mut WebSocketStream<TcpStream>, seen: &mut Seen) {
    if seen.client_closed {
        return;
    }
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        while next_json(ws, seen).await.is_some() {}
    })
    .await;
}
