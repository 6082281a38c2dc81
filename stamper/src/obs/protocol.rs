//! obs-websocket 5.x message shapes used by the stream-status exchange.
//!
//! Every frame is a JSON object `{"op": <opcode>, "d": <payload>}`.
//!
//! See: <https://github.com/obsproject/obs-websocket/blob/master/docs/generated/protocol.md>

use serde::{Deserialize, Serialize};

/// The RPC version this client speaks.
pub const RPC_VERSION: u32 = 1;

/// The request type used to read the output status.
pub const GET_STREAM_STATUS: &str = "GetStreamStatus";

/// Message opcodes, as carried in the `op` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    /// Server greeting, sent immediately after connecting.
    Hello = 0,
    /// Client identification (and authentication) request.
    Identify = 1,
    /// Server acknowledgement of a successful identify.
    Identified = 2,
    /// Any reply with this opcode in answer to an identify is treated as a rejection.
    Event = 5,
    /// A request from the client.
    Request = 6,
    /// A response to a [`OpCode::Request`].
    RequestResponse = 7,
}

impl OpCode {
    pub fn matches(self, op: Option<u8>) -> bool {
        op == Some(self as u8)
    }
}

/// Any inbound frame, before its payload has been interpreted.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub op: Option<u8>,
    #[serde(default)]
    pub d: Option<serde_json::Value>,
}

/// An outbound frame.
#[derive(Debug, Serialize)]
pub struct Outgoing<T> {
    pub op: u8,
    pub d: T,
}

impl<T> Outgoing<T> {
    pub fn new(op: OpCode, d: T) -> Self {
        Self { op: op as u8, d }
    }
}

/// Payload of [`OpCode::Hello`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hello {
    #[serde(default)]
    pub authentication: Option<HelloAuthentication>,
}

/// The challenge/salt pair the server sends when a password is set.
#[derive(Debug, Deserialize)]
pub struct HelloAuthentication {
    #[serde(default)]
    pub challenge: Option<String>,
    #[serde(default)]
    pub salt: Option<String>,
}

/// Payload of [`OpCode::Identify`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identify {
    pub rpc_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<String>,
}

/// Payload of [`OpCode::Request`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request<'a> {
    pub request_type: &'a str,
    pub request_id: &'a str,
}

/// Payload of [`OpCode::RequestResponse`] for `GetStreamStatus`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResponse {
    pub request_id: String,
    pub request_status: RequestStatus,
    #[serde(default)]
    pub response_data: Option<StreamStatusData>,
}

#[derive(Debug, Deserialize)]
pub struct RequestStatus {
    pub result: bool,
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// The subset of the `GetStreamStatus` response data this client reads.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStatusData {
    pub output_active: bool,
    #[serde(default)]
    pub output_timecode: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn identify_omits_missing_authentication() {
        let bare = Outgoing::new(
            OpCode::Identify,
            Identify {
                rpc_version: RPC_VERSION,
                authentication: None,
            },
        );
        assert_eq!(
            serde_json::to_value(&bare).unwrap(),
            json!({"op": 1, "d": {"rpcVersion": 1}})
        );

        let authed = Outgoing::new(
            OpCode::Identify,
            Identify {
                rpc_version: RPC_VERSION,
                authentication: Some("abc=".into()),
            },
        );
        assert_eq!(
            serde_json::to_value(&authed).unwrap(),
            json!({"op": 1, "d": {"rpcVersion": 1, "authentication": "abc="}})
        );
    }

    #[test]
    fn stream_status_request_shape() {
        let req = Outgoing::new(
            OpCode::Request,
            Request {
                request_type: GET_STREAM_STATUS,
                request_id: "42",
            },
        );
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"op": 6, "d": {"requestType": "GetStreamStatus", "requestId": "42"}})
        );
    }

    #[test]
    fn parses_stream_status_response() {
        let raw = json!({
            "requestId": "42",
            "requestType": "GetStreamStatus",
            "requestStatus": {"result": true, "code": 100},
            "responseData": {
                "outputActive": true,
                "outputReconnecting": false,
                "outputTimecode": "00:10:00.250",
                "outputDuration": 600250,
                "outputBytes": 1024
            }
        });
        let resp: RequestResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(resp.request_id, "42");
        assert!(resp.request_status.result);
        let data = resp.response_data.unwrap();
        assert!(data.output_active);
        assert_eq!(data.output_timecode.as_deref(), Some("00:10:00.250"));
    }

    #[test]
    fn hello_without_authentication() {
        let hello: Hello =
            serde_json::from_value(json!({"obsWebSocketVersion": "5.5.0", "rpcVersion": 1}))
                .unwrap();
        assert!(hello.authentication.is_none());
    }
}
