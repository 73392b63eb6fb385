//! Wire format of the control socket.
//!
//! One JSON object per line in each direction. A client writes a single
//! [`Request`] and reads a single [`Response`]:
//!
//! ```text
//! → {"command":"set_mode","mode":"always-on"}
//! ← {"ok":true,"status":{"mode":"always-on", ...}}
//! ← {"ok":false,"error":"unknown mode 'disco' (available: ...)"}
//! ```

use serde::{Deserialize, Serialize};
use std::sync::mpsc::Sender;

use crate::core::{Command, Direction, MotionLocation, Reply, StatusReport};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Request {
    Status,
    SetMode { mode: String },
    Trigger { location: MotionLocation },
    Test { direction: Direction },
}

impl Request {
    /// Turn the request into a core command answered on `reply`.
    pub fn into_command(self, reply: Sender<Reply>) -> Command {
        match self {
            Request::Status => Command::Status { reply },
            Request::SetMode { mode } => Command::SetMode { mode, reply },
            Request::Trigger { location } => Command::Trigger { location, reply },
            Request::Test { direction } => Command::Test { direction, reply },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn success(status: StatusReport) -> Self {
        Self {
            ok: true,
            status: Some(status),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            status: None,
            error: Some(error.into()),
        }
    }
}

impl From<Reply> for Response {
    fn from(reply: Reply) -> Self {
        match reply {
            Ok(status) => Response::success(status),
            Err(rejected) => Response::failure(rejected.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModeRejected;

    #[test]
    fn test_request_wire_format() {
        let request = Request::SetMode {
            mode: "always-on".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"command":"set_mode","mode":"always-on"}"#
        );

        let parsed: Request =
            serde_json::from_str(r#"{"command":"trigger","location":"bottom"}"#).unwrap();
        assert_eq!(
            parsed,
            Request::Trigger {
                location: MotionLocation::Bottom
            }
        );

        let parsed: Request = serde_json::from_str(r#"{"command":"status"}"#).unwrap();
        assert_eq!(parsed, Request::Status);
    }

    #[test]
    fn test_unknown_location_does_not_parse() {
        let parsed = serde_json::from_str::<Request>(r#"{"command":"trigger","location":"middle"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_rejection_becomes_error_response() {
        let response = Response::from(Err(ModeRejected::InvalidArgument {
            kind: "direction",
            requested: "sideways".to_string(),
        }));
        assert!(!response.ok);
        assert_eq!(response.error.as_deref(), Some("unknown direction 'sideways'"));
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"ok":false,"error":"unknown direction 'sideways'"}"#
        );
    }

    #[test]
    fn test_into_command_keeps_arguments() {
        let (tx, _rx) = std::sync::mpsc::channel();
        let command = Request::Test {
            direction: Direction::Descending,
        }
        .into_command(tx);
        assert!(matches!(
            command,
            Command::Test {
                direction: Direction::Descending,
                ..
            }
        ));
    }
}
