//! mpv JSON IPC messages
//!
//! Reference: https://mpv.io/manual/master/#json-ipc

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Observer id for `time-pos`
pub const OBSERVE_TIME_POS: i64 = 1;
/// Observer id for `duration`
pub const OBSERVE_DURATION: i64 = 2;

/// A command without its request id (assigned by the writer)
#[derive(Debug, Clone, PartialEq)]
pub struct MpvCommand {
    pub args: Vec<Value>,
}

impl MpvCommand {
    pub fn new(args: Vec<Value>) -> Self {
        Self { args }
    }

    /// Replace whatever is playing with `url`
    pub fn loadfile(url: &str) -> Self {
        Self::new(vec!["loadfile".into(), url.into(), "replace".into()])
    }

    pub fn seek_absolute(position: f64) -> Self {
        Self::new(vec!["seek".into(), position.into(), "absolute".into()])
    }

    pub fn set_pause(paused: bool) -> Self {
        Self::new(vec!["set_property".into(), "pause".into(), paused.into()])
    }

    pub fn set_speed(speed: f64) -> Self {
        Self::new(vec!["set_property".into(), "speed".into(), speed.into()])
    }

    pub fn observe_property(id: i64, name: &str) -> Self {
        Self::new(vec!["observe_property".into(), id.into(), name.into()])
    }

    pub fn stop() -> Self {
        Self::new(vec!["stop".into()])
    }

    pub fn quit() -> Self {
        Self::new(vec!["quit".into()])
    }

    /// Wire form: one JSON object per line
    pub fn to_line(&self, request_id: i64) -> Result<String, serde_json::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            command: &'a [Value],
            request_id: i64,
        }
        let mut line = serde_json::to_string(&Wire {
            command: &self.args,
            request_id,
        })?;
        line.push('\n');
        Ok(line)
    }
}

/// Reply to a command
#[derive(Debug, Clone, Deserialize)]
pub struct MpvResponse {
    pub error: String,
    pub data: Option<Value>,
    pub request_id: i64,
}

impl MpvResponse {
    pub fn is_success(&self) -> bool {
        self.error == "success"
    }
}

/// Asynchronous event (property changes, end of file, ...)
#[derive(Debug, Clone, Deserialize)]
pub struct MpvEvent {
    pub event: String,
    pub id: Option<i64>,
    pub name: Option<String>,
    pub data: Option<Value>,
    /// `end-file` reason: eof, stop, quit, error, redirect
    pub reason: Option<String>,
    pub file_error: Option<String>,
}

/// One line read from the socket
#[derive(Debug, Clone)]
pub enum MpvMessage {
    Response(MpvResponse),
    Event(MpvEvent),
}

impl MpvMessage {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(line)?;
        if value.get("event").is_some() {
            Ok(MpvMessage::Event(serde_json::from_value(value)?))
        } else {
            Ok(MpvMessage::Response(serde_json::from_value(value)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_format() {
        let line = MpvCommand::set_speed(2.0).to_line(7).unwrap();
        assert_eq!(
            line,
            "{\"command\":[\"set_property\",\"speed\",2.0],\"request_id\":7}\n"
        );
    }

    #[test]
    fn test_parse_property_change() {
        let msg = MpvMessage::parse(r#"{"event":"property-change","id":1,"name":"time-pos","data":12.5}"#)
            .unwrap();
        match msg {
            MpvMessage::Event(e) => {
                assert_eq!(e.id, Some(OBSERVE_TIME_POS));
                assert_eq!(e.data.and_then(|d| d.as_f64()), Some(12.5));
            }
            other => panic!("Expected event, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_end_file_error() {
        let msg = MpvMessage::parse(
            r#"{"event":"end-file","reason":"error","file_error":"loading failed"}"#,
        )
        .unwrap();
        match msg {
            MpvMessage::Event(e) => {
                assert_eq!(e.reason.as_deref(), Some("error"));
                assert_eq!(e.file_error.as_deref(), Some("loading failed"));
            }
            other => panic!("Expected event, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_response() {
        let msg = MpvMessage::parse(r#"{"error":"success","data":null,"request_id":3}"#).unwrap();
        assert!(matches!(msg, MpvMessage::Response(r) if r.is_success() && r.request_id == 3));
    }
}
