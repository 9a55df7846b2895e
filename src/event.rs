use crate::error::ServerError;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Every key a call event must carry, in declaration order.
///
/// The decoder reports the first one missing from this list.
pub const CALL_EVENT_FIELDS: [&str; 13] = [
    "app",
    "callid",
    "request_hash",
    "cli_name",
    "cli_number",
    "number",
    "command",
    "command_id",
    "command_result",
    "command_error",
    "date_started",
    "variables",
    "call_status",
];

/// Call lifecycle state reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallStatus {
    #[serde(rename = "INCOMING_CALL")]
    IncomingCall,
    #[serde(rename = "UP")]
    Up,
    #[serde(rename = "HANGUP")]
    Hangup,
    /// The target number is busy
    #[serde(rename = "BUSY")]
    Busy,
    /// The call was not answered in time
    #[serde(rename = "NOANSWER")]
    NoAnswer,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::IncomingCall => "INCOMING_CALL",
            CallStatus::Up => "UP",
            CallStatus::Hangup => "HANGUP",
            CallStatus::Busy => "BUSY",
            CallStatus::NoAnswer => "NOANSWER",
        }
    }

    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "INCOMING_CALL" => Some(CallStatus::IncomingCall),
            "UP" => Some(CallStatus::Up),
            "HANGUP" => Some(CallStatus::Hangup),
            "BUSY" => Some(CallStatus::Busy),
            "NOANSWER" => Some(CallStatus::NoAnswer),
            _ => None,
        }
    }

    /// The call is over; any command sent back is moot.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallStatus::Hangup | CallStatus::Busy | CallStatus::NoAnswer
        )
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event posted by the platform at call setup and after each command.
///
/// Values are kept exactly as received; the accessors give typed views and
/// return `None` when a value does not have the expected shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEvent {
    pub app: Value,
    pub callid: Value,
    /// Platform request id for inbound calls, `false` for outbound ones
    pub request_hash: Value,
    pub cli_name: Value,
    pub cli_number: Value,
    pub number: Value,
    /// Previous command
    pub command: Value,
    /// Id of the previous command, an empty string on the first event
    pub command_id: Value,
    /// Result of the previous command, shape depends on the command
    pub command_result: Value,
    pub command_error: Value,
    pub date_started: Value,
    pub variables: Value,
    pub call_status: Value,
}

impl CallEvent {
    pub fn app(&self) -> Option<&str> {
        self.app.as_str()
    }

    pub fn callid(&self) -> Option<&str> {
        self.callid.as_str()
    }

    pub fn cli_name(&self) -> Option<&str> {
        self.cli_name.as_str()
    }

    pub fn cli_number(&self) -> Option<&str> {
        self.cli_number.as_str()
    }

    pub fn number(&self) -> Option<&str> {
        self.number.as_str()
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_str()
    }

    pub fn command_error(&self) -> Option<&str> {
        self.command_error.as_str()
    }

    pub fn call_status(&self) -> Option<CallStatus> {
        self.call_status.as_str().and_then(CallStatus::parse)
    }

    pub fn is_outbound(&self) -> bool {
        self.request_hash == Value::Bool(false)
    }

    pub fn request_hash(&self) -> Option<&str> {
        self.request_hash.as_str()
    }

    /// Previous command id, whether echoed as a number or as text.
    pub fn command_id(&self) -> Option<i64> {
        match &self.command_id {
            Value::Number(id) => id.as_i64(),
            Value::String(text) => text.parse().ok(),
            _ => None,
        }
    }

    pub fn variables(&self) -> Option<&Map<String, Value>> {
        self.variables.as_object()
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables().and_then(|variables| variables.get(name))
    }

    /// `date_started` as a timestamp, accepting RFC 3339 or the platform's
    /// `YYYY-MM-DD HH:MM:SS` (taken as UTC).
    pub fn started_at(&self) -> Option<DateTime<FixedOffset>> {
        let date_started = self.date_started.as_str()?;
        if let Ok(ts) = DateTime::parse_from_rfc3339(date_started) {
            return Some(ts);
        }
        NaiveDateTime::parse_from_str(date_started, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|naive| naive.and_utc().fixed_offset())
    }
}

/// Decode a raw webhook body into a [`CallEvent`].
///
/// Once every field of [`CALL_EVENT_FIELDS`] is present the event is
/// accepted, whatever the values look like.
pub fn decode(body: &[u8]) -> Result<CallEvent, ServerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ServerError::EmptyRequest);
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ServerError::InvalidRequest(format!("malformed json: {}", e)))?;
    let mut object = match value {
        Value::Object(object) => object,
        _ => {
            return Err(ServerError::InvalidRequest(
                "body is not a json object".to_string(),
            ))
        }
    };

    if let Some(missing) = CALL_EVENT_FIELDS
        .iter()
        .find(|field| !object.contains_key(**field))
    {
        return Err(ServerError::MissingProperty(missing.to_string()));
    }

    let mut take = |field: &str| object.remove(field).unwrap_or(Value::Null);
    Ok(CallEvent {
        app: take("app"),
        callid: take("callid"),
        request_hash: take("request_hash"),
        cli_name: take("cli_name"),
        cli_number: take("cli_number"),
        number: take("number"),
        command: take("command"),
        command_id: take("command_id"),
        command_result: take("command_result"),
        command_error: take("command_error"),
        date_started: take("date_started"),
        variables: take("variables"),
        call_status: take("call_status"),
    })
}
