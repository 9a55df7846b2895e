use crate::event::CallEvent;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A number to ring from a `dialout` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialTarget {
    pub number: String,
    /// Ring time in seconds
    pub timeout: u32,
}

impl DialTarget {
    pub fn new(number: impl Into<String>, timeout: u32) -> Self {
        Self {
            number: number.into(),
            timeout,
        }
    }
}

/// Next action for the platform to run on the call.
///
/// Each variant carries exactly the parameters the platform requires for it.
/// Ranges are not checked here; the platform validates them itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "params", rename_all = "snake_case")]
pub enum Command {
    /// Make another call and bridge it on answer
    Dialout {
        ringtone: String,
        cli: String,
        targets: Vec<DialTarget>,
        whisper: String,
        cdr_field: String,
    },
    /// Play a media library entry, or say the text with TTS
    Play { media_id: String },
    /// Play a file captured by `record`
    PlayRecord { media_file: String },
    /// Play a prompt while collecting DTMF
    Read {
        media_id: String,
        attempts: u32,
        max_digits: u32,
        timeout_ms: u32,
    },
    /// Record the caller. Stops on `#`, on silence or at `max_duration`
    /// (both in seconds).
    Record { silence: u32, max_duration: u32 },
    /// Send DTMF digits (`0-9`, `*`, `#`)
    SendDtmf {
        digit: String,
        timeout_ms: u32,
        duration_ms: u32,
    },
    /// Wait for `wait` seconds
    Wait { wait: u32 },
    /// Wait until silence is detected or `timeout_ms` is reached
    WaitForSilence {
        silence_ms: u32,
        iterations: u32,
        timeout_ms: u32,
    },
    /// Hang up the call
    Hangup {},
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Dialout { .. } => "dialout",
            Command::Play { .. } => "play",
            Command::PlayRecord { .. } => "play_record",
            Command::Read { .. } => "read",
            Command::Record { .. } => "record",
            Command::SendDtmf { .. } => "send_dtmf",
            Command::Wait { .. } => "wait",
            Command::WaitForSilence { .. } => "wait_for_silence",
            Command::Hangup {} => "hangup",
        }
    }

    pub fn dialout(
        ringtone: impl Into<String>,
        cli: impl Into<String>,
        targets: Vec<DialTarget>,
        whisper: impl Into<String>,
        cdr_field: impl Into<String>,
    ) -> Self {
        Command::Dialout {
            ringtone: ringtone.into(),
            cli: cli.into(),
            targets,
            whisper: whisper.into(),
            cdr_field: cdr_field.into(),
        }
    }

    pub fn play(media_id: impl Into<String>) -> Self {
        Command::Play {
            media_id: media_id.into(),
        }
    }

    pub fn play_record(media_file: impl Into<String>) -> Self {
        Command::PlayRecord {
            media_file: media_file.into(),
        }
    }

    pub fn read(
        media_id: impl Into<String>,
        attempts: u32,
        max_digits: u32,
        timeout_ms: u32,
    ) -> Self {
        Command::Read {
            media_id: media_id.into(),
            attempts,
            max_digits,
            timeout_ms,
        }
    }

    pub fn record(silence: u32, max_duration: u32) -> Self {
        Command::Record {
            silence,
            max_duration,
        }
    }

    pub fn send_dtmf(digit: impl Into<String>, timeout_ms: u32, duration_ms: u32) -> Self {
        Command::SendDtmf {
            digit: digit.into(),
            timeout_ms,
            duration_ms,
        }
    }

    pub fn wait(wait: u32) -> Self {
        Command::Wait { wait }
    }

    pub fn wait_for_silence(silence_ms: u32, iterations: u32, timeout_ms: u32) -> Self {
        Command::WaitForSilence {
            silence_ms,
            iterations,
            timeout_ms,
        }
    }

    pub fn hangup() -> Self {
        Command::Hangup {}
    }
}

impl Default for Command {
    fn default() -> Self {
        Command::hangup()
    }
}

/// The single reply to a call event: `{command_id, command, params, variables}`.
///
/// Starts as `hangup`. Every variant setter replaces both the command and its
/// params, so the last one called wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandObject {
    pub command_id: u32,
    #[serde(flatten)]
    pub command: Command,
    pub variables: Map<String, Value>,
}

impl Default for CommandObject {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandObject {
    pub fn new() -> Self {
        Self {
            command_id: rand::rng().random_range(100..=999),
            command: Command::default(),
            variables: Map::new(),
        }
    }

    /// A fresh reply carrying the event's variables back to the platform.
    /// Variables that are not a JSON object are dropped.
    pub fn reply_to(event: &CallEvent) -> Self {
        let variables = event.variables().cloned().unwrap_or_default();
        Self::new().with_variables(variables)
    }

    pub fn with_command_id(mut self, command_id: u32) -> Self {
        self.command_id = command_id;
        self
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.command = command;
        self
    }

    pub fn name(&self) -> &'static str {
        self.command.name()
    }

    pub fn set_variable(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn variables_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.variables
    }

    pub fn set_command(&mut self, command: Command) -> &mut Self {
        self.command = command;
        self
    }

    pub fn dialout(
        &mut self,
        ringtone: impl Into<String>,
        cli: impl Into<String>,
        targets: Vec<DialTarget>,
        whisper: impl Into<String>,
        cdr_field: impl Into<String>,
    ) -> &mut Self {
        self.set_command(Command::dialout(ringtone, cli, targets, whisper, cdr_field))
    }

    pub fn play(&mut self, media_id: impl Into<String>) -> &mut Self {
        self.set_command(Command::play(media_id))
    }

    pub fn play_record(&mut self, media_file: impl Into<String>) -> &mut Self {
        self.set_command(Command::play_record(media_file))
    }

    pub fn read(
        &mut self,
        media_id: impl Into<String>,
        attempts: u32,
        max_digits: u32,
        timeout_ms: u32,
    ) -> &mut Self {
        self.set_command(Command::read(media_id, attempts, max_digits, timeout_ms))
    }

    pub fn record(&mut self, silence: u32, max_duration: u32) -> &mut Self {
        self.set_command(Command::record(silence, max_duration))
    }

    pub fn send_dtmf(
        &mut self,
        digit: impl Into<String>,
        timeout_ms: u32,
        duration_ms: u32,
    ) -> &mut Self {
        self.set_command(Command::send_dtmf(digit, timeout_ms, duration_ms))
    }

    pub fn wait(&mut self, wait: u32) -> &mut Self {
        self.set_command(Command::wait(wait))
    }

    pub fn wait_for_silence(
        &mut self,
        silence_ms: u32,
        iterations: u32,
        timeout_ms: u32,
    ) -> &mut Self {
        self.set_command(Command::wait_for_silence(silence_ms, iterations, timeout_ms))
    }

    pub fn hangup(&mut self) -> &mut Self {
        self.set_command(Command::hangup())
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
