use crate::{
    command::CommandObject,
    event::{CallEvent, CallStatus},
    server::CallHandler,
};
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

const WELCOMED: &str = "welcomed";

/// Plays a welcome prompt on a new call, then hangs up.
pub struct WelcomeApp {
    media_id: String,
}

impl WelcomeApp {
    pub fn new(media_id: impl Into<String>) -> Self {
        Self {
            media_id: media_id.into(),
        }
    }
}

#[async_trait]
impl CallHandler for WelcomeApp {
    async fn on_event(&self, event: CallEvent) -> Result<CommandObject> {
        let mut reply = CommandObject::reply_to(&event);
        let welcomed = event.variable(WELCOMED).and_then(|v| v.as_bool()) == Some(true);

        let callid = event.callid().unwrap_or("-");

        if event.call_status() == Some(CallStatus::IncomingCall) && !welcomed {
            info!(
                callid,
                cli_number = event.cli_number().unwrap_or("-"),
                number = event.number().unwrap_or("-"),
                media_id = self.media_id.as_str(),
                "welcoming caller"
            );
            reply.play(self.media_id.clone()).set_variable(WELCOMED, true);
        } else {
            if let Some(error) = event.command_error() {
                info!(
                    callid,
                    command = event.command().unwrap_or("-"),
                    "previous command failed: {}",
                    error
                );
            }
            reply.hangup();
        }
        Ok(reply)
    }
}
