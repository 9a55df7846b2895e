use crate::{
    command::CommandObject,
    error::ServerError,
    event::{decode, CallEvent},
    response::{banner_header, CommandResponse},
};
use anyhow::Result;
use async_trait::async_trait;
use http::HeaderValue;
use serde_json::Value;
use std::{fmt, sync::Arc, time::Instant};
use tracing::{debug, info, warn};

/// Application logic: turns a validated call event into the next command.
///
/// Called once per webhook request. Any state that must survive to the next
/// request goes into the returned command's `variables`.
#[async_trait]
pub trait CallHandler: Send + Sync {
    /// Returning `Err` counts as an invalid result: the exchange fails with
    /// [`ServerError::InvalidCallbackResult`] and no command is sent.
    async fn on_event(&self, event: CallEvent) -> Result<CommandObject>;
}

/// Adapts a plain function into a [`CallHandler`].
pub struct FnHandler<F>(F);

pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(CallEvent) -> CommandObject + Send + Sync,
{
    FnHandler(f)
}

#[async_trait]
impl<F> CallHandler for FnHandler<F>
where
    F: Fn(CallEvent) -> CommandObject + Send + Sync,
{
    async fn on_event(&self, event: CallEvent) -> Result<CommandObject> {
        Ok((self.0)(event))
    }
}

/// Adapts a function producing untyped JSON. The value must have the shape of
/// a command object or the exchange fails.
pub struct JsonHandler<F>(F);

pub fn json_handler_fn<F>(f: F) -> JsonHandler<F>
where
    F: Fn(CallEvent) -> Value + Send + Sync,
{
    JsonHandler(f)
}

#[async_trait]
impl<F> CallHandler for JsonHandler<F>
where
    F: Fn(CallEvent) -> Value + Send + Sync,
{
    async fn on_event(&self, event: CallEvent) -> Result<CommandObject> {
        let value = (self.0)(event);
        serde_json::from_value(value)
            .map_err(|e| anyhow::anyhow!("not a command object: {}", e))
    }
}

/// Progress of one webhook exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Decoding,
    Invoking,
    Serializing,
    Sent,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Decoding => "decoding",
            Stage::Invoking => "invoking",
            Stage::Serializing => "serializing",
            Stage::Sent => "sent",
        };
        f.write_str(name)
    }
}

/// One request/response pair. `run` consumes it, so an exchange produces at
/// most one response.
pub struct Exchange<'a> {
    body: &'a [u8],
    stage: Stage,
    started_at: Instant,
}

impl<'a> Exchange<'a> {
    pub fn new(body: &'a [u8]) -> Self {
        Self {
            body,
            stage: Stage::Idle,
            started_at: Instant::now(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, stage: Stage) {
        debug!(from = %self.stage, to = %stage, "exchange stage");
        self.stage = stage;
    }

    fn fail(&self, err: &ServerError) {
        warn!(
            stage = %self.stage,
            body_len = self.body.len(),
            elapsed_ms = self.started_at.elapsed().as_millis(),
            "exchange failed: {}",
            err
        );
    }

    pub async fn run(
        mut self,
        handler: &dyn CallHandler,
        banner: &HeaderValue,
    ) -> Result<CommandResponse, ServerError> {
        self.advance(Stage::Decoding);
        let event = decode(self.body).inspect_err(|e| self.fail(e))?;
        let callid = event.callid().unwrap_or("-").to_string();
        let call_status = event.call_status().map(|s| s.as_str()).unwrap_or("-");
        debug!(
            callid,
            call_status,
            command = event.command().unwrap_or("-"),
            "call event decoded"
        );

        self.advance(Stage::Invoking);
        let command = handler
            .on_event(event)
            .await
            .map_err(|e| ServerError::InvalidCallbackResult(e.to_string()))
            .inspect_err(|e| self.fail(e))?;

        self.advance(Stage::Serializing);
        let response = CommandResponse::new(&command, banner)
            .map_err(|e| ServerError::InvalidCallbackResult(e.to_string()))
            .inspect_err(|e| self.fail(e))?;

        self.advance(Stage::Sent);
        info!(
            callid,
            call_status,
            command = command.name(),
            command_id = command.command_id,
            elapsed_ms = self.started_at.elapsed().as_millis(),
            "command sent"
        );
        Ok(response)
    }
}

/// Request/response orchestrator shared by every webhook request.
///
/// Holds no per-call state; each request gets its own [`Exchange`].
#[derive(Clone)]
pub struct RealtimeServer {
    handler: Arc<dyn CallHandler>,
    banner: HeaderValue,
}

impl RealtimeServer {
    pub fn new(handler: Arc<dyn CallHandler>) -> Self {
        Self {
            handler,
            banner: banner_header(None),
        }
    }

    pub fn with_banner(mut self, name: &str) -> Self {
        self.banner = banner_header(Some(name));
        self
    }

    pub fn banner(&self) -> &HeaderValue {
        &self.banner
    }

    pub async fn handle(&self, body: &[u8]) -> Result<CommandResponse, ServerError> {
        Exchange::new(body)
            .run(self.handler.as_ref(), &self.banner)
            .await
    }
}

/// Run a single exchange with the default banner.
pub async fn handle(
    body: &[u8],
    handler: &dyn CallHandler,
) -> Result<CommandResponse, ServerError> {
    Exchange::new(body)
        .run(handler, &banner_header(None))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::event::CallStatus;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn incoming_call() -> Value {
        json!({
            "app": "A1",
            "callid": "C1",
            "request_hash": false,
            "cli_name": "Bob",
            "cli_number": "555",
            "number": "600",
            "command": "",
            "command_id": "",
            "command_result": null,
            "command_error": null,
            "date_started": "2024-01-01T00:00:00Z",
            "variables": {},
            "call_status": "INCOMING_CALL"
        })
    }

    #[tokio::test]
    async fn test_play_welcome() {
        let handler = handler_fn(|_event| {
            let mut reply = CommandObject::new();
            reply.play("welcome.wav");
            reply
        });
        let body = incoming_call().to_string();
        let response = handle(body.as_bytes(), &handler).await.unwrap();

        assert_eq!(response.status, http::StatusCode::OK);
        let value: Value = serde_json::from_slice(&response.body).unwrap();
        let command_id = value["command_id"].as_u64().unwrap();
        assert!((100..=999).contains(&command_id));
        assert_eq!(
            value,
            json!({
                "command_id": command_id,
                "command": "play",
                "params": {"media_id": "welcome.wav"},
                "variables": {}
            })
        );
    }

    #[tokio::test]
    async fn test_plain_mapping_is_rejected() {
        let handler = json_handler_fn(|_event| json!({"media_id": "welcome.wav"}));
        let body = incoming_call().to_string();
        let err = handle(body.as_bytes(), &handler).await.unwrap_err();
        assert!(matches!(err, ServerError::InvalidCallbackResult(_)));
    }

    #[tokio::test]
    async fn test_json_handler_accepts_command_object() {
        let handler = json_handler_fn(|event| {
            json!({
                "command_id": 777,
                "command": "read",
                "params": {
                    "media_id": "menu.wav",
                    "attempts": 3,
                    "max_digits": 1,
                    "timeout_ms": 5000
                },
                "variables": {"callid": event.callid}
            })
        });
        let body = incoming_call().to_string();
        let response = handle(body.as_bytes(), &handler).await.unwrap();
        let value: Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(value["command_id"], 777);
        assert_eq!(value["command"], "read");
        assert_eq!(value["variables"], json!({"callid": "C1"}));
    }

    struct FailingApp;

    #[async_trait]
    impl CallHandler for FailingApp {
        async fn on_event(&self, _event: CallEvent) -> Result<CommandObject> {
            Err(anyhow::anyhow!("database unavailable"))
        }
    }

    #[tokio::test]
    async fn test_handler_error() {
        let body = incoming_call().to_string();
        let err = handle(body.as_bytes(), &FailingApp).await.unwrap_err();
        assert_eq!(
            err,
            ServerError::InvalidCallbackResult("database unavailable".to_string())
        );
    }

    #[tokio::test]
    async fn test_decode_failure_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = handler_fn(move |_event| {
            counter.fetch_add(1, Ordering::SeqCst);
            CommandObject::new()
        });

        assert_eq!(
            handle(b"", &handler).await.unwrap_err(),
            ServerError::EmptyRequest
        );
        assert!(matches!(
            handle(b"not json", &handler).await.unwrap_err(),
            ServerError::InvalidRequest(_)
        ));
        let mut partial = incoming_call();
        partial.as_object_mut().unwrap().remove("call_status");
        assert_eq!(
            handle(partial.to_string().as_bytes(), &handler)
                .await
                .unwrap_err(),
            ServerError::MissingProperty("call_status".to_string())
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_variables_round_trip() {
        let server = RealtimeServer::new(Arc::new(handler_fn(|event| {
            let step = event.variable("step").and_then(Value::as_u64).unwrap_or(0);
            let mut reply = CommandObject::reply_to(&event);
            reply.set_variable("step", step + 1);
            if event.call_status() == Some(CallStatus::Up) {
                reply.set_command(Command::wait(1));
            }
            reply
        })));

        let mut event = incoming_call();
        event["call_status"] = json!("UP");
        event["variables"] = json!({"step": 4, "lang": "fr"});
        let response = server.handle(event.to_string().as_bytes()).await.unwrap();
        let value: Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(value["command"], "wait");
        assert_eq!(value["variables"], json!({"step": 5, "lang": "fr"}));
    }

    #[tokio::test]
    async fn test_concurrent_exchanges_are_isolated() {
        let server = RealtimeServer::new(Arc::new(handler_fn(|event| {
            let mut reply = CommandObject::reply_to(&event);
            reply.play(event.callid().unwrap_or_default());
            reply
        })))
        .with_banner("Realtime Basic Server 1.0");

        let mut tasks = Vec::new();
        for i in 0..16 {
            let server = server.clone();
            let mut event = incoming_call();
            event["callid"] = json!(format!("call-{}", i));
            event["variables"] = json!({"index": i});
            tasks.push(tokio::spawn(async move {
                server.handle(event.to_string().as_bytes()).await
            }));
        }

        for (i, task) in tasks.into_iter().enumerate() {
            let response = task.await.unwrap().unwrap();
            assert_eq!(
                response.headers[http::header::USER_AGENT],
                "Realtime Basic Server 1.0"
            );
            let value: Value = serde_json::from_slice(&response.body).unwrap();
            assert_eq!(value["params"]["media_id"], format!("call-{}", i));
            assert_eq!(value["variables"], json!({"index": i}));
        }
    }

    #[test]
    fn test_exchange_starts_idle() {
        assert_eq!(Exchange::new(b"{}").stage(), Stage::Idle);
        assert_eq!(Stage::Serializing.to_string(), "serializing");
    }
}
