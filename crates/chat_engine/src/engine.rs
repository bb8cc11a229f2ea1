use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use chat_logging::{chat_info, chat_warn};
use tokio_util::sync::CancellationToken;

use crate::client::{ChatClient, ClientSettings, EventSink};
use crate::{EngineEvent, FailureKind, RequestId, StreamError};

enum EngineCommand {
    Send { request_id: RequestId, prompt: String },
    Cancel { request_id: RequestId },
}

type CancelMap = Arc<Mutex<HashMap<RequestId, CancellationToken>>>;

/// Runs chat requests on a background tokio runtime.
///
/// Every `send` ends with exactly one `EngineEvent::Finished` on the sink.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub fn new(settings: ClientSettings, sink: Arc<dyn EventSink>) -> Result<Self, StreamError> {
        let client = Arc::new(ChatClient::new(&settings)?);
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|err| StreamError::new(FailureKind::Transport, err.to_string()))?;
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let cancels: CancelMap = Arc::default();

        thread::spawn(move || {
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Send { request_id, prompt } => {
                        let token = CancellationToken::new();
                        if let Ok(mut map) = cancels.lock() {
                            map.insert(request_id, token.clone());
                        }
                        runtime.spawn(run_request(
                            client.clone(),
                            sink.clone(),
                            cancels.clone(),
                            request_id,
                            prompt,
                            token,
                        ));
                    }
                    EngineCommand::Cancel { request_id } => {
                        let token = cancels
                            .lock()
                            .ok()
                            .and_then(|map| map.get(&request_id).cloned());
                        match token {
                            Some(token) => token.cancel(),
                            None => chat_warn!("cancel for unknown request {request_id}"),
                        }
                    }
                }
            }
        });

        Ok(Self { cmd_tx })
    }

    pub fn send(&self, request_id: RequestId, prompt: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Send {
            request_id,
            prompt: prompt.into(),
        });
    }

    pub fn cancel(&self, request_id: RequestId) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel { request_id });
    }
}

async fn run_request(
    client: Arc<ChatClient>,
    sink: Arc<dyn EventSink>,
    cancels: CancelMap,
    request_id: RequestId,
    prompt: String,
    token: CancellationToken,
) {
    let result = client
        .send(request_id, &prompt, &token, sink.as_ref())
        .await
        .map_err(|err| {
            chat_info!("request {request_id} ended: {err}");
            err.kind
        });
    if let Ok(mut map) = cancels.lock() {
        map.remove(&request_id);
    }
    sink.emit(EngineEvent::Finished { request_id, result });
}
