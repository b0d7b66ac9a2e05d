//! Runs persistence requests on the tokio runtime and hands the results back
//! to the UI thread through a std channel drained once per frame.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};

use tracing::{error, warn};

use super::{ApiEnvelope, ApiRequest, Dispatcher, PersistenceClient, Ticket};

pub struct TokioDispatcher {
    rt_handle: tokio::runtime::Handle,
    client: Arc<PersistenceClient>,
    tx: Sender<ApiEnvelope>,
    rx: Receiver<ApiEnvelope>,
}

impl TokioDispatcher {
    pub fn new(rt_handle: tokio::runtime::Handle, client: PersistenceClient) -> Self {
        let (tx, rx) = std::sync::mpsc::channel();
        Self {
            rt_handle,
            client: Arc::new(client),
            tx,
            rx,
        }
    }

    /// Next finished request, if any. Non-blocking.
    pub fn poll(&self) -> Option<ApiEnvelope> {
        match self.rx.try_recv() {
            Ok(envelope) => Some(envelope),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                // We hold a sender ourselves, so this cannot normally happen.
                error!(target: "api", "Response channel disconnected");
                None
            }
        }
    }

    /// Drain everything that has finished since the last frame.
    pub fn drain(&self) -> Vec<ApiEnvelope> {
        std::iter::from_fn(|| self.poll()).collect()
    }
}

impl Dispatcher for TokioDispatcher {
    fn dispatch(&mut self, ticket: Ticket, request: ApiRequest) {
        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        self.rt_handle.spawn(async move {
            let result = client.execute(request).await;
            if let Err(e) = &result {
                warn!(target: "api", action = %ticket.action, "Request failed: {}", e);
            }
            let _ = tx.send(ApiEnvelope { ticket, result });
        });
    }
}
