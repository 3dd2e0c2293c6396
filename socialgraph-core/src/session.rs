use tracing::{debug, instrument};

use crate::adapter::Adapter;
use crate::backend::Backend;
use crate::transport::Transport;

/// Pairs an adapter with a transport and pumps requests between them.
#[derive(Debug)]
pub struct Session<B: Backend, T: Transport> {
    adapter: Adapter<B>,
    transport: T,
}

impl<B: Backend, T: Transport> Session<B, T> {
    pub fn new(adapter: Adapter<B>, transport: T) -> Self {
        Session { adapter, transport }
    }

    pub fn adapter(&self) -> &Adapter<B> {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut Adapter<B> {
        &mut self.adapter
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_parts(self) -> (Adapter<B>, T) {
        (self.adapter, self.transport)
    }

    /// Sends the oldest queued request and delivers its reply.
    ///
    /// Returns false when nothing was queued.
    pub async fn step(&mut self) -> bool {
        let Some(outgoing) = self.adapter.next_request() else {
            return false;
        };
        debug!(id = ?outgoing.id, url = %outgoing.request.url, "sending request");
        let result = self.transport.send(&outgoing.request).await;
        self.adapter.deliver(outgoing.id, result);
        true
    }

    /// Pumps requests until the adapter stops issuing them.
    ///
    /// Returns the number of requests sent.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> usize {
        let mut sent = 0;
        while self.step().await {
            sent += 1;
        }
        debug!(sent, "session settled");
        sent
    }
}
