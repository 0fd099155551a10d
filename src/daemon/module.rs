use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, trace, Instrument};

use crate::{messaging::Envelope, storage::state_store::StateStore, utils::clock::Clock};

use super::{context::ContentContext, presentation::document::Document};

/// The content surface. Keeps the stylesheet in line with the stored state, the messages it
/// receives and the page being shown.
pub struct ContentModule<S: StateStore, D: Document> {
    context: ContentContext<D>,
    store: S,
    messages: mpsc::Receiver<Envelope>,
    shutdown: CancellationToken,
    reconcile_interval: Duration,
    time_provider: Box<dyn Clock>,
}

impl<S: StateStore, D: Document> ContentModule<S, D> {
    pub fn new(
        context: ContentContext<D>,
        store: S,
        messages: mpsc::Receiver<Envelope>,
        shutdown: CancellationToken,
        reconcile_interval: Duration,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            context,
            store,
            messages,
            shutdown,
            reconcile_interval,
            time_provider,
        }
    }

    async fn reconcile(&mut self) {
        match self.context.reconcile().await {
            Ok(true) => info!("Page updated to {:?}", self.context.plan()),
            Ok(false) => trace!("Page already up to date"),
            Err(e) => error!("Failed to apply the page state {e:?}"),
        }
    }

    /// Executes the content event loop.
    ///
    /// Besides reacting to messages, the loop re-reads the store and re-applies the page state on
    /// every tick. That covers changes made while no message got through and undoes outside edits
    /// of the stylesheet.
    pub async fn run(mut self) -> Result<()> {
        self.context.load(&self.store).await;
        self.reconcile().await;

        let mut messages_open = true;
        let mut reconcile_point = self.time_provider.instant() + self.reconcile_interval;
        loop {
            tokio::select! {
                // Cancelation means we stop the loop and take back everything the page got.
                _ = self.shutdown.cancelled() => {
                    break
                }
                envelope = self.messages.recv(), if messages_open => match envelope {
                    Some((message, reply)) => {
                        let span = info_span!("Handling message");
                        let answer = span.in_scope(|| self.context.handle(message));
                        self.reconcile().instrument(span).await;
                        // The sender may have hung up already, that's ok
                        let _ = reply.send(answer);
                    }
                    None => {
                        debug!("Message channel closed, only reconciling from now on");
                        messages_open = false;
                    }
                },
                _ = self.time_provider.sleep_until(reconcile_point) => {
                    reconcile_point += self.reconcile_interval;
                    self.context.load(&self.store).await;
                    self.reconcile().await;
                }
            }
        }

        info!("Shutting down content surface");
        self.context.teardown().await
    }
}
