use std::time::Duration;

use anyhow::Result;
use module::ContentModule;
use presentation::document::StylesheetDocument;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::{
    messaging::Envelope,
    storage::state_store::{FileStateStore, StateStore},
    utils::{
        clock::{Clock, DefaultClock},
        dir::AppPaths,
    },
};

use context::ContentContext;

pub mod args;
pub mod context;
pub mod module;
pub mod presentation;
pub mod shutdown;

pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(1);

/// Knobs of the content surface that don't come from the stored state.
#[derive(Debug, Clone)]
pub struct DaemonSettings {
    /// Page shown when the daemon starts.
    pub location: String,
    pub reconcile_interval: Duration,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            location: "/home".into(),
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
        }
    }
}

/// Represents the starting point for the daemon
pub async fn start_daemon(paths: AppPaths, settings: DaemonSettings) -> Result<()> {
    let (sender, receiver) = mpsc::channel::<Envelope>(10);
    let shutdown_token = CancellationToken::new();

    let store = FileStateStore::new(paths.dir().to_path_buf())?;
    let content = create_content_module(
        &paths,
        &settings,
        store,
        receiver,
        &shutdown_token,
        DefaultClock,
    );

    let content_result = {
        cfg_if::cfg_if! {
            if #[cfg(unix)] {
                use crate::messaging::listener::MessageListener;

                let listener =
                    MessageListener::bind(paths.socket_file(), sender, shutdown_token.clone())?;

                let (_, listener_result, content_result) = tokio::join!(
                    shutdown::detect_shutdown(shutdown_token.clone()),
                    listener.run(),
                    content.run(),
                );

                if let Err(listener_result) = listener_result {
                    error!("Message listener got an error {:?}", listener_result);
                }
                content_result
            } else {
                // Without a socket the daemon only follows the store.
                drop(sender);
                let (_, content_result) = tokio::join!(
                    shutdown::detect_shutdown(shutdown_token.clone()),
                    content.run(),
                );
                content_result
            }
        }
    };

    if let Err(content_result) = content_result {
        error!("Content module got an error {:?}", content_result);
    }

    Ok(())
}

fn create_content_module<S: StateStore>(
    paths: &AppPaths,
    settings: &DaemonSettings,
    store: S,
    receiver: mpsc::Receiver<Envelope>,
    shutdown_token: &CancellationToken,
    clock: impl Clock,
) -> ContentModule<S, StylesheetDocument> {
    let document = StylesheetDocument::new(paths.stylesheet_file());
    ContentModule::new(
        ContentContext::new(document, &settings.location),
        store,
        receiver,
        shutdown_token.clone(),
        settings.reconcile_interval,
        Box::new(clock),
    )
}
