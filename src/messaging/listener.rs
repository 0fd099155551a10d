use std::{io::ErrorKind, path::PathBuf, time::Duration};

use anyhow::Result;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{UnixListener, UnixStream},
    sync::{mpsc, oneshot},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{Envelope, Message};

/// How long a connection may take to deliver its message line.
const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Accepts messages on the daemon socket and forwards them to the
/// [ContentModule](crate::daemon::module::ContentModule). Every connection is served by its own
/// task, so a peer that never finishes its line only holds up itself.
pub struct MessageListener {
    listener: UnixListener,
    socket_path: PathBuf,
    next: mpsc::Sender<Envelope>,
    shutdown: CancellationToken,
}

impl MessageListener {
    /// Binds the socket, replacing one left behind by a daemon that didn't shut down cleanly.
    pub fn bind(
        socket_path: PathBuf,
        next: mpsc::Sender<Envelope>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        match std::fs::remove_file(&socket_path) {
            Ok(()) => debug!("Removed stale socket {socket_path:?}"),
            Err(e) if e.kind() == ErrorKind::NotFound => (),
            Err(e) => return Err(e.into()),
        }
        let listener = UnixListener::bind(&socket_path)?;
        info!("Listening on {socket_path:?}");
        Ok(Self {
            listener,
            socket_path,
            next,
            shutdown,
        })
    }

    pub async fn run(self) -> Result<()> {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let next = self.next.clone();
                        tokio::spawn(async move {
                            if let Err(e) = serve(stream, next).await {
                                warn!("Failed to serve a message {e:?}");
                            }
                        });
                    }
                    Err(e) => error!("Failed to accept a connection {e:?}"),
                }
            }
        }

        if let Err(e) = std::fs::remove_file(&self.socket_path) {
            warn!("Couldn't remove socket {:?}: {e}", self.socket_path);
        }
        Ok(())
    }
}

async fn serve(stream: UnixStream, next: mpsc::Sender<Envelope>) -> Result<()> {
    let (read, mut write) = stream.into_split();
    let mut line = String::new();
    tokio::time::timeout(READ_TIMEOUT, BufReader::new(read).read_line(&mut line)).await??;

    let message = match serde_json::from_str::<Message>(&line) {
        Ok(v) => v,
        Err(e) => {
            warn!("Ignoring malformed message {:?}: {e}", line.trim());
            return Ok(());
        }
    };
    debug!("Received {message:?}");

    let (reply_sender, reply_receiver) = oneshot::channel();
    next.send((message, reply_sender)).await?;
    // The module drops the sender without answering when it shuts down.
    if let Ok(Some(reply)) = reply_receiver.await {
        let mut reply = serde_json::to_vec(&reply)?;
        reply.push(b'\n');
        write.write_all(&reply).await?;
    }
    write.shutdown().await?;
    Ok(())
}
