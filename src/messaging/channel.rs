use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use super::{Message, StateReply};

/// How long the cli waits for the daemon before giving up on a message.
const SEND_TIMEOUT: Duration = Duration::from_secs(2);

/// Delivers messages to the content surface.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Best-effort delivery. Failures are swallowed: `None` stands both for "no answer expected"
    /// and for "nobody is listening".
    async fn send(&self, message: Message) -> Option<StateReply>;
}

/// [Notifier] talking to the daemon's socket.
pub struct SocketNotifier {
    socket_path: PathBuf,
}

impl SocketNotifier {
    pub fn new(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }
}

#[async_trait]
impl Notifier for SocketNotifier {
    async fn send(&self, message: Message) -> Option<StateReply> {
        match tokio::time::timeout(SEND_TIMEOUT, send_message(&self.socket_path, &message)).await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                // The daemon might simply not be running, that's ok
                debug!("Content surface unreachable, dropping {message:?}: {e}");
                None
            }
            Err(_) => {
                debug!("Content surface didn't answer in time, dropping {message:?}");
                None
            }
        }
    }
}

/// Sends one message and waits for the daemon to answer or hang up.
#[cfg(unix)]
pub async fn send_message(
    socket_path: &std::path::Path,
    message: &Message,
) -> Result<Option<StateReply>> {
    use tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
        net::UnixStream,
    };

    let stream = UnixStream::connect(socket_path).await?;
    let (read, mut write) = stream.into_split();

    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    write.write_all(&line).await?;
    write.shutdown().await?;

    let mut reply = String::new();
    BufReader::new(read).read_line(&mut reply).await?;
    if reply.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::from_str(&reply)?))
    }
}

#[cfg(not(unix))]
pub async fn send_message(
    _socket_path: &std::path::Path,
    _message: &Message,
) -> Result<Option<StateReply>> {
    anyhow::bail!("The message channel needs unix domain sockets")
}
