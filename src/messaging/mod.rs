//! Messages exchanged between the cli and the content daemon.
//!
//! Every message is one line of JSON sent over a local socket. Only [Message::GetState] is
//! answered; everything else is fire and forget, and a daemon that isn't running simply means
//! the message is lost.

pub mod channel;
#[cfg(unix)]
pub mod listener;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::storage::entities::FlagsPatch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Message {
    /// Blocking was switched on or off.
    ToggleBlocking { enabled: bool },
    /// Some of the feature flags changed.
    UpdateAdvancedOptions { options: FlagsPatch },
    /// Asks whether the content surface currently blocks.
    GetState,
    /// The page being shown changed.
    Navigate { path: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateReply {
    pub enabled: bool,
}

/// A message together with the slot its answer goes into.
pub type Envelope = (Message, oneshot::Sender<Option<StateReply>>);
