//! Hides the home timeline of a social network and keeps score of what that focus is worth.
//! Two surfaces share one persisted record: a content daemon that renders visibility rules into a
//! user stylesheet, and a cli that flips blocking on and off and shows the money saved or lost.
//!

pub mod accounting;
pub mod cli;
pub mod daemon;
pub mod error;
pub mod fs;
pub mod messaging;
pub mod storage;
pub mod utils;
