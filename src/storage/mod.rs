//! Storage is organized through [state_store::FileStateStore].
//! The basic idea is:
//!  - There is one JSON object holding every key both surfaces care about.
//!  - Keys are read and written in groups; keys that were never written fall back to defaults.
//!  - Writes replace the file atomically, so a reader sees either the old or the new record.

pub mod entities;
pub mod state_store;
