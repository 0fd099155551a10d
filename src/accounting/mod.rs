//! Time accounting shared by both surfaces.
//!
//! Every moment since the first use belongs to exactly one open interval: "saved" while blocking
//! is enabled, "wasted" while it's disabled. A transition closes the open interval, folds its
//! length into the matching total and opens the other one. Nothing here touches storage, so the
//! functions can be called as often as needed.

pub mod money;

use chrono::{DateTime, Duration, Utc};

use crate::storage::entities::PersistedState;

/// Which of the two totals is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Time spent with blocking enabled.
    Saved,
    /// Time spent with blocking disabled.
    Wasted,
}

impl Mode {
    pub fn active(state: &PersistedState) -> Self {
        if state.enabled {
            Mode::Saved
        } else {
            Mode::Wasted
        }
    }
}

/// Elapsed time of an interval starting at `start`. A missing start counts as nothing, and so
/// does a start after `now`, which happens when the wall clock is moved backwards.
fn elapsed_since(start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Duration {
    start
        .map(|start| now - start)
        .filter(|elapsed| *elapsed > Duration::zero())
        .unwrap_or_else(Duration::zero)
}

/// Moves `state` into the requested mode at `now`.
///
/// Requesting the mode that is already active returns the state unchanged, so repeated enables
/// neither double count nor restart the open interval.
pub fn transition_to(
    target_enabled: bool,
    now: DateTime<Utc>,
    state: &PersistedState,
) -> PersistedState {
    if target_enabled == state.enabled {
        return state.clone();
    }

    let mut next = state.clone();
    if target_enabled {
        next.total_time_wasted += elapsed_since(state.disabled_at, now);
        next.disabled_at = None;
        next.enabled_at = Some(now);
    } else {
        next.total_time_saved += elapsed_since(state.enabled_at, now);
        next.enabled_at = None;
        next.disabled_at = Some(now);
    }
    next.enabled = target_enabled;
    next
}

/// Length of the interval that is currently open.
pub fn open_interval_elapsed(state: &PersistedState, now: DateTime<Utc>) -> Duration {
    elapsed_since(state.open_interval_start(), now)
}

/// Accumulated total for `mode`, including the open interval when `mode` is the active one.
pub fn projected_total(mode: Mode, state: &PersistedState, now: DateTime<Utc>) -> Duration {
    let accumulated = match mode {
        Mode::Saved => state.total_time_saved,
        Mode::Wasted => state.total_time_wasted,
    };
    if Mode::active(state) == mode {
        accumulated + open_interval_elapsed(state, now)
    } else {
        accumulated
    }
}
