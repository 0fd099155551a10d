use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    accounting::{money::AnnualSalary, transition_to},
    error::InputError,
    messaging::{channel::Notifier, Message, StateReply},
    storage::{
        entities::{FlagsPatch, PersistedState, StateKey},
        state_store::StateStore,
    },
    utils::clock::Clock,
};

use super::{challenge::Challenge, output::MoneyCard};

/// How often `watch` refreshes.
pub const POLL_PERIOD: Duration = Duration::from_secs(1);

/// Control surface over the stored state. Every user action goes through here: it reads the
/// store, folds the change through the accounting, writes it back and tells the content surface.
///
/// Storage failures never stop an action. Reads fall back to defaults and failed writes are
/// logged. Derived values are only written back when the read they're derived from succeeded, so
/// defaults never end up overwriting stored totals.
pub struct PopupController<S: StateStore, N: Notifier> {
    store: S,
    notifier: N,
    clock: Box<dyn Clock>,
}

impl<S: StateStore, N: Notifier> PopupController<S, N> {
    pub fn new(store: S, notifier: N, clock: Box<dyn Clock>) -> Self {
        Self {
            store,
            notifier,
            clock,
        }
    }

    /// Current state. The first time it's ever called this also opens the interval of the current
    /// mode, which is where accounting starts.
    pub async fn load(&self) -> PersistedState {
        match PersistedState::load(&self.store).await {
            Ok(mut state) => {
                if state.ensure_open_interval(self.clock.time()) {
                    debug!("Opening the first interval");
                    self.persist(&state, &[StateKey::EnabledAt, StateKey::DisabledAt])
                        .await;
                }
                state
            }
            Err(e) => {
                warn!("Couldn't read state, showing defaults: {e:?}");
                let mut state = PersistedState::default();
                state.ensure_open_interval(self.clock.time());
                state
            }
        }
    }

    pub async fn enable(&self) -> PersistedState {
        self.transition(true).await
    }

    /// First half of disabling. The returned challenge has to be typed back to
    /// [PopupController::confirm_disable].
    pub fn begin_disable(&self, rng: &mut impl Rng) -> Challenge {
        Challenge::random(rng)
    }

    /// Disables blocking if `typed` matches the challenge. A mismatch changes nothing.
    pub async fn confirm_disable(
        &self,
        challenge: &Challenge,
        typed: &str,
    ) -> Result<PersistedState, InputError> {
        challenge.verify(typed).inspect_err(|_| {
            info!("Disable rejected, phrase didn't match");
        })?;
        Ok(self.transition(false).await)
    }

    #[instrument(skip(self))]
    async fn transition(&self, enabled: bool) -> PersistedState {
        let now = self.clock.time();
        let stored = match PersistedState::load(&self.store).await {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Couldn't read state, the transition won't be stored: {e:?}");
                None
            }
        };

        let mut current = stored.clone().unwrap_or_default();
        current.ensure_open_interval(now);
        let next = transition_to(enabled, now, &current);
        match stored {
            Some(stored) if next != stored => {
                self.persist(&next, &StateKey::ACCOUNTING).await;
            }
            Some(_) => debug!("Already in the requested mode"),
            None => (),
        }

        self.notifier
            .send(Message::ToggleBlocking { enabled })
            .await;
        next
    }

    /// Stores the salary parsed from `input`. Anything that isn't a positive number is rejected
    /// without writing.
    pub async fn set_salary(&self, input: &str) -> Result<AnnualSalary, InputError> {
        let salary = input.parse::<AnnualSalary>()?;
        let state = PersistedState {
            annual_salary: Some(salary),
            ..PersistedState::default()
        };
        self.persist(&state, &[StateKey::AnnualSalary]).await;
        info!("Annual salary set to {salary}");
        Ok(salary)
    }

    /// Merges `patch` into the stored flags and forwards it to the content surface. Only the flags
    /// the patch sets are written.
    pub async fn update_options(&self, patch: FlagsPatch) -> PersistedState {
        let mut state = PersistedState::load_or_default(&self.store).await;
        if patch.is_empty() {
            return state;
        }
        state.flags.merge(patch);
        self.persist(&state, &patch.keys()).await;
        self.notifier
            .send(Message::UpdateAdvancedOptions { options: patch })
            .await;
        state
    }

    /// What the content surface reports, `None` when it isn't running.
    pub async fn content_status(&self) -> Option<StateReply> {
        self.notifier.send(Message::GetState).await
    }

    /// Tells the content surface the browser moved to `path`.
    pub async fn navigate(&self, path: String) {
        self.notifier.send(Message::Navigate { path }).await;
    }

    pub fn money_card(&self, state: &PersistedState) -> MoneyCard {
        MoneyCard::project(state, self.clock.time())
    }

    /// Calls `render` with a fresh state and money card every `period` until `cancel` fires. Only
    /// reads from the store.
    pub async fn watch(
        &self,
        period: Duration,
        cancel: CancellationToken,
        mut render: impl FnMut(&PersistedState, &MoneyCard),
    ) {
        loop {
            let state = PersistedState::load_or_default(&self.store).await;
            render(&state, &self.money_card(&state));
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.clock.sleep(period) => (),
            }
        }
    }

    async fn persist(&self, state: &PersistedState, keys: &[StateKey]) {
        if let Err(e) = self.store.set(state.record(keys)).await {
            error!("Failed to store {keys:?}: {e:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use anyhow::Result;
    use chrono::{DateTime, TimeZone, Utc};
    use mockall::predicate::eq;
    use rand::{rngs::StdRng, SeedableRng};
    use serde_json::{json, Value};
    use tempfile::tempdir;
    use tokio_util::sync::CancellationToken;

    use crate::{
        error::InputError,
        messaging::{
            channel::MockNotifier,
            Message, StateReply,
        },
        storage::{
            entities::{FlagsPatch, StateRecord},
            state_store::{FileStateStore, MockStateStore, STATE_FILE},
        },
        utils::clock::{Clock, ManualClock},
    };

    use super::PopupController;

    fn start() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    fn record(value: Value) -> StateRecord {
        value.as_object().cloned().unwrap()
    }

    fn quiet_notifier() -> MockNotifier {
        let mut notifier = MockNotifier::new();
        notifier.expect_send().returning(|_| None);
        notifier
    }

    fn file_controller(
        dir: &std::path::Path,
        clock: &ManualClock,
    ) -> Result<PopupController<FileStateStore, MockNotifier>> {
        Ok(PopupController::new(
            FileStateStore::new(dir.to_path_buf())?,
            quiet_notifier(),
            Box::new(clock.clone()),
        ))
    }

    #[tokio::test]
    async fn test_first_load_opens_interval() -> Result<()> {
        let dir = tempdir()?;
        let clock = ManualClock::new(start());
        let controller = file_controller(dir.path(), &clock)?;

        let state = controller.load().await;
        assert!(state.enabled);
        assert_eq!(state.enabled_at, Some(start()));

        clock.advance(chrono::Duration::seconds(10));
        let state = controller.load().await;
        assert_eq!(state.enabled_at, Some(start()));
        Ok(())
    }

    #[tokio::test]
    async fn test_disable_then_enable_moves_time_between_totals() -> Result<()> {
        let dir = tempdir()?;
        let clock = ManualClock::new(start());
        let controller = file_controller(dir.path(), &clock)?;
        controller.load().await;

        clock.advance(chrono::Duration::seconds(5));
        let challenge = controller.begin_disable(&mut StdRng::seed_from_u64(1));
        let state = controller
            .confirm_disable(&challenge, &challenge.phrase().to_uppercase())
            .await?;
        assert!(!state.enabled);
        assert_eq!(state.total_time_saved, chrono::Duration::seconds(5));
        assert_eq!(state.disabled_at, Some(clock.time()));

        clock.advance(chrono::Duration::seconds(3));
        controller.enable().await;
        clock.advance(chrono::Duration::seconds(3));
        let state = controller.enable().await;

        let stored = controller.load().await;
        assert_eq!(stored, state);
        assert!(stored.enabled);
        assert_eq!(stored.total_time_saved, chrono::Duration::seconds(5));
        assert_eq!(stored.total_time_wasted, chrono::Duration::seconds(3));
        assert_eq!(
            stored.enabled_at,
            Some(start() + chrono::Duration::seconds(8))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_phrase_mismatch_keeps_blocking() -> Result<()> {
        let mut store = MockStateStore::new();
        store.expect_get().returning(|_| Ok(StateRecord::new()));
        store.expect_set().never();
        let mut notifier = MockNotifier::new();
        notifier.expect_send().never();
        let controller =
            PopupController::new(store, notifier, Box::new(ManualClock::new(start())));

        let challenge = controller.begin_disable(&mut StdRng::seed_from_u64(3));
        let result = controller
            .confirm_disable(&challenge, "I choose to waste my")
            .await;
        assert_eq!(result, Err(InputError::PhraseMismatch));
        Ok(())
    }

    #[tokio::test]
    async fn test_disable_notifies_content_surface() {
        let mut store = MockStateStore::new();
        store.expect_get().returning(move |_| {
            Ok(record(json!({
                "enabled": true,
                "enabledAt": start().timestamp_millis(),
            })))
        });
        store
            .expect_set()
            .withf(|record| record.get("enabled") == Some(&json!(false)))
            .times(1)
            .returning(|_| Ok(()));
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .with(eq(Message::ToggleBlocking { enabled: false }))
            .times(1)
            .returning(|_| None);
        let controller =
            PopupController::new(store, notifier, Box::new(ManualClock::new(start())));

        let challenge = controller.begin_disable(&mut StdRng::seed_from_u64(9));
        let state = controller
            .confirm_disable(&challenge, challenge.phrase())
            .await
            .unwrap();
        assert!(!state.enabled);
    }

    #[tokio::test]
    async fn test_failed_write_still_notifies() {
        let mut store = MockStateStore::new();
        store.expect_get().returning(|_| Ok(StateRecord::new()));
        store
            .expect_set()
            .returning(|_| Err(anyhow::anyhow!("disk full")));
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .with(eq(Message::ToggleBlocking { enabled: true }))
            .times(1)
            .returning(|_| None);
        let controller =
            PopupController::new(store, notifier, Box::new(ManualClock::new(start())));

        assert!(controller.enable().await.enabled);
    }

    #[tokio::test]
    async fn test_invalid_salary_is_not_stored() {
        let mut store = MockStateStore::new();
        store.expect_set().never();
        let controller =
            PopupController::new(store, quiet_notifier(), Box::new(ManualClock::new(start())));

        for input in ["abc", "0", "-5", ""] {
            assert!(matches!(
                controller.set_salary(input).await,
                Err(InputError::InvalidSalary(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_salary_is_stored() -> Result<()> {
        let dir = tempdir()?;
        let clock = ManualClock::new(start());
        let controller = file_controller(dir.path(), &clock)?;

        let salary = controller.set_salary("$87,600").await?;
        assert_eq!(*salary, 87600.);
        assert_eq!(controller.load().await.annual_salary, Some(salary));
        Ok(())
    }

    #[tokio::test]
    async fn test_options_are_merged_and_forwarded() -> Result<()> {
        let dir = tempdir()?;
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .withf(|message| {
                matches!(
                    message,
                    Message::UpdateAdvancedOptions { options } if options.block_explore == Some(true)
                )
            })
            .times(2)
            .returning(|_| None);
        let controller = PopupController::new(
            FileStateStore::new(dir.path().to_path_buf())?,
            notifier,
            Box::new(ManualClock::new(start())),
        );

        controller
            .update_options(FlagsPatch {
                block_explore: Some(true),
                block_post: Some(true),
                ..FlagsPatch::default()
            })
            .await;
        let state = controller
            .update_options(FlagsPatch {
                block_explore: Some(true),
                block_post: Some(false),
                ..FlagsPatch::default()
            })
            .await;

        assert!(state.flags.block_explore);
        assert!(!state.flags.block_post);
        assert_eq!(controller.load().await.flags, state.flags);
        Ok(())
    }

    #[tokio::test]
    async fn test_content_status_passes_reply_through() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .with(eq(Message::GetState))
            .returning(|_| Some(StateReply { enabled: false }));
        let controller = PopupController::new(
            MockStateStore::new(),
            notifier,
            Box::new(ManualClock::new(start())),
        );

        assert_eq!(
            controller.content_status().await,
            Some(StateReply { enabled: false })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_never_writes() {
        let mut store = MockStateStore::new();
        store.expect_get().returning(|_| {
            Ok(record(json!({
                "enabled": true,
                "enabledAt": start().timestamp_millis(),
                "annualSalary": 87600,
            })))
        });
        store.expect_set().never();
        let clock = ManualClock::new(start());
        let controller = PopupController::new(store, quiet_notifier(), Box::new(clock.clone()));

        let cancel = CancellationToken::new();
        let amounts = Arc::new(Mutex::new(Vec::new()));
        let watch = controller.watch(Duration::from_secs(1), cancel.clone(), |state, card| {
            assert!(state.enabled);
            amounts.lock().unwrap().push(card.amount.to_string());
            clock.advance(chrono::Duration::minutes(30));
        });
        let stop = async {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            cancel.cancel();
        };
        tokio::join!(watch, stop);

        assert_eq!(
            *amounts.lock().unwrap(),
            vec!["$0.00".to_string(), "$5.00".into(), "$10.00".into()]
        );
    }

    #[tokio::test]
    async fn test_unreadable_store_assumes_enabled() {
        let mut store = MockStateStore::new();
        store
            .expect_get()
            .returning(|_| Err(anyhow::anyhow!("storage is gone")));
        store.expect_set().never();
        let controller =
            PopupController::new(store, quiet_notifier(), Box::new(ManualClock::new(start())));

        let state = controller.load().await;
        assert!(state.enabled);
        assert_eq!(state.enabled_at, Some(start()));
        assert_eq!(
            controller.money_card(&state).amount,
            crate::accounting::money::MoneyEstimate::Unknown
        );
    }

    #[tokio::test]
    async fn test_unreadable_store_never_overwrites_totals() {
        let mut store = MockStateStore::new();
        store
            .expect_get()
            .returning(|_| Err(anyhow::anyhow!("storage is gone")));
        store.expect_set().never();
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .with(eq(Message::ToggleBlocking { enabled: false }))
            .times(1)
            .returning(|_| None);
        let controller =
            PopupController::new(store, notifier, Box::new(ManualClock::new(start())));

        let challenge = controller.begin_disable(&mut StdRng::seed_from_u64(5));
        let state = controller
            .confirm_disable(&challenge, challenge.phrase())
            .await
            .unwrap();
        assert!(!state.enabled);
        assert_eq!(state.disabled_at, Some(start()));
    }

    #[tokio::test]
    async fn test_malformed_flag_keeps_stored_totals() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(
            dir.path().join(STATE_FILE),
            json!({
                "enabled": true,
                "enabledAt": start().timestamp_millis(),
                "totalTimeSaved": 36_000_000,
                "totalTimeWasted": 600_000,
                "blockPost": 1,
            })
            .to_string(),
        )?;
        let clock = ManualClock::new(start());
        let controller = file_controller(dir.path(), &clock)?;

        clock.advance(chrono::Duration::seconds(30));
        let challenge = controller.begin_disable(&mut StdRng::seed_from_u64(2));
        controller
            .confirm_disable(&challenge, challenge.phrase())
            .await?;

        let stored = controller.load().await;
        assert!(!stored.enabled);
        assert_eq!(
            stored.total_time_saved,
            chrono::Duration::milliseconds(36_030_000)
        );
        assert_eq!(
            stored.total_time_wasted,
            chrono::Duration::milliseconds(600_000)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_options_write_only_patched_flags() {
        let mut store = MockStateStore::new();
        store
            .expect_get()
            .returning(|_| Err(anyhow::anyhow!("storage is gone")));
        store
            .expect_set()
            .withf(|record| {
                record.len() == 1 && record.get("blockPost") == Some(&json!(true))
            })
            .times(1)
            .returning(|_| Ok(()));
        let controller =
            PopupController::new(store, quiet_notifier(), Box::new(ManualClock::new(start())));

        let state = controller
            .update_options(FlagsPatch {
                block_post: Some(true),
                ..FlagsPatch::default()
            })
            .await;
        assert!(state.flags.block_post);
    }
}
