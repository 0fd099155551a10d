use anyhow::Result;
use tracing::{debug, info};

use crate::{
    messaging::{Message, StateReply},
    storage::{
        entities::{FeatureFlags, PersistedState},
        state_store::StateStore,
    },
};

use super::presentation::{
    applier::apply, classify_path, desired_state, document::Document, rules::RuleSet,
    PresentationInput, RenderPlan,
};

/// Everything the content surface knows: the last state it saw, the page being shown and the
/// document it renders into.
pub struct ContentContext<D: Document> {
    enabled: bool,
    flags: FeatureFlags,
    location: String,
    rules: RuleSet,
    document: D,
}

impl<D: Document> ContentContext<D> {
    /// Starts out enabled with no restrictions, which is also what an unreadable store yields.
    pub fn new(document: D, location: &str) -> Self {
        Self {
            enabled: true,
            flags: FeatureFlags::default(),
            location: pathname(location).to_string(),
            rules: RuleSet::default(),
            document,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn flags(&self) -> FeatureFlags {
        self.flags
    }

    pub fn load_state(&mut self, state: &PersistedState) {
        self.enabled = state.enabled;
        self.flags = state.flags;
    }

    /// Refreshes from `store`, assuming defaults if it can't be read.
    pub async fn load(&mut self, store: &impl StateStore) {
        let state = PersistedState::load_or_default(store).await;
        self.load_state(&state);
    }

    /// Updates the context from a message. Only [Message::GetState] is answered.
    pub fn handle(&mut self, message: Message) -> Option<StateReply> {
        match message {
            Message::ToggleBlocking { enabled } => {
                info!("Blocking turned {}", if enabled { "on" } else { "off" });
                self.enabled = enabled;
                None
            }
            Message::UpdateAdvancedOptions { options } => {
                debug!("Merging options {options:?}");
                self.flags.merge(options);
                None
            }
            Message::GetState => Some(StateReply {
                enabled: self.enabled,
            }),
            Message::Navigate { path } => {
                self.navigate(&path);
                None
            }
        }
    }

    pub fn navigate(&mut self, location: &str) {
        let path = pathname(location);
        if path != self.location {
            debug!("Navigated from {} to {path}", self.location);
            self.location = path.to_string();
        }
    }

    pub fn plan(&self) -> RenderPlan {
        desired_state(&PresentationInput {
            enabled: self.enabled,
            flags: self.flags,
            scope: classify_path(&self.location),
        })
    }

    /// Applies the current plan and publishes the document. Returns true if anything had to be
    /// written.
    pub async fn reconcile(&mut self) -> Result<bool> {
        let plan = self.plan();
        apply(&plan, &self.rules, &mut self.document);
        self.document.commit().await
    }

    /// Removes everything the context added to the document.
    pub async fn teardown(&mut self) -> Result<()> {
        apply(&RenderPlan::default(), &self.rules, &mut self.document);
        self.document.commit().await?;
        Ok(())
    }
}

/// Drops query and fragment, leaving what a browser calls the pathname.
fn pathname(location: &str) -> &str {
    location
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use crate::{
        daemon::presentation::{document::StylesheetDocument, rules::X_RULES},
        messaging::{Message, StateReply},
        storage::{
            entities::{FlagsPatch, PersistedState, StateKey},
            state_store::{FileStateStore, StateStore},
        },
    };

    use super::{pathname, ContentContext};

    fn context_in(dir: &std::path::Path, location: &str) -> ContentContext<StylesheetDocument> {
        ContentContext::new(StylesheetDocument::new(dir.join("sheet.css")), location)
    }

    #[test]
    fn pathname_strips_query_and_fragment() {
        assert_eq!(pathname("/home?lang=en"), "/home");
        assert_eq!(pathname("/#top"), "/");
        assert_eq!(pathname("/explore"), "/explore");
        assert_eq!(pathname(""), "");
    }

    #[tokio::test]
    async fn test_toggle_and_navigation_drive_stylesheet() -> Result<()> {
        let dir = tempdir()?;
        let mut context = context_in(dir.path(), "/home");

        context.reconcile().await?;
        let sheet = std::fs::read_to_string(dir.path().join("sheet.css"))?;
        assert!(sheet.contains(X_RULES.feed));
        assert!(sheet.contains(X_RULES.banner));

        context.handle(Message::Navigate {
            path: "/explore".into(),
        });
        context.reconcile().await?;
        let sheet = std::fs::read_to_string(dir.path().join("sheet.css"))?;
        assert!(!sheet.contains(X_RULES.feed));

        context.navigate("/home?src=logo");
        context.handle(Message::ToggleBlocking { enabled: false });
        context.reconcile().await?;
        let sheet = std::fs::read_to_string(dir.path().join("sheet.css"))?;
        assert!(!sheet.contains(X_RULES.feed));
        assert!(!sheet.contains(X_RULES.banner));
        Ok(())
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() -> Result<()> {
        let dir = tempdir()?;
        let mut context = context_in(dir.path(), "/");

        assert!(context.reconcile().await?);
        assert!(!context.reconcile().await?);
        assert!(!context.reconcile().await?);

        let sheet = std::fs::read_to_string(dir.path().join("sheet.css"))?;
        assert_eq!(sheet.matches("Feed Blocked").count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_options_and_state_reply() -> Result<()> {
        let dir = tempdir()?;
        let mut context = context_in(dir.path(), "/notifications");

        assert_eq!(
            context.handle(Message::GetState),
            Some(StateReply { enabled: true })
        );
        context.handle(Message::UpdateAdvancedOptions {
            options: FlagsPatch {
                block_notifications: Some(true),
                ..FlagsPatch::default()
            },
        });
        assert!(context.flags().block_notifications);

        context.reconcile().await?;
        let sheet = std::fs::read_to_string(dir.path().join("sheet.css"))?;
        assert!(sheet.contains(X_RULES.notifications));

        context.teardown().await?;
        let sheet = std::fs::read_to_string(dir.path().join("sheet.css"))?;
        assert!(!sheet.contains(X_RULES.notifications));
        Ok(())
    }

    #[tokio::test]
    async fn test_load_picks_up_store_changes() -> Result<()> {
        let dir = tempdir()?;
        let store = FileStateStore::new(dir.path().to_owned())?;
        let mut context = context_in(dir.path(), "/home");

        let state = PersistedState {
            enabled: false,
            ..PersistedState::default()
        };
        store
            .set(state.record(&[StateKey::Enabled, StateKey::BlockExplore]))
            .await?;
        context.load(&store).await;

        assert!(!context.enabled());
        assert!(!context.plan().hide_feed);
        Ok(())
    }
}
