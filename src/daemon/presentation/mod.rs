//! Decides what the page should look like and makes it so.
//!
//! [desired_state] is a pure function of the current state and the page being shown. The
//! [applier] brings a [document::Document] in line with its [RenderPlan]. Running both on every
//! observed change is enough to keep the page right, however often that happens.

pub mod applier;
pub mod document;
pub mod rules;

use crate::storage::entities::FeatureFlags;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageScope {
    /// The home timeline. The only page blocking applies to.
    Home,
    Other,
}

/// Only the exact root paths count as home. Everything else is never blocked.
pub fn classify_path(path: &str) -> PageScope {
    match path {
        "" | "/" | "/home" => PageScope::Home,
        _ => PageScope::Other,
    }
}

/// Parts of the site a feature flag can restrict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Section {
    Notifications,
    Messages,
    Explore,
    Post,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Notifications,
        Section::Messages,
        Section::Explore,
        Section::Post,
    ];

    fn restricted_by(self, flags: &FeatureFlags) -> bool {
        match self {
            Section::Notifications => flags.block_notifications,
            Section::Messages => flags.block_messages,
            Section::Explore => flags.block_explore,
            Section::Post => flags.block_post,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentationInput {
    pub enabled: bool,
    pub flags: FeatureFlags,
    pub scope: PageScope,
}

/// What the page should look like.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderPlan {
    /// Hide the timeline and show the blocked banner in its place.
    pub hide_feed: bool,
    /// Sections restricted by feature flags, in [Section::ALL] order.
    pub restricted: Vec<Section>,
}

pub fn desired_state(input: &PresentationInput) -> RenderPlan {
    RenderPlan {
        hide_feed: input.enabled && input.scope == PageScope::Home,
        // Restrictions are independent of blocking and of the page.
        restricted: Section::ALL
            .into_iter()
            .filter(|section| section.restricted_by(&input.flags))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::entities::FeatureFlags;

    use super::{classify_path, desired_state, PageScope, PresentationInput, RenderPlan, Section};

    #[test]
    fn only_root_paths_are_home() {
        for path in ["", "/", "/home"] {
            assert_eq!(classify_path(path), PageScope::Home, "{path:?}");
        }
        for path in ["/home/", "/explore", "/notifications", "/someone", "/homepage"] {
            assert_eq!(classify_path(path), PageScope::Other, "{path:?}");
        }
    }

    #[test]
    fn feed_hidden_only_when_enabled_on_home() {
        let plan = |enabled, scope| {
            desired_state(&PresentationInput {
                enabled,
                flags: FeatureFlags::default(),
                scope,
            })
        };
        assert!(plan(true, PageScope::Home).hide_feed);
        assert!(!plan(false, PageScope::Home).hide_feed);
        assert!(!plan(true, PageScope::Other).hide_feed);
        assert_eq!(plan(false, PageScope::Other), RenderPlan::default());
    }

    #[test]
    fn restrictions_follow_flags_everywhere() {
        let flags = FeatureFlags {
            block_post: true,
            block_messages: true,
            ..FeatureFlags::default()
        };
        for (enabled, scope) in [(true, PageScope::Home), (false, PageScope::Other)] {
            let plan = desired_state(&PresentationInput {
                enabled,
                flags,
                scope,
            });
            assert_eq!(plan.restricted, vec![Section::Messages, Section::Post]);
        }
    }
}
