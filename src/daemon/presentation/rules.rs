use super::Section;

/// Id of the block hiding the timeline.
pub const FEED_STYLE_ID: &str = "x-feed-blocker-style";
/// Id of the block carrying every flag restriction.
pub const RESTRICTIONS_STYLE_ID: &str = "x-feed-blocker-advanced-style";

/// CSS used to render a [RenderPlan](super::RenderPlan). Swap it out to target a different site
/// layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    pub feed: &'static str,
    /// Message shown where the timeline used to be.
    pub banner: &'static str,
    pub notifications: &'static str,
    pub messages: &'static str,
    pub explore: &'static str,
    pub post: &'static str,
}

impl RuleSet {
    pub fn section(&self, section: Section) -> &'static str {
        match section {
            Section::Notifications => self.notifications,
            Section::Messages => self.messages,
            Section::Explore => self.explore,
            Section::Post => self.post,
        }
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        X_RULES
    }
}

pub const X_RULES: RuleSet = RuleSet {
    feed: r#"[data-testid="primaryColumn"] section[role="region"] > div > div,
[data-testid="primaryColumn"] [data-testid="cellInnerDiv"] {
  display: none !important;
}
[data-testid="primaryColumn"] > div > div:first-child {
  display: block !important;
}"#,
    banner: r#"[data-testid="primaryColumn"] section[role="region"]::before {
  content: "Feed Blocked. The home feed is hidden to keep you focused. Search, notifications, messages and profiles still work.";
  display: block;
  padding: 32px;
  text-align: center;
}"#,
    notifications: r#"a[href="/notifications"],
a[aria-label*="Notifications"] {
  pointer-events: none;
  opacity: 0.3;
}
[data-testid="primaryColumn"] div[aria-label*="Timeline: Notifications"] {
  display: none !important;
}"#,
    messages: r#"a[href="/messages"],
a[aria-label*="Direct Messages"] {
  pointer-events: none;
  opacity: 0.3;
}
[data-testid="DMDrawer"],
[data-testid="primaryColumn"] div[aria-label*="Timeline: Messages"] {
  display: none !important;
}"#,
    explore: r#"a[href="/explore"],
a[href*="/search"],
a[aria-label*="Search and explore"] {
  pointer-events: none;
  opacity: 0.3;
}
[data-testid="primaryColumn"] div[aria-label*="Search"] {
  display: none !important;
}"#,
    post: r#"a[href="/compose/post"],
a[data-testid="SideNav_NewTweet_Button"],
[data-testid="toolBar"],
[data-testid="tweetButtonInline"],
div[aria-label*="Post text"] {
  display: none !important;
}"#,
};
