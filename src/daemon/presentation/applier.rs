use super::{
    document::Document,
    rules::{RuleSet, FEED_STYLE_ID, RESTRICTIONS_STYLE_ID},
    RenderPlan,
};

/// Brings `document` in line with `plan`. Applying the same plan any number of times leaves the
/// document exactly as applying it once does.
pub fn apply(plan: &RenderPlan, rules: &RuleSet, document: &mut impl Document) {
    if plan.hide_feed {
        if !document.has_style(FEED_STYLE_ID) {
            document.insert_style(FEED_STYLE_ID, rules.feed.to_string());
        }
        if !document.has_banner() {
            document.insert_banner(rules.banner.to_string());
        }
    } else {
        document.remove_style(FEED_STYLE_ID);
        document.remove_banner();
    }

    // Restrictions are rebuilt from scratch every time.
    document.remove_style(RESTRICTIONS_STYLE_ID);
    let restrictions = plan
        .restricted
        .iter()
        .map(|section| rules.section(*section))
        .collect::<Vec<_>>();
    if !restrictions.is_empty() {
        document.insert_style(RESTRICTIONS_STYLE_ID, restrictions.join("\n"));
    }
}
