//! Blacklist/whitelist decision logic.
//!
//! [`classify`] is pure: same item text, rules, and mode always give the same
//! [`Verdict`]. It does no logging; the orchestrator reports verdicts.

use crate::models::{
    CompiledRule, ContentItem, ListMode, MatchDetail, MatchField, MatchMethod, RuleSet, Verdict,
    VerdictReason,
};

fn field_text(item: &ContentItem, field: MatchField) -> &str {
    match field {
        MatchField::Title => &item.title,
        MatchField::Channel => &item.channel_name,
        MatchField::Description => &item.description,
    }
}

/// Test one field against a rule.
///
/// The rule's pattern is tried against the raw text first, then each keyword
/// pattern against the lower-cased text. First hit wins.
pub fn match_field(text: &str, field: MatchField, rule: &CompiledRule) -> Option<MatchDetail> {
    if let Some(pattern) = &rule.pattern {
        if pattern.is_match(text) {
            return Some(MatchDetail::new(
                field,
                MatchMethod::Pattern,
                text,
                pattern.as_str(),
            ));
        }
    }

    if rule.keyword_patterns.is_empty() {
        return None;
    }

    let lowered = text.to_lowercase();
    rule.keyword_patterns
        .iter()
        .find(|keyword| keyword.is_match(&lowered))
        .map(|keyword| MatchDetail::new(field, MatchMethod::Keyword, text, keyword.as_str()))
}

/// Test every field the rule targets, in title → channel → description order.
pub fn match_rule(item: &ContentItem, rule: &CompiledRule) -> Option<MatchDetail> {
    if rule.is_inert() {
        return None;
    }
    rule.target_fields()
        .find_map(|field| match_field(field_text(item, field), field, rule))
}

/// Classify one item.
///
/// - Blacklist: first enabled matching rule wins.
/// - Whitelist: scanned to completion when both lists are active, stops at
///   the first match in whitelist-only mode.
/// - A whitelist match overrides a blacklist match.
/// - Whitelist-only mode denies by default; every other mode allows by default.
pub fn classify(item: &ContentItem, rules: &RuleSet, mode: ListMode) -> Verdict {
    if !mode.use_blacklist && !mode.use_whitelist {
        return Verdict::allow(VerdictReason::NoListsActive);
    }

    let blacklist_hit = if mode.use_blacklist {
        rules
            .blacklist
            .iter()
            .filter(|rule| rule.enabled)
            .find_map(|rule| match_rule(item, rule).map(|detail| (rule, detail)))
    } else {
        None
    };

    let mut whitelist_hit: Option<(&CompiledRule, MatchDetail)> = None;
    if mode.use_whitelist {
        for rule in rules.whitelist.iter().filter(|rule| rule.enabled) {
            if let Some(detail) = match_rule(item, rule) {
                if whitelist_hit.is_none() {
                    whitelist_hit = Some((rule, detail));
                }
                if !mode.use_blacklist {
                    break;
                }
            }
        }
    }

    if let Some((rule, detail)) = whitelist_hit {
        return Verdict::allow(VerdictReason::Whitelisted {
            rule: rule.name.clone(),
        })
        .with_match(rule.name.clone(), Some(detail));
    }

    if let Some((rule, detail)) = blacklist_hit {
        return Verdict::block(VerdictReason::Blacklisted {
            rule: rule.name.clone(),
        })
        .with_match(rule.name.clone(), Some(detail))
        .with_mark_not_interested(rule.mark_not_interested);
    }

    if mode.is_whitelist_only() {
        return Verdict::block(VerdictReason::NotOnWhitelist);
    }

    Verdict::allow(VerdictReason::NoMatch)
}
