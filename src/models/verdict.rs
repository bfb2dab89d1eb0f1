use std::fmt;

/// Longest matched-text snippet kept in a [`MatchDetail`], in characters.
pub const SNIPPET_MAX_CHARS: usize = 100;

/// Item field a rule was tested against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchField {
    Title,
    Channel,
    Description,
}

impl fmt::Display for MatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchField::Title => write!(f, "title"),
            MatchField::Channel => write!(f, "channel"),
            MatchField::Description => write!(f, "description"),
        }
    }
}

/// How a rule matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMethod {
    Pattern,
    Keyword,
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMethod::Pattern => write!(f, "pattern"),
            MatchMethod::Keyword => write!(f, "keyword"),
        }
    }
}

/// Where and how a rule matched, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchDetail {
    pub field: MatchField,
    pub method: MatchMethod,
    /// The matched field's text, truncated to [`SNIPPET_MAX_CHARS`] plus `...`.
    pub snippet: String,
    /// Source of the regex that matched.
    pub matched_pattern: String,
}

impl MatchDetail {
    pub fn new(field: MatchField, method: MatchMethod, text: &str, matched_pattern: &str) -> Self {
        Self {
            field,
            method,
            snippet: truncate_snippet(text),
            matched_pattern: matched_pattern.to_string(),
        }
    }
}

impl fmt::Display for MatchDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} matched {} /{}/: \"{}\"",
            self.method, self.field, self.matched_pattern, self.snippet
        )
    }
}

/// Cut `text` to [`SNIPPET_MAX_CHARS`] characters, appending `...` when cut.
pub fn truncate_snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_MAX_CHARS) {
        Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
        None => text.to_string(),
    }
}

/// Why an item was blocked or allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerdictReason {
    /// Neither list is enabled.
    NoListsActive,
    /// A whitelist rule matched; overrides any blacklist hit.
    Whitelisted { rule: String },
    /// A blacklist rule matched and no whitelist rule did.
    Blacklisted { rule: String },
    /// Whitelist-only mode and nothing on the whitelist matched.
    NotOnWhitelist,
    /// No list matched and the mode allows by default.
    NoMatch,
}

impl fmt::Display for VerdictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerdictReason::NoListsActive => write!(f, "no filter lists active"),
            VerdictReason::Whitelisted { .. } => write!(f, "whitelisted"),
            VerdictReason::Blacklisted { rule } => write!(f, "blacklisted by \"{}\"", rule),
            VerdictReason::NotOnWhitelist => write!(f, "not on whitelist"),
            VerdictReason::NoMatch => write!(f, "no rule matched"),
        }
    }
}

/// Classification result for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Verdict {
    pub blocked: bool,
    pub reason: VerdictReason,
    pub matched_rule_name: Option<String>,
    pub match_detail: Option<MatchDetail>,
    /// `markNotInterested` of the blacklist rule behind a block. `None` for
    /// every verdict not caused by a blacklist rule.
    pub mark_not_interested: Option<bool>,
}

impl Verdict {
    pub fn allow(reason: VerdictReason) -> Self {
        Self {
            blocked: false,
            reason,
            matched_rule_name: None,
            match_detail: None,
            mark_not_interested: None,
        }
    }

    pub fn block(reason: VerdictReason) -> Self {
        Self {
            blocked: true,
            reason,
            matched_rule_name: None,
            match_detail: None,
            mark_not_interested: None,
        }
    }

    pub fn with_match(mut self, rule: impl Into<String>, detail: Option<MatchDetail>) -> Self {
        self.matched_rule_name = Some(rule.into());
        self.match_detail = detail;
        self
    }

    pub fn with_mark_not_interested(mut self, mark: bool) -> Self {
        self.mark_not_interested = Some(mark);
        self
    }

    /// Whether a blocked item may go through the menu protocol. Blocks with
    /// no responsible rule (whitelist-only default deny) always may.
    pub fn allows_menu_action(&self) -> bool {
        self.blocked && self.mark_not_interested.unwrap_or(true)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decision = if self.blocked { "BLOCK" } else { "ALLOW" };
        write!(f, "{} ({})", decision, self.reason)?;
        if let Some(detail) = &self.match_detail {
            write!(f, " [{}]", detail)?;
        }
        Ok(())
    }
}
