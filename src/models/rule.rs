use crate::models::verdict::MatchField;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml_ng::Value;
use thiserror::Error;

/// Which rule list a rule belongs to. Only used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Blacklist,
    Whitelist,
}

impl std::fmt::Display for ListKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListKind::Blacklist => write!(f, "Blacklist"),
            ListKind::Whitelist => write!(f, "Whitelist"),
        }
    }
}

/// A rule as stored in configuration.
///
/// Deserialization is lenient in the same places the stored data has
/// historically been sloppy: missing flags default to `true`, anything other
/// than an explicit `false` counts as `true`, and a non-list `keywords` value
/// becomes an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSpec {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub pattern: String,

    #[serde(default, deserialize_with = "lenient_strings")]
    pub keywords: Vec<String>,

    /// Kept for round-tripping; matching does not consult it.
    #[serde(default, deserialize_with = "lenient_strings")]
    pub channels: Vec<String>,

    #[serde(default = "default_true", deserialize_with = "not_false")]
    pub enabled: bool,

    #[serde(default = "default_true", deserialize_with = "not_false")]
    pub on_title: bool,

    #[serde(default = "default_true", deserialize_with = "not_false")]
    pub on_description: bool,

    #[serde(default = "default_true", deserialize_with = "not_false")]
    pub on_channel_name: bool,

    #[serde(default = "default_true", deserialize_with = "not_false")]
    pub mark_not_interested: bool,
}

impl RuleSpec {
    /// A rule with every flag at its default and no criteria.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: String::new(),
            keywords: Vec::new(),
            channels: Vec::new(),
            enabled: true,
            on_title: true,
            on_description: true,
            on_channel_name: true,
            mark_not_interested: true,
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict the rule to the given fields.
    pub fn only_on(mut self, fields: &[MatchField]) -> Self {
        self.on_title = fields.contains(&MatchField::Title);
        self.on_channel_name = fields.contains(&MatchField::Channel);
        self.on_description = fields.contains(&MatchField::Description);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

fn default_true() -> bool {
    true
}

fn not_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(!matches!(value, Value::Bool(false)))
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(value).unwrap_or_default())
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Sequence(items) => items.into_iter().filter_map(scalar_to_string).collect(),
        _ => Vec::new(),
    })
}

/// Errors raised while compiling a stored rule.
///
/// These never escape [`CompiledRule::compile`]; they are logged and the
/// offending pattern is dropped.
#[derive(Error, Debug)]
pub enum PatternError {
    #[error("invalid pattern in rule '{rule}': {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid keyword '{keyword}' in rule '{rule}': {source}")]
    InvalidKeyword {
        rule: String,
        keyword: String,
        #[source]
        source: regex::Error,
    },
}

/// Parse a raw stored rule list.
///
/// Entries may be mappings or strings holding a serialized rule. Entries that
/// are neither are dropped with a warning. Missing names become `Rule <n>`.
pub fn parse_rule_list(raw: Option<&Value>, kind: ListKind) -> Vec<RuleSpec> {
    let items = match raw {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Sequence(items)) => items,
        Some(other) => {
            tracing::warn!("{} is not a list, ignoring it: {:?}", kind, other);
            return Vec::new();
        }
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let parsed = match item {
                Value::String(text) => serde_yaml_ng::from_str::<Value>(text)
                    .map_err(|e| e.to_string())
                    .and_then(|v| match v {
                        Value::Mapping(_) => {
                            serde_yaml_ng::from_value::<RuleSpec>(v).map_err(|e| e.to_string())
                        }
                        _ => Err("not a rule object".to_string()),
                    }),
                Value::Mapping(_) => {
                    serde_yaml_ng::from_value::<RuleSpec>(item.clone()).map_err(|e| e.to_string())
                }
                _ => Err("not a rule object".to_string()),
            };

            match parsed {
                Ok(mut rule) => {
                    if rule.name.trim().is_empty() {
                        rule.name = format!("Rule {}", index + 1);
                    }
                    Some(rule)
                }
                Err(e) => {
                    tracing::warn!("{} item #{} is invalid and was skipped: {}", kind, index, e);
                    None
                }
            }
        })
        .collect()
}

/// Compile a user pattern as a case-insensitive regex. Empty means absent.
pub fn compile_pattern(pattern: &str) -> Result<Option<Regex>, regex::Error> {
    if pattern.is_empty() {
        return Ok(None);
    }
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map(Some)
}

/// Compile a keyword into a case-insensitive whole-word regex.
///
/// The keyword is trimmed, lower-cased, and escaped. Blank keywords yield
/// `None`.
pub fn compile_keyword(keyword: &str) -> Result<Option<Regex>, regex::Error> {
    let trimmed = keyword.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let escaped = regex::escape(&trimmed.to_lowercase());
    RegexBuilder::new(&format!(r"\b{}\b", escaped))
        .case_insensitive(true)
        .build()
        .map(Some)
}

/// A rule ready for matching. Immutable once built.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub name: String,
    pub enabled: bool,
    pub pattern: Option<Regex>,
    pub keyword_patterns: Vec<Regex>,
    pub on_title: bool,
    pub on_description: bool,
    pub on_channel_name: bool,
    pub mark_not_interested: bool,
}

impl CompiledRule {
    /// Compile a stored rule. Invalid patterns and keywords are logged and
    /// dropped, never returned as errors.
    pub fn compile(spec: &RuleSpec, kind: ListKind) -> Self {
        let pattern = match compile_pattern(&spec.pattern) {
            Ok(pattern) => pattern,
            Err(source) => {
                let err = PatternError::InvalidPattern {
                    rule: spec.name.clone(),
                    source,
                };
                tracing::warn!("{}: {}", kind, err);
                None
            }
        };

        let keyword_patterns = spec
            .keywords
            .iter()
            .filter_map(|keyword| match compile_keyword(keyword) {
                Ok(compiled) => compiled,
                Err(source) => {
                    let err = PatternError::InvalidKeyword {
                        rule: spec.name.clone(),
                        keyword: keyword.clone(),
                        source,
                    };
                    tracing::warn!("{}: {}", kind, err);
                    None
                }
            })
            .collect();

        Self {
            name: spec.name.clone(),
            enabled: spec.enabled,
            pattern,
            keyword_patterns,
            on_title: spec.on_title,
            on_description: spec.on_description,
            on_channel_name: spec.on_channel_name,
            mark_not_interested: spec.mark_not_interested,
        }
    }

    /// A rule with nothing to match against can never match.
    pub fn is_inert(&self) -> bool {
        self.pattern.is_none() && self.keyword_patterns.is_empty()
    }

    /// Targeted fields in matching priority order: title, channel, description.
    pub fn target_fields(&self) -> impl Iterator<Item = MatchField> + '_ {
        [
            (MatchField::Title, self.on_title),
            (MatchField::Channel, self.on_channel_name),
            (MatchField::Description, self.on_description),
        ]
        .into_iter()
        .filter_map(|(field, on)| on.then_some(field))
    }
}

/// Which rule lists are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMode {
    pub use_blacklist: bool,
    pub use_whitelist: bool,
}

impl ListMode {
    pub fn new(use_blacklist: bool, use_whitelist: bool) -> Self {
        Self {
            use_blacklist,
            use_whitelist,
        }
    }

    pub fn is_whitelist_only(&self) -> bool {
        self.use_whitelist && !self.use_blacklist
    }
}

impl Default for ListMode {
    fn default() -> Self {
        Self::new(true, false)
    }
}

/// Compiled blacklist and whitelist. Rebuilt only on configuration reload.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub blacklist: Vec<CompiledRule>,
    pub whitelist: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn compile(blacklist: &[RuleSpec], whitelist: &[RuleSpec]) -> Self {
        let rule_set = Self {
            blacklist: blacklist
                .iter()
                .map(|r| CompiledRule::compile(r, ListKind::Blacklist))
                .collect(),
            whitelist: whitelist
                .iter()
                .map(|r| CompiledRule::compile(r, ListKind::Whitelist))
                .collect(),
        };

        tracing::debug!(
            "Rule set compiled: blacklist={} ({} inert), whitelist={} ({} inert)",
            rule_set.blacklist.len(),
            rule_set.blacklist.iter().filter(|r| r.is_inert()).count(),
            rule_set.whitelist.len(),
            rule_set.whitelist.iter().filter(|r| r.is_inert()).count()
        );

        rule_set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_spec_defaults() {
        let rule: RuleSpec = serde_yaml_ng::from_str("name: spiders").unwrap();
        assert!(rule.enabled);
        assert!(rule.on_title && rule.on_description && rule.on_channel_name);
        assert!(rule.mark_not_interested);
        assert!(rule.keywords.is_empty());
    }

    #[test]
    fn test_rule_spec_lenient_fields() {
        let rule: RuleSpec =
            serde_yaml_ng::from_str("name: x\nkeywords: nope\nenabled: 0\nonTitle: false").unwrap();
        assert!(rule.keywords.is_empty());
        assert!(rule.enabled, "only an explicit false disables");
        assert!(!rule.on_title);
    }

    #[test]
    fn test_parse_rule_list_mixed_entries() {
        let raw: Value = serde_yaml_ng::from_str(
            r#"
- name: plain
  keywords: [cats]
- '{"name": "from json", "pattern": "dogs"}'
- 17
- keywords: [unnamed]
"#,
        )
        .unwrap();

        let rules = parse_rule_list(Some(&raw), ListKind::Blacklist);
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].name, "plain");
        assert_eq!(rules[1].name, "from json");
        assert_eq!(rules[1].pattern, "dogs");
        assert_eq!(rules[2].name, "Rule 4");
    }

    #[test]
    fn test_parse_rule_list_not_a_list() {
        let raw = Value::String("oops".into());
        assert!(parse_rule_list(Some(&raw), ListKind::Whitelist).is_empty());
        assert!(parse_rule_list(None, ListKind::Whitelist).is_empty());
    }

    #[test]
    fn test_compile_keyword_escapes_metacharacters() {
        let re = compile_keyword("  Node.JS ").unwrap().unwrap();
        assert!(re.is_match("learn node.js today"));
        assert!(!re.is_match("learn nodexjs today"));
        assert!(compile_keyword("   ").unwrap().is_none());
    }

    #[test]
    fn test_compile_keyword_whole_word() {
        let re = compile_keyword("spider").unwrap().unwrap();
        assert!(re.is_match("giant spider attack"));
        assert!(!re.is_match("spiderman"));
        assert!(!re.is_match(""));
    }

    #[test]
    fn test_invalid_pattern_is_dropped() {
        let spec = RuleSpec::named("broken").with_pattern("(unclosed");
        let rule = CompiledRule::compile(&spec, ListKind::Blacklist);
        assert!(rule.pattern.is_none());
        assert!(rule.is_inert());
    }

    #[test]
    fn test_target_field_order() {
        let rule = CompiledRule::compile(&RuleSpec::named("all"), ListKind::Blacklist);
        let fields: Vec<_> = rule.target_fields().collect();
        assert_eq!(
            fields,
            vec![MatchField::Title, MatchField::Channel, MatchField::Description]
        );

        let only_desc = CompiledRule::compile(
            &RuleSpec::named("desc").only_on(&[MatchField::Description]),
            ListKind::Whitelist,
        );
        assert_eq!(
            only_desc.target_fields().collect::<Vec<_>>(),
            vec![MatchField::Description]
        );
    }
}
