use crate::models::rule::{ListKind, ListMode, RuleSpec, parse_rule_list};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;

/// Storage keys, in the order they are requested from the store.
pub mod keys {
    pub const DEBUG_MODE: &str = "debugMode";
    pub const DRY_RUN: &str = "dryrun";
    pub const USE_BLACKLIST: &str = "useBlacklist";
    pub const USE_WHITELIST: &str = "useWhitelist";
    pub const BLACKLIST: &str = "blacklist";
    pub const WHITELIST: &str = "whitelist";
    pub const USE_STRICT_BLOCKING: &str = "useStrictBlocking";
    pub const YOUTUBE_LANGUAGE: &str = "youtubeLanguage";
    pub const CUSTOM_NOT_INTERESTED_PATTERN: &str = "customNotInterestedPattern";
    pub const CUSTOM_DONT_RECOMMEND_PATTERN: &str = "customDontRecommendPattern";
    pub const FILTER_SYNCHRONIZED_VIDEOS: &str = "filterSynchronizedVideos";
    pub const SYNCHRONIZED_VIDEO_ACTION: &str = "synchronizedVideoAction";

    pub const ALL: [&str; 12] = [
        DEBUG_MODE,
        DRY_RUN,
        USE_BLACKLIST,
        USE_WHITELIST,
        BLACKLIST,
        WHITELIST,
        USE_STRICT_BLOCKING,
        YOUTUBE_LANGUAGE,
        CUSTOM_NOT_INTERESTED_PATTERN,
        CUSTOM_DONT_RECOMMEND_PATTERN,
        FILTER_SYNCHRONIZED_VIDEOS,
        SYNCHRONIZED_VIDEO_ACTION,
    ];
}

/// What to do with items carrying the synchronized/dubbed badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SynchronizedVideoAction {
    #[default]
    Hide,
    NotInterested,
    Nothing,
}

/// All user options the filter understands, with documented defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSettings {
    pub use_blacklist: bool,
    pub use_whitelist: bool,
    pub blacklist: Vec<RuleSpec>,
    pub whitelist: Vec<RuleSpec>,

    /// Preferred menu label language; empty means auto-detect.
    pub youtube_language: String,

    pub debug_mode: bool,

    #[serde(rename = "dryrun")]
    pub dry_run: bool,

    pub use_strict_blocking: bool,
    pub custom_not_interested_pattern: String,
    pub custom_dont_recommend_pattern: String,
    pub filter_synchronized_videos: bool,
    pub synchronized_video_action: SynchronizedVideoAction,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            use_blacklist: true,
            use_whitelist: false,
            blacklist: Vec::new(),
            whitelist: Vec::new(),
            youtube_language: String::new(),
            debug_mode: false,
            dry_run: true,
            use_strict_blocking: false,
            custom_not_interested_pattern: String::new(),
            custom_dont_recommend_pattern: String::new(),
            filter_synchronized_videos: false,
            synchronized_video_action: SynchronizedVideoAction::Hide,
        }
    }
}

/// Decode one stored value, falling back to `default` when absent or invalid.
fn decode_or<T: DeserializeOwned>(values: &IndexMap<String, Value>, key: &str, default: T) -> T {
    match values.get(key) {
        None | Some(Value::Null) => default,
        Some(value) => match serde_yaml_ng::from_value::<T>(value.clone()) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!("Invalid value for '{}', using default: {}", key, e);
                default
            }
        },
    }
}

impl FilterSettings {
    /// Build settings from raw stored values.
    ///
    /// Each key is decoded on its own; a bad value only resets that key.
    pub fn from_values(values: &IndexMap<String, Value>) -> Self {
        let defaults = Self::default();

        let settings = Self {
            use_blacklist: decode_or(values, keys::USE_BLACKLIST, defaults.use_blacklist),
            use_whitelist: decode_or(values, keys::USE_WHITELIST, defaults.use_whitelist),
            blacklist: parse_rule_list(values.get(keys::BLACKLIST), ListKind::Blacklist),
            whitelist: parse_rule_list(values.get(keys::WHITELIST), ListKind::Whitelist),
            youtube_language: decode_or(values, keys::YOUTUBE_LANGUAGE, defaults.youtube_language),
            debug_mode: decode_or(values, keys::DEBUG_MODE, defaults.debug_mode),
            dry_run: decode_or(values, keys::DRY_RUN, defaults.dry_run),
            use_strict_blocking: decode_or(
                values,
                keys::USE_STRICT_BLOCKING,
                defaults.use_strict_blocking,
            ),
            custom_not_interested_pattern: decode_or(
                values,
                keys::CUSTOM_NOT_INTERESTED_PATTERN,
                defaults.custom_not_interested_pattern,
            ),
            custom_dont_recommend_pattern: decode_or(
                values,
                keys::CUSTOM_DONT_RECOMMEND_PATTERN,
                defaults.custom_dont_recommend_pattern,
            ),
            filter_synchronized_videos: decode_or(
                values,
                keys::FILTER_SYNCHRONIZED_VIDEOS,
                defaults.filter_synchronized_videos,
            ),
            synchronized_video_action: decode_or(
                values,
                keys::SYNCHRONIZED_VIDEO_ACTION,
                defaults.synchronized_video_action,
            ),
        };

        tracing::debug!(
            "Settings decoded: dryrun={}, blacklist={} ({} rules), whitelist={} ({} rules), strict={}, language='{}', synchronized={} ({:?})",
            settings.dry_run,
            settings.use_blacklist,
            settings.blacklist.len(),
            settings.use_whitelist,
            settings.whitelist.len(),
            settings.use_strict_blocking,
            settings.youtube_language,
            settings.filter_synchronized_videos,
            settings.synchronized_video_action
        );

        settings
    }

    /// Flatten into storable key/value pairs.
    pub fn to_values(&self) -> Result<IndexMap<String, Value>, serde_yaml_ng::Error> {
        let mut values = IndexMap::new();
        if let Value::Mapping(mapping) = serde_yaml_ng::to_value(self)? {
            for (key, value) in mapping {
                if let Value::String(key) = key {
                    values.insert(key, value);
                }
            }
        }
        Ok(values)
    }

    pub fn list_mode(&self) -> ListMode {
        ListMode::new(self.use_blacklist, self.use_whitelist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let settings = FilterSettings::from_values(&IndexMap::new());
        assert_eq!(settings, FilterSettings::default());
        assert!(settings.use_blacklist);
        assert!(!settings.use_whitelist);
        assert!(settings.dry_run);
        assert_eq!(
            settings.synchronized_video_action,
            SynchronizedVideoAction::Hide
        );
    }

    #[test]
    fn test_bad_value_only_resets_that_key() {
        let mut values = IndexMap::new();
        values.insert(keys::DRY_RUN.to_string(), Value::String("maybe".into()));
        values.insert(keys::USE_WHITELIST.to_string(), Value::Bool(true));

        let settings = FilterSettings::from_values(&values);
        assert!(settings.dry_run, "invalid dryrun falls back to default");
        assert!(settings.use_whitelist);
    }

    #[test]
    fn test_synchronized_action_names() {
        let mut values = IndexMap::new();
        values.insert(
            keys::SYNCHRONIZED_VIDEO_ACTION.to_string(),
            Value::String("notInterested".into()),
        );
        let settings = FilterSettings::from_values(&values);
        assert_eq!(
            settings.synchronized_video_action,
            SynchronizedVideoAction::NotInterested
        );
    }

    #[test]
    fn test_to_values_uses_storage_keys() {
        let values = FilterSettings::default().to_values().unwrap();
        for key in keys::ALL {
            assert!(values.contains_key(key), "missing key {}", key);
        }
        assert_eq!(values.len(), keys::ALL.len());
    }

    #[test]
    fn test_values_round_trip() {
        let mut settings = FilterSettings::default();
        settings.use_whitelist = true;
        settings.blacklist.push(RuleSpec::named("spiders").with_keywords(["spider"]));

        let restored = FilterSettings::from_values(&settings.to_values().unwrap());
        assert_eq!(restored, settings);
    }
}
