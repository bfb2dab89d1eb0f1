//! Localized menu labels for the "not interested" and "don't recommend
//! channel" actions.

use crate::models::FilterSettings;
use crate::models::rule::compile_pattern;
use regex::Regex;

struct LanguagePatterns {
    code: &'static str,
    not_interested: &'static str,
    dont_recommend: &'static str,
}

const LANGUAGES: &[LanguagePatterns] = &[
    LanguagePatterns {
        code: "en",
        not_interested: "not interested",
        dont_recommend: "don't recommend( this)? channel",
    },
    LanguagePatterns {
        code: "de",
        not_interested: "kein interesse",
        dont_recommend: "keine videos von diesem kanal empfehlen",
    },
    LanguagePatterns {
        code: "es",
        not_interested: "no me interesa",
        dont_recommend: "no recomendar( este)? canal",
    },
    LanguagePatterns {
        code: "fr",
        not_interested: "pas intéressé",
        dont_recommend: "ne pas recommander cette chaîne",
    },
    LanguagePatterns {
        code: "it",
        not_interested: "non mi interessa",
        dont_recommend: "non consigliare questo canale",
    },
    LanguagePatterns {
        code: "pt",
        not_interested: "não tenho interesse|não me interessa",
        dont_recommend: "não recomendar( este| esse)? canal",
    },
];

const FALLBACK_LANGUAGE: &str = "en";

fn lookup(code: &str) -> Option<&'static LanguagePatterns> {
    let primary = code.split(['-', '_']).next().unwrap_or(code).to_lowercase();
    LANGUAGES.iter().find(|lang| lang.code == primary)
}

/// Language codes with built-in labels.
pub fn supported_languages() -> impl Iterator<Item = &'static str> {
    LANGUAGES.iter().map(|lang| lang.code)
}

/// Compiled menu-action patterns for the current configuration.
#[derive(Debug, Clone)]
pub struct ActionPatterns {
    /// Resolved label language.
    pub language: &'static str,
    /// "Not interested" label.
    pub primary: Option<Regex>,
    /// "Don't recommend channel" label.
    pub strict: Option<Regex>,
    pub strict_enabled: bool,
}

impl ActionPatterns {
    /// Pick the label language and apply custom overrides.
    ///
    /// Language order: configured `youtubeLanguage`, then the detected
    /// document language, then English.
    pub fn resolve(settings: &FilterSettings, detected_language: Option<&str>) -> Self {
        let configured = settings.youtube_language.trim();
        let lang = (!configured.is_empty())
            .then(|| lookup(configured))
            .flatten()
            .or_else(|| detected_language.and_then(lookup))
            .or_else(|| lookup(FALLBACK_LANGUAGE))
            .unwrap_or(&LANGUAGES[0]);

        let primary = custom_or_default(
            &settings.custom_not_interested_pattern,
            lang.not_interested,
            "customNotInterestedPattern",
        );
        let strict = custom_or_default(
            &settings.custom_dont_recommend_pattern,
            lang.dont_recommend,
            "customDontRecommendPattern",
        );

        tracing::debug!(
            "Menu patterns resolved: language={}, strict_enabled={}",
            lang.code,
            settings.use_strict_blocking
        );

        Self {
            language: lang.code,
            primary,
            strict,
            strict_enabled: settings.use_strict_blocking,
        }
    }

    /// Strict pattern, but only while strict blocking is on.
    pub fn active_strict(&self) -> Option<&Regex> {
        self.strict.as_ref().filter(|_| self.strict_enabled)
    }

    /// Whether blocked items should go through the menu protocol at all.
    pub fn demands_interaction(&self) -> bool {
        self.active_strict().is_some() || self.primary.is_some()
    }
}

impl Default for ActionPatterns {
    fn default() -> Self {
        Self::resolve(&FilterSettings::default(), None)
    }
}

fn custom_or_default(custom: &str, default: &str, key: &str) -> Option<Regex> {
    if !custom.trim().is_empty() {
        match compile_pattern(custom) {
            Ok(Some(regex)) => return Some(regex),
            Ok(None) => {}
            Err(e) => tracing::warn!("Invalid {} '{}', using default: {}", key, custom, e),
        }
    }
    match compile_pattern(default) {
        Ok(regex) => regex,
        Err(e) => {
            tracing::warn!("Built-in menu pattern '{}' failed to compile: {}", default, e);
            None
        }
    }
}
