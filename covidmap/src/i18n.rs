//! UI language selection.
//!
//! Translations come from externally supplied JSON bundles in the i18next
//! resource layout:
//!
//! ```json
//! { "en": { "translation": { "header": { "title": "Map" } } } }
//! ```
//!
//! Nested keys are addressed with dots (`header.title`). The selected language
//! is persisted under [`LANGUAGE_KEY`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MapError;
use crate::storage::{KeyValueStore, LANGUAGE_KEY};

/// Supported UI language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English.
    En,
    /// Portuguese.
    Pt,
}

impl Language {
    /// All supported languages.
    pub const ALL: [Language; 2] = [Language::En, Language::Pt];

    /// Language code as stored and used in bundles.
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Pt => "pt",
        }
    }

    /// Parses a language code.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|lang| lang.code() == code)
    }

    /// Picks the language for a platform locale such as `pt-BR` or `en-US`.
    pub fn from_locale(locale: &str) -> Self {
        if locale.contains("pt") {
            Self::Pt
        } else {
            Self::En
        }
    }
}

/// Translation strings of all languages.
#[derive(Debug, Clone, Default)]
pub struct Translations {
    bundles: HashMap<Language, HashMap<String, String>>,
}

#[derive(Deserialize)]
struct Bundle {
    translation: Value,
}

impl Translations {
    /// Parses a bundle document. Languages that are not supported are skipped.
    pub fn from_json(json: &str) -> Result<Self, MapError> {
        let documents: HashMap<String, Bundle> = serde_json::from_str(json)?;
        let mut translations = Self::default();

        for (code, bundle) in documents {
            let Some(language) = Language::from_code(&code) else {
                log::warn!("Skipping translations for unsupported language '{code}'");
                continue;
            };

            let strings = translations.bundles.entry(language).or_default();
            flatten(String::new(), bundle.translation, strings);
        }

        Ok(translations)
    }

    /// Adds the strings of `other`, overriding existing keys.
    pub fn merge(&mut self, other: Translations) {
        for (language, strings) in other.bundles {
            self.bundles.entry(language).or_default().extend(strings);
        }
    }

    /// Looks up a string.
    pub fn get(&self, language: Language, key: &str) -> Option<&str> {
        self.bundles
            .get(&language)
            .and_then(|strings| strings.get(key))
            .map(String::as_str)
    }
}

fn flatten(prefix: String, value: Value, out: &mut HashMap<String, String>) {
    match value {
        Value::Object(entries) => {
            for (key, value) in entries {
                let key = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(key, value, out);
            }
        }
        Value::String(text) => {
            out.insert(prefix, text);
        }
        Value::Null => {}
        other => {
            out.insert(prefix, other.to_string());
        }
    }
}

/// Current UI language and translation lookup.
pub struct I18n {
    store: Arc<dyn KeyValueStore + Send + Sync>,
    translations: Translations,
    language: Language,
}

impl I18n {
    /// Restores the persisted language, or picks one from the platform `locale`.
    ///
    /// The resulting language is written back to the store.
    pub fn new(
        store: Arc<dyn KeyValueStore + Send + Sync>,
        translations: Translations,
        locale: &str,
    ) -> Result<Self, MapError> {
        let stored = store.get(LANGUAGE_KEY)?;
        let language = match stored.as_deref().and_then(Language::from_code) {
            Some(language) => language,
            None => {
                if let Some(code) = stored {
                    log::warn!("Ignoring unsupported stored language '{code}'");
                }
                Language::from_locale(locale)
            }
        };

        store.set(LANGUAGE_KEY, language.code())?;
        log::info!("UI language is '{}'", language.code());

        Ok(Self {
            store,
            translations,
            language,
        })
    }

    /// Text for `key` in the current language, or the key itself if missing.
    pub fn text(&self, key: &str) -> String {
        self.translations
            .get(self.language, key)
            .unwrap_or(key)
            .to_string()
    }

    /// Current language.
    pub fn language(&self) -> Language {
        self.language
    }

    /// Languages the user can pick.
    pub fn languages(&self) -> &'static [Language] {
        &Language::ALL
    }

    /// Switches the language, persists it and then calls `on_changed`.
    pub fn set_language(
        &mut self,
        language: Language,
        on_changed: impl FnOnce(Language),
    ) -> Result<(), MapError> {
        self.store.set(LANGUAGE_KEY, language.code())?;
        self.language = language;
        log::debug!("UI language changed to '{}'", language.code());
        on_changed(language);
        Ok(())
    }
}

impl std::fmt::Debug for I18n {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("I18n")
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}
