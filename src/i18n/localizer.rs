use anyhow::{anyhow, Result};
use fluent_bundle::{FluentArgs, FluentValue};
use std::collections::HashMap;

use crate::i18n::fluent_loader::FluentLoader;
use crate::i18n::language::SupportedLanguage;

/// Resolves message keys against the loaded bundles, falling back to the
/// default language and finally to the key itself.
pub struct Localizer {
    loader: FluentLoader,
    default_language: SupportedLanguage,
}

impl Localizer {
    pub fn new(loader: FluentLoader, default_language: SupportedLanguage) -> Self {
        Self {
            loader,
            default_language,
        }
    }

    pub fn get_message_with_language(
        &self,
        language: &SupportedLanguage,
        key: &str,
        args: Option<&HashMap<String, FluentValue>>,
    ) -> Result<String> {
        // Requested language first, then the default one, per message.
        let (bundle, message) = [language, &self.default_language]
            .into_iter()
            .filter_map(|lang| self.loader.get_bundle(lang))
            .find_map(|bundle| bundle.get_message(key).map(|message| (bundle, message)))
            .ok_or_else(|| anyhow!("Message not found: {} ({})", key, language))?;

        let pattern = message
            .value()
            .ok_or_else(|| anyhow!("Message has no value: {}", key))?;

        let mut errors = Vec::new();
        let formatted = match args {
            Some(args) => {
                let mut fluent_args = FluentArgs::new();
                for (k, v) in args {
                    fluent_args.set(k.as_str(), v.clone());
                }
                bundle.format_pattern(pattern, Some(&fluent_args), &mut errors)
            }
            None => bundle.format_pattern(pattern, None, &mut errors),
        };

        if !errors.is_empty() {
            tracing::warn!("Fluent formatting errors for key '{}': {:?}", key, errors);
        }

        Ok(formatted.into_owned())
    }

    pub fn get_string_for_language(&self, language: &SupportedLanguage, key: &str) -> String {
        self.get_message_with_language(language, key, None)
            .unwrap_or_else(|_| key.to_string())
    }

    /// Whether `language`'s own catalogue defines `key`, ignoring fallback.
    pub fn has_message(&self, language: &SupportedLanguage, key: &str) -> bool {
        self.loader
            .get_bundle(language)
            .map(|bundle| bundle.has_message(key))
            .unwrap_or(false)
    }

    pub fn default_language(&self) -> SupportedLanguage {
        self.default_language
    }
}
