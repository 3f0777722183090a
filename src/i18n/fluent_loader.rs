use anyhow::{anyhow, Result};
use fluent_bundle::{concurrent::FluentBundle, FluentResource};
use std::collections::HashMap;

use crate::i18n::language::SupportedLanguage;

pub type Bundle = FluentBundle<FluentResource>;

const PT_BR_COMMON: &str = include_str!("../../locales/pt-BR/common.ftl");
const EN_COMMON: &str = include_str!("../../locales/en/common.ftl");

/// Holds one Fluent bundle per supported language. Catalogues are compiled
/// into the binary so the service has no runtime file dependency.
pub struct FluentLoader {
    bundles: HashMap<SupportedLanguage, Bundle>,
}

impl FluentLoader {
    pub fn new() -> Self {
        Self {
            bundles: HashMap::new(),
        }
    }

    fn sources(language: SupportedLanguage) -> &'static [&'static str] {
        match language {
            SupportedLanguage::Portuguese => &[PT_BR_COMMON],
            SupportedLanguage::English => &[EN_COMMON],
        }
    }

    pub fn load_locale(&mut self, language: SupportedLanguage) -> Result<()> {
        self.load_sources(language, Self::sources(language))?;
        tracing::info!("Loaded {} FTL files for locale {}", Self::sources(language).len(), language.code());
        Ok(())
    }

    /// Build the bundle for `language` from FTL sources, replacing any
    /// bundle loaded before.
    pub fn load_sources(&mut self, language: SupportedLanguage, sources: &[&str]) -> Result<()> {
        let mut bundle = FluentBundle::new_concurrent(vec![language.lang_id()]);
        // Messages end up in JSON bodies, not bidi-sensitive markup.
        bundle.set_use_isolating(false);

        for source in sources {
            let resource = FluentResource::try_new(source.to_string()).map_err(|(_, errors)| {
                anyhow!("Failed to parse FTL for {}: {:?}", language.code(), errors)
            })?;

            bundle
                .add_resource(resource)
                .map_err(|errors| anyhow!("Failed to add resource to bundle: {:?}", errors))?;
        }

        self.bundles.insert(language, bundle);
        Ok(())
    }

    pub fn get_bundle(&self, language: &SupportedLanguage) -> Option<&Bundle> {
        self.bundles.get(language)
    }
}

impl Default for FluentLoader {
    fn default() -> Self {
        Self::new()
    }
}
