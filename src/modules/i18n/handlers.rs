use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::app_state::AppState;
use crate::i18n::{I18n, SupportedLanguage};

/// Messages the registration pages need when no keys are requested.
const DEFAULT_CLIENT_KEYS: &[&str] = &[
    "cpf-invalid",
    "registration-created",
    "registration-deadline-passed",
    "registration-event-ended",
    "registration-temporarily-closed",
    "registration-full",
    "registration-duplicate",
];

#[derive(Debug, Deserialize)]
pub struct TranslationQuery {
    /// Comma-separated list of message keys.
    pub keys: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LanguageInfo {
    pub code: &'static str,
    pub is_default: bool,
}

#[derive(Debug, Serialize)]
pub struct SupportedLanguagesResponse {
    pub languages: Vec<LanguageInfo>,
    pub default_language: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TranslationsResponse {
    pub language: &'static str,
    pub translations: BTreeMap<String, String>,
    /// Requested keys with no message in the catalogue.
    pub missing: Vec<String>,
}

pub async fn get_supported_languages(State(state): State<AppState>) -> Json<SupportedLanguagesResponse> {
    let default_language = state.localizer.default_language();
    let languages = SupportedLanguage::all()
        .iter()
        .map(|lang| LanguageInfo {
            code: lang.code(),
            is_default: *lang == default_language,
        })
        .collect();

    Json(SupportedLanguagesResponse {
        languages,
        default_language: default_language.code(),
    })
}

/// Explicit `language` query wins over the request's detected language.
pub async fn get_translations(
    i18n: I18n,
    Query(query): Query<TranslationQuery>,
) -> Json<TranslationsResponse> {
    let language = query
        .language
        .as_deref()
        .and_then(|lang| lang.parse::<SupportedLanguage>().ok())
        .unwrap_or(i18n.language);

    let keys: Vec<String> = match query.keys {
        Some(keys) => keys
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect(),
        None => DEFAULT_CLIENT_KEYS.iter().map(|key| key.to_string()).collect(),
    };

    let mut translations = BTreeMap::new();
    let mut missing = Vec::new();
    for key in keys {
        if i18n.localizer.has_message(&language, &key) {
            let text = i18n.localizer.get_string_for_language(&language, &key);
            translations.insert(key, text);
        } else {
            missing.push(key);
        }
    }

    Json(TranslationsResponse {
        language: language.code(),
        translations,
        missing,
    })
}
