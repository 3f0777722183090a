use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;
use unic_langid::LanguageIdentifier;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupportedLanguage {
    #[default]
    #[serde(rename = "pt-BR")]
    Portuguese,
    #[serde(rename = "en")]
    English,
}

impl SupportedLanguage {
    pub fn all() -> &'static [SupportedLanguage] {
        &[SupportedLanguage::Portuguese, SupportedLanguage::English]
    }

    /// Code used for locale directories and the `X-Language` header.
    pub fn code(&self) -> &'static str {
        match self {
            SupportedLanguage::Portuguese => "pt-BR",
            SupportedLanguage::English => "en",
        }
    }

    /// Get the language identifier for Fluent
    pub fn lang_id(&self) -> LanguageIdentifier {
        self.code().parse().unwrap_or_default()
    }

    /// First supported language in an Accept-Language list, if any.
    pub fn from_accept_language(accept_language: &str) -> Option<Self> {
        accept_language.split(',').find_map(|part| {
            let tag = part.trim().split(';').next().unwrap_or("").to_lowercase();
            if tag.starts_with("pt") {
                Some(SupportedLanguage::Portuguese)
            } else if tag.starts_with("en") {
                Some(SupportedLanguage::English)
            } else {
                None
            }
        })
    }
}

impl Display for SupportedLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for SupportedLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pt" | "pt-br" | "portuguese" | "português" => Ok(SupportedLanguage::Portuguese),
            "en" | "en-us" | "english" => Ok(SupportedLanguage::English),
            _ => Err(format!("Unsupported language: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_accept_language_picks_first_supported() {
        assert_eq!(
            SupportedLanguage::from_accept_language("fr-FR,en;q=0.8,pt-BR;q=0.5"),
            Some(SupportedLanguage::English)
        );
        assert_eq!(
            SupportedLanguage::from_accept_language("pt-BR,pt;q=0.9"),
            Some(SupportedLanguage::Portuguese)
        );
        assert_eq!(SupportedLanguage::from_accept_language("de-DE"), None);
    }

    #[test]
    fn test_parse_language_codes() {
        assert_eq!("PT-BR".parse(), Ok(SupportedLanguage::Portuguese));
        assert_eq!("en".parse(), Ok(SupportedLanguage::English));
        assert!("tr".parse::<SupportedLanguage>().is_err());
    }
}
