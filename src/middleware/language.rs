use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};

use crate::i18n::SupportedLanguage;

/// Stores the client's language in the request extensions. When the client
/// states no supported preference nothing is stored and the `I18n` extractor
/// falls back to the configured default.
pub async fn language_middleware(mut request: Request, next: Next) -> Response {
    if let Some(language) = detect_language_from_headers(request.headers()) {
        request.extensions_mut().insert(language);
    }

    next.run(request).await
}

/// `X-Language` wins over `Accept-Language`.
fn detect_language_from_headers(headers: &HeaderMap) -> Option<SupportedLanguage> {
    let explicit = headers
        .get("X-Language")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<SupportedLanguage>().ok());
    if explicit.is_some() {
        return explicit;
    }

    headers
        .get("Accept-Language")
        .and_then(|value| value.to_str().ok())
        .and_then(SupportedLanguage::from_accept_language)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_explicit_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Language", HeaderValue::from_static("en"));
        headers.insert("Accept-Language", HeaderValue::from_static("pt-BR"));
        assert_eq!(detect_language_from_headers(&headers), Some(SupportedLanguage::English));
    }

    #[test]
    fn test_unsupported_explicit_header_falls_through() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Language", HeaderValue::from_static("tr"));
        headers.insert("Accept-Language", HeaderValue::from_static("pt-BR,pt;q=0.9"));
        assert_eq!(
            detect_language_from_headers(&headers),
            Some(SupportedLanguage::Portuguese)
        );
        assert_eq!(detect_language_from_headers(&HeaderMap::new()), None);
    }
}
