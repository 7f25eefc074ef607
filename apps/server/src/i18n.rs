//! Locale selection for user-facing messages.
//!
//! The public admissions form is Indonesian-first; the admin panel speaks English.
//! Callers can override either default with `Accept-Language`.

use axum::http::{header, HeaderMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    /// Bahasa Indonesia
    Id,
    #[default]
    En,
}

impl Locale {
    /// Pick the first supported language tag from `Accept-Language`, or `fallback`.
    ///
    /// Quality values are ignored; tags are considered in the order sent.
    pub fn from_headers(headers: &HeaderMap, fallback: Locale) -> Locale {
        let Some(value) = headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
        else {
            return fallback;
        };

        for tag in value.split(',') {
            let primary = tag
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .split('-')
                .next()
                .unwrap_or_default()
                .to_ascii_lowercase();
            match primary.as_str() {
                "id" | "in" => return Locale::Id,
                "en" => return Locale::En,
                _ => {}
            }
        }
        fallback
    }

    /// Choose between an English and an Indonesian rendering.
    pub fn pick<'a>(self, en: &'a str, id: &'a str) -> &'a str {
        match self {
            Locale::En => en,
            Locale::Id => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_header_uses_fallback() {
        assert_eq!(Locale::from_headers(&HeaderMap::new(), Locale::Id), Locale::Id);
        assert_eq!(Locale::from_headers(&HeaderMap::new(), Locale::En), Locale::En);
    }

    #[test]
    fn first_supported_tag_wins() {
        assert_eq!(Locale::from_headers(&headers("en-US,id;q=0.8"), Locale::Id), Locale::En);
        assert_eq!(Locale::from_headers(&headers("fr, id-ID;q=0.9"), Locale::En), Locale::Id);
        assert_eq!(Locale::from_headers(&headers("fr, de"), Locale::Id), Locale::Id);
    }
}
