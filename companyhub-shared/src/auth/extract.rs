//! Access token extraction from request headers
//!
//! The `access_token` cookie takes precedence; `Authorization: Bearer` is the
//! fallback for non-browser clients.

use axum::http::{header, HeaderMap};

/// Name of the cookie carrying the access token
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Extracts the raw access token from request headers
///
/// Returns None when neither a usable cookie nor a bearer token is present.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    cookie_token(headers).or_else(|| bearer_token(headers))
}

/// Reads the first `access_token` pair across all `Cookie` headers
///
/// An empty value or one that is not valid percent-encoding counts as absent.
pub fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| name.trim() == ACCESS_TOKEN_COOKIE)
        .map(|(_, value)| value.trim())?;

    let decoded = urlencoding::decode(raw).ok()?;
    if decoded.is_empty() {
        return None;
    }

    Some(decoded.into_owned())
}

/// Reads a token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(header::HeaderName, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_no_credentials() {
        assert_eq!(extract_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_cookie_token() {
        let map = headers(&[(header::COOKIE, "theme=dark; access_token=abc.def.ghi; lang=en")]);
        assert_eq!(extract_token(&map), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_cookie_value_is_url_decoded() {
        let map = headers(&[(header::COOKIE, "access_token=a%2Eb%3Dc")]);
        assert_eq!(cookie_token(&map), Some("a.b=c".to_string()));
    }

    #[test]
    fn test_cookie_split_on_first_equals() {
        let map = headers(&[(header::COOKIE, "access_token=abc==")]);
        assert_eq!(cookie_token(&map), Some("abc==".to_string()));
    }

    #[test]
    fn test_first_cookie_wins() {
        let map = headers(&[
            (header::COOKIE, "access_token=first"),
            (header::COOKIE, "access_token=second"),
        ]);
        assert_eq!(cookie_token(&map), Some("first".to_string()));
    }

    #[test]
    fn test_similar_cookie_names_ignored() {
        let map = headers(&[(header::COOKIE, "my_access_token=nope; access_token_old=nope")]);
        assert_eq!(cookie_token(&map), None);
    }

    #[test]
    fn test_cookie_takes_precedence_over_bearer() {
        let map = headers(&[
            (header::COOKIE, "access_token=from-cookie"),
            (header::AUTHORIZATION, "Bearer from-header"),
        ]);
        assert_eq!(extract_token(&map), Some("from-cookie".to_string()));
    }

    #[test]
    fn test_bearer_fallback() {
        let map = headers(&[
            (header::COOKIE, "theme=dark"),
            (header::AUTHORIZATION, "Bearer from-header"),
        ]);
        assert_eq!(extract_token(&map), Some("from-header".to_string()));
    }

    #[test]
    fn test_empty_cookie_falls_back_to_bearer() {
        let map = headers(&[
            (header::COOKIE, "access_token="),
            (header::AUTHORIZATION, "Bearer from-header"),
        ]);
        assert_eq!(extract_token(&map), Some("from-header".to_string()));
    }

    #[test]
    fn test_malformed_cookie_encoding_is_absent() {
        let map = headers(&[(header::COOKIE, "access_token=%FF%FE")]);
        assert_eq!(cookie_token(&map), None);
    }

    #[test]
    fn test_bearer_requires_scheme() {
        assert_eq!(bearer_token(&headers(&[(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")])), None);
        assert_eq!(bearer_token(&headers(&[(header::AUTHORIZATION, "token-only")])), None);
        assert_eq!(bearer_token(&headers(&[(header::AUTHORIZATION, "Bearer ")])), None);
        assert_eq!(
            bearer_token(&headers(&[(header::AUTHORIZATION, "bearer lower")])),
            Some("lower".to_string())
        );
    }
}
