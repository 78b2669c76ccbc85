use crate::error::StockroomError;
use axum::http::request::Parts;

/// Extracts credentials from request headers
pub struct TokenExtractor;

impl TokenExtractor {
    /// Extract token from Authorization header
    pub fn from_header(parts: &Parts) -> Result<String, StockroomError> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| StockroomError::unauthorized("Missing authorization header"))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            StockroomError::unauthorized(
                "Invalid authorization header format. Expected: Bearer <token>",
            )
        })?;

        let token = token.trim();
        if token.is_empty() {
            return Err(StockroomError::unauthorized("Empty bearer token"));
        }

        Ok(token.to_string())
    }

    /// Extract token from a named cookie
    pub fn from_cookie(parts: &Parts, cookie_name: &str) -> Result<String, StockroomError> {
        let prefix = format!("{}=", cookie_name);

        parts
            .headers
            .get_all("cookie")
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|header| header.split(';'))
            .map(str::trim)
            .find_map(|cookie| cookie.strip_prefix(prefix.as_str()))
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                StockroomError::unauthorized(format!("Cookie '{}' not found", cookie_name))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn request_parts(header: (&str, &str)) -> Parts {
        let req = Request::builder()
            .header(header.0, header.1)
            .body(())
            .unwrap();
        req.into_parts().0
    }

    #[test]
    fn test_extract_from_valid_bearer_header() {
        let parts = request_parts(("authorization", "Bearer test_token_123"));
        assert_eq!(TokenExtractor::from_header(&parts).unwrap(), "test_token_123");
    }

    #[test]
    fn test_extract_from_missing_header() {
        let req = Request::builder().body(()).unwrap();
        let (parts, _) = req.into_parts();

        assert!(TokenExtractor::from_header(&parts).is_err());
    }

    #[test]
    fn test_extract_from_invalid_format() {
        let parts = request_parts(("authorization", "Basic credentials"));
        assert!(TokenExtractor::from_header(&parts).is_err());

        let parts = request_parts(("authorization", "Bearer   "));
        assert!(TokenExtractor::from_header(&parts).is_err());
    }

    #[test]
    fn test_extract_from_cookie() {
        let parts = request_parts(("cookie", "theme=dark; stockroom_session=abc123; lang=en"));
        assert_eq!(
            TokenExtractor::from_cookie(&parts, "stockroom_session").unwrap(),
            "abc123"
        );
        assert!(TokenExtractor::from_cookie(&parts, "other").is_err());
    }

    #[test]
    fn test_cookie_name_must_match_exactly() {
        let parts = request_parts(("cookie", "xstockroom_session=abc"));
        assert!(TokenExtractor::from_cookie(&parts, "stockroom_session").is_err());
    }
}
