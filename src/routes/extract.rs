//! Request extractors that answer with [`AppError`] bodies instead of
//! axum's plain-text rejections.

use crate::error::AppError;
use axum::{
    extract::{rejection::QueryRejection, FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use validator::Validate;

/// JSON body that has passed its `validator` rules.
///
/// Malformed JSON becomes a 400 with the parser's message; rule violations
/// become a 400 listing every failing field.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Query string extractor with JSON error bodies.
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: QueryRejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Accept a Telegram ID sent either as a JSON string or a JSON number.
///
/// Strings are trimmed; a blank string is treated as absent.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(i64),
    }

    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.map(|value| match value {
            StringOrNumber::String(s) => s.trim().to_string(),
            StringOrNumber::Number(n) => n.to_string(),
        })
        .filter(|s| !s.is_empty()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Body {
        #[serde(default, deserialize_with = "string_or_number")]
        id: Option<String>,
    }

    #[test]
    fn test_string_or_number() {
        let body: Body = serde_json::from_str(r#"{"id":"42"}"#).unwrap();
        assert_eq!(body.id.as_deref(), Some("42"));

        let body: Body = serde_json::from_str(r#"{"id":42}"#).unwrap();
        assert_eq!(body.id.as_deref(), Some("42"));

        let body: Body = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(body.id, None);

        let body: Body = serde_json::from_str(r#"{"id":null}"#).unwrap();
        assert_eq!(body.id, None);

        let body: Body = serde_json::from_str(r#"{"id":" 42\t"}"#).unwrap();
        assert_eq!(body.id.as_deref(), Some("42"));

        let body: Body = serde_json::from_str(r#"{"id":"  "}"#).unwrap();
        assert_eq!(body.id, None);

        assert!(serde_json::from_str::<Body>(r#"{"id":[1]}"#).is_err());
    }
}
