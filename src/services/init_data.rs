// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Telegram WebApp `initData` verification.
//!
//! The mini-app client receives a query-string shaped `initData` blob from
//! Telegram and forwards it to us untouched. Authenticity is established by
//! recomputing the signature Telegram attached in the `hash` field:
//!
//! 1. derive a signing key from the bot token,
//! 2. drop `hash`, sort the remaining fields by name and join them as
//!    `name=value` lines (the "data check string"),
//! 3. HMAC-SHA256 the data check string with the signing key and compare the
//!    lowercase hex digest against `hash`.
//!
//! Values are taken literally: no escaping is applied to `=` or newlines.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Key used for the WebApp signing-key derivation.
const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";

/// Field carrying the signature itself.
pub const HASH_FIELD: &str = "hash";
const USER_FIELD: &str = "user";
const AUTH_DATE_FIELD: &str = "auth_date";

/// Tolerated clock difference for an `auth_date` ahead of our clock.
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// How the signing key is derived from the bot token.
///
/// Telegram documents `WebAppData` for mini-apps. `Sha256` is the Login
/// Widget convention that earlier deployments of this backend used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyDerivation {
    /// `HMAC-SHA256(key = "WebAppData", message = bot_token)`
    #[default]
    WebAppData,
    /// `SHA-256(bot_token)`
    Sha256,
}

impl FromStr for KeyDerivation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webapp" | "webappdata" | "hmac" => Ok(Self::WebAppData),
            "sha256" | "sha-256" | "legacy" => Ok(Self::Sha256),
            other => Err(format!(
                "unknown key derivation '{other}' (expected 'webapp' or 'sha256')"
            )),
        }
    }
}

impl fmt::Display for KeyDerivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WebAppData => f.write_str("webapp"),
            Self::Sha256 => f.write_str("sha256"),
        }
    }
}

/// Derive the 32-byte signing key from the bot token.
pub fn derive_signing_key(bot_token: &[u8], derivation: KeyDerivation) -> [u8; 32] {
    match derivation {
        KeyDerivation::WebAppData => {
            let mut mac = HmacSha256::new_from_slice(WEB_APP_DATA_KEY)
                .expect("HMAC accepts keys of any length");
            mac.update(bot_token);
            mac.finalize().into_bytes().into()
        }
        KeyDerivation::Sha256 => Sha256::digest(bot_token).into(),
    }
}

/// Build the canonical data check string: every field except `hash`, sorted
/// byte-wise by name, rendered as `name=value` and joined with `\n`.
pub fn data_check_string<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<(&str, &str)> = fields
        .into_iter()
        .filter(|(name, _)| *name != HASH_FIELD)
        .collect();
    pairs.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lowercase hex HMAC-SHA256 of the data check string under `signing_key`.
pub fn compute_hash(fields: &HashMap<String, String>, signing_key: &[u8; 32]) -> String {
    let check_string = data_check_string(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    let mut mac =
        HmacSha256::new_from_slice(signing_key).expect("HMAC accepts keys of any length");
    mac.update(check_string.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn verify_with_key(fields: &HashMap<String, String>, signing_key: &[u8; 32]) -> bool {
    let Some(supplied) = fields.get(HASH_FIELD) else {
        return false;
    };

    let expected = compute_hash(fields, signing_key);
    expected.as_bytes().ct_eq(supplied.as_bytes()).into()
}

/// Check the `hash` field of a decoded initData field map.
///
/// Pure and deterministic. A missing `hash` field verifies as `false`.
pub fn verify(
    fields: &HashMap<String, String>,
    bot_token: &[u8],
    derivation: KeyDerivation,
) -> bool {
    verify_with_key(fields, &derive_signing_key(bot_token, derivation))
}

/// Decode a raw initData string into its flat field map.
///
/// Uses `application/x-www-form-urlencoded` rules (`+` is a space). Repeated
/// field names are rejected since the signature covers a mapping.
pub fn parse_fields(raw: &str) -> Result<HashMap<String, String>, InitDataError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(InitDataError::Malformed("initData is empty".to_string()));
    }

    let mut fields = HashMap::new();
    for (name, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        if name.is_empty() {
            return Err(InitDataError::Malformed("empty field name".to_string()));
        }
        if fields.insert(name.to_string(), value.into_owned()).is_some() {
            return Err(InitDataError::Malformed(format!(
                "duplicate field '{name}'"
            )));
        }
    }
    Ok(fields)
}

/// The Telegram user embedded in initData's `user` field.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WebAppUser {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
}

/// Successfully verified initData.
#[derive(Debug, Clone)]
pub struct InitData {
    pub fields: HashMap<String, String>,
    pub user: WebAppUser,
    /// Unix seconds, when Telegram supplied it.
    pub auth_date: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitDataError {
    #[error("Malformed initData: {0}")]
    Malformed(String),

    #[error("initData has no user field")]
    MissingUser,

    #[error("initData user field is invalid: {0}")]
    InvalidUser(#[from] serde_json::Error),

    #[error("initData signature mismatch")]
    SignatureMismatch,

    #[error("initData has expired")]
    Expired,

    #[error("initData auth_date is in the future")]
    IssuedInFuture,
}

/// Verifier with the signing key derived once at startup.
#[derive(Clone)]
pub struct InitDataVerifier {
    signing_key: [u8; 32],
    max_age: Option<Duration>,
}

impl fmt::Debug for InitDataVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitDataVerifier")
            .field("signing_key", &"[REDACTED]")
            .field("max_age", &self.max_age)
            .finish()
    }
}

impl InitDataVerifier {
    pub fn new(bot_token: &SecretString, derivation: KeyDerivation) -> Self {
        Self {
            signing_key: derive_signing_key(bot_token.expose_secret().as_bytes(), derivation),
            max_age: None,
        }
    }

    /// Reject initData whose `auth_date` is older than `max_age`, or more
    /// than a minute ahead of the local clock.
    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    /// Verify a field map against this verifier's key.
    pub fn verify_fields(&self, fields: &HashMap<String, String>) -> bool {
        verify_with_key(fields, &self.signing_key)
    }

    /// Sign a field map; the inverse of [`Self::verify_fields`].
    pub fn sign(&self, fields: &HashMap<String, String>) -> String {
        compute_hash(fields, &self.signing_key)
    }

    /// Decode, authenticate and unpack a raw initData string.
    pub fn authenticate(&self, raw: &str) -> Result<InitData, InitDataError> {
        self.authenticate_at(raw, chrono::Utc::now().timestamp())
    }

    /// [`Self::authenticate`] with an explicit clock (Unix seconds).
    pub fn authenticate_at(&self, raw: &str, now: i64) -> Result<InitData, InitDataError> {
        let fields = parse_fields(raw)?;

        if !self.verify_fields(&fields) {
            return Err(InitDataError::SignatureMismatch);
        }

        let auth_date = match fields.get(AUTH_DATE_FIELD) {
            Some(value) => Some(value.parse::<i64>().map_err(|_| {
                InitDataError::Malformed(format!("auth_date '{value}' is not a timestamp"))
            })?),
            None => None,
        };

        if let Some(max_age) = self.max_age {
            // Unsigned freshness can't be judged.
            let issued = auth_date.ok_or(InitDataError::Expired)?;
            let age = now.saturating_sub(issued);
            if age < -MAX_CLOCK_SKEW_SECS {
                return Err(InitDataError::IssuedInFuture);
            }
            if age > i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX) {
                return Err(InitDataError::Expired);
            }
        }

        let user_json = fields.get(USER_FIELD).ok_or(InitDataError::MissingUser)?;
        let user: WebAppUser = serde_json::from_str(user_json)?;

        Ok(InitData {
            fields,
            user,
            auth_date,
        })
    }
}
