use std::borrow::Cow;

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{error::ShortenerError, short_id::ShortId};

/// A stored mapping from a short id to its destination.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UrlRecord {
    pub short_id: String,
    /// Stored exactly as submitted; see [`UrlRecord::destination`].
    pub original_url: String,
    pub username: String,
    pub password: String,
    pub clicks: i64,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl UrlRecord {
    #[must_use]
    pub fn new(short_id: &ShortId, original_url: String, owner: &OwnerCredential) -> Self {
        Self {
            short_id: short_id.as_str().to_owned(),
            original_url,
            username: owner.username().to_owned(),
            password: owner.password().to_owned(),
            clicks: 0,
            created_at: Utc::now(),
        }
    }

    /// The URL visitors are sent to.
    #[must_use]
    pub fn destination(&self) -> Cow<'_, str> {
        with_default_scheme(&self.original_url)
    }
}

/// The username/password pair that scopes list and delete.
///
/// Ownership is an exact, case-sensitive match against the values stored with a record.
/// Every comparison goes through this type (or the store filter built from it), so a
/// hashed or token based scheme only has to change here and in the stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerCredential {
    username: String,
    password: String,
}

impl OwnerCredential {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    #[must_use]
    pub fn owns(&self, record: &UrlRecord) -> bool {
        record.username == self.username && record.password == self.password
    }
}

/// Prefixes `https://` unless `raw` already starts with `<scheme>://`.
#[must_use]
pub fn with_default_scheme(raw: &str) -> Cow<'_, str> {
    if has_scheme(raw) {
        Cow::Borrowed(raw)
    } else {
        Cow::Owned(format!("https://{raw}"))
    }
}

fn has_scheme(raw: &str) -> bool {
    let Some((scheme, _)) = raw.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn is_valid_destination(raw: &str) -> bool {
    Url::parse(&with_default_scheme(raw))
        .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
}

/// JavaScript-style presence: absent and empty strings both count as missing.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenParams {
    pub original_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub short_id: Option<String>,
}

/// A create request that passed validation.
#[derive(Debug)]
pub struct NewLink {
    pub original_url: String,
    pub owner: OwnerCredential,
    pub short_id: Option<ShortId>,
}

impl ShortenParams {
    /// # Errors
    ///
    /// [`ShortenerError::Validation`] when a required field is missing, the URL is malformed
    /// or the requested short id is not usable.
    pub fn validate(self) -> Result<NewLink, ShortenerError> {
        let (Some(original_url), Some(username), Some(password)) = (
            present(self.original_url),
            present(self.username),
            present(self.password),
        ) else {
            return Err(ShortenerError::Validation(
                "URL, username, and password are required",
            ));
        };
        if !is_valid_destination(&original_url) {
            return Err(ShortenerError::Validation("URL provided was malformed"));
        }
        let short_id = present(self.short_id).map(ShortId::parse).transpose()?;

        Ok(NewLink {
            original_url,
            owner: OwnerCredential::new(username, password),
            short_id,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CredentialParams {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl CredentialParams {
    /// # Errors
    ///
    /// [`ShortenerError::Validation`] when either field is missing.
    pub fn validate(self) -> Result<OwnerCredential, ShortenerError> {
        match (present(self.username), present(self.password)) {
            (Some(username), Some(password)) => Ok(OwnerCredential::new(username, password)),
            _ => Err(ShortenerError::Validation(
                "Username and password are required",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub secret: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
    pub short_url: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSummary {
    pub short_id: String,
    pub original_url: String,
    pub clicks: i64,
    pub created_at: DateTime<Utc>,
}

impl From<UrlRecord> for LinkSummary {
    fn from(record: UrlRecord) -> Self {
        Self {
            short_id: record.short_id,
            original_url: record.original_url,
            clicks: record.clicks,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
