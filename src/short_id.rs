use std::fmt;

use crate::error::ShortenerError;

/// Length of generated ids.
pub const GENERATED_LENGTH: usize = 6;

/// Longest id a caller may ask for.
pub const MAX_CANDIDATE_LENGTH: usize = 64;

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Words that collide with the service's own routes.
const RESERVED: [&str; 2] = ["shorten", "list"];

/// A syntactically valid short id. Says nothing about whether it is taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortId(String);

impl ShortId {
    /// A fresh random id drawn from the thread-local CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let id = std::iter::repeat_with(|| ALPHABET[rand::random_range(0..ALPHABET.len())] as char)
            .take(GENERATED_LENGTH)
            .collect();
        Self(id)
    }

    /// Accepts a caller-supplied id as-is, or rejects it.
    ///
    /// # Errors
    ///
    /// [`ShortenerError::Validation`] for empty, overlong, reserved or non URL-safe ids.
    pub fn parse(candidate: String) -> Result<Self, ShortenerError> {
        if candidate.is_empty() || candidate.len() > MAX_CANDIDATE_LENGTH {
            return Err(ShortenerError::Validation(
                "Short ID must be between 1 and 64 characters",
            ));
        }
        if !candidate.bytes().all(|b| ALPHABET.contains(&b)) {
            return Err(ShortenerError::Validation(
                "Short ID may only contain letters, digits, '_' and '-'",
            ));
        }
        if RESERVED.contains(&candidate.as_str()) {
            return Err(ShortenerError::Validation("Short ID is reserved"));
        }
        Ok(Self(candidate))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The public short URL for `short_id` under `base_url`.
#[must_use]
pub fn short_url(base_url: &str, short_id: &str) -> String {
    format!("{}/{short_id}", base_url.trim_end_matches('/'))
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
