//! Storage key generation.
//!
//! Keys are partitioned by UTC date and carry 120 bits of randomness:
//! `<prefix><YYYY>/<MM>/<DD>/<30 hex chars><extension>`.

use std::fmt;

use chrono::{Datelike, NaiveDate, Utc};
use rand::RngCore;

use super::error::ConfigError;

/// Random bytes per key. Hex-encoded this is 30 characters.
pub const RANDOM_BYTES: usize = 15;

/// Prefix that starts every generated key.
///
/// The store normalizes object paths, so a prefix is only accepted when it
/// survives normalization unchanged. Otherwise the public URL would name a
/// different object than the one written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPrefix(String);

impl KeyPrefix {
    /// Validate a key prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix is empty, starts with `/` or
    /// whitespace, or contains an empty path segment (`//`).
    pub fn new(prefix: impl Into<String>) -> Result<Self, ConfigError> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(ConfigError::Missing("upload.key_prefix"));
        }

        let reason = if prefix.starts_with('/') {
            Some("must not start with '/'")
        } else if prefix.starts_with(char::is_whitespace) {
            Some("must not start with whitespace")
        } else if prefix.contains("//") {
            Some("must not contain an empty segment '//'")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(ConfigError::InvalidKeyPrefix { prefix, reason });
        }

        Ok(Self(prefix))
    }

    /// Borrow the prefix.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of an object in the store. Doubles as the public URL path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Generate a fresh key for today's UTC date.
    ///
    /// The extension, if any, is appended verbatim, so pass it with its
    /// leading dot.
    #[must_use]
    pub fn generate(prefix: &KeyPrefix, extension: Option<&str>) -> Self {
        Self::generate_on(prefix, Utc::now().date_naive(), extension)
    }

    fn generate_on(prefix: &KeyPrefix, date: NaiveDate, extension: Option<&str>) -> Self {
        // ThreadRng is an OS-seeded CSPRNG and panics if the OS source is broken.
        let mut suffix = [0u8; RANDOM_BYTES];
        rand::rng().fill_bytes(&mut suffix);

        Self(format!(
            "{}{}/{:02}/{:02}/{}{}",
            prefix.as_str(),
            date.year(),
            date.month(),
            date.day(),
            hex::encode(suffix),
            extension.unwrap_or_default(),
        ))
    }

    /// Borrow the key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the underlying string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use rstest::rstest;

    fn prefix(s: &str) -> KeyPrefix {
        KeyPrefix::new(s).expect("valid prefix")
    }

    /// Splits `rest` after the prefix into (date, random, extension).
    fn split_key<'a>(key: &'a str, prefix: &str) -> (&'a str, &'a str, &'a str) {
        let rest = key.strip_prefix(prefix).expect("key starts with prefix");
        let (date, tail) = rest.split_at(10);
        let tail = tail.strip_prefix('/').expect("slash after date");
        let (random, extension) = tail.split_at(RANDOM_BYTES * 2);
        (date, random, extension)
    }

    #[test]
    fn test_empty_prefix_rejected() {
        assert!(matches!(
            KeyPrefix::new(""),
            Err(ConfigError::Missing("upload.key_prefix"))
        ));
    }

    #[rstest]
    #[case("/picture/")]
    #[case("pics//")]
    #[case("a//b/")]
    #[case(" picture/")]
    fn test_prefix_rewritten_by_store_is_rejected(#[case] raw: &str) {
        assert!(matches!(
            KeyPrefix::new(raw),
            Err(ConfigError::InvalidKeyPrefix { ref prefix, .. }) if prefix == raw
        ));
    }

    #[rstest]
    #[case("picture/")]
    #[case("avatars/v2/")]
    #[case("img-")]
    fn test_plain_prefixes_accepted(#[case] raw: &str) {
        assert_eq!(KeyPrefix::new(raw).expect("valid prefix").as_str(), raw);
    }

    #[test]
    fn test_key_uses_zero_padded_date_partition() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).expect("valid date");
        let key = StorageKey::generate_on(&prefix("picture/"), date, None);

        assert!(key.as_str().starts_with("picture/2024/01/02/"));
        assert_eq!(key.as_str().len(), "picture/2024/01/02/".len() + 30);
    }

    #[rstest]
    #[case(None, "")]
    #[case(Some(".svg"), ".svg")]
    #[case(Some(".tar.gz"), ".tar.gz")]
    #[case(Some(""), "")]
    fn test_extension_appended_verbatim(#[case] extension: Option<&str>, #[case] expected: &str) {
        let key = StorageKey::generate(&prefix("p/"), extension);
        let (_, random, ext) = split_key(key.as_str(), "p/");

        assert_eq!(random.len(), 30);
        assert_eq!(ext, expected);
    }

    #[test]
    fn test_key_matches_current_utc_date() {
        let before = Utc::now().date_naive();
        let key = StorageKey::generate(&prefix("picture/"), Some(".png"));
        let after = Utc::now().date_naive();

        let (date, random, ext) = split_key(key.as_str(), "picture/");
        let expected: HashSet<String> = [before, after]
            .iter()
            .map(|d| d.format("%Y/%m/%d").to_string())
            .collect();

        assert!(expected.contains(date), "unexpected date partition {date}");
        assert!(random.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(ext, ".png");
    }

    #[test]
    fn test_ten_thousand_keys_are_distinct() {
        let prefix = prefix("picture/");
        let keys: HashSet<StorageKey> = (0..10_000)
            .map(|_| StorageKey::generate(&prefix, None))
            .collect();
        assert_eq!(keys.len(), 10_000);
    }
}
