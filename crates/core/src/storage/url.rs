//! Public URL derivation.

/// Public HTTPS URL of a stored object behind the CDN.
///
/// Built optimistically: nothing checks that the object exists.
#[must_use]
pub fn public_url(cdn_host: &str, key: &str) -> String {
    format!("https://{cdn_host}/{key}")
}
