//! The `hash:` attribute: a SHA-1 digest of a unit's raw source bytes.
//!
//! Computed over the source exactly as read, after normalizing `\r\n`
//! line endings to `\n` (so the same logical source hashes the same
//! whether it was checked out with Windows or Unix line endings) and
//! without otherwise touching a trailing newline.

use sha1::{Digest, Sha1};

/// Computes the hex-encoded SHA-1 digest srcML records in a unit's
/// `hash:` attribute, per [`super::options::Options::HASH`].
#[must_use]
pub fn source_hash(source: &str) -> String {
    let normalized = normalize_line_endings(source);
    let mut hasher = Sha1::new();
    hasher.update(normalized.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

fn normalize_line_endings(source: &str) -> std::borrow::Cow<'_, str> {
    if source.contains("\r\n") {
        std::borrow::Cow::Owned(source.replace("\r\n", "\n"))
    } else {
        std::borrow::Cow::Borrowed(source)
    }
}
