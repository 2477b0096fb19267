//! Caller credential forwarded to downstream services.

/// The raw `Authorization` header value of an inbound request.
///
/// The value is never parsed or validated here: it is forwarded verbatim so
/// each downstream service applies its own authorization rules.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a header value. Blank values yield `None`, so nothing is forwarded.
    pub fn from_header(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Returns the header value exactly as received.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens must not end up in logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}
