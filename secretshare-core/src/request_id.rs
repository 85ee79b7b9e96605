//! Request ID generation

use uuid::Uuid;

/// Unique identifier assigned to every inbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId {
    /// Hyphenated UUID
    pub id: String,
}

impl RequestId {
    /// Generate a new request ID
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().hyphenated().to_string(),
        }
    }

    /// Create a request ID with a specific value (for testing)
    pub fn with_id(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// The secret identifier derived from this request: the ID with every
    /// hyphen removed.
    pub fn secret_id(&self) -> String {
        self.id.replace('-', "")
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_generation() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();

        assert_ne!(id1.id, id2.id);
        assert_eq!(id1.id.len(), 36);
    }

    #[test]
    fn test_secret_id_strips_hyphens() {
        let secret_id = RequestId::new().secret_id();

        assert_eq!(secret_id.len(), 32);
        assert!(secret_id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_request_id_with_id() {
        let id = RequestId::with_id("c0a8-01-ff-");
        assert_eq!(id.id, "c0a8-01-ff-");
        assert_eq!(id.secret_id(), "c0a801ff");
    }
}
