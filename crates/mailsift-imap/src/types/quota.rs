//! Quota types (RFC 2087).

/// One resource row of a QUOTA response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaResource {
    /// Resource name (`STORAGE`, `MESSAGE`, ...).
    pub name: String,
    /// Current usage.
    pub usage: u64,
    /// Usage limit.
    pub limit: u64,
}

/// A quota root with its resource limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quota {
    /// Quota root name.
    pub root: String,
    /// Resource limits under this root.
    pub resources: Vec<QuotaResource>,
}

impl Quota {
    /// Returns the named resource, if the server reported it.
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<&QuotaResource> {
        self.resources
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_lookup() {
        let quota = Quota {
            root: String::new(),
            resources: vec![QuotaResource {
                name: "STORAGE".to_string(),
                usage: 10,
                limit: 512,
            }],
        };
        assert_eq!(quota.resource("storage").unwrap().limit, 512);
        assert!(quota.resource("MESSAGE").is_none());
    }
}
