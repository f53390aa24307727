// SPDX-License-Identifier: MIT

//! API-key gate in front of session creation

use std::collections::HashSet;

/// Header carrying the caller's access key
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone)]
pub enum AccessGate {
    /// Embedded in a trusted host process; every caller is admitted
    TrustedHost,
    /// Only callers presenting one of these keys are admitted
    AllowList(HashSet<String>),
}

impl AccessGate {
    pub fn trusted_host() -> Self {
        Self::TrustedHost
    }

    /// Build an allow-list from a comma-separated key list.
    ///
    /// Entries are trimmed and empty entries are dropped, so `"k1,,k2,"`
    /// yields exactly `{k1, k2}`.
    pub fn from_keys(csv: &str) -> Self {
        Self::AllowList(
            csv.split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    pub fn authorize(&self, presented: Option<&str>) -> bool {
        match self {
            Self::TrustedHost => true,
            Self::AllowList(keys) => match presented {
                Some(key) if !key.is_empty() => keys.contains(key),
                _ => false,
            },
        }
    }

    pub fn is_trusted_host(&self) -> bool {
        matches!(self, Self::TrustedHost)
    }

    /// Number of configured keys; zero for a trusted host
    pub fn key_count(&self) -> usize {
        match self {
            Self::TrustedHost => 0,
            Self::AllowList(keys) => keys.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list() {
        let gate = AccessGate::from_keys("k1,k2");
        assert!(gate.authorize(Some("k1")));
        assert!(gate.authorize(Some("k2")));
        assert!(!gate.authorize(Some("")));
        assert!(!gate.authorize(Some("k3")));
        assert!(!gate.authorize(None));
    }

    #[test]
    fn test_empty_entries_never_match() {
        let gate = AccessGate::from_keys("k1,,k2,");
        assert_eq!(gate.key_count(), 2);
        assert!(!gate.authorize(Some("")));

        let empty = AccessGate::from_keys("");
        assert_eq!(empty.key_count(), 0);
        assert!(!empty.authorize(Some("")));
        assert!(!empty.authorize(Some("anything")));
    }

    #[test]
    fn test_entries_are_trimmed() {
        let gate = AccessGate::from_keys(" k1 , k2");
        assert!(gate.authorize(Some("k1")));
        assert!(gate.authorize(Some("k2")));
        assert!(!gate.authorize(Some(" k1 ")));
    }

    #[test]
    fn test_trusted_host_admits_everyone() {
        let gate = AccessGate::trusted_host();
        assert!(gate.authorize(Some("anything")));
        assert!(gate.authorize(Some("")));
        assert!(gate.authorize(None));
        assert!(gate.is_trusted_host());
    }
}
