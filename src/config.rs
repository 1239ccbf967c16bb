//! Registry configuration.

use serde::{Deserialize, Serialize};

/// Tunables of one registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Label qualifying memo keys and log records.
    pub label: String,
    /// Whether tied alternative matches are chained at all.
    pub keep_alternatives: bool,
    /// Longest tie chain kept behind one match.
    pub max_alternatives: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            label: "registry".to_string(),
            keep_alternatives: true,
            max_alternatives: 8,
        }
    }
}

impl RegistryConfig {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        serde_cbor::to_vec(self)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, serde_cbor::Error> {
        serde_cbor::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn missing_fields_take_defaults() {
        let mut partial = BTreeMap::new();
        partial.insert("label", "design");
        let bytes = serde_cbor::to_vec(&partial).unwrap();
        let config = RegistryConfig::from_cbor(&bytes).unwrap();
        assert_eq!(config.label, "design");
        assert!(config.keep_alternatives);
        assert_eq!(config.max_alternatives, 8);
    }

    #[test]
    fn survives_cbor() {
        let config = RegistryConfig {
            keep_alternatives: false,
            ..RegistryConfig::labeled("x")
        };
        let decoded = RegistryConfig::from_cbor(&config.to_cbor().unwrap()).unwrap();
        assert_eq!(decoded, config);
    }
}
