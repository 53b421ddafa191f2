//! YAML configuration loading for CA-wide settings and issuance profiles.

use std::collections::HashMap;

use crate::error::Result;
use crate::model::ProfileConfig;

/// Top-level CA configuration: everything needed to bring up a
/// [`crate::issuer::Issuer`] other than the signing key itself.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CaConfig {
    /// The profile new requests use when none is named explicitly.
    pub default_profile: String,
    /// Starting value for the TSA's monotonic serial counter, for resuming
    /// after a restart.
    #[serde(default)]
    pub tsa_counter_start: u64,
    /// Every profile this CA will issue under, keyed by name.
    pub profiles: HashMap<String, ProfileConfig>,
}

impl CaConfig {
    /// Parse a `CaConfig` from a YAML document. Every profile's SAN allow-list
    /// patterns are compiled here, so a malformed regex rejects the whole
    /// configuration at load time rather than surfacing on first use.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        for profile in config.profiles.values() {
            profile.validate()?;
        }
        Ok(config)
    }

    /// Render this configuration back to YAML, e.g. for persisting defaults.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
default_profile: tls-server
tsa_counter_start: 0
profiles:
  tls-server:
    name: tls-server
    subject_defaults: {}
    require_common_name: true
    require_organization: false
    key_usage:
      bits: [DigitalSignature, KeyEncipherment]
      critical: true
    extended_key_usage:
      purposes: [ServerAuth]
      critical: false
    allowed_san_patterns: []
    basic_constraints:
      is_ca: false
      path_len_constraint: null
      critical: false
    max_validity_days: 398
"#;

    #[test]
    fn parses_a_profile_registry() {
        let config = CaConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.default_profile, "tls-server");
        assert!(config.profiles.contains_key("tls-server"));
        assert_eq!(config.profiles["tls-server"].max_validity_days, 398);
    }
}
