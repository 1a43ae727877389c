//! Names of the tables, columns and procedures the built-in checks probe.

use serde::{Deserialize, Serialize};

fn default_policy_function() -> String {
    "list_policies".into()
}

fn default_rls_function() -> String {
    "rls_status".into()
}

fn default_profile_table() -> String {
    "profiles".into()
}

fn default_key() -> String {
    "id".into()
}

fn default_organization_table() -> String {
    "organizations".into()
}

fn default_organization_ref() -> String {
    "organization_id".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChecksConfig {
    /// Procedure returning the policies of a table, called with `table_name`.
    #[serde(default = "default_policy_function")]
    pub policy_function: String,

    /// Procedure returning whether RLS is enabled, called with `table_name`.
    #[serde(default = "default_rls_function")]
    pub rls_function: String,

    #[serde(default = "default_profile_table")]
    pub profile_table: String,

    /// Profile column holding the authenticated subject id.
    #[serde(default = "default_key")]
    pub profile_key: String,

    #[serde(default = "default_organization_table")]
    pub organization_table: String,

    #[serde(default = "default_key")]
    pub organization_key: String,

    /// Profile column referencing the organization.
    #[serde(default = "default_organization_ref")]
    pub organization_ref: String,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            policy_function: default_policy_function(),
            rls_function: default_rls_function(),
            profile_table: default_profile_table(),
            profile_key: default_key(),
            organization_table: default_organization_table(),
            organization_key: default_key(),
            organization_ref: default_organization_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = ChecksConfig::default();
        assert_eq!(config.policy_function, "list_policies");
        assert_eq!(config.rls_function, "rls_status");
        assert_eq!(config.profile_table, "profiles");
        assert_eq!(config.profile_key, "id");
        assert_eq!(config.organization_ref, "organization_id");
    }
}
