//! Configuration file domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the Terraform files the service knows how to store
///
/// The set is closed: uploads are keyed by these names and nothing else
/// ever becomes a path component inside the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfigFileName {
    #[serde(rename = "main.tf")]
    Main,
    #[serde(rename = "variables.tf")]
    Variables,
    #[serde(rename = "terraform.tfvars")]
    VariableValues,
}

impl ConfigFileName {
    /// All known files, in upload order
    pub const ALL: [ConfigFileName; 3] = [
        ConfigFileName::Main,
        ConfigFileName::Variables,
        ConfigFileName::VariableValues,
    ];

    /// File name on disk, also the key used in write requests
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigFileName::Main => "main.tf",
            ConfigFileName::Variables => "variables.tf",
            ConfigFileName::VariableValues => "terraform.tfvars",
        }
    }
}

impl fmt::Display for ConfigFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a name is not one of the known configuration files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownConfigFile(pub String);

impl fmt::Display for UnknownConfigFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown configuration file '{}'", self.0)
    }
}

impl std::error::Error for UnknownConfigFile {}

impl FromStr for ConfigFileName {
    type Err = UnknownConfigFile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigFileName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownConfigFile(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_names() {
        for name in ConfigFileName::ALL {
            assert_eq!(name.as_str().parse::<ConfigFileName>(), Ok(name));
        }
    }

    #[test]
    fn test_rejects_path_components() {
        assert!("../main.tf".parse::<ConfigFileName>().is_err());
        assert!("output/diagram.dot.png".parse::<ConfigFileName>().is_err());
        assert!("MAIN.TF".parse::<ConfigFileName>().is_err());
    }

    #[test]
    fn test_serde_uses_file_names() {
        let json = serde_json::to_string(&ConfigFileName::VariableValues).unwrap();
        assert_eq!(json, "\"terraform.tfvars\"");

        let parsed: ConfigFileName = serde_json::from_str("\"variables.tf\"").unwrap();
        assert_eq!(parsed, ConfigFileName::Variables);
    }
}
