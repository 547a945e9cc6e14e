use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::image::OsType;

pub const APP_NAME: &str = "ec2tools";

/// Persistent tool settings (`confy` app config).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// awscli profile used when `--profile` is omitted
    pub profile: String,
    /// Region used when neither the argument, the profile nor the
    /// environment name one
    pub fallback_region: String,
    /// Instance size used by `launch` when `--instance-type` is omitted
    pub instance_type: String,
    /// OS family used by `launch` when neither `--image` nor `--ami` is given
    pub image: OsType,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: "default".to_string(),
            fallback_region: "us-east-2".to_string(),
            instance_type: "t3.micro".to_string(),
            image: OsType::AmazonLinux2,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        confy::load(APP_NAME, None).context("loading ec2tools configuration")
    }
}

/// Directory holding the config file and persisted account profiles.
pub fn config_dir() -> Result<PathBuf> {
    let path = confy::get_configuration_file_path(APP_NAME, None)?;
    let dir = path
        .parent()
        .with_context(|| format!("config path {} has no parent", path.display()))?;
    Ok(dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.profile, "default");
        assert_eq!(cfg.fallback_region, "us-east-2");
        assert_eq!(cfg.image, OsType::AmazonLinux2);
    }
}
