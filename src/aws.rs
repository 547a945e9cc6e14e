use anyhow::{Context, Result};
use aws_config::SdkConfig;
use aws_types::region::Region;
use home::home_dir;
use ini::Ini;
use lazy_static::lazy_static;
use regex::Regex;
use std::{
    collections::{BTreeMap, HashMap},
    env,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

pub mod ec2;
pub mod iam;
pub mod sts;

/// SDK configuration for an awscli profile, pinned to `region`.
pub async fn sdk_config(profile: &str, region: &str) -> SdkConfig {
    debug!(profile, region, "loading aws configuration");
    aws_config::from_env()
        .profile_name(profile)
        .region(Region::new(region.to_string()))
        .load()
        .await
}

fn aws_dir() -> Result<PathBuf> {
    let home = home_dir().context("home directory must be set")?;
    Ok(home.join(".aws"))
}

fn read_config_section(path: &Path, section_key: &str) -> Result<Option<HashMap<String, String>>> {
    if !path.exists() {
        return Ok(None);
    }
    let cfg = Ini::load_from_file(path)?;
    Ok(cfg.section(Some(section_key)).map(|s| {
        HashMap::from_iter(
            s.iter()
                .map(|(key, val)| (key.to_string(), val.to_string())),
        )
    }))
}

/// Section name of a profile in `~/.aws/config`.
fn config_section(profile: &str) -> String {
    if profile == "default" {
        profile.to_string()
    } else {
        format!("profile {profile}")
    }
}

/// Region configured for `profile` in an awscli config file.
pub fn profile_region_in(config_path: &Path, profile: &str) -> Result<Option<String>> {
    Ok(read_config_section(config_path, &config_section(profile))?
        .and_then(|sec| sec.get("region").cloned())
        .filter(|r| !r.is_empty()))
}

/// Region to operate in, by precedence: explicit argument, the profile's
/// configured region, `AWS_DEFAULT_REGION`/`AWS_REGION`, then `fallback`.
pub fn resolve_region(explicit: Option<&str>, profile: &str, fallback: &str) -> Result<String> {
    let config_path = match aws_dir() {
        Ok(dir) => Some(dir.join("config")),
        Err(e) => {
            warn!(error = %e, "cannot locate awscli configuration");
            None
        }
    };
    resolve_region_with(explicit, profile, fallback, config_path.as_deref(), |key| {
        env::var(key).ok()
    })
}

/// `resolve_region` against an explicit awscli config file and environment.
pub fn resolve_region_with(
    explicit: Option<&str>,
    profile: &str,
    fallback: &str,
    config_path: Option<&Path>,
    env_var: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    if let Some(region) = explicit {
        return validate_region(region);
    }
    let configured = match config_path {
        Some(path) => profile_region_in(path, profile)?,
        None => None,
    };
    let from_env = |key: &str| env_var(key).filter(|r| !r.trim().is_empty());
    let region = configured
        .or_else(|| from_env("AWS_DEFAULT_REGION"))
        .or_else(|| from_env("AWS_REGION"))
        .unwrap_or_else(|| fallback.to_string());
    debug!(profile, region = %region, "resolved region");
    validate_region(&region)
}

/// Check that `code` looks like an AWS region code.
pub fn validate_region(code: &str) -> Result<String> {
    lazy_static! {
        static ref REGION: Regex = Regex::new(r"^[a-z]{2}(-gov|-iso[a-z]?)?-[a-z]+-\d+$").unwrap();
    }
    let code = code.trim();
    if REGION.is_match(code) {
        Ok(code.to_string())
    } else {
        anyhow::bail!("`{code}` is not a valid AWS region code (e.g. us-east-2)")
    }
}

/// Profile names (and configured region, if any) found in awscli files.
pub fn profiles_in(credentials: &Path, config: &Path) -> Result<BTreeMap<String, Option<String>>> {
    let mut profiles = BTreeMap::new();
    if credentials.exists() {
        let creds = Ini::load_from_file(credentials)?;
        for name in creds.sections().flatten() {
            profiles.entry(name.to_string()).or_insert(None);
        }
    }
    if config.exists() {
        let cfg = Ini::load_from_file(config)?;
        for (name, props) in cfg.iter() {
            let Some(name) = name else { continue };
            let name = name.strip_prefix("profile ").unwrap_or(name).trim();
            if name.starts_with("sso-session") || name.starts_with("services") {
                continue;
            }
            let region = props.get("region").map(str::to_string);
            let entry = profiles.entry(name.to_string()).or_insert(None);
            if region.is_some() {
                *entry = region;
            }
        }
    }
    Ok(profiles)
}

/// Profiles from `~/.aws/credentials` and `~/.aws/config`.
pub fn local_profiles() -> Result<BTreeMap<String, Option<String>>> {
    let dir = aws_dir()?;
    profiles_in(&dir.join("credentials"), &dir.join("config"))
}

/// Warn when `profile` is unknown to the local awscli files.
pub fn check_profile(profile: &str) {
    match local_profiles() {
        Ok(profiles) if !profiles.contains_key(profile) => {
            warn!(profile, "profile not found in local awscli configuration")
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "unable to read local awscli configuration"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::write;

    fn fixtures() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let creds = dir.path().join("credentials");
        let config = dir.path().join("config");
        write(
            &creds,
            "[default]\naws_access_key_id = AKIA1\n\n[ops]\naws_access_key_id = AKIA2\n",
        )
        .unwrap();
        write(
            &config,
            "[default]\nregion = eu-west-1\n\n[profile ops]\noutput = json\n\n\
             [profile dev]\nregion = ap-southeast-2\n\n[sso-session corp]\nsso_region = us-east-1\n",
        )
        .unwrap();
        (dir, creds, config)
    }

    #[test]
    fn test_profile_region() {
        let (_dir, _creds, config) = fixtures();
        assert_eq!(
            profile_region_in(&config, "default").unwrap().as_deref(),
            Some("eu-west-1")
        );
        assert_eq!(
            profile_region_in(&config, "dev").unwrap().as_deref(),
            Some("ap-southeast-2")
        );
        assert_eq!(profile_region_in(&config, "ops").unwrap(), None);
        assert_eq!(profile_region_in(&config, "missing").unwrap(), None);
    }

    #[test]
    fn test_profiles_merge_both_files() {
        let (_dir, creds, config) = fixtures();
        let profiles = profiles_in(&creds, &config).unwrap();
        let names: Vec<_> = profiles.keys().cloned().collect();
        assert_eq!(names, vec!["default", "dev", "ops"]);
        assert_eq!(profiles["default"].as_deref(), Some("eu-west-1"));
        assert_eq!(profiles["ops"], None);
    }

    #[test]
    fn test_missing_files_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let profiles =
            profiles_in(&dir.path().join("nope"), &dir.path().join("nada")).unwrap();
        assert!(profiles.is_empty());
    }

    #[test]
    fn test_validate_region() {
        assert_eq!(validate_region("us-east-2").unwrap(), "us-east-2");
        assert!(validate_region("us-gov-west-1").is_ok());
        assert!(validate_region("ap-southeast-4").is_ok());
        assert!(validate_region("useast2").is_err());
        assert!(validate_region("US-EAST-2").is_err());
    }

    #[test]
    fn test_explicit_region_wins() {
        let region = resolve_region(Some("sa-east-1"), "default", "us-east-2").unwrap();
        assert_eq!(region, "sa-east-1");
    }

    fn env_of(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_region_precedence() {
        let (_dir, _creds, config) = fixtures();
        let env = env_of(&[("AWS_DEFAULT_REGION", "ca-central-1"), ("AWS_REGION", "sa-east-1")]);

        let region = resolve_region_with(None, "dev", "us-east-2", Some(&config), &env).unwrap();
        assert_eq!(region, "ap-southeast-2");

        let region = resolve_region_with(None, "ops", "us-east-2", Some(&config), &env).unwrap();
        assert_eq!(region, "ca-central-1");

        let only_region = env_of(&[("AWS_REGION", "sa-east-1")]);
        let region =
            resolve_region_with(None, "ops", "us-east-2", Some(&config), &only_region).unwrap();
        assert_eq!(region, "sa-east-1");

        let region = resolve_region_with(None, "ops", "us-east-2", None, env_of(&[])).unwrap();
        assert_eq!(region, "us-east-2");
    }

    #[test]
    fn test_empty_env_region_falls_through() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("config");
        let env = env_of(&[("AWS_DEFAULT_REGION", ""), ("AWS_REGION", "  ")]);
        let region =
            resolve_region_with(None, "default", "us-east-2", Some(&missing), env).unwrap();
        assert_eq!(region, "us-east-2");
    }
}
