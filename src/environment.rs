//! Account profile: the subnets, security groups and key pairs of an
//! account, keyed by region.

use anyhow::{Context, Result};
use aws_config::SdkConfig;
use aws_sdk_ec2::types::{KeyPairInfo, SecurityGroup, Subnet};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::read_to_string,
    path::{Path, PathBuf},
};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::{
    aws::ec2::{get_key_pairs, get_security_groups, get_subnets, regional_client},
    export::write_atomic,
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct SubnetRecord {
    pub subnet_id: String,
    pub availability_zone: String,
    pub cidr_block: String,
    /// `Public` when instances get a public address on launch
    pub ip_addresses: String,
    pub state: String,
    pub vpc_id: String,
}

impl From<&Subnet> for SubnetRecord {
    fn from(s: &Subnet) -> Self {
        let public = s.map_public_ip_on_launch().unwrap_or(false);
        Self {
            subnet_id: s.subnet_id().unwrap_or_default().to_string(),
            availability_zone: s.availability_zone().unwrap_or_default().to_string(),
            cidr_block: s.cidr_block().unwrap_or_default().to_string(),
            ip_addresses: if public { "Public" } else { "Private" }.to_string(),
            state: s.state().map(|st| st.as_str().to_string()).unwrap_or_default(),
            vpc_id: s.vpc_id().unwrap_or_default().to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupRecord {
    pub group_id: String,
    pub group_name: String,
    pub vpc_id: String,
    pub description: String,
}

impl From<&SecurityGroup> for SecurityGroupRecord {
    fn from(g: &SecurityGroup) -> Self {
        Self {
            group_id: g.group_id().unwrap_or_default().to_string(),
            group_name: g.group_name().unwrap_or_default().to_string(),
            vpc_id: g.vpc_id().unwrap_or_default().to_string(),
            description: g.description().unwrap_or_default().to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct KeyPairRecord {
    pub key_name: String,
    pub key_pair_id: String,
    pub key_type: String,
    pub key_fingerprint: String,
}

impl From<&KeyPairInfo> for KeyPairRecord {
    fn from(k: &KeyPairInfo) -> Self {
        Self {
            key_name: k.key_name().unwrap_or_default().to_string(),
            key_pair_id: k.key_pair_id().unwrap_or_default().to_string(),
            key_type: k.key_type().map(|t| t.as_str().to_string()).unwrap_or_default(),
            key_fingerprint: k.key_fingerprint().unwrap_or_default().to_string(),
        }
    }
}

/// Launch-relevant resources of a single region.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct RegionProfile {
    pub subnets: Vec<SubnetRecord>,
    pub security_groups: Vec<SecurityGroupRecord>,
    pub key_pairs: Vec<KeyPairRecord>,
}

impl RegionProfile {
    /// Security groups of `vpc_id`; every group when none belong to it.
    pub fn security_groups_for_vpc(&self, vpc_id: &str) -> Vec<SecurityGroupRecord> {
        let matching: Vec<_> = self
            .security_groups
            .iter()
            .filter(|g| g.vpc_id == vpc_id)
            .cloned()
            .collect();
        if matching.is_empty() {
            self.security_groups.clone()
        } else {
            matching
        }
    }
}

pub type AccountProfile = BTreeMap<String, RegionProfile>;

pub async fn profile_region(sdk_config: &SdkConfig, region: &str) -> Result<RegionProfile> {
    let client = regional_client(sdk_config, region);
    let (subnets, security_groups, key_pairs) = tokio::try_join!(
        get_subnets(&client),
        get_security_groups(&client),
        get_key_pairs(&client),
    )?;
    debug!(
        region,
        subnets = subnets.len(),
        security_groups = security_groups.len(),
        key_pairs = key_pairs.len(),
        "profiled region"
    );
    Ok(RegionProfile {
        subnets,
        security_groups,
        key_pairs,
    })
}

/// Profile `regions` concurrently. Regions that fail are logged and left out.
pub async fn profile_account(sdk_config: &SdkConfig, regions: &[String]) -> AccountProfile {
    let mut tasks = JoinSet::new();
    for region in regions {
        let sdk_config = sdk_config.clone();
        let region = region.clone();
        tasks.spawn(async move {
            let res = profile_region(&sdk_config, &region).await;
            (region, res)
        });
    }

    let mut results = Vec::with_capacity(regions.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => warn!(error = %e, "profiling task failed"),
        }
    }
    collect_regions(results)
}

/// Fold per-region outcomes into a profile, dropping failed regions.
pub fn collect_regions(
    results: impl IntoIterator<Item = (String, Result<RegionProfile>)>,
) -> AccountProfile {
    let mut profile = AccountProfile::new();
    for (region, result) in results {
        match result {
            Ok(rp) => {
                profile.insert(region, rp);
            }
            Err(e) => warn!(region = %region, error = %e, "unable to profile region; skipping"),
        }
    }
    profile
}

/// Persisted account profiles, one `<account>.profile` file per account.
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, account: &str) -> PathBuf {
        self.dir.join(format!("{account}.profile"))
    }

    pub fn load(&self, account: &str) -> Result<Option<AccountProfile>> {
        let path = self.path(account);
        if !path.exists() {
            return Ok(None);
        }
        read_profile(&path).map(Some)
    }

    pub fn save(&self, account: &str, profile: &AccountProfile) -> Result<PathBuf> {
        let path = self.path(account);
        let mut body = serde_json::to_string_pretty(profile)?;
        body.push('\n');
        write_atomic(&path, body.as_bytes())?;
        info!(path = %path.display(), regions = profile.len(), "saved account profile");
        Ok(path)
    }

    /// Replace the regions in `update`, keep the rest, and save.
    pub fn merge(&self, account: &str, update: AccountProfile) -> Result<AccountProfile> {
        let mut profile = self.load(account)?.unwrap_or_default();
        profile.extend(update);
        self.save(account, &profile)?;
        Ok(profile)
    }
}

fn read_profile(path: &Path) -> Result<AccountProfile> {
    let body = read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&body).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ec2::types::SubnetState;

    fn sample_region(vpc: &str) -> RegionProfile {
        RegionProfile {
            subnets: vec![SubnetRecord {
                subnet_id: "subnet-1".to_string(),
                vpc_id: vpc.to_string(),
                ..Default::default()
            }],
            security_groups: vec![
                SecurityGroupRecord {
                    group_id: "sg-1".to_string(),
                    group_name: "default".to_string(),
                    vpc_id: "vpc-a".to_string(),
                    ..Default::default()
                },
                SecurityGroupRecord {
                    group_id: "sg-2".to_string(),
                    group_name: "web".to_string(),
                    vpc_id: "vpc-b".to_string(),
                    ..Default::default()
                },
            ],
            key_pairs: vec![],
        }
    }

    #[test]
    fn test_subnet_record_from_sdk() {
        let subnet = Subnet::builder()
            .subnet_id("subnet-0abc")
            .availability_zone("us-east-2a")
            .cidr_block("10.0.1.0/24")
            .map_public_ip_on_launch(true)
            .state(SubnetState::Available)
            .vpc_id("vpc-1")
            .build();
        let rec = SubnetRecord::from(&subnet);
        assert_eq!(rec.ip_addresses, "Public");
        assert_eq!(rec.state, "available");
        assert_eq!(rec.availability_zone, "us-east-2a");

        let private = SubnetRecord::from(&Subnet::builder().subnet_id("subnet-p").build());
        assert_eq!(private.ip_addresses, "Private");
    }

    #[test]
    fn test_profile_json_layout() {
        let mut profile = AccountProfile::new();
        profile.insert("us-east-2".to_string(), sample_region("vpc-a"));
        let value = serde_json::to_value(&profile).unwrap();
        let region = &value["us-east-2"];
        assert_eq!(region["Subnets"][0]["SubnetId"], "subnet-1");
        assert_eq!(region["SecurityGroups"][1]["GroupName"], "web");
        assert!(region["KeyPairs"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_security_groups_for_vpc() {
        let rp = sample_region("vpc-a");
        let groups = rp.security_groups_for_vpc("vpc-b");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].group_id, "sg-2");
        assert_eq!(rp.security_groups_for_vpc("vpc-zzz").len(), 2);
    }

    #[test]
    fn test_failed_region_is_left_out() {
        let results = vec![
            (
                "ap-south-2".to_string(),
                Err(anyhow::anyhow!("AuthFailure: region not enabled")),
            ),
            ("us-east-2".to_string(), Ok(sample_region("vpc-a"))),
        ];
        let profile = collect_regions(results);
        assert_eq!(profile.len(), 1);
        assert!(!profile.contains_key("ap-south-2"));
        assert_eq!(profile["us-east-2"].subnets[0].subnet_id, "subnet-1");

        let none: Vec<(String, Result<RegionProfile>)> =
            vec![("eu-west-3".to_string(), Err(anyhow::anyhow!("throttled")))];
        assert!(collect_regions(none).is_empty());
    }

    #[test]
    fn test_store_merge_keeps_other_regions() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        assert!(store.load("acme").unwrap().is_none());

        let mut first = AccountProfile::new();
        first.insert("us-east-1".to_string(), sample_region("vpc-a"));
        first.insert("us-west-2".to_string(), sample_region("vpc-a"));
        store.save("acme", &first).unwrap();

        let mut update = AccountProfile::new();
        update.insert("us-west-2".to_string(), sample_region("vpc-b"));
        update.insert("eu-west-1".to_string(), RegionProfile::default());
        let merged = store.merge("acme", update).unwrap();

        assert_eq!(merged.len(), 3);
        assert_eq!(merged["us-west-2"].subnets[0].vpc_id, "vpc-b");
        assert_eq!(store.load("acme").unwrap().unwrap(), merged);
        assert!(store.path("acme").ends_with("acme.profile"));
    }

    #[tokio::test]
    #[ignore = "requires aws credentials"]
    async fn test_profile_account() {
        let cfg = crate::aws::sdk_config("default", "us-east-2").await;
        let profile = profile_account(&cfg, &["us-east-2".to_string()]).await;
        eprintln!("{}", serde_json::to_string_pretty(&profile).unwrap());
    }
}
