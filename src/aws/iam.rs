use anyhow::{Context, Result};
use aws_sdk_iam::{types::InstanceProfile, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// IAM instance profile that can be attached to a launch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceProfileRecord {
    pub name: String,
    pub arn: String,
    pub roles: Vec<String>,
}

impl From<&InstanceProfile> for InstanceProfileRecord {
    fn from(p: &InstanceProfile) -> Self {
        Self {
            name: p.instance_profile_name().unwrap_or_default().to_string(),
            arn: p.arn().unwrap_or_default().to_string(),
            roles: p
                .roles()
                .unwrap_or_default()
                .iter()
                .filter_map(|r| r.role_name())
                .map(String::from)
                .collect(),
        }
    }
}

/// First account alias, if the account has one.
pub async fn account_alias(client: &Client) -> Result<Option<String>> {
    let res = client
        .list_account_aliases()
        .send()
        .await
        .context("listing account aliases")?;
    Ok(res
        .account_aliases()
        .unwrap_or_default()
        .first()
        .cloned())
}

pub async fn instance_profiles(client: &Client) -> Result<Vec<InstanceProfileRecord>> {
    let mut profiles = Vec::new();
    let mut marker = None;
    loop {
        let res = client
            .list_instance_profiles()
            .set_marker(marker)
            .send()
            .await
            .context("listing instance profiles")?;
        profiles.extend(
            res.instance_profiles()
                .unwrap_or_default()
                .iter()
                .map(InstanceProfileRecord::from),
        );
        marker = res.marker().map(String::from);
        if marker.is_none() {
            break;
        }
    }
    profiles.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(count = profiles.len(), "found instance profiles");
    Ok(profiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_iam::types::Role;

    #[test]
    fn test_instance_profile_record() {
        let profile = InstanceProfile::builder()
            .instance_profile_name("web-server")
            .arn("arn:aws:iam::123456789012:instance-profile/web-server")
            .roles(Role::builder().role_name("web-server-role").build())
            .build();
        let rec = InstanceProfileRecord::from(&profile);
        assert_eq!(rec.name, "web-server");
        assert_eq!(rec.roles, vec!["web-server-role"]);
    }
}
