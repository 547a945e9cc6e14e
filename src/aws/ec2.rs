use anyhow::{Context, Result};
use aws_config::SdkConfig;
use aws_sdk_ec2 as ec2;
use aws_types::region::Region;
use ec2::{
    config::Builder,
    types::{
        Filter, IamInstanceProfileSpecification, InstanceType, ResourceType, Tag,
        TagSpecification,
    },
    Client,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

use crate::{
    environment::{KeyPairRecord, SecurityGroupRecord, SubnetRecord},
    image::{newest, ImageRecord, OsType},
};

/// EC2 client bound to `region`, sharing credentials with `sdk_config`.
pub fn regional_client(sdk_config: &SdkConfig, region: &str) -> Client {
    let config = Builder::from(sdk_config)
        .region(Region::new(region.to_string()))
        .build();
    Client::from_conf(config)
}

pub fn is_china_region(name: &str) -> bool {
    name.starts_with("cn-")
}

/// Whether `name` reads as an instance size, `family.size` (`t3.micro`).
pub fn is_instance_type(name: &str) -> bool {
    lazy_static! {
        static ref SIZE: Regex = Regex::new(r"^[a-z][a-z0-9-]*\.[a-z0-9-]+$").unwrap();
    }
    SIZE.is_match(name)
}

/// Region names enabled for the account, excluding the China partition.
pub async fn get_regions(client: &Client) -> Result<Vec<String>> {
    let res = client
        .describe_regions()
        .send()
        .await
        .context("describing regions")?;
    let mut regions: Vec<String> = res
        .regions()
        .unwrap_or_default()
        .iter()
        .filter_map(|r| r.region_name())
        .filter(|name| !is_china_region(name))
        .map(String::from)
        .collect();
    regions.sort();
    debug!(count = regions.len(), "found regions");
    Ok(regions)
}

pub async fn get_subnets(client: &Client) -> Result<Vec<SubnetRecord>> {
    let mut subnets = Vec::new();
    let mut token = None;
    loop {
        let res = client
            .describe_subnets()
            .set_next_token(token)
            .send()
            .await
            .context("describing subnets")?;
        subnets.extend(res.subnets().unwrap_or_default().iter().map(SubnetRecord::from));
        token = res.next_token().map(String::from);
        if token.is_none() {
            break;
        }
    }
    Ok(subnets)
}

pub async fn get_security_groups(client: &Client) -> Result<Vec<SecurityGroupRecord>> {
    let mut groups = Vec::new();
    let mut token = None;
    loop {
        let res = client
            .describe_security_groups()
            .set_next_token(token)
            .send()
            .await
            .context("describing security groups")?;
        groups.extend(
            res.security_groups()
                .unwrap_or_default()
                .iter()
                .map(SecurityGroupRecord::from),
        );
        token = res.next_token().map(String::from);
        if token.is_none() {
            break;
        }
    }
    Ok(groups)
}

pub async fn get_key_pairs(client: &Client) -> Result<Vec<KeyPairRecord>> {
    let res = client
        .describe_key_pairs()
        .send()
        .await
        .context("describing key pairs")?;
    Ok(res
        .key_pairs()
        .unwrap_or_default()
        .iter()
        .map(KeyPairRecord::from)
        .collect())
}

/// Newest available x86_64 image published for `os`.
pub async fn latest_image(client: &Client, os: OsType) -> Result<ImageRecord> {
    let res = client
        .describe_images()
        .owners(os.owner())
        .filters(Filter::builder().name("name").values(os.name_pattern()).build())
        .filters(Filter::builder().name("state").values("available").build())
        .filters(Filter::builder().name("architecture").values("x86_64").build())
        .send()
        .await
        .with_context(|| format!("describing {os} images"))?;

    let images = res.images().unwrap_or_default();
    debug!(os = %os, candidates = images.len(), "described images");
    newest(images.iter().map(ImageRecord::from))
        .with_context(|| format!("no {os} image found"))
}

/// Instance size names offered in the client's region.
pub async fn instance_types(client: &Client) -> Result<Vec<String>> {
    let mut types = Vec::new();
    let mut token = None;
    loop {
        let res = client
            .describe_instance_types()
            .set_next_token(token)
            .send()
            .await
            .context("describing instance types")?;
        types.extend(
            res.instance_types()
                .unwrap_or_default()
                .iter()
                .filter_map(|t| t.instance_type())
                .map(|t| t.as_str().to_string()),
        );
        token = res.next_token().map(String::from);
        if token.is_none() {
            break;
        }
    }
    Ok(types)
}

/// Everything `RunInstances` needs for one launch.
#[derive(Debug, Clone, Default)]
pub struct LaunchRequest {
    pub image_id: String,
    pub instance_type: String,
    pub count: i32,
    pub name: Option<String>,
    pub subnet_id: String,
    pub security_group_id: String,
    pub key_name: Option<String>,
    pub instance_profile: Option<String>,
    /// Base64 encoded
    pub user_data: Option<String>,
}

/// Launch instances; returns their ids.
pub async fn run_instances(client: &Client, req: &LaunchRequest) -> Result<Vec<String>> {
    let mut request = client
        .run_instances()
        .image_id(&req.image_id)
        .instance_type(InstanceType::from(req.instance_type.as_str()))
        .min_count(req.count)
        .max_count(req.count)
        .subnet_id(&req.subnet_id)
        .security_group_ids(&req.security_group_id)
        .set_key_name(req.key_name.clone())
        .set_user_data(req.user_data.clone());

    if let Some(name) = &req.name {
        request = request.tag_specifications(
            TagSpecification::builder()
                .resource_type(ResourceType::Instance)
                .tags(Tag::builder().key("Name").value(name).build())
                .build(),
        );
    }

    if let Some(profile) = &req.instance_profile {
        request = request.iam_instance_profile(
            IamInstanceProfileSpecification::builder()
                .name(profile)
                .build(),
        );
    }

    let res = request.send().await.context("launching instance")?;
    let ids: Vec<String> = res
        .instances()
        .unwrap_or_default()
        .iter()
        .filter_map(|i| i.instance_id())
        .map(String::from)
        .collect();
    if ids.is_empty() {
        anyhow::bail!("no instances returned by RunInstances");
    }
    info!(ids = ?ids, "launched instances");
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::sdk_config;

    #[test]
    fn test_china_regions_excluded() {
        assert!(is_china_region("cn-north-1"));
        assert!(is_china_region("cn-northwest-1"));
        assert!(!is_china_region("ap-east-1"));
        assert!(!is_china_region("ca-central-1"));
    }

    #[test]
    fn test_instance_type_names() {
        for name in ["t3.micro", "m5d.2xlarge", "u-6tb1.metal", "c7gn.medium"] {
            assert!(is_instance_type(name), "{name}");
        }
        for name in ["t3", "T3.micro", ".large", "m5.", "m5 large"] {
            assert!(!is_instance_type(name), "{name}");
        }
    }

    #[tokio::test]
    #[ignore = "requires aws credentials"]
    async fn test_get_regions() {
        let cfg = sdk_config("default", "us-east-2").await;
        let regions = get_regions(&Client::new(&cfg)).await.unwrap();
        assert!(regions.iter().any(|r| r == "us-east-2"));
    }

    #[tokio::test]
    #[ignore = "requires aws credentials"]
    async fn test_latest_image() {
        let cfg = sdk_config("default", "us-east-2").await;
        let image = latest_image(&regional_client(&cfg, "us-east-1"), OsType::AmazonLinux2)
            .await
            .unwrap();
        eprintln!("{image:?}");
        assert!(image.image_id.starts_with("ami-"));
    }
}
