use anyhow::{bail, Context, Result};
use aws_config::SdkConfig;
use aws_sdk_ec2 as ec2;
use aws_sdk_iam as iam;
use base64::{engine::general_purpose::STANDARD, Engine};
use clap::Args;
use ec2tools::{
    aws::{
        check_profile,
        ec2::{is_instance_type, latest_image, run_instances, LaunchRequest},
        iam::{instance_profiles, InstanceProfileRecord},
        resolve_region, sdk_config,
        sts::account_identifier,
    },
    choice::{choose, confirm},
    config::{config_dir, Config},
    environment::{profile_region, AccountProfile, ProfileStore, RegionProfile},
    image::OsType,
    table::{self, display_to},
};
use std::{
    fs::read,
    io::{stdin, stdout, BufRead, Write},
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use super::status;

/// EC2 rejects user data above this size (before encoding).
const MAX_USER_DATA: usize = 16 * 1024;

#[derive(Args)]
pub struct LaunchArgs {
    /// awscli profile to authenticate with (default: from configuration)
    #[arg(long, short = 'p')]
    profile: Option<String>,

    /// Region to launch in (default: the profile's region)
    #[arg(long, short = 'r')]
    region: Option<String>,

    /// Launch the latest image of this OS family (default: from configuration)
    #[arg(long, short = 'i', value_enum, conflicts_with = "ami")]
    image: Option<OsType>,

    /// Launch this exact image id
    #[arg(long)]
    ami: Option<String>,

    /// Instance size (default: from configuration)
    #[arg(long, short = 't')]
    instance_type: Option<String>,

    /// Value of the instance `Name` tag
    #[arg(long, short = 'n')]
    name: Option<String>,

    /// Number of instances to launch
    #[arg(long, short = 'c', default_value_t = 1, value_parser = clap::value_parser!(i32).range(1..))]
    count: i32,

    /// File passed to the instance as user data
    #[arg(long, short = 'u')]
    user_data: Option<PathBuf>,

    /// Re-profile the region even when a saved profile exists
    #[arg(long)]
    refresh: bool,

    /// Launch without an IAM instance profile
    #[arg(long)]
    no_instance_profile: bool,

    /// Launch without asking for confirmation
    #[arg(long, short = 'y')]
    yes: bool,
}

impl LaunchArgs {
    pub async fn main(self) -> Result<()> {
        let config = Config::load()?;
        let profile = self.profile.clone().unwrap_or(config.profile.clone());
        check_profile(&profile);
        let region = resolve_region(self.region.as_deref(), &profile, &config.fallback_region)?;

        let instance_type = self
            .instance_type
            .clone()
            .unwrap_or(config.instance_type.clone());
        if !is_instance_type(&instance_type) {
            bail!("`{instance_type}` is not an instance type (e.g. t3.micro)");
        }
        let user_data = self.user_data.as_deref().map(encode_user_data).transpose()?;

        let sdk_config = sdk_config(&profile, &region).await;
        let client = ec2::Client::new(&sdk_config);

        let account = account_identifier(&sdk_config).await?;
        let resources = self.region_profile(&sdk_config, &account, &region).await?;
        if resources.subnets.is_empty() {
            bail!("no subnets found in region {region}; nowhere to launch");
        }

        let roles = if self.no_instance_profile {
            Vec::new()
        } else {
            match instance_profiles(&iam::Client::new(&sdk_config)).await {
                Ok(profiles) => profiles,
                Err(e) => {
                    warn!(error = %e, "unable to list IAM instance profiles; launching without one");
                    Vec::new()
                }
            }
        };

        let (image_id, windows) = match &self.ami {
            Some(ami) => (ami.clone(), false),
            None => {
                let os = self.image.unwrap_or(config.image);
                let image = latest_image(&client, os).await?;
                info!(os = %os, image = %image.image_id, name = %image.name, "resolved image");
                (image.image_id, os.is_windows())
            }
        };

        let template = LaunchRequest {
            image_id,
            instance_type,
            count: self.count,
            name: self.name.clone(),
            user_data,
            ..Default::default()
        };
        let choices = LaunchChoices {
            region: &region,
            resources: &resources,
            instance_profiles: &roles,
            windows,
        };
        let request = select_launch(
            &mut stdin().lock(),
            &mut stdout(),
            &choices,
            template,
            !self.yes,
        )?;
        let Some(request) = request else {
            status("Launch cancelled");
            return Ok(());
        };

        let ids = run_instances(&client, &request).await?;
        for id in ids {
            println!("{id}");
        }
        Ok(())
    }

    /// Saved resources for `region`, profiling (and saving) them when
    /// absent or when a refresh is requested.
    async fn region_profile(
        &self,
        sdk_config: &SdkConfig,
        account: &str,
        region: &str,
    ) -> Result<RegionProfile> {
        let store = ProfileStore::new(config_dir()?);
        if !self.refresh {
            let cached = match store.load(account) {
                Ok(profile) => profile.and_then(|mut p| p.remove(region)),
                Err(e) => {
                    warn!(error = %e, "ignoring unreadable saved profile");
                    None
                }
            };
            if let Some(rp) = cached {
                info!(account, region, "using saved account profile");
                return Ok(rp);
            }
        }

        status(&format!("Profiling region {region}"));
        let rp = profile_region(sdk_config, region).await?;
        let update = AccountProfile::from([(region.to_string(), rp.clone())]);
        if let Err(e) = store.merge(account, update) {
            warn!(error = %e, "unable to save account profile");
        }
        Ok(rp)
    }
}

/// What the user picks from during a launch.
struct LaunchChoices<'a> {
    region: &'a str,
    resources: &'a RegionProfile,
    instance_profiles: &'a [InstanceProfileRecord],
    windows: bool,
}

/// Fill subnet, security group, key pair and instance profile of `template`
/// from the user's choices, then confirm when `ask` is set. `None` means the
/// user declined.
fn select_launch<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    choices: &LaunchChoices,
    template: LaunchRequest,
    ask: bool,
) -> Result<Option<LaunchRequest>> {
    let LaunchChoices {
        region,
        resources,
        instance_profiles: roles,
        windows,
    } = choices;

    display_to(
        output,
        &format!("Subnets in region {region}"),
        &table::subnets(&resources.subnets),
    )?;
    let subnet = &resources.subnets[choose(input, output, "subnet", resources.subnets.len())?];

    let groups = resources.security_groups_for_vpc(&subnet.vpc_id);
    display_to(
        output,
        &format!("Security groups for {}", subnet.vpc_id),
        &table::security_groups(&groups),
    )?;
    let group = &groups[choose(input, output, "security group", groups.len())?];

    let key_name = if resources.key_pairs.is_empty() {
        if *windows {
            warn!(region = %region, "no key pairs in region; the Windows password will not be retrievable");
        } else {
            warn!(region = %region, "no key pairs in region; instance will not accept ssh keys");
        }
        None
    } else {
        display_to(output, "Key pairs", &table::key_pairs(&resources.key_pairs))?;
        let idx = choose(input, output, "key pair", resources.key_pairs.len())?;
        Some(resources.key_pairs[idx].key_name.clone())
    };

    let instance_profile = if roles.is_empty() {
        warn!("no IAM instance profile selected; launching without one");
        None
    } else {
        display_to(output, "IAM instance profiles", &table::instance_profiles(roles))?;
        let idx = choose(input, output, "instance profile", roles.len())?;
        Some(roles[idx].name.clone())
    };

    let request = LaunchRequest {
        subnet_id: subnet.subnet_id.clone(),
        security_group_id: group.group_id.clone(),
        key_name,
        instance_profile,
        ..template
    };

    display_to(output, "Launch summary", &table::launch_summary(region, &request))?;
    if ask && !confirm(input, output, "Launch?", false)? {
        return Ok(None);
    }
    Ok(Some(request))
}

fn encode_user_data(path: &Path) -> Result<String> {
    let raw = read(path).with_context(|| format!("reading user data {}", path.display()))?;
    if raw.len() > MAX_USER_DATA {
        bail!(
            "user data {} is {} bytes; EC2 accepts at most {MAX_USER_DATA}",
            path.display(),
            raw.len()
        );
    }
    Ok(STANDARD.encode(raw))
}
