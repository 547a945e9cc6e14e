use anyhow::{bail, Result};
use aws_sdk_ec2 as ec2;
use clap::Args;
use ec2tools::{
    aws::{check_profile, ec2::get_regions, resolve_region, sdk_config, sts::account_identifier},
    config::{config_dir, Config},
    environment::{profile_account, ProfileStore},
    export::export_json,
};

use super::status;

#[derive(Args)]
pub struct ProfileArgs {
    /// awscli profile to authenticate with (default: from configuration)
    #[arg(long, short = 'p')]
    profile: Option<String>,

    /// Profile only this region (default: every region)
    #[arg(long, short = 'r')]
    region: Option<String>,

    /// Save into the local profile store instead of printing
    #[arg(long, short = 'o')]
    outputfile: bool,
}

impl ProfileArgs {
    pub async fn main(self) -> Result<()> {
        let config = Config::load()?;
        let profile = self.profile.unwrap_or(config.profile);
        check_profile(&profile);

        let home_region = resolve_region(self.region.as_deref(), &profile, &config.fallback_region)?;
        let sdk_config = sdk_config(&profile, &home_region).await;

        let regions = match self.region {
            Some(_) => vec![home_region],
            None => get_regions(&ec2::Client::new(&sdk_config)).await?,
        };

        let account = profile_account(&sdk_config, &regions).await;
        if account.is_empty() {
            bail!("no region could be profiled with profile `{profile}`");
        }

        if self.outputfile {
            let ident = account_identifier(&sdk_config).await?;
            let store = ProfileStore::new(config_dir()?);
            store.merge(&ident, account)?;
            status(&format!("Profile written to {}", store.path(&ident).display()));
        } else {
            export_json(&account, None)?;
        }

        status("Profile run complete");
        Ok(())
    }
}
