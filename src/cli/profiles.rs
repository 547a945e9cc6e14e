use anyhow::Result;
use clap::Args;
use ec2tools::{
    aws::local_profiles,
    config::Config,
    table::{self, display},
};

use super::status;

#[derive(Args)]
pub struct ProfilesArgs {}

impl ProfilesArgs {
    pub async fn main(self) -> Result<()> {
        let profiles = local_profiles()?;
        if profiles.is_empty() {
            status("No awscli profiles found in ~/.aws");
            return Ok(());
        }
        let config = Config::load()?;
        display(
            &format!("Local awscli profiles (tool default: {})", config.profile),
            &table::local_profiles(&profiles),
        );
        Ok(())
    }
}
