use anyhow::{bail, Result};
use aws_sdk_ec2 as ec2;
use clap::Args;
use ec2tools::{
    aws::{
        check_profile,
        ec2::{instance_types, is_instance_type},
        resolve_region, sdk_config,
    },
    config::Config,
    export::write_atomic,
};
use std::path::PathBuf;

use super::status;

#[derive(Args)]
pub struct SizesArgs {
    /// awscli profile to authenticate with (default: from configuration)
    #[arg(long, short = 'p')]
    profile: Option<String>,

    /// Region whose offerings are listed (default: the profile's region)
    #[arg(long, short = 'r')]
    region: Option<String>,

    /// Write the size list to this file
    #[arg(long, short = 'n')]
    filename: Option<PathBuf>,
}

impl SizesArgs {
    pub async fn main(self) -> Result<()> {
        let config = Config::load()?;
        let profile = self.profile.unwrap_or(config.profile);
        check_profile(&profile);
        let region = resolve_region(self.region.as_deref(), &profile, &config.fallback_region)?;

        let sdk_config = sdk_config(&profile, &region).await;
        let sizes = size_list(instance_types(&ec2::Client::new(&sdk_config)).await?);
        if sizes.is_empty() {
            bail!("no instance types offered in {region}");
        }

        let body = sizes.join("\n") + "\n";
        match self.filename {
            Some(path) => {
                write_atomic(&path, body.as_bytes())?;
                status(&format!(
                    "Wrote {} size types to {}",
                    sizes.len(),
                    path.display()
                ));
            }
            None => print!("{body}"),
        }
        Ok(())
    }
}

/// Sorted, deduplicated, well-formed size names.
fn size_list(raw: Vec<String>) -> Vec<String> {
    let mut sizes: Vec<String> = raw.into_iter().filter(|s| is_instance_type(s)).collect();
    sizes.sort();
    sizes.dedup();
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_list() {
        let raw = ["t3.micro", "m5.large", "t3.micro", "bogus", "a1.medium"]
            .map(String::from)
            .to_vec();
        assert_eq!(size_list(raw), vec!["a1.medium", "m5.large", "t3.micro"]);
    }
}
