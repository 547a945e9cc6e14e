use anyhow::{bail, Result};
use aws_sdk_ec2 as ec2;
use clap::{Args, ValueEnum};
use ec2tools::{
    aws::{
        check_profile,
        ec2::{get_regions, latest_image, regional_client},
        resolve_region, sdk_config,
    },
    config::Config,
    export::{export_json, write_atomic},
    image::{ImageRecord, OsType},
    table,
};
use std::{collections::BTreeMap, path::PathBuf};
use tokio::task::JoinSet;
use tracing::warn;

#[derive(Args)]
pub struct ImageArgs {
    /// Operating system family to find the latest image of
    #[arg(long, short = 'i', value_enum)]
    image: OsType,

    /// awscli profile to authenticate with (default: from configuration)
    #[arg(long, short = 'p')]
    profile: Option<String>,

    /// Only this region (default: every region)
    #[arg(long, short = 'r')]
    region: Option<String>,

    /// Output all metadata of each image instead of only its id
    #[arg(long, short = 'd')]
    details: bool,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Write output to this file
    #[arg(long, short = 'n')]
    filename: Option<PathBuf>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Text,
}

impl ImageArgs {
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

        let mut tasks = JoinSet::new();
        for region in regions {
            let client = regional_client(&sdk_config, &region);
            let os = self.image;
            tasks.spawn(async move { (region, latest_image(&client, os).await) });
        }

        let mut images: BTreeMap<String, ImageRecord> = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((region, Ok(img))) => {
                    images.insert(region, img);
                }
                Ok((region, Err(e))) => {
                    warn!(region = %region, error = %e, "image lookup failed; skipping region")
                }
                Err(e) => warn!(error = %e, "image lookup task failed"),
            }
        }
        if images.is_empty() {
            bail!("no {} image found in any region", self.image);
        }

        let path = self.filename.as_deref();
        match (self.format, self.details) {
            (Format::Json, true) => export_json(&images, path),
            (Format::Json, false) => export_json(&image_ids(&images), path),
            (Format::Text, details) => {
                let body = if details {
                    table::images(&images).to_string()
                } else {
                    image_ids(&images)
                        .iter()
                        .map(|(region, id)| format!("{region}\t{id}"))
                        .collect::<Vec<_>>()
                        .join("\n")
                };
                match path {
                    Some(path) => write_atomic(path, format!("{body}\n").as_bytes()),
                    None => {
                        println!("{body}");
                        Ok(())
                    }
                }
            }
        }
    }
}

fn image_ids(images: &BTreeMap<String, ImageRecord>) -> BTreeMap<&str, &str> {
    images
        .iter()
        .map(|(region, img)| (region.as_str(), img.image_id.as_str()))
        .collect()
}
