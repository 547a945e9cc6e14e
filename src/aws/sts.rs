use anyhow::{Context, Result};
use aws_config::SdkConfig;
use aws_sdk_sts::{Client, Config};
use tracing::{debug, warn};

use super::iam::account_alias;

pub async fn account_id(client: &Client) -> Result<String> {
    let identity = client
        .get_caller_identity()
        .send()
        .await
        .context("fetching caller identity")?;
    Ok(identity
        .account()
        .context("caller identity has no account")?
        .to_string())
}

/// Human friendly name for the account: its alias, else its id.
pub async fn account_identifier(sdk_config: &SdkConfig) -> Result<String> {
    let iam = aws_sdk_iam::Client::new(sdk_config);
    match account_alias(&iam).await {
        Ok(Some(alias)) => {
            debug!(alias = %alias, "using account alias");
            return Ok(alias);
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "unable to list account aliases; falling back to account id"),
    }
    let sts = Client::from_conf(Config::new(sdk_config));
    account_id(&sts).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::sdk_config;

    #[tokio::test]
    #[ignore = "requires aws credentials"]
    async fn test_account_identifier() {
        let cfg = sdk_config("default", "us-east-2").await;
        let ident = account_identifier(&cfg).await.unwrap();
        eprintln!("{ident}");
        assert!(!ident.is_empty());
    }
}
