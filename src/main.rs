mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::{ImageArgs, LaunchArgs, ProfileArgs, ProfilesArgs, SizesArgs};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose log output
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Profile subnets, security groups and key pairs of an account
    Profile(ProfileArgs),
    /// Latest Amazon Machine Image of an OS family, per region
    Image(ImageArgs),
    /// Interactively launch an EC2 instance
    Launch(LaunchArgs),
    /// List local awscli profiles
    Profiles(ProfilesArgs),
    /// List instance size types offered in a region
    Sizes(SizesArgs),
}

fn init_logging(debug: bool) {
    let default = if debug { "ec2tools=debug,warn" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if !atty::is(atty::Stream::Stderr) {
        colored::control::set_override(false);
    }

    use Commands::*;
    match cli.command {
        Profile(args) => args.main().await,
        Image(args) => args.main().await,
        Launch(args) => args.main().await,
        Profiles(args) => args.main().await,
        Sizes(args) => args.main().await,
    }
}
