mod image;
mod launch;
mod profile;
mod profiles;
mod sizes;

pub use image::ImageArgs;
pub use launch::LaunchArgs;
pub use profile::ProfileArgs;
pub use profiles::ProfilesArgs;
pub use sizes::SizesArgs;

use colored::Colorize;

/// One-line progress note on stderr, keeping stdout for data.
pub(crate) fn status(msg: &str) {
    eprintln!("  {} {msg}", "INFO:".green().bold());
}
