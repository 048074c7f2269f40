//! Download media from the GoPro cloud and sort local media into
//! date-named folders.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod lister;
pub mod logging;
pub mod model;
pub mod organize;
pub mod sidecar;
pub mod sync;
pub mod timestamps;

#[cfg(test)]
mod test_support;

use git_version::git_version;

pub const GIT_VERSION: &str = git_version!(args = ["--always", "--dirty=-modified"], fallback = "unknown");

pub use client::{GoProClient, MediaApi};
pub use config::{DownloadConfig, OrganizeConfig};
pub use error::GoProError;
