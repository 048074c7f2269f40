use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser;
use log::info;

use gopro_cloud::cli::{DownloadArgs, OrganizeArgs, print_banner, report_organize};
use gopro_cloud::sync::sync;
use gopro_cloud::{GoProClient, logging};

/// Download and organize GoPro media files in one step
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base directory for media files
    #[arg(short, long, default_value = "gopro_media")]
    output_dir: PathBuf,

    #[command(flatten)]
    download: DownloadArgs,

    #[command(flatten)]
    organize: OrganizeArgs,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    let result = tokio::select! {
        result = run(args) => result,
        _ = tokio::signal::ctrl_c() => Err(anyhow!("Operation cancelled by user")),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    print_banner("GoPro Sync");

    let download = args.download.to_config(&args.output_dir)?;
    let organize = args.organize.to_config(&args.output_dir);
    let client = GoProClient::new(&download)?;

    let summary = sync(&client, &download, &organize).await?;

    info!("Finished getting media. {} new files.", summary.download.downloaded);
    report_organize(&summary.organize, organize.dry_run);
    Ok(())
}
