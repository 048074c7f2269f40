use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser;
use log::info;

use gopro_cloud::cli::{DownloadArgs, print_banner};
use gopro_cloud::fetcher::download_all;
use gopro_cloud::{GoProClient, logging};

/// Download media files from GoPro Cloud
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Output directory for downloaded files
    #[arg(short, long, default_value = "gopro_downloads")]
    output_dir: PathBuf,

    #[command(flatten)]
    download: DownloadArgs,

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
    print_banner("GoPro Cloud Downloader");

    let config = args.download.to_config(&args.output_dir)?;
    let client = GoProClient::new(&config)?;

    info!("Downloading media. This may take several minutes...");
    let summary = download_all(&client, &config).await?;
    info!("Finished getting media. {} new files.", summary.downloaded);

    Ok(())
}
