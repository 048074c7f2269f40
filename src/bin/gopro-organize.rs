use std::path::PathBuf;

use clap::Parser;

use gopro_cloud::cli::{OrganizeArgs, print_banner, report_organize};
use gopro_cloud::logging;
use gopro_cloud::organize::Organizer;

/// Organize GoPro media files into date folders and fix their timestamps
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory containing the media files
    source_dir: PathBuf,

    #[command(flatten)]
    organize: OrganizeArgs,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    print_banner("GoPro Organizer");

    let config = args.organize.to_config(&args.source_dir);
    let organizer = Organizer::new(config)?;
    let summary = organizer.run();
    report_organize(&summary, organizer.config().dry_run);

    Ok(())
}
