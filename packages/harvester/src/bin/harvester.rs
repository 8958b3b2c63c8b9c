//! Command-line entry point: one subcommand per harvest stage.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use harvester::browser::{ChromiumLauncher, PageLoader};
use harvester::extract::ListingExtractor;
use harvester::files::{read_json, write_json};
use harvester::pipeline::crawl::{DEFAULT_PAGES, DEFAULT_PAGE_PAUSE};
use harvester::pipeline::{
    crawl_listing_pages, describe_competitions, download_kernels, export_code, parse_snapshots,
    BatchRunner, CsvCheckpointStore, Merger,
};
use harvester::sources::KaggleCli;
use harvester::table::{read_work_table, write_kernel_rows};
use harvester::{
    CheckpointStore, HarvestConfig, HttpMetadataSource, Listing, MetadataClient, RetryPolicy,
};

#[derive(Parser)]
#[command(name = "harvester")]
#[command(about = "Harvest competition listings, descriptions and kernel metadata")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save rendered competition index pages as HTML snapshots
    Crawl {
        #[arg(long, default_value_t = *DEFAULT_PAGES.start())]
        first_page: u32,
        #[arg(long, default_value_t = *DEFAULT_PAGES.end())]
        last_page: u32,
        #[arg(long, default_value = "pages")]
        out: PathBuf,
        /// Seconds to wait between two pages
        #[arg(long, default_value_t = DEFAULT_PAGE_PAUSE.as_secs())]
        pause_secs: u64,
        /// Chrome/Chromium executable (auto-detected when omitted)
        #[arg(long)]
        chrome: Option<PathBuf>,
    },

    /// Extract competition titles and links from saved snapshots
    Parse {
        #[arg(long, default_value = "pages")]
        pages: PathBuf,
        #[arg(long, default_value = "competitions.json")]
        out: PathBuf,
    },

    /// Extract descriptions from saved overview and data pages
    Describe {
        #[arg(long, default_value = "competitions.json")]
        listing: PathBuf,
        #[arg(long, default_value = "competition_pages_overview")]
        overview_dir: PathBuf,
        #[arg(long, default_value = "competition_pages_data")]
        data_dir: PathBuf,
        #[arg(long, default_value = "extracted_data.json")]
        out: PathBuf,
    },

    /// Build the top-K kernel table for every listed competition
    Kernels {
        #[arg(long, default_value = "competitions.json")]
        listing: PathBuf,
        #[arg(long, default_value = "all_competitions_kernels.csv")]
        out: PathBuf,
    },

    /// Fetch metadata for every kernel in the table
    Metadata {
        #[arg(long, default_value = "all_competitions_kernels.csv")]
        input: PathBuf,
        #[arg(long, default_value = "kernels_with_metadata.csv")]
        output: PathBuf,
        /// Continue from the rows already in the output file
        #[arg(long)]
        resume: bool,
    },

    /// Pull kernel sources named by the table's local-filename column
    Download {
        #[arg(long, default_value = "all_competitions_kernels.csv")]
        input: PathBuf,
        #[arg(long, default_value = "code_files")]
        out: PathBuf,
    },

    /// Flatten notebooks and scripts to plain text
    ExportCode {
        #[arg(long, default_value = "code_files")]
        input: PathBuf,
        #[arg(long, default_value = "processed-codes")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,harvester=debug,chromiumoxide=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = HarvestConfig::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Crawl {
            first_page,
            last_page,
            out,
            pause_secs,
            chrome,
        } => {
            if first_page == 0 || first_page > last_page {
                bail!("invalid page range {}..={}", first_page, last_page);
            }
            let mut launcher =
                ChromiumLauncher::new().with_user_agent(config.metadata.user_agent.clone());
            if let Some(path) = chrome {
                launcher = launcher.with_executable(path);
            }
            let loader = PageLoader::new(launcher, config.listing_url.clone())
                .with_scroll(config.scroll.clone());

            let summary = crawl_listing_pages(
                &loader,
                first_page..=last_page,
                &out,
                Duration::from_secs(pause_secs),
            )
            .await
            .context("Crawl failed")?;
            println!(
                "Saved {} page(s), {} failed {:?}",
                summary.saved.len(),
                summary.failed.len(),
                summary.failed
            );
        }

        Commands::Parse { pages, out } => {
            let summary = parse_snapshots(&pages, &ListingExtractor::default())
                .with_context(|| format!("Failed to read snapshots in {}", pages.display()))?;
            write_json(&out, &summary.listing)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!(
                "Wrote {} competition(s) to {} ({} empty page(s))",
                summary.listing.len(),
                out.display(),
                summary.empty.len()
            );
        }

        Commands::Describe {
            listing,
            overview_dir,
            data_dir,
            out,
        } => {
            let listing: Listing = read_json(&listing)
                .with_context(|| format!("Failed to read listing {}", listing.display()))?;
            let handles = listing.competition_handles();
            let descriptions = describe_competitions(&handles, &overview_dir, &data_dir);
            write_json(&out, &descriptions)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!("Wrote {} description(s) to {}", descriptions.len(), out.display());
        }

        Commands::Kernels { listing, out } => {
            let listing: Listing = read_json(&listing)
                .with_context(|| format!("Failed to read listing {}", listing.display()))?;
            let merger = Merger::new(KaggleCli::new()).with_page_size(config.page_size);

            let summary = merger
                .merge_competitions(&listing.competition_handles())
                .await;
            write_kernel_rows(&out, &summary.rows)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!(
                "Wrote {} kernel(s) to {}; no kernels for {:?}",
                summary.rows.len(),
                out.display(),
                summary.failed_competitions
            );
        }

        Commands::Metadata {
            input,
            output,
            resume,
        } => {
            let table = read_work_table(&input).context("Failed to read kernel table")?;
            let source = HttpMetadataSource::new(&config.metadata, config.retry.timeout)
                .context("Failed to build metadata client")?;
            let store = CsvCheckpointStore::new(&output);

            let checkpoint = if resume {
                store.load().await.context("Failed to read checkpoint")?
            } else {
                None
            };

            let runner = BatchRunner::new(MetadataClient::new(source, config.retry.clone()), store)
                .with_interval(config.checkpoint_interval);
            let report = runner
                .run(&table, checkpoint)
                .await
                .context("Metadata run failed")?;
            report.log_summary();
            println!(
                "Enriched {} of {} kernel(s) into {}; {} failed this run, {} failed previously",
                report.resolved(),
                report.records.len(),
                output.display(),
                report.failed.len(),
                report.previously_failed.len()
            );
        }

        Commands::Download { input, out } => {
            let table = read_work_table(&input).context("Failed to read kernel table")?;
            let summary =
                download_kernels(&table, &KaggleCli::new(), &out, &RetryPolicy::for_downloads())
                    .await
                    .context("Download failed")?;
            println!(
                "Saved {} kernel(s) to {}; {} failed",
                summary.saved.len(),
                out.display(),
                summary.failed.len()
            );
        }

        Commands::ExportCode { input, out } => {
            let summary = export_code(&input, &out)
                .with_context(|| format!("Failed to export {}", input.display()))?;
            println!(
                "Exported {} file(s) to {}; skipped {}",
                summary.exported.len(),
                out.display(),
                summary.skipped.len()
            );
            for path in &summary.skipped {
                println!("- {}", path.display());
            }
        }
    }

    Ok(())
}
