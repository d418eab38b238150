use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use floorwatch::browser::ChromeSession;
use floorwatch::detector::DetectionOutcome;
use floorwatch::recorder::RecordOutcome;
use floorwatch::{AppConfig, HarvestPipeline, HarvestReport};

/// Harvests marketplace listings for one tracked product, records the floor
/// price, and optionally flags suspected sales against the previous run.
#[derive(Parser, Debug)]
#[command(name = "floorwatch", version, about)]
struct Cli {
    /// Path to a configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Product identifier the run is recorded under.
    #[arg(long)]
    product_id: Option<i64>,

    /// Target listing page URL.
    #[arg(long)]
    url: Option<String>,

    /// Filter query string appended to the URL, e.g. "sellerCountry=7".
    #[arg(long)]
    filter: Option<String>,

    /// Database location, e.g. "sqlite://data/floorwatch.db".
    #[arg(long)]
    database_url: Option<String>,

    /// Location tag stamped on every listing.
    #[arg(long)]
    location: Option<String>,

    /// Run sale-suspicion detection after a successful persist.
    #[arg(long)]
    detect_sales: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("floorwatch=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);
    config.validate()?;

    let pool = floorwatch::db::connect(&config.database).await?;
    let pipeline = HarvestPipeline::new(config.clone(), pool);

    info!("launching browser session");
    let session = ChromeSession::launch(&config.browser)?;
    let report = pipeline.run(&session).await?;
    drop(session);

    print_summary(&report);
    Ok(())
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(product_id) = cli.product_id {
        config.harvest.product_id = product_id;
    }
    if let Some(url) = &cli.url {
        config.harvest.product_url = url.clone();
    }
    if let Some(filter) = &cli.filter {
        config.harvest.filter_query = filter.clone();
    }
    if let Some(database_url) = &cli.database_url {
        config.database.url = database_url.clone();
    }
    if let Some(location) = &cli.location {
        config.harvest.location = location.clone();
    }
    if cli.detect_sales {
        config.harvest.detect_sales = true;
    }
}

fn print_summary(report: &HarvestReport) {
    println!();
    println!("Run summary for product {}", report.product_id);
    println!("  Rows loaded:    {}", report.rows_loaded);
    println!(
        "  Valid listings: {} ({} dropped, {} faulted)",
        report.stats.rows_kept, report.stats.rows_dropped, report.stats.row_faults
    );
    match &report.outcome {
        RecordOutcome::Recorded(scrape) => {
            println!(
                "  Floor price:    {:.2} € (scrape #{})",
                scrape.floor_price, scrape.id
            );
        }
        RecordOutcome::Empty => println!("  Floor price:    no valid floor price found"),
    }
    match &report.detection {
        None => println!("  Sale detection: disabled"),
        Some(DetectionOutcome::InsufficientHistory) => {
            println!("  Sale detection: insufficient history");
        }
        Some(DetectionOutcome::Analyzed(sales)) => {
            println!("  Sale detection: {} suspected sale(s)", sales.len());
            for sale in sales {
                println!(
                    "    - {} @ {:.2} € ({} confidence)",
                    sale.seller, sale.price, sale.confidence
                );
            }
        }
    }
    println!("  Elapsed:        {} ms", report.elapsed_ms);
}
