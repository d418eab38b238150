use sqlx::SqlitePool;
use std::time::{Duration, Instant};
use tracing::info;
use url::Url;

use crate::browser::BrowserSession;
use crate::config::AppConfig;
use crate::detector::{DetectionOutcome, SaleSuspicionDetector};
use crate::extractor::{ExtractionStats, ListingExtractor};
use crate::loader::{DynamicContentLoader, LISTING_ROW_SELECTOR};
use crate::models::FilterSignature;
use crate::recorder::{RecordOutcome, ScrapeRecorder};
use crate::Result;

/// What one run produced, rendered by the binary as the run summary.
#[derive(Debug)]
pub struct HarvestReport {
    pub product_id: i64,
    pub rows_loaded: usize,
    pub stats: ExtractionStats,
    pub outcome: RecordOutcome,
    /// `None` when the detection stage was not enabled for this run.
    pub detection: Option<DetectionOutcome>,
    pub elapsed_ms: u64,
}

impl HarvestReport {
    pub fn floor_price(&self) -> Option<f64> {
        match &self.outcome {
            RecordOutcome::Recorded(scrape) => Some(scrape.floor_price),
            RecordOutcome::Empty => None,
        }
    }
}

/// Runs one product's harvest sequentially: load, extract, record, and
/// optionally detect. The caller owns the browser session and its scope;
/// detection runs only when enabled in configuration, as an explicit stage
/// after a successful persist.
pub struct HarvestPipeline {
    config: AppConfig,
    extractor: ListingExtractor,
    recorder: ScrapeRecorder,
    detector: SaleSuspicionDetector,
}

impl HarvestPipeline {
    pub fn new(config: AppConfig, pool: SqlitePool) -> Self {
        Self {
            config,
            extractor: ListingExtractor::new(),
            recorder: ScrapeRecorder::new(pool.clone()),
            detector: SaleSuspicionDetector::new(pool),
        }
    }

    pub async fn run(&self, session: &dyn BrowserSession) -> Result<HarvestReport> {
        let started = Instant::now();
        let harvest = &self.config.harvest;
        let url = self.target_url()?;

        info!(%url, product_id = harvest.product_id, "starting harvest");
        session.navigate(&url).await?;
        session
            .wait_for_selector(
                LISTING_ROW_SELECTOR,
                Duration::from_secs(self.config.browser.selector_timeout),
            )
            .await?;
        // Initial rows exist, but client-side rendering may still be filling
        // them in.
        session
            .settle(Duration::from_millis(harvest.initial_settle_ms))
            .await;

        let loader = DynamicContentLoader::new(
            session,
            Duration::from_millis(harvest.click_settle_ms),
            Duration::from_millis(harvest.scroll_settle_ms),
        );
        let rows_loaded = loader.expand().await?;
        info!(rows_loaded, "page fully expanded");

        let rows = session.row_html(LISTING_ROW_SELECTOR).await?;
        let extraction = self.extractor.extract(&rows, &harvest.location);
        info!(
            kept = extraction.stats.rows_kept,
            dropped = extraction.stats.rows_dropped,
            faults = extraction.stats.row_faults,
            "rows extracted"
        );

        let filters = FilterSignature::parse(&harvest.filter_query);
        let outcome = self
            .recorder
            .record(harvest.product_id, &filters, &extraction.listings)
            .await?;

        let detection = match (&outcome, harvest.detect_sales) {
            (RecordOutcome::Recorded(_), true) => {
                Some(self.detector.detect(harvest.product_id).await?)
            }
            _ => None,
        };

        Ok(HarvestReport {
            product_id: harvest.product_id,
            rows_loaded,
            stats: extraction.stats,
            outcome,
            detection,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn target_url(&self) -> Result<String> {
        let mut url = Url::parse(&self.config.harvest.product_url)?;
        if !self.config.harvest.filter_query.is_empty() {
            url.set_query(Some(&self.config.harvest.filter_query));
        }
        Ok(url.into())
    }
}
