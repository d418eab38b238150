use std::time::Duration;
use tracing::debug;

use crate::browser::BrowserSession;
use crate::Result;

/// Selector for one marketplace listing row.
pub const LISTING_ROW_SELECTOR: &str = ".article-row";

/// A declarative "reveal more" control matcher: a CSS selector plus an
/// optional visible-text filter for sites that only distinguish their
/// load-more button by its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealControl {
    pub selector: &'static str,
    pub text: Option<&'static str>,
}

/// Candidate reveal controls, tried in priority order. Localized button
/// labels come first since the page renders them for the filtered locale.
pub const REVEAL_CONTROLS: &[RevealControl] = &[
    RevealControl { selector: "button", text: Some("ZEIGE MEHR") },
    RevealControl { selector: "button", text: Some("Load more") },
    RevealControl { selector: "button", text: Some("Show more") },
    RevealControl { selector: ".load-more-articles", text: None },
    RevealControl { selector: "[data-testid=\"load-more\"]", text: None },
    RevealControl { selector: ".table-footer button", text: None },
];

const MAX_CLICKS_PER_CONTROL: usize = 10;
const MAX_SCROLL_ATTEMPTS: usize = 30;
const STALLED_SCROLL_LIMIT: u32 = 3;

/// Drives progressive reveal of listing rows until the page stops growing.
///
/// Two independent heuristics cover both lazy-loading patterns: clicking a
/// "reveal more" control, and scrolling to the bottom of the page. Fixed
/// attempt and settle budgets bound worst-case latency while tolerating
/// asynchronous rendering delay.
pub struct DynamicContentLoader<'a> {
    session: &'a dyn BrowserSession,
    click_settle: Duration,
    scroll_settle: Duration,
}

impl<'a> DynamicContentLoader<'a> {
    pub fn new(
        session: &'a dyn BrowserSession,
        click_settle: Duration,
        scroll_settle: Duration,
    ) -> Self {
        Self {
            session,
            click_settle,
            scroll_settle,
        }
    }

    /// Expands the page and returns the final row count. Session faults
    /// propagate unrecovered; they are fatal to the run.
    pub async fn expand(&self) -> Result<usize> {
        let initial = self.session.count_rows(LISTING_ROW_SELECTOR).await?;
        debug!(rows = initial, "initial listing rows");

        let after_controls = self.expand_with_controls(initial).await?;
        self.expand_by_scrolling(after_controls).await?;

        self.session.count_rows(LISTING_ROW_SELECTOR).await
    }

    /// Phase one: click reveal controls in priority order. A selector is
    /// skipped as soon as no visible control matches, and abandoned on the
    /// first click that yields no row-count growth.
    async fn expand_with_controls(&self, initial: usize) -> Result<usize> {
        let mut count = initial;

        for control in REVEAL_CONTROLS {
            for _ in 0..MAX_CLICKS_PER_CONTROL {
                if !self.session.click_visible(control).await? {
                    break;
                }
                self.session.settle(self.click_settle).await;

                let current = self.session.count_rows(LISTING_ROW_SELECTOR).await?;
                if current > count {
                    debug!(selector = control.selector, rows = current, "control revealed rows");
                    count = current;
                } else {
                    break;
                }
            }
        }

        Ok(count)
    }

    /// Phase two: scroll to the bottom until three consecutive attempts
    /// reveal nothing new.
    async fn expand_by_scrolling(&self, initial: usize) -> Result<usize> {
        let mut count = initial;
        let mut stalled = 0u32;

        for attempt in 0..MAX_SCROLL_ATTEMPTS {
            self.session.scroll_to_bottom().await?;
            self.session.settle(self.scroll_settle).await;

            let current = self.session.count_rows(LISTING_ROW_SELECTOR).await?;
            if current > count {
                debug!(attempt = attempt + 1, rows = current, "scroll revealed rows");
                count = current;
                stalled = 0;
            } else {
                stalled += 1;
                if stalled >= STALLED_SCROLL_LIMIT {
                    debug!(attempt = attempt + 1, "no new rows, assuming end of content");
                    break;
                }
            }
        }

        Ok(count)
    }
}
