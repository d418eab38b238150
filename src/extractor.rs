use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use scraper::{Html, Selector};
use std::str::FromStr;
use tracing::warn;

use crate::models::NewListing;
use crate::Result;

/// Sentinel seller name for rows without a recognizable seller link.
pub const UNKNOWN_SELLER: &str = "Unknown";

const SELLER_LINK_SELECTOR: &str = r#"a[href*="/Users/"]"#;
const PRICE_SELECTOR: &str = ".price, .fw-bold";
const QUANTITY_SELECTOR: &str = ".badge, .amount";

/// A field value that either parsed cleanly or fell back to a default.
/// Keeping the distinction explicit makes fallback usage observable and
/// countable instead of silent control flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Parsed<T> {
    Value(T),
    Fallback(T),
}

impl<T: Copy> Parsed<T> {
    pub fn get(&self) -> T {
        match self {
            Parsed::Value(v) | Parsed::Fallback(v) => *v,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Parsed::Fallback(_))
    }
}

/// Per-batch accounting for one extraction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub rows_seen: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
    pub row_faults: usize,
    pub price_fallbacks: usize,
    pub quantity_fallbacks: usize,
}

#[derive(Debug)]
pub struct Extraction {
    pub listings: Vec<NewListing>,
    pub stats: ExtractionStats,
}

#[derive(Debug)]
struct RowFields {
    seller: String,
    price: Parsed<f64>,
    quantity: Parsed<i64>,
}

impl RowFields {
    fn is_valid(&self) -> bool {
        self.seller != UNKNOWN_SELLER && self.price.get() > 0.0
    }
}

/// Parses EU-format currency text ("12,50 €", "1.234,56 €") into a
/// dot-decimal value. Dot groups are thousands separators, the comma is the
/// decimal separator, and the euro suffix anchors the match.
pub struct PriceParser {
    pattern: Regex,
}

impl PriceParser {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"(\d{1,3}(?:\.\d{3})+|\d+)(?:,(\d+))?\s*€").unwrap(),
        }
    }

    pub fn parse(&self, text: &str) -> Parsed<f64> {
        let Some(captures) = self.pattern.captures(text) else {
            return Parsed::Fallback(0.0);
        };

        let whole = captures[1].replace('.', "");
        let normalized = match captures.get(2) {
            Some(decimals) => format!("{}.{}", whole, decimals.as_str()),
            None => whole,
        };

        match Decimal::from_str(&normalized).ok().and_then(|d| d.to_f64()) {
            Some(price) => Parsed::Value(price),
            None => Parsed::Fallback(0.0),
        }
    }
}

impl Default for PriceParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts revealed listing rows into validated records.
pub struct ListingExtractor {
    seller_selector: Selector,
    price_selector: Selector,
    quantity_selector: Selector,
    price_parser: PriceParser,
    quantity_pattern: Regex,
}

impl ListingExtractor {
    pub fn new() -> Self {
        Self {
            seller_selector: Selector::parse(SELLER_LINK_SELECTOR).unwrap(),
            price_selector: Selector::parse(PRICE_SELECTOR).unwrap(),
            quantity_selector: Selector::parse(QUANTITY_SELECTOR).unwrap(),
            price_parser: PriceParser::new(),
            quantity_pattern: Regex::new(r"^\s*(\d+)").unwrap(),
        }
    }

    /// Extracts validated listings from row HTML fragments, preserving row
    /// order and passing duplicates through unmerged. Rows with an unknown
    /// seller or a non-positive price are dropped silently; a row whose
    /// extraction faults is logged and skipped without aborting the batch.
    pub fn extract(&self, rows: &[String], location: &str) -> Extraction {
        let mut listings = Vec::new();
        let mut stats = ExtractionStats {
            rows_seen: rows.len(),
            ..Default::default()
        };

        for (index, row) in rows.iter().enumerate() {
            match self.extract_row(row) {
                Ok(fields) => {
                    if fields.price.is_fallback() {
                        stats.price_fallbacks += 1;
                    }
                    if fields.quantity.is_fallback() {
                        stats.quantity_fallbacks += 1;
                    }

                    if fields.is_valid() {
                        listings.push(NewListing {
                            seller: fields.seller,
                            price: fields.price.get(),
                            quantity: fields.quantity.get(),
                            location: location.to_string(),
                        });
                        stats.rows_kept += 1;
                    } else {
                        stats.rows_dropped += 1;
                    }
                }
                Err(e) => {
                    warn!(row = index + 1, error = %e, "row extraction failed, skipping");
                    stats.row_faults += 1;
                }
            }
        }

        Extraction { listings, stats }
    }

    fn extract_row(&self, row: &str) -> Result<RowFields> {
        let fragment = Html::parse_fragment(row);

        let seller = fragment
            .select(&self.seller_selector)
            .next()
            .map(|link| collect_text(&link))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_SELLER.to_string());

        let price = match fragment.select(&self.price_selector).next() {
            Some(element) => self.price_parser.parse(&collect_text(&element)),
            None => Parsed::Fallback(0.0),
        };

        let quantity = match fragment.select(&self.quantity_selector).next() {
            Some(element) => self.parse_quantity(&collect_text(&element)),
            None => Parsed::Fallback(1),
        };

        Ok(RowFields {
            seller,
            price,
            quantity,
        })
    }

    fn parse_quantity(&self, text: &str) -> Parsed<i64> {
        self.quantity_pattern
            .captures(text)
            .and_then(|captures| captures[1].parse::<i64>().ok())
            .map_or(Parsed::Fallback(1), Parsed::Value)
    }
}

impl Default for ListingExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_text(element: &scraper::ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(seller: &str, price: &str, quantity: &str) -> String {
        format!(
            r#"<div class="article-row">
                <a href="/en/Magic/Users/{seller}">{seller}</a>
                <span class="price">{price}</span>
                <span class="badge">{quantity}</span>
            </div>"#
        )
    }

    #[test]
    fn test_price_parsing_decimal_comma() {
        let parser = PriceParser::new();
        assert_eq!(parser.parse("12,50 €"), Parsed::Value(12.50));
    }

    #[test]
    fn test_price_parsing_thousands_separator() {
        let parser = PriceParser::new();
        assert_eq!(parser.parse("1.234,56 €"), Parsed::Value(1234.56));
    }

    #[test]
    fn test_price_parsing_whole_euros() {
        let parser = PriceParser::new();
        assert_eq!(parser.parse("7 €"), Parsed::Value(7.0));
        assert_eq!(parser.parse("120€"), Parsed::Value(120.0));
    }

    #[test]
    fn test_price_parsing_failure_falls_back_to_zero() {
        let parser = PriceParser::new();
        assert_eq!(parser.parse("not a price"), Parsed::Fallback(0.0));
        assert_eq!(parser.parse(""), Parsed::Fallback(0.0));
        assert_eq!(parser.parse("$12.50"), Parsed::Fallback(0.0));
    }

    #[test]
    fn test_extract_valid_row() {
        let extractor = ListingExtractor::new();
        let rows = vec![row("cardkeeper_de", "12,50 €", "3")];

        let extraction = extractor.extract(&rows, "Germany");

        assert_eq!(extraction.listings.len(), 1);
        let listing = &extraction.listings[0];
        assert_eq!(listing.seller, "cardkeeper_de");
        assert_eq!(listing.price, 12.50);
        assert_eq!(listing.quantity, 3);
        assert_eq!(listing.location, "Germany");
        assert_eq!(extraction.stats.rows_kept, 1);
        assert_eq!(extraction.stats.rows_dropped, 0);
    }

    #[test]
    fn test_missing_seller_link_drops_row() {
        let extractor = ListingExtractor::new();
        let rows = vec![
            r#"<div class="article-row"><span class="price">5,00 €</span></div>"#.to_string(),
        ];

        let extraction = extractor.extract(&rows, "Germany");

        assert!(extraction.listings.is_empty());
        assert_eq!(extraction.stats.rows_dropped, 1);
    }

    #[test]
    fn test_unparsable_price_counts_fallback_and_drops_row() {
        let extractor = ListingExtractor::new();
        let rows = vec![row("someone", "sold out", "1")];

        let extraction = extractor.extract(&rows, "Germany");

        assert!(extraction.listings.is_empty());
        assert_eq!(extraction.stats.price_fallbacks, 1);
        assert_eq!(extraction.stats.rows_dropped, 1);
    }

    #[test]
    fn test_missing_quantity_defaults_to_one() {
        let extractor = ListingExtractor::new();
        let rows = vec![
            r#"<div class="article-row">
                <a href="/en/Magic/Users/someone">someone</a>
                <span class="price">3,00 €</span>
            </div>"#
                .to_string(),
        ];

        let extraction = extractor.extract(&rows, "Germany");

        assert_eq!(extraction.listings[0].quantity, 1);
        assert_eq!(extraction.stats.quantity_fallbacks, 1);
        assert_eq!(extraction.stats.rows_kept, 1);
    }

    #[test]
    fn test_garbage_quantity_defaults_to_one() {
        let extractor = ListingExtractor::new();
        let rows = vec![row("someone", "3,00 €", "lots")];

        let extraction = extractor.extract(&rows, "Germany");

        assert_eq!(extraction.listings[0].quantity, 1);
        assert_eq!(extraction.stats.quantity_fallbacks, 1);
    }

    #[test]
    fn test_row_order_preserved_and_duplicates_unmerged() {
        let extractor = ListingExtractor::new();
        let rows = vec![
            row("alpha", "2,00 €", "1"),
            row("beta", "1,00 €", "1"),
            row("alpha", "2,00 €", "1"),
        ];

        let extraction = extractor.extract(&rows, "Germany");

        let sellers: Vec<&str> = extraction
            .listings
            .iter()
            .map(|listing| listing.seller.as_str())
            .collect();
        assert_eq!(sellers, vec!["alpha", "beta", "alpha"]);
    }

    #[test]
    fn test_invalid_rows_dropped_among_valid_ones() {
        let extractor = ListingExtractor::new();
        let rows = vec![
            row("alpha", "2,00 €", "1"),
            row("beta", "broken", "1"),
            r#"<div class="article-row"><span class="price">9,99 €</span></div>"#.to_string(),
            row("gamma", "4,00 €", "2"),
        ];

        let extraction = extractor.extract(&rows, "Germany");

        assert_eq!(extraction.listings.len(), 2);
        assert_eq!(extraction.stats.rows_seen, 4);
        assert_eq!(extraction.stats.rows_kept, 2);
        assert_eq!(extraction.stats.rows_dropped, 2);
        for listing in &extraction.listings {
            assert!(listing.price > 0.0);
            assert_ne!(listing.seller, UNKNOWN_SELLER);
        }
    }

    #[test]
    fn test_fw_bold_price_marker_is_recognized() {
        let extractor = ListingExtractor::new();
        let rows = vec![
            r#"<div class="article-row">
                <a href="/en/Magic/Users/someone">someone</a>
                <span class="fw-bold">15,00 €</span>
            </div>"#
                .to_string(),
        ];

        let extraction = extractor.extract(&rows, "Germany");

        assert_eq!(extraction.listings[0].price, 15.0);
    }
}
