//! Builds the base dataset by scraping one search results table per day.

use std::path::Path;

use chrono::NaiveDate;
use indicatif::ProgressIterator;
use tracing::{debug, error, info, warn};

use crate::client::{with_retry, Client};
use crate::config::ScrapeConfig;
use crate::error::Result;
use crate::progress::progress_style;
use crate::record::write_raw_table;
use crate::savant::{self, ResultsTable};

/// Rows from every scraped day. The first row is the header; every later
/// row must have the same width.
#[derive(Debug, Default)]
pub struct Accumulator {
    rows: Vec<Vec<String>>,
}

impl Accumulator {
    pub fn push_table(&mut self, date: NaiveDate, table: ResultsTable) {
        let mut rows = table.rows.into_iter();

        if self.rows.is_empty() {
            match table.header {
                Some(header) => self.rows.push(header),
                None => match rows.next() {
                    Some(first) => self.rows.push(first),
                    None => return,
                },
            }
        }

        let width = self.rows[0].len();
        for row in rows {
            if row == self.rows[0] {
                continue;
            }
            if row.len() != width {
                warn!("{date}: dropping row with {} columns, expected {width}", row.len());
                continue;
            }
            self.rows.push(row);
        }
    }

    /// Data rows, not counting the header.
    pub fn len(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }
}

async fn scrape_day(client: &Client, date: NaiveDate, config: &ScrapeConfig) -> Result<Option<ResultsTable>> {
    let url = savant::search_url(date);
    debug!("Fetching webpage content for {url}");
    let html = with_retry(|| client.get_text(&url), config.max_attempts, config.retry_delay()).await?;
    savant::parse_results_table(&html)
}

pub fn days(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|day| *day <= end).collect()
}

/// Scrape every day in `start..=end` and overwrite `output` with the result.
/// Days whose request still fails after the retries are logged and skipped.
pub async fn scrape_range(
    client: &Client,
    start: NaiveDate,
    end: NaiveDate,
    config: &ScrapeConfig,
    output: &Path,
) -> Result<usize> {
    let mut accumulator = Accumulator::default();
    let mut failed_days = Vec::new();

    for date in days(start, end).into_iter().progress_with_style(progress_style()) {
        match scrape_day(client, date, config).await {
            Ok(Some(table)) => {
                debug!("{date}: {} rows", table.rows.len());
                accumulator.push_table(date, table);
            }
            Ok(None) => warn!("{date}: table not found on the page"),
            Err(e) => {
                error!("{date}: failed to scrape: {e}");
                failed_days.push(date);
            }
        }

        tokio::time::sleep(config.day_delay()).await;
    }

    if !failed_days.is_empty() {
        warn!("{} days failed and were skipped: {:?}", failed_days.len(), failed_days);
    }

    if accumulator.is_empty() {
        warn!("No data was scraped; {} left as it was", output.display());
        return Ok(0);
    }

    write_raw_table(output, accumulator.rows())?;
    info!("Saved {} home runs to {}", accumulator.len(), output.display());
    Ok(accumulator.len())
}
