//! Fills the "x/30 ballparks" column from each play's video page.

use indicatif::ProgressIterator;
use tracing::{info, warn};

use crate::client::Client;
use crate::error::Result;
use crate::progress::progress_style;
use crate::record::Dataset;
use crate::savant;

async fn scrape_park_count(client: &Client, play_id: &str) -> Result<Option<u8>> {
    let html = client.get_text(&savant::play_page_url(play_id)).await?;
    savant::parse_park_count(&html)
}

/// `None` when the page could not be fetched or has no readable badge; the
/// record stays empty and is retried on the next run.
pub async fn fetch_park_count(client: &Client, play_id: &str) -> Option<u8> {
    match scrape_park_count(client, play_id).await {
        Ok(Some(count)) => Some(count),
        Ok(None) => {
            warn!("No x/30 parks badge for {play_id}");
            None
        }
        Err(e) => {
            warn!("Error scraping {play_id}: {e}");
            None
        }
    }
}

/// Indices of records that have a play id but no park count yet.
pub fn pending(dataset: &Dataset) -> Vec<usize> {
    dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.play_id.is_some() && r.park_count.is_none())
        .map(|(i, _)| i)
        .collect()
}

pub async fn populate_park_counts(client: &Client, dataset: &mut Dataset, delay: std::time::Duration) -> usize {
    let pending = pending(dataset);
    info!("{} home runs need a park count", pending.len());

    let mut filled = 0;
    for (n, index) in pending.into_iter().enumerate().progress_with_style(progress_style()) {
        let Some(play_id) = dataset.records[index].play_id.clone() else {
            continue;
        };

        let count = fetch_park_count(client, &play_id).await;
        if let Some(count) = count {
            dataset.records[index].park_count = Some(count);
            filled += 1;
        }
        if n % 100 == 0 {
            info!("Processed {n} home runs, last playId: {play_id}, x/30: {count:?}");
        }

        tokio::time::sleep(delay).await;
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::{write_sample, SAMPLE};
    use tempfile::TempDir;

    #[test]
    fn pending_needs_play_id_and_no_count() {
        let dir = TempDir::new().unwrap();
        let mut dataset = Dataset::load(&write_sample(&dir, SAMPLE)).unwrap();
        assert!(pending(&dataset).is_empty());

        dataset.records[0].play_id = Some("judge-3".to_string());
        dataset.records[1].play_id = Some("acuna-1".to_string());
        dataset.records[1].park_count = Some(12);
        assert_eq!(pending(&dataset), vec![0]);
    }

    #[tokio::test]
    async fn fully_populated_dataset_is_untouched() {
        let dir = TempDir::new().unwrap();
        let mut dataset = Dataset::load(&write_sample(&dir, SAMPLE)).unwrap();
        for record in &mut dataset.records {
            record.play_id = Some(format!("{}-id", record.team));
            record.park_count = Some(20);
        }
        let before = dataset.records.clone();

        let client = Client::new(&crate::config::HttpConfig::default()).unwrap();
        let filled = populate_park_counts(&client, &mut dataset, std::time::Duration::ZERO).await;
        assert_eq!(filled, 0);
        assert_eq!(dataset.records, before);
    }
}
