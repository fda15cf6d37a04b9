//! Resolves each play's clip URL and optionally downloads the clips.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use glob::{glob, Pattern};
use indicatif::ProgressIterator;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::error::Result;
use crate::progress::progress_style;
use crate::record::Dataset;
use crate::savant;

async fn scrape_video_url(client: &Client, play_id: &str) -> Result<Option<String>> {
    let html = client.get_text(&savant::play_page_url(play_id)).await?;
    savant::parse_video_url(&html)
}

/// Fill the `video` column for records that have a play id but no URL.
pub async fn populate_video_urls(client: &Client, dataset: &mut Dataset, delay: Duration) -> usize {
    let pending: Vec<usize> = dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.play_id.is_some() && r.video.is_none())
        .map(|(i, _)| i)
        .collect();
    info!("{} home runs need a video URL", pending.len());

    let mut filled = 0;
    for index in pending.into_iter().progress_with_style(progress_style()) {
        let Some(play_id) = dataset.records[index].play_id.clone() else {
            continue;
        };

        match scrape_video_url(client, &play_id).await {
            Ok(Some(url)) => {
                dataset.records[index].video = Some(url);
                filled += 1;
            }
            Ok(None) => warn!("No video found for playId {play_id}"),
            Err(e) => warn!("Error scraping video for {play_id}: {e}"),
        }

        tokio::time::sleep(delay).await;
    }

    filled
}

pub fn video_path(dir: &Path, row: usize, play_id: &str) -> PathBuf {
    dir.join(format!("{}_{}.mp4", row + 1, play_id))
}

/// Whether any `*_{play_id}.mp4` is already in `dir`. Row numbers shift when
/// the dataset is rebuilt, so only the play id is compared.
pub fn already_downloaded(dir: &Path, play_id: &str) -> bool {
    let pattern = format!(
        "{}/*_{}.mp4",
        Pattern::escape(&dir.to_string_lossy()),
        Pattern::escape(play_id)
    );
    match glob(&pattern) {
        Ok(mut paths) => paths.any(|path| path.is_ok()),
        Err(e) => {
            warn!("Bad glob pattern {pattern}: {e}");
            false
        }
    }
}

async fn download(client: &Client, url: &str, path: &Path) -> Result<u64> {
    let response = client.get_response(url).await?;
    let temp_path = path.with_extension("mp4.part");

    let mut file = tokio::fs::File::create(&temp_path).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&temp_path, path).await?;
    Ok(written)
}

/// Download every resolved clip into `dir`. Returns how many were saved.
pub async fn download_videos(client: &Client, dataset: &Dataset, dir: &Path) -> Result<usize> {
    tokio::fs::create_dir_all(dir).await?;

    let mut saved = 0;
    for (row, record) in dataset.records.iter().enumerate().progress_with_style(progress_style()) {
        let (Some(play_id), Some(url)) = (&record.play_id, &record.video) else {
            continue;
        };
        if already_downloaded(dir, play_id) {
            debug!("Already have video for playId {play_id}");
            continue;
        }

        let path = video_path(dir, row, play_id);
        info!("Downloading video for playId {play_id}...");
        match download(client, url, &path).await {
            Ok(bytes) => {
                debug!("Saved {} bytes to {}", bytes, path.display());
                saved += 1;
            }
            Err(e) => warn!("Failed to download video for playId {play_id}: {e}"),
        }
    }

    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_names_use_one_based_rows() {
        let dir = Path::new("clips");
        assert_eq!(video_path(dir, 0, "abc-123"), Path::new("clips/1_abc-123.mp4"));
    }

    #[test]
    fn detects_existing_download_by_play_id() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("17_abc-123.mp4"), b"mp4").unwrap();

        assert!(already_downloaded(dir.path(), "abc-123"));
        assert!(!already_downloaded(dir.path(), "def-456"));
    }
}
