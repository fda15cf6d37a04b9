//! Assigns `playId`s by matching dataset home runs against live game feeds.

use std::collections::HashSet;
use std::future::Future;

use indicatif::ProgressIterator;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::config::MatchingConfig;
use crate::error::Result;
use crate::model::{GameFeed, HitData, PlayEvent};
use crate::names::{self, NameMatch};
use crate::progress::progress_style;
use crate::record::{Dataset, HomeRunRecord};

/// A metric missing from the feed always passes. One the feed reports but
/// the dataset lacks cannot be confirmed and fails.
fn within(dataset: Option<f64>, feed: Option<f64>, tolerance: f64) -> bool {
    match (dataset, feed) {
        (_, None) => true,
        (Some(ours), Some(theirs)) => (ours - theirs).abs() < tolerance,
        (None, Some(_)) => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricCheck {
    pub pitch_speed: bool,
    pub exit_velocity: bool,
    pub distance: bool,
}

impl MetricCheck {
    pub fn passed(&self) -> bool {
        self.pitch_speed && self.exit_velocity && self.distance
    }
}

pub fn check_metrics(record: &HomeRunRecord, event: &PlayEvent, hit: &HitData, config: &MatchingConfig) -> MetricCheck {
    MetricCheck {
        pitch_speed: within(record.pitch_speed, event.pitch_speed, config.pitch_speed_tolerance),
        exit_velocity: within(record.exit_velocity, hit.launch_speed, config.exit_velocity_tolerance),
        distance: within(record.distance, hit.total_distance, config.distance_tolerance),
    }
}

/// Try to give every unresolved record of `feed`'s game a play id from the
/// feed. `claimed` holds play ids already in use and is updated. Returns how
/// many records were filled.
pub fn match_feed(
    records: &mut [HomeRunRecord],
    feed: &GameFeed,
    config: &MatchingConfig,
    claimed: &mut HashSet<String>,
) -> usize {
    let relevant: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.play_id.is_none() && r.game_pks.as_ref().is_some_and(|pks| pks.contains(feed.game_pk)))
        .map(|(i, _)| i)
        .collect();
    if relevant.is_empty() {
        return 0;
    }

    let dataset_names: Vec<_> = relevant.iter().map(|&i| names::normalize(&records[i].name)).collect();
    let mut filled = 0;

    for play in &feed.home_runs {
        let feed_name = names::normalize(&play.batter);

        for event in &play.events {
            let (Some(play_id), Some(hit)) = (&event.play_id, &event.hit) else {
                continue;
            };
            if claimed.contains(play_id) {
                continue;
            }

            for (&index, dataset_name) in relevant.iter().zip(&dataset_names) {
                let record = &records[index];
                if record.play_id.is_some() {
                    continue;
                }

                let name_match = names::compare(dataset_name, &feed_name, config.fuzzy_threshold);
                if !name_match.is_match() {
                    if name_match == NameMatch::SuffixMismatch {
                        debug!("Suffix mismatch: {} vs {}", record.name, play.batter);
                    }
                    continue;
                }

                let check = check_metrics(record, event, hit, config);
                if !check.passed() {
                    debug!(
                        "{} ({:?}) at bat {:?}: metrics disagree {:?}, dataset pitch={:?} ev={:?} dist={:?}, feed pitch={:?} ev={:?} dist={:?}",
                        record.name,
                        name_match,
                        play.at_bat_index,
                        check,
                        record.pitch_speed,
                        record.exit_velocity,
                        record.distance,
                        event.pitch_speed,
                        hit.launch_speed,
                        hit.total_distance,
                    );
                    continue;
                }

                info!(
                    "Match found: playId {} for {} in game {} ({:?}), launch angle {:?}",
                    play_id, record.name, feed.game_pk, name_match, hit.launch_angle
                );
                records[index].play_id = Some(play_id.clone());
                claimed.insert(play_id.clone());
                filled += 1;
                break;
            }
        }
    }

    filled
}

/// Matching pass over `records`, with `fetch_feed` loading one game feed.
/// Each game is fetched at most once. Once a feed fills a record, the
/// remaining candidates of the record that triggered it are not fetched.
async fn fill_play_ids<F, Fut>(records: &mut [HomeRunRecord], config: &MatchingConfig, mut fetch_feed: F) -> usize
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<GameFeed>>,
{
    let mut processed_game_pks: HashSet<u64> = HashSet::new();
    let mut claimed: HashSet<String> = records.iter().filter_map(|r| r.play_id.clone()).collect();
    let mut filled = 0;

    for index in (0..records.len()).progress_with_style(progress_style()) {
        let record = &records[index];
        if record.play_id.is_some() {
            continue;
        }
        let Some(game_pks) = record.game_pks.clone() else {
            continue;
        };

        for game_pk in game_pks.iter() {
            if processed_game_pks.contains(&game_pk) {
                continue;
            }

            let filled_now = match fetch_feed(game_pk).await {
                Ok(feed) => {
                    processed_game_pks.insert(game_pk);
                    match_feed(records, &feed, config, &mut claimed)
                }
                Err(e) => {
                    warn!("Error fetching game feed for {game_pk}: {e}");
                    0
                }
            };
            tokio::time::sleep(config.feed_delay()).await;

            filled += filled_now;
            if filled_now > 0 {
                break;
            }
        }
    }

    filled
}

/// Fill `playId` for every record that has a `gamePk` but no play id yet.
pub async fn populate_play_ids(client: &Client, dataset: &mut Dataset, config: &MatchingConfig) -> usize {
    let filled = fill_play_ids(&mut dataset.records, config, |game_pk| GameFeed::from_game_pk(client, game_pk)).await;
    info!("Finished matching: {} playIds added to {}", filled, dataset.path().display());
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::error::Error;
    use crate::model::tests::sample_feed;
    use crate::record::GamePks;
    use chrono::NaiveDate;

    fn judge() -> HomeRunRecord {
        let mut record = HomeRunRecord::new("Aaron Judge", NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(), "NYY", "ARI");
        record.pitch_speed = Some(95.1);
        record.exit_velocity = Some(112.3);
        record.distance = Some(441.0);
        record.game_pks = GamePks::new(vec![778001]);
        record
    }

    fn feed() -> GameFeed {
        GameFeed::from_value(778001, &sample_feed()).unwrap()
    }

    #[test]
    fn assigns_batted_ball_event() {
        let mut records = vec![judge()];
        let mut claimed = HashSet::new();
        let filled = match_feed(&mut records, &feed(), &MatchingConfig::default(), &mut claimed);

        assert_eq!(filled, 1);
        assert_eq!(records[0].play_id.as_deref(), Some("judge-3"));
        assert!(claimed.contains("judge-3"));
    }

    #[test]
    fn accented_and_reordered_name_still_matches() {
        let mut record = judge();
        record.name = "Judge, Aarón".to_string();
        let mut records = vec![record];
        match_feed(&mut records, &feed(), &MatchingConfig::default(), &mut HashSet::new());
        assert_eq!(records[0].play_id.as_deref(), Some("judge-3"));
    }

    #[test]
    fn distance_outside_tolerance_is_rejected() {
        let mut record = judge();
        record.distance = Some(449.0);
        let mut records = vec![record];
        let filled = match_feed(&mut records, &feed(), &MatchingConfig::default(), &mut HashSet::new());
        assert_eq!(filled, 0);
        assert_eq!(records[0].play_id, None);
    }

    #[test]
    fn metric_missing_from_feed_passes() {
        let record = judge();
        let event = PlayEvent {
            play_id: Some("p".to_string()),
            pitch_speed: None,
            hit: None,
        };
        let hit = HitData {
            launch_speed: Some(112.0),
            total_distance: None,
            launch_angle: None,
        };
        let check = check_metrics(&record, &event, &hit, &MatchingConfig::default());
        assert!(check.passed());

        let mut blank = judge();
        blank.exit_velocity = None;
        assert!(!check_metrics(&blank, &event, &hit, &MatchingConfig::default()).exit_velocity);
    }

    #[test]
    fn play_id_is_not_assigned_twice() {
        let mut records = vec![judge(), judge()];
        let filled = match_feed(&mut records, &feed(), &MatchingConfig::default(), &mut HashSet::new());
        assert_eq!(filled, 1);
        assert_eq!(records[0].play_id.as_deref(), Some("judge-3"));
        assert_eq!(records[1].play_id, None);
    }

    #[test]
    fn other_games_and_resolved_records_are_untouched() {
        let mut other_game = judge();
        other_game.game_pks = GamePks::new(vec![778999]);
        let mut resolved = judge();
        resolved.play_id = Some("already".to_string());
        let mut records = vec![other_game, resolved];
        let before = records.clone();

        let filled = match_feed(&mut records, &feed(), &MatchingConfig::default(), &mut HashSet::new());
        assert_eq!(filled, 0);
        assert_eq!(records, before);
    }

    #[test]
    fn different_batter_is_not_matched() {
        let mut record = judge();
        record.name = "Giancarlo Stanton".to_string();
        let mut records = vec![record];
        assert_eq!(match_feed(&mut records, &feed(), &MatchingConfig::default(), &mut HashSet::new()), 0);
    }

    fn feed_for(game_pk: u64) -> GameFeed {
        GameFeed::from_value(game_pk, &sample_feed()).unwrap()
    }

    fn no_delay() -> MatchingConfig {
        MatchingConfig {
            feed_delay_ms: 0,
            ..MatchingConfig::default()
        }
    }

    fn doubleheader(mut record: HomeRunRecord) -> HomeRunRecord {
        record.game_pks = GamePks::new(vec![9, 10]);
        record
    }

    fn stanton() -> HomeRunRecord {
        let mut record = judge();
        record.name = "Giancarlo Stanton".to_string();
        record
    }

    #[tokio::test]
    async fn resolved_dataset_fetches_nothing() {
        let mut first = judge();
        first.play_id = Some("judge-3".to_string());
        let mut second = doubleheader(stanton());
        second.play_id = Some("stanton-1".to_string());
        let mut records = vec![first, second];
        let before = records.clone();
        let fetched = RefCell::new(Vec::new());

        let filled = fill_play_ids(&mut records, &no_delay(), |game_pk| {
            fetched.borrow_mut().push(game_pk);
            async move { Ok::<_, Error>(feed_for(game_pk)) }
        })
        .await;

        assert_eq!(filled, 0);
        assert!(fetched.borrow().is_empty());
        assert_eq!(records, before);
    }

    #[tokio::test]
    async fn stops_once_the_record_is_filled() {
        let mut records = vec![doubleheader(judge())];
        let fetched = RefCell::new(Vec::new());

        let filled = fill_play_ids(&mut records, &no_delay(), |game_pk| {
            fetched.borrow_mut().push(game_pk);
            async move { Ok::<_, Error>(feed_for(game_pk)) }
        })
        .await;

        assert_eq!(filled, 1);
        assert_eq!(*fetched.borrow(), vec![9]);
        assert_eq!(records[0].play_id.as_deref(), Some("judge-3"));
    }

    #[tokio::test]
    async fn row_resolved_earlier_does_not_block_second_game() {
        // game 9's home run was matched on an earlier run
        let mut resolved = doubleheader(judge());
        resolved.play_id = Some("judge-9".to_string());
        let mut records = vec![resolved, doubleheader(judge())];
        let fetched = RefCell::new(Vec::new());

        let filled = fill_play_ids(&mut records, &no_delay(), |game_pk| {
            fetched.borrow_mut().push(game_pk);
            async move {
                let mut feed = feed_for(game_pk);
                if game_pk == 9 {
                    feed.home_runs.clear();
                }
                Ok::<_, Error>(feed)
            }
        })
        .await;

        assert_eq!(*fetched.borrow(), vec![9, 10]);
        assert_eq!(filled, 1);
        assert_eq!(records[1].play_id.as_deref(), Some("judge-3"));
    }

    #[tokio::test]
    async fn failed_fetch_moves_on_to_next_candidate() {
        let mut records = vec![doubleheader(judge())];
        let fetched = RefCell::new(Vec::new());

        let filled = fill_play_ids(&mut records, &no_delay(), |game_pk| {
            fetched.borrow_mut().push(game_pk);
            async move {
                if game_pk == 9 {
                    Err(Error::Parse("connection reset".to_string()))
                } else {
                    Ok(feed_for(game_pk))
                }
            }
        })
        .await;

        assert_eq!(*fetched.borrow(), vec![9, 10]);
        assert_eq!(filled, 1);
        assert_eq!(records[0].play_id.as_deref(), Some("judge-3"));
    }

    #[tokio::test]
    async fn each_game_is_fetched_once() {
        let mut other = stanton();
        other.name = "Anthony Volpe".to_string();
        let mut records = vec![doubleheader(stanton()), doubleheader(other)];
        let fetched = RefCell::new(Vec::new());

        let filled = fill_play_ids(&mut records, &no_delay(), |game_pk| {
            fetched.borrow_mut().push(game_pk);
            async move { Ok::<_, Error>(feed_for(game_pk)) }
        })
        .await;

        assert_eq!(filled, 0);
        assert_eq!(*fetched.borrow(), vec![9, 10]);
    }
}
