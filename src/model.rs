//! The parts of the stats API live game feed the play matcher needs.

use serde_json::Value;
use tracing::debug;

use crate::client::Client;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitData {
    pub launch_speed: Option<f64>,
    pub total_distance: Option<f64>,
    pub launch_angle: Option<f64>,
}

impl HitData {
    /// `None` when the event has no (or an empty) `hitData` object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let hit_data = value.as_object()?;
        if hit_data.is_empty() {
            return None;
        }

        Some(Self {
            launch_speed: number(&value["launchSpeed"]),
            total_distance: number(&value["totalDistance"]),
            launch_angle: number(&value["launchAngle"]),
        })
    }
}

/// The feed sometimes sends numbers as strings.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// One pitch of a plate appearance.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayEvent {
    pub play_id: Option<String>,
    pub pitch_speed: Option<f64>,
    pub hit: Option<HitData>,
}

impl PlayEvent {
    pub fn from_value(value: &Value) -> Self {
        Self {
            play_id: value["playId"].as_str().filter(|id| !id.is_empty()).map(str::to_string),
            pitch_speed: number(&value["pitchData"]["startSpeed"]),
            hit: HitData::from_value(&value["hitData"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HomeRunPlay {
    pub batter: String,
    pub at_bat_index: Option<u64>,
    pub events: Vec<PlayEvent>,
}

impl HomeRunPlay {
    fn from_value(value: &Value) -> Result<Self> {
        let batter = match value["matchup"]["batter"]["fullName"].as_str() {
            Some(batter) => batter.to_string(),
            None => return Err(Error::Parse("No batter".to_string())),
        };
        let events = match value["playEvents"].as_array() {
            Some(events) => events.iter().map(PlayEvent::from_value).collect(),
            None => Vec::new(),
        };

        Ok(Self {
            batter,
            at_bat_index: value["about"]["atBatIndex"].as_u64(),
            events,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameFeed {
    pub game_pk: u64,
    pub home_runs: Vec<HomeRunPlay>,
}

impl GameFeed {
    pub fn from_value(game_pk: u64, game_data: &Value) -> Result<Self> {
        let feed_error = |message: &str| Error::Feed {
            game_pk,
            message: message.to_string(),
        };

        let plays_data = game_data["liveData"]["plays"]["allPlays"]
            .as_array()
            .ok_or_else(|| feed_error("no liveData.plays.allPlays"))?;

        let mut home_runs = Vec::new();
        for play in plays_data {
            if play["result"]["eventType"].as_str() != Some("home_run") {
                continue;
            }
            let home_run = HomeRunPlay::from_value(play).map_err(|e| feed_error(&e.to_string()))?;
            home_runs.push(home_run);
        }

        Ok(Self { game_pk, home_runs })
    }

    pub async fn from_game_pk(client: &Client, game_pk: u64) -> Result<Self> {
        let url = format!("https://statsapi.mlb.com/api/v1.1/game/{game_pk}/feed/live");
        debug!("Getting game: {url}");
        let game_data = client.get_json(&url).await?;
        Self::from_value(game_pk, &game_data)
    }
}
