//! Season schedule: downloading it from the stats API and joining home runs
//! to their `gamePk` by date and team pair.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use indicatif::ProgressIterator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::progress::progress_style;
use crate::record::{Dataset, GamePks};

// dataset team code -> full name as the stats API spells it
const TEAMS: [(&str, &str); 38] = [
    ("BAL", "Baltimore Orioles"),
    ("BOS", "Boston Red Sox"),
    ("NYY", "New York Yankees"),
    ("TB", "Tampa Bay Rays"),
    ("TBR", "Tampa Bay Rays"),
    ("TOR", "Toronto Blue Jays"),
    ("CWS", "Chicago White Sox"),
    ("CHW", "Chicago White Sox"),
    ("CLE", "Cleveland Guardians"),
    ("DET", "Detroit Tigers"),
    ("KC", "Kansas City Royals"),
    ("KCR", "Kansas City Royals"),
    ("MIN", "Minnesota Twins"),
    ("HOU", "Houston Astros"),
    ("LAA", "Los Angeles Angels"),
    ("ATH", "Athletics"),
    ("OAK", "Athletics"),
    ("SEA", "Seattle Mariners"),
    ("TEX", "Texas Rangers"),
    ("ATL", "Atlanta Braves"),
    ("MIA", "Miami Marlins"),
    ("NYM", "New York Mets"),
    ("PHI", "Philadelphia Phillies"),
    ("WSH", "Washington Nationals"),
    ("WSN", "Washington Nationals"),
    ("CHC", "Chicago Cubs"),
    ("CIN", "Cincinnati Reds"),
    ("MIL", "Milwaukee Brewers"),
    ("PIT", "Pittsburgh Pirates"),
    ("STL", "St. Louis Cardinals"),
    ("AZ", "Arizona Diamondbacks"),
    ("ARI", "Arizona Diamondbacks"),
    ("COL", "Colorado Rockies"),
    ("LAD", "Los Angeles Dodgers"),
    ("SD", "San Diego Padres"),
    ("SDP", "San Diego Padres"),
    ("SF", "San Francisco Giants"),
    ("SFG", "San Francisco Giants"),
];

pub fn team_full_name(code: &str) -> Option<&'static str> {
    let code = code.trim().to_uppercase();
    TEAMS.iter().find(|(abbr, _)| *abbr == code).map(|(_, name)| *name)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledGame {
    pub date: NaiveDate,
    #[serde(rename = "homeTeam")]
    pub home_team: String,
    #[serde(rename = "awayTeam")]
    pub away_team: String,
    #[serde(rename = "gamePk")]
    pub game_pk: u64,
}

impl ScheduledGame {
    /// Parse one entry of `dates[].games[]` from the schedule endpoint.
    fn from_value(value: &Value) -> Result<Self> {
        let game_pk = value["gamePk"]
            .as_u64()
            .ok_or_else(|| Error::Parse("No gamePk".to_string()))?;
        let date = match value["officialDate"].as_str() {
            Some(date) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|e| Error::Parse(format!("game {game_pk}: bad officialDate: {e}")))?,
            None => return Err(Error::Parse(format!("game {game_pk}: No officialDate"))),
        };
        let home_team = match value["teams"]["home"]["team"]["name"].as_str() {
            Some(name) => name.to_string(),
            None => return Err(Error::Parse(format!("game {game_pk}: No home team"))),
        };
        let away_team = match value["teams"]["away"]["team"]["name"].as_str() {
            Some(name) => name.to_string(),
            None => return Err(Error::Parse(format!("game {game_pk}: No away team"))),
        };

        Ok(Self {
            date,
            home_team,
            away_team,
            game_pk,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schedule {
    by_date: HashMap<NaiveDate, Vec<ScheduledGame>>,
}

impl Schedule {
    pub fn new(games: Vec<ScheduledGame>) -> Self {
        let mut by_date: HashMap<NaiveDate, Vec<ScheduledGame>> = HashMap::new();
        for game in games {
            by_date.entry(game.date).or_default().push(game);
        }
        Self { by_date }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(path.display().to_string()));
        }
        let mut reader = csv::Reader::from_path(path)?;
        let games = reader
            .deserialize::<ScheduledGame>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!("Loaded {} scheduled games from {}", games.len(), path.display());
        Ok(Self::new(games))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut games: Vec<&ScheduledGame> = self.by_date.values().flatten().collect();
        games.sort_by_key(|game| (game.date, game.game_pk));

        let mut writer = csv::Writer::from_path(path)?;
        for game in games {
            writer.serialize(game)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.by_date.values().map(Vec::len).sum()
    }

    /// All games on `date` between the two teams, in either home/away order.
    pub fn lookup(&self, date: NaiveDate, team: &str, opponent: &str) -> Option<GamePks> {
        let games = self.by_date.get(&date)?;
        let pks = games
            .iter()
            .filter(|game| {
                (game.home_team == team && game.away_team == opponent)
                    || (game.home_team == opponent && game.away_team == team)
            })
            .map(|game| game.game_pk)
            .collect();
        GamePks::new(pks)
    }

    /// Download the regular-season schedule for `season`.
    pub async fn fetch(client: &Client, season: i32) -> Result<Self> {
        let url = format!("https://statsapi.mlb.com/api/v1/schedule?sportId=1&season={season}&gameType=R");
        info!("Getting schedule: {url}");
        let schedule = client.get_json(&url).await?;
        let dates = schedule["dates"]
            .as_array()
            .ok_or_else(|| Error::Parse("schedule has no dates".to_string()))?;

        let mut games = Vec::new();
        for date in dates {
            let Some(games_data) = date["games"].as_array() else {
                continue;
            };
            for game_data in games_data {
                // postponed games show up again on their makeup date
                if game_data["status"]["detailedState"].as_str() == Some("Postponed") {
                    continue;
                }
                match ScheduledGame::from_value(game_data) {
                    Ok(game) => games.push(game),
                    Err(e) => warn!("Skipping schedule entry: {e}"),
                }
            }
        }

        info!("Fetched {} games for {season}", games.len());
        Ok(Self::new(games))
    }
}

/// Fill `gamePk` for every record that lacks one. Returns how many were filled.
pub fn populate_game_pks(dataset: &mut Dataset, schedule: &Schedule) -> usize {
    let mut populated = 0;

    for record in dataset.records.iter_mut().progress_with_style(progress_style()) {
        if record.game_pks.is_some() {
            continue;
        }

        let (Some(team), Some(opponent)) = (team_full_name(&record.team), team_full_name(&record.opponent)) else {
            warn!(
                "Unknown team code for HR on {} ({} vs {})",
                record.date, record.team, record.opponent
            );
            continue;
        };

        match schedule.lookup(record.date, team, opponent) {
            Some(pks) => {
                debug!(
                    "Populated gamePk for HR on {} ({} vs {}) with: {}",
                    record.date, record.team, record.opponent, pks
                );
                record.game_pks = Some(pks);
                populated += 1;
            }
            None => warn!(
                "Could not find gamePk in schedule for HR on {} ({} vs {})",
                record.date, record.team, record.opponent
            ),
        }
    }

    info!("Processed {} home runs, populated {} gamePk values", dataset.len(), populated);
    populated
}
