//! The home-run dataset: a typed view over the CSV file every job reads and
//! rewrites.

use std::fmt;
use std::fs::{rename, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::{debug, warn};

use crate::error::{Error, Result};

pub const NAME: &str = "Name";
pub const DATE: &str = "Date";
pub const TEAM: &str = "Team";
pub const OPPONENT: &str = "Vs.";
pub const EXIT_VELOCITY: &str = "EV (MPH)";
pub const LAUNCH_ANGLE: &str = "LA (deg)";
pub const DISTANCE: &str = "Dist (ft)";
pub const PITCH_SPEED: &str = "Pitch (MPH)";
pub const GAME_PK: &str = "gamePk";
pub const PLAY_ID: &str = "playId";
pub const PARK_COUNT: &str = "x/30 ballparks";
pub const VIDEO: &str = "video";

const NAME_ALIASES: [&str; 2] = [NAME, "Player"];

/// One or more candidate game identifiers. More than one means the schedule
/// had several games for the same date and teams (a doubleheader).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamePks(Vec<u64>);

impl GamePks {
    pub fn new(pks: Vec<u64>) -> Option<Self> {
        if pks.is_empty() {
            None
        } else {
            Some(Self(pks))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.iter().copied()
    }

    pub fn contains(&self, game_pk: u64) -> bool {
        self.0.contains(&game_pk)
    }
}

impl fmt::Display for GamePks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.0.iter().map(|pk| pk.to_string()).collect::<Vec<_>>().join("|");
        write!(f, "{joined}")
    }
}

impl FromStr for GamePks {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let pks = s
            .split('|')
            .map(|part| {
                let part = part.trim();
                // spreadsheets like to turn 777123 into 777123.0
                let part = part.strip_suffix(".0").unwrap_or(part);
                part.parse::<u64>()
                    .map_err(|_| Error::Parse(format!("invalid game id \"{part}\"")))
            })
            .collect::<Result<Vec<_>>>()?;

        GamePks::new(pks).ok_or_else(|| Error::Parse("empty game id list".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HomeRunRecord {
    pub name: String,
    pub date: NaiveDate,
    pub team: String,
    pub opponent: String,
    pub exit_velocity: Option<f64>,
    pub launch_angle: Option<f64>,
    pub distance: Option<f64>,
    pub pitch_speed: Option<f64>,
    pub game_pks: Option<GamePks>,
    pub play_id: Option<String>,
    pub park_count: Option<u8>,
    pub video: Option<String>,
    /// Original cells, so columns this crate does not know survive a rewrite.
    raw: StringRecord,
}

/// Column positions resolved from the header row.
#[derive(Debug, Clone)]
struct Schema {
    name: usize,
    date: usize,
    team: usize,
    opponent: usize,
    exit_velocity: usize,
    launch_angle: usize,
    distance: usize,
    pitch_speed: usize,
    game_pk: Option<usize>,
    play_id: Option<usize>,
    park_count: Option<usize>,
    video: Option<usize>,
}

impl Schema {
    fn resolve(headers: &StringRecord, path: &str) -> Result<Self> {
        let find = |column: &str| headers.iter().position(|h| h.trim() == column);
        let require = |column: &'static str| {
            find(column).ok_or_else(|| Error::MissingColumn {
                path: path.to_string(),
                column,
            })
        };

        let name = NAME_ALIASES
            .iter()
            .find_map(|&alias| find(alias))
            .ok_or_else(|| Error::MissingColumn {
                path: path.to_string(),
                column: NAME,
            })?;

        Ok(Self {
            name,
            date: require(DATE)?,
            team: require(TEAM)?,
            opponent: require(OPPONENT)?,
            exit_velocity: require(EXIT_VELOCITY)?,
            launch_angle: require(LAUNCH_ANGLE)?,
            distance: require(DISTANCE)?,
            pitch_speed: require(PITCH_SPEED)?,
            game_pk: find(GAME_PK),
            play_id: find(PLAY_ID),
            park_count: find(PARK_COUNT),
            video: find(VIDEO),
        })
    }
}

fn cell(record: &StringRecord, index: usize) -> &str {
    record.get(index).map(str::trim).unwrap_or("")
}

fn optional_cell(record: &StringRecord, index: Option<usize>) -> Option<&str> {
    index.map(|i| cell(record, i)).filter(|value| !value.is_empty() && *value != "nan")
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let date_part = value.split_whitespace().next().unwrap_or("");
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%m/%d/%Y"))
        .ok()
}

impl HomeRunRecord {
    fn from_row(raw: StringRecord, schema: &Schema, path: &str, row: usize) -> Result<Self> {
        let invalid = |message: String| Error::InvalidRow {
            path: path.to_string(),
            row,
            message,
        };

        let date_cell = cell(&raw, schema.date);
        let date = parse_date(date_cell).ok_or_else(|| invalid(format!("invalid date \"{date_cell}\"")))?;

        let metric = |index: usize, column: &str| -> Option<f64> {
            let value = cell(&raw, index);
            if value.is_empty() {
                return None;
            }
            match value.parse::<f64>() {
                Ok(v) if v.is_finite() => Some(v),
                _ => {
                    warn!("{path}, row {row}: unreadable {column} \"{value}\"");
                    None
                }
            }
        };

        let game_pks = optional_cell(&raw, schema.game_pk).and_then(|value| match value.parse::<GamePks>() {
            Ok(pks) => Some(pks),
            Err(e) => {
                warn!("{path}, row {row}: {e}");
                None
            }
        });

        let park_count = optional_cell(&raw, schema.park_count).and_then(|value| {
            let value = value.strip_suffix(".0").unwrap_or(value);
            match value.parse::<u8>() {
                Ok(count) if count <= 30 => Some(count),
                _ => {
                    warn!("{path}, row {row}: unreadable {PARK_COUNT} \"{value}\"");
                    None
                }
            }
        });

        Ok(Self {
            name: cell(&raw, schema.name).to_string(),
            date,
            team: cell(&raw, schema.team).to_string(),
            opponent: cell(&raw, schema.opponent).to_string(),
            exit_velocity: metric(schema.exit_velocity, EXIT_VELOCITY),
            launch_angle: metric(schema.launch_angle, LAUNCH_ANGLE),
            distance: metric(schema.distance, DISTANCE),
            pitch_speed: metric(schema.pitch_speed, PITCH_SPEED),
            game_pks,
            play_id: optional_cell(&raw, schema.play_id).map(str::to_string),
            park_count,
            video: optional_cell(&raw, schema.video).map(str::to_string),
            raw,
        })
    }

    /// Cells in the loaded row past the first `width`.
    fn cells_beyond(&self, width: usize) -> usize {
        self.raw.len().saturating_sub(width)
    }

    #[cfg(test)]
    pub fn new(name: &str, date: NaiveDate, team: &str, opponent: &str) -> Self {
        Self {
            name: name.to_string(),
            date,
            team: team.to_string(),
            opponent: opponent.to_string(),
            exit_velocity: None,
            launch_angle: None,
            distance: None,
            pitch_speed: None,
            game_pks: None,
            play_id: None,
            park_count: None,
            video: None,
            raw: StringRecord::new(),
        }
    }
}

fn format_metric(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// The whole dataset file, held in memory for one job run.
#[derive(Debug, Clone)]
pub struct Dataset {
    path: PathBuf,
    headers: StringRecord,
    schema: Schema,
    pub records: Vec<HomeRunRecord>,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(path.display().to_string()));
        }
        let file = File::open(path)?;
        Self::from_reader(file, path)
    }

    fn from_reader<R: std::io::Read>(rdr: R, path: &Path) -> Result<Self> {
        let source = path.display().to_string();
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
        let headers = reader.headers()?.clone();
        let schema = Schema::resolve(&headers, &source)?;

        let mut records = Vec::new();
        for (i, result) in reader.records().enumerate() {
            // header is line 1
            let row = i + 2;
            records.push(HomeRunRecord::from_row(result?, &schema, &source, row)?);
        }
        debug!("Loaded {} records from {}", records.len(), source);

        Ok(Self {
            path: path.to_path_buf(),
            headers,
            schema,
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Headers plus any enrichment columns the file did not have yet.
    fn output_schema(&self) -> (StringRecord, Schema) {
        let mut headers = self.headers.clone();
        let mut schema = self.schema.clone();

        for (column, slot) in [
            (GAME_PK, &mut schema.game_pk),
            (PLAY_ID, &mut schema.play_id),
            (PARK_COUNT, &mut schema.park_count),
            (VIDEO, &mut schema.video),
        ] {
            if slot.is_none() {
                *slot = Some(headers.len());
                headers.push_field(column);
            }
        }

        (headers, schema)
    }

    fn row_fields(record: &HomeRunRecord, schema: &Schema, width: usize) -> Vec<String> {
        let extra = record.cells_beyond(width);
        if extra > 0 {
            warn!(
                "{} on {}: dropping {} cells beyond the header",
                record.name, record.date, extra
            );
        }

        let mut fields: Vec<String> = (0..width)
            .map(|i| record.raw.get(i).unwrap_or("").to_string())
            .collect();

        let mut set = |index: Option<usize>, value: String| {
            if let Some(i) = index {
                fields[i] = value;
            }
        };
        set(Some(schema.name), record.name.clone());
        set(Some(schema.date), record.date.format("%Y-%m-%d").to_string());
        set(Some(schema.team), record.team.clone());
        set(Some(schema.opponent), record.opponent.clone());
        // metrics loaded from the file are written back as they were
        if record.raw.is_empty() {
            set(Some(schema.exit_velocity), format_metric(record.exit_velocity));
            set(Some(schema.launch_angle), format_metric(record.launch_angle));
            set(Some(schema.distance), format_metric(record.distance));
            set(Some(schema.pitch_speed), format_metric(record.pitch_speed));
        }
        set(schema.game_pk, record.game_pks.as_ref().map(|p| p.to_string()).unwrap_or_default());
        set(schema.play_id, record.play_id.clone().unwrap_or_default());
        set(schema.park_count, record.park_count.map(|c| c.to_string()).unwrap_or_default());
        set(schema.video, record.video.clone().unwrap_or_default());

        fields
    }

    fn write_to<W: std::io::Write>(&self, wtr: W) -> Result<()> {
        let (headers, schema) = self.output_schema();
        let mut writer = csv::Writer::from_writer(wtr);
        writer.write_record(&headers)?;
        for record in &self.records {
            writer.write_record(Self::row_fields(record, &schema, headers.len()))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the dataset back to where it was loaded from. The file is
    /// replaced in one rename, so an interrupted save leaves the old file.
    pub fn save(&self) -> Result<()> {
        let temp_path = self.path.with_extension("csv.tmp");
        {
            let file = File::create(&temp_path)?;
            self.write_to(file)?;
        }
        rename(&temp_path, &self.path)?;
        debug!("Saved {} records to {}", self.records.len(), self.path.display());
        Ok(())
    }
}

/// Write scraped rows as a fresh dataset; the first row is the header.
pub fn write_raw_table(path: &Path, rows: &[Vec<String>]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let temp_path = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&temp_path)?;
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    rename(&temp_path, path)?;
    Ok(())
}
