//! Baseball Savant pages: the statcast search results table and the
//! per-play video page.

use chrono::{Datelike, NaiveDate};
use scraper::{ElementRef, Html, Selector};

use crate::error::{Error, Result};

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Parse(format!("bad selector {css}: {e:?}")))
}

fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Search for every regular-season home run on `date`, grouped by
/// player-event, with pitch speed, exit velocity, launch angle and distance.
pub fn search_url(date: NaiveDate) -> String {
    let day = date.format("%Y-%m-%d");
    let season = date.year();
    format!(
        "https://baseballsavant.mlb.com/statcast_search?hfPT=&hfAB=home%5C.%5C.run%7C&hfGT=R%7C&hfPR=&hfZ=&hfStadium=&hfBBL=&hfNewZones=&hfPull=&hfC=&hfSea={season}%7C&hfSit=&player_type=batter&hfOuts=&hfOpponent=&pitcher_throws=&batter_stands=&hfSA=&game_date_gt={day}&game_date_lt={day}&hfMo=&hfTeam=&home_road=&hfRO=&position=&hfInfield=&hfOutfield=&hfInn=&hfBBT=&hfFlag=&metric_1=&group_by=name-event&min_pitches=0&min_results=0&min_pas=0&sort_col=pitches&player_event_sort=api_h_launch_speed&sort_order=desc&chk_event_release_speed=on&chk_event_launch_speed=on&chk_event_launch_angle=on&chk_event_hit_distance_sc=on#results"
    )
}

pub fn play_page_url(play_id: &str) -> String {
    format!("https://baseballsavant.mlb.com/sporty-videos?playId={play_id}")
}

/// A parsed `table#search_results`: the header cells (when the table has a
/// `thead`) and the non-blank body rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsTable {
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

/// `Ok(None)` when the page has no results table at all.
pub fn parse_results_table(html: &str) -> Result<Option<ResultsTable>> {
    let document = Html::parse_document(html);
    let table_selector = selector("table#search_results")?;
    let header_selector = selector("thead th")?;
    let row_selector = selector("tbody tr")?;
    let cell_selector = selector("td")?;

    let Some(table) = document.select(&table_selector).next() else {
        return Ok(None);
    };

    let header: Vec<String> = table.select(&header_selector).map(text_of).collect();
    let header = if header.is_empty() { None } else { Some(header) };

    let rows = table
        .select(&row_selector)
        .map(|tr| tr.select(&cell_selector).map(text_of).collect::<Vec<_>>())
        .filter(|cells| !cells.iter().all(|cell| cell.is_empty()))
        .collect();

    Ok(Some(ResultsTable { header, rows }))
}

/// The `x` of the "x/30 parks" badge on a play page.
pub fn parse_park_count(html: &str) -> Result<Option<u8>> {
    let document = Html::parse_document(html);
    let span_selector = selector("span#hr-x-parks-listener")?;

    let Some(span) = document.select(&span_selector).next() else {
        return Ok(None);
    };
    let text = text_of(span);
    let count = text
        .split('/')
        .next()
        .unwrap_or("")
        .trim()
        .parse::<u8>()
        .map_err(|_| Error::Parse(format!("unreadable park count \"{text}\"")))?;
    if count > 30 {
        return Err(Error::Parse(format!("park count out of range: {count}")));
    }

    Ok(Some(count))
}

/// The first `<video><source src=...>` on a play page.
pub fn parse_video_url(html: &str) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    let source_selector = selector("video source")?;

    Ok(document
        .select(&source_selector)
        .find_map(|source| source.value().attr("src"))
        .map(|src| src.trim().to_string())
        .filter(|src| !src.is_empty()))
}
