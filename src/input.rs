use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::debug;
use serde::Deserialize;

use crate::error::EngineResult;
use crate::models::ActivityRecord;

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "id_agente")]
    agent_id: i64,
    #[serde(default, alias = "nombre_usuario_agente")]
    agent_name: String,
    #[serde(default, alias = "creado")]
    created: Option<String>,
    #[serde(alias = "jugador_id")]
    player_id: String,
    #[serde(default, alias = "calculo_ngr")]
    ngr: Option<f64>,
    #[serde(default, alias = "calculo_comision")]
    commission: Option<f64>,
    #[serde(default, alias = "num_depositos")]
    deposit_count: Option<f64>,
    #[serde(default, alias = "num_retiros")]
    withdrawal_count: Option<f64>,
    #[serde(default, alias = "total_depositos")]
    deposit_total: Option<f64>,
    #[serde(default, alias = "total_retiros")]
    withdrawal_total: Option<f64>,
    #[serde(default)]
    casino_ggr: Option<f64>,
    #[serde(default, alias = "apuestas_deportivas_ggr")]
    sportsbook_ggr: Option<f64>,
}

impl From<CsvRow> for ActivityRecord {
    fn from(row: CsvRow) -> Self {
        ActivityRecord {
            agent_id: row.agent_id,
            agent_name: row.agent_name,
            created: row.created.as_deref().and_then(parse_timestamp),
            player_id: row.player_id,
            ngr: row.ngr.unwrap_or(0.0),
            commission: row.commission.unwrap_or(0.0),
            deposit_count: row.deposit_count.unwrap_or(0.0),
            withdrawal_count: row.withdrawal_count.unwrap_or(0.0),
            deposit_total: row.deposit_total.unwrap_or(0.0),
            withdrawal_total: row.withdrawal_total.unwrap_or(0.0),
            casino_ggr: row.casino_ggr.unwrap_or(0.0),
            sportsbook_ggr: row.sportsbook_ggr.unwrap_or(0.0),
        }
    }
}

pub fn load_records(csv_path: &Path) -> EngineResult<Vec<ActivityRecord>> {
    let file = std::fs::File::open(csv_path)?;
    read_records(file)
}

pub fn read_records<R: Read>(source: R) -> EngineResult<Vec<ActivityRecord>> {
    let mut reader = csv::Reader::from_reader(source);
    let mut records = Vec::new();

    for result in reader.deserialize::<CsvRow>() {
        records.push(ActivityRecord::from(result?));
    }

    debug!("loaded {} activity records", records.len());
    Ok(records)
}

/// Lenient timestamp parsing; `None` when no known format matches.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
