//! Trade-history ingestion: JSON arrays, JSON Lines, or flat CSV.
//!
//! The engine itself never does I/O; this is the boundary where a provider's
//! export is turned into an immutable `Vec<TradeRecord>` snapshot.
//!
//! Records are decoded one at a time. A record that cannot be decoded (an
//! unknown asset type, a bad timestamp) is left out with a `load` warning;
//! only an unreadable file or a broken container fails the load.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{AnalysisStage, RecordIssue, RecordWarning, TradeId, TradeRecord};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read trade history {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON trade history: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid CSV trade history: {0}")]
    Csv(#[from] csv::Error),
    #[error("unsupported trade history format '{0}' (expected .json, .jsonl or .csv)")]
    UnsupportedFormat(String),
}

/// On-disk layout of a trade history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeFormat {
    /// A single JSON array of records.
    Json,
    /// One JSON record per line; blank lines are skipped.
    JsonLines,
    /// Header row plus one record per row; empty cells are missing values.
    Csv,
}

impl TradeFormat {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(Self::Json),
            "jsonl" | "ndjson" => Ok(Self::JsonLines),
            "csv" => Ok(Self::Csv),
            _ => Err(LoadError::UnsupportedFormat(ext)),
        }
    }
}

/// Decoded records plus one `load` warning per record left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeHistory {
    pub trades: Vec<TradeRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<RecordWarning>,
}

/// A record that did not decode, with its id when one could be read.
struct Rejected {
    id: Option<String>,
    position: usize,
}

impl TradeHistory {
    fn push(&mut self, decoded: Result<TradeRecord, Rejected>) {
        match decoded {
            Ok(trade) => self.trades.push(trade),
            Err(Rejected { id, position }) => {
                let id = TradeId::new(id.unwrap_or_else(|| format!("record-{position}")));
                self.warnings.push(RecordWarning::new(
                    &id,
                    AnalysisStage::Load,
                    RecordIssue::Malformed { position },
                ));
            }
        }
    }
}

/// Load a trade history, inferring the format from the extension.
pub fn load_trades(path: &Path) -> Result<TradeHistory, LoadError> {
    let format = TradeFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let history = parse_trades(&content, format)?;
    debug!(count = history.trades.len(), path = %path.display(), "loaded trade history");
    Ok(history)
}

/// Parse a trade history already held in memory.
pub fn parse_trades(content: &str, format: TradeFormat) -> Result<TradeHistory, LoadError> {
    let history = match format {
        TradeFormat::Json => parse_json_array(content)?,
        TradeFormat::JsonLines => parse_json_lines(content),
        TradeFormat::Csv => parse_csv(content.as_bytes())?,
    };
    if !history.warnings.is_empty() {
        warn!(
            skipped = history.warnings.len(),
            loaded = history.trades.len(),
            "malformed trade records left out of the batch"
        );
    }
    Ok(history)
}

fn decode_value(value: serde_json::Value, position: usize) -> Result<TradeRecord, Rejected> {
    let id = value.get("id").and_then(|v| v.as_str()).map(str::to_string);
    serde_json::from_value(value).map_err(|e| {
        debug!(position, error = %e, "undecodable trade record");
        Rejected { id, position }
    })
}

fn parse_json_array(content: &str) -> Result<TradeHistory, LoadError> {
    let values: Vec<serde_json::Value> = serde_json::from_str(content)?;
    let mut history = TradeHistory::default();
    for (i, value) in values.into_iter().enumerate() {
        history.push(decode_value(value, i + 1));
    }
    Ok(history)
}

fn parse_json_lines(content: &str) -> TradeHistory {
    let mut history = TradeHistory::default();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let decoded = match serde_json::from_str::<serde_json::Value>(line) {
            Ok(value) => decode_value(value, i + 1),
            Err(e) => {
                debug!(line = i + 1, error = %e, "unparseable JSON line");
                Err(Rejected {
                    id: None,
                    position: i + 1,
                })
            }
        };
        history.push(decoded);
    }
    history
}

/// Parse CSV from any reader.
///
/// Rows with missing or extra cells, or cells that do not decode, become
/// `load` warnings. I/O and encoding failures still fail the whole load.
pub fn parse_csv<R: Read>(reader: R) -> Result<TradeHistory, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    let id_column = headers.iter().position(|h| h == "id");

    let mut history = TradeHistory::default();
    for row in rdr.records() {
        let record = row?;
        let position = record.position().map_or(0, |p| p.line() as usize);
        let decoded = if record.len() == headers.len() {
            record.deserialize::<TradeRecord>(Some(&headers)).map_err(|e| {
                debug!(position, error = %e, "undecodable CSV row");
            })
        } else {
            debug!(position, cells = record.len(), "CSV row with wrong cell count");
            Err(())
        };
        let id = id_column
            .and_then(|c| record.get(c))
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        history.push(decoded.map_err(|()| Rejected { id, position }));
    }
    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, ResolutionState};

    const CSV: &str = "\
id,symbol,asset_type,source,direction,entry_price,target_price,stop_loss,percent_gain,resolution_state,holding_period,highest_reached,lowest_reached,loss_reason_code,timestamp,exit_by,entry_valid_until
a1,AAPL,stock,ai,long,100,110,95,4.5,won,swing,,,,2024-01-02T15:00:00Z,,
a2,TSLA,stock,quant,short,200,180,210,-5.0,lost,intraday,,,gap_up,2024-01-03T15:00:00Z,,
a3,SPY,option,flow,long,5,7,4,,expired,swing,6.5,4.8,,2024-01-04T15:00:00Z,2024-01-10T21:00:00Z,
";

    fn trades(content: &str, format: TradeFormat) -> Vec<TradeRecord> {
        let history = parse_trades(content, format).unwrap();
        assert!(history.warnings.is_empty(), "{:?}", history.warnings);
        history.trades
    }

    #[test]
    fn csv_empty_cells_become_none() {
        let trades = trades(CSV, TradeFormat::Csv);
        assert_eq!(trades.len(), 3);
        assert_eq!(trades[0].percent_gain, Some(4.5));
        assert_eq!(trades[0].loss_reason_code, None);
        assert_eq!(trades[1].direction, Direction::Short);
        assert_eq!(trades[1].loss_reason_code.as_deref(), Some("gap_up"));
        assert_eq!(trades[2].percent_gain, None);
        assert_eq!(trades[2].resolution_state, ResolutionState::Expired);
        assert_eq!(trades[2].highest_reached, Some(6.5));
        assert!(trades[2].exit_by.is_some());
    }

    #[test]
    fn json_lines_skips_offending_line() {
        let good = serde_json::to_string(&trades(CSV, TradeFormat::Csv)[0]).unwrap();
        let content = format!("{good}\n\n{{not json}}\n");
        let history = parse_trades(&content, TradeFormat::JsonLines).unwrap();
        assert_eq!(history.trades.len(), 1);
        assert_eq!(history.warnings.len(), 1);
        assert_eq!(history.warnings[0].trade_id.as_str(), "record-3");
        assert_eq!(history.warnings[0].stage, AnalysisStage::Load);
        assert_eq!(
            history.warnings[0].issue,
            RecordIssue::Malformed { position: 3 }
        );
    }

    #[test]
    fn json_array_matches_csv() {
        let from_csv = trades(CSV, TradeFormat::Csv);
        let json = serde_json::to_string(&from_csv).unwrap();
        let from_json = trades(&json, TradeFormat::Json);
        assert_eq!(from_csv, from_json);
    }

    // ── Malformed records ──

    #[test]
    fn csv_missing_target_still_loads() {
        // a2 has no target price: the plan is unusable, the outcome is not.
        let csv = CSV.replace("200,180,210", "200,,210");
        let history = parse_trades(&csv, TradeFormat::Csv).unwrap();
        assert!(history.warnings.is_empty());
        assert_eq!(history.trades.len(), 3);
        assert_eq!(history.trades[1].target_price, None);
        assert_eq!(history.trades[1].plan(), Err(RecordIssue::MissingPrices));
        assert_eq!(history.trades[1].percent_gain, Some(-5.0));
    }

    #[test]
    fn csv_undecodable_row_is_skipped_with_warning() {
        let csv = CSV.replace("a2,TSLA,stock", "a2,TSLA,etf");
        let history = parse_trades(&csv, TradeFormat::Csv).unwrap();
        let ids: Vec<&str> = history.trades.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["a1", "a3"]);
        assert_eq!(history.warnings.len(), 1);
        assert_eq!(history.warnings[0].trade_id.as_str(), "a2");
        assert_eq!(
            history.warnings[0].issue,
            RecordIssue::Malformed { position: 3 }
        );
    }

    #[test]
    fn csv_short_row_is_skipped_with_warning() {
        let csv = format!("{CSV}a4,QQQ,stock\n");
        let history = parse_trades(&csv, TradeFormat::Csv).unwrap();
        assert_eq!(history.trades.len(), 3);
        assert_eq!(history.warnings[0].trade_id.as_str(), "a4");
    }

    #[test]
    fn json_unknown_asset_type_keeps_other_records() {
        let mut values: Vec<serde_json::Value> =
            serde_json::from_str(&serde_json::to_string(&trades(CSV, TradeFormat::Csv)).unwrap())
                .unwrap();
        values[1]["asset_type"] = "etf".into();
        let json = serde_json::to_string(&values).unwrap();
        let history = parse_trades(&json, TradeFormat::Json).unwrap();
        assert_eq!(history.trades.len(), 2);
        assert_eq!(history.trades[0].id.as_str(), "a1");
        assert_eq!(history.warnings[0].trade_id.as_str(), "a2");
        assert_eq!(
            history.warnings[0].issue,
            RecordIssue::Malformed { position: 2 }
        );
    }

    #[test]
    fn json_that_is_not_an_array_fails() {
        let err = parse_trades("{\"id\": \"a1\"}", TradeFormat::Json).unwrap_err();
        assert!(matches!(err, LoadError::Json(_)));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            TradeFormat::from_path(Path::new("t.JSON")).unwrap(),
            TradeFormat::Json
        );
        assert_eq!(
            TradeFormat::from_path(Path::new("t.ndjson")).unwrap(),
            TradeFormat::JsonLines
        );
        assert!(matches!(
            TradeFormat::from_path(Path::new("t.parquet")),
            Err(LoadError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        std::fs::write(&path, CSV).unwrap();
        let history = load_trades(&path).unwrap();
        assert_eq!(history.trades.len(), 3);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_trades(Path::new("/nonexistent/history.json")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
