//! CSV artifact adapter implementing ArtifactPort.
//!
//! Layout under the output root:
//!
//! ```text
//! marketData/marketData_<TF>.csv
//! reduced/reduced_<TF>.csv
//! reduced/history/reduced_<TF>_<YYYYmmdd_HHMMSS>.csv
//! indicatorSummary.csv
//! narrationInput.txt
//! ```

use crate::domain::column::{ColumnKey, FeatureName};
use crate::domain::error::SignalError;
use crate::domain::frame::ColumnStore;
use crate::domain::settings::SummarySettings;
use crate::domain::snapshot::Snapshot;
use crate::domain::summary::SummaryRecord;
use crate::ports::artifact_port::ArtifactPort;
use std::fs;
use std::path::{Path, PathBuf};

pub const METADATA_COLUMNS: [&str; 4] = ["Ticker", "Timeframe", "Date", "Time"];
pub const SUMMARY_FILE: &str = "indicatorSummary.csv";
pub const NARRATION_FILE: &str = "narrationInput.txt";
const ARCHIVE_STAMP: &str = "%Y%m%d_%H%M%S";

pub struct CsvArtifactAdapter {
    root: PathBuf,
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, SignalError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| SignalError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| SignalError::data(e.to_string()))
}

/// Metadata columns followed by `keys`, one line per snapshot row.
pub fn render_table(snapshot: &Snapshot, keys: &[ColumnKey]) -> Result<String, SignalError> {
    let mut w = csv::Writer::from_writer(Vec::new());
    let header: Vec<String> = METADATA_COLUMNS
        .iter()
        .map(|s| s.to_string())
        .chain(keys.iter().map(ToString::to_string))
        .collect();
    w.write_record(&header)?;

    // resolve each column once, not once per cell
    let columns: Vec<Option<&[Option<f64>]>> = keys.iter().map(|k| snapshot.values(k)).collect();
    for (i, meta) in snapshot.rows().iter().enumerate() {
        let mut record = vec![
            meta.ticker.clone(),
            meta.timeframe.clone(),
            meta.date.clone().unwrap_or_default(),
            meta.time.clone().unwrap_or_default(),
        ];
        record.extend(
            columns
                .iter()
                .map(|&c| cell(c.and_then(|v| v.get(i).copied().flatten()))),
        );
        w.write_record(&record)?;
    }
    finish(w)
}

pub fn render_snapshot(snapshot: &Snapshot) -> Result<String, SignalError> {
    let keys: Vec<ColumnKey> = snapshot.keys().cloned().collect();
    render_table(snapshot, &keys)
}

/// Allow-listed features absent from the snapshot are left out.
pub fn render_reduced(snapshot: &Snapshot, features: &[FeatureName]) -> Result<String, SignalError> {
    let keys: Vec<ColumnKey> = features
        .iter()
        .map(|f| f.qualify(snapshot.label()))
        .filter(|k| snapshot.has_column(k))
        .collect();
    render_table(snapshot, &keys)
}

pub fn render_summary(
    records: &[SummaryRecord],
    settings: &SummarySettings,
) -> Result<String, SignalError> {
    let mut w = csv::Writer::from_writer(Vec::new());
    let mut header = vec!["Timeframe".to_string()];
    for feature in &settings.indicators {
        header.push(format!("{feature}_Top"));
        header.push(format!("{feature}_Bottom"));
        if settings.include_context {
            header.push(format!("{feature}_AvgMean"));
            header.push(format!("{feature}_SlopeMean"));
        }
    }
    w.write_record(&header)?;

    for record in records {
        let mut row = vec![record.timeframe.clone()];
        for feature in &settings.indicators {
            let ranking = record.rankings.iter().find(|r| r.feature == *feature);
            row.push(ranking.map(|r| r.top.join("|")).unwrap_or_default());
            row.push(ranking.map(|r| r.bottom.join("|")).unwrap_or_default());
            if settings.include_context {
                row.push(cell(ranking.and_then(|r| r.avg_mean)));
                row.push(cell(ranking.and_then(|r| r.slope_mean)));
            }
        }
        w.write_record(&row)?;
    }
    finish(w)
}

fn section(out: &mut String, name: &str, body: &str) {
    out.push_str(&format!("======== {name} ========\n"));
    out.push_str(body);
    if !body.ends_with('\n') {
        out.push('\n');
    }
    out.push('\n');
}

impl CsvArtifactAdapter {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshot_path(&self, label: &str) -> PathBuf {
        self.root
            .join("marketData")
            .join(format!("marketData_{label}.csv"))
    }

    pub fn reduced_dir(&self) -> PathBuf {
        self.root.join("reduced")
    }

    pub fn reduced_path(&self, label: &str) -> PathBuf {
        self.reduced_dir().join(format!("reduced_{label}.csv"))
    }

    pub fn history_dir(&self) -> PathBuf {
        self.reduced_dir().join("history")
    }

    fn write(&self, path: PathBuf, contents: &str) -> Result<PathBuf, SignalError> {
        let artifact_err = |e: std::io::Error| SignalError::Artifact {
            path: path.display().to_string(),
            reason: e.to_string(),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(artifact_err)?;
        }
        fs::write(&path, contents).map_err(artifact_err)?;
        tracing::debug!(path = %path.display(), bytes = contents.len(), "artifact written");
        Ok(path)
    }

    /// Archive step with an explicit timestamp suffix.
    pub fn archive_reduced_as(&self, stamp: &str) -> Result<usize, SignalError> {
        let source = self.reduced_dir();
        if !source.is_dir() {
            return Ok(0);
        }

        let mut files: Vec<PathBuf> = fs::read_dir(&source)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && p.extension().is_some_and(|ext| ext == "csv")
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with("reduced_"))
            })
            .collect();
        files.sort();

        let history = self.history_dir();
        fs::create_dir_all(&history)?;
        let mut archived = 0;
        for file in files {
            let Some(stem) = file.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let dest = history.join(format!("{stem}_{stamp}.csv"));
            match fs::copy(&file, &dest) {
                Ok(_) => {
                    archived += 1;
                    tracing::info!(from = %file.display(), to = %dest.display(), "archived");
                }
                Err(e) => tracing::error!(file = %file.display(), error = %e, "archive failed"),
            }
        }
        Ok(archived)
    }
}

impl ArtifactPort for CsvArtifactAdapter {
    fn write_snapshot(&self, snapshot: &Snapshot) -> Result<PathBuf, SignalError> {
        let body = render_snapshot(snapshot)?;
        self.write(self.snapshot_path(snapshot.label()), &body)
    }

    fn write_reduced(
        &self,
        snapshot: &Snapshot,
        features: &[FeatureName],
    ) -> Result<PathBuf, SignalError> {
        let body = render_reduced(snapshot, features)?;
        self.write(self.reduced_path(snapshot.label()), &body)
    }

    fn write_summary(
        &self,
        records: &[SummaryRecord],
        settings: &SummarySettings,
    ) -> Result<PathBuf, SignalError> {
        let body = render_summary(records, settings)?;
        self.write(self.root.join(SUMMARY_FILE), &body)
    }

    fn write_narration_input(
        &self,
        records: &[SummaryRecord],
        settings: &SummarySettings,
        snapshots: &[Snapshot],
        features: &[FeatureName],
    ) -> Result<PathBuf, SignalError> {
        let mut out = String::new();
        section(&mut out, "indicatorSummary", &render_summary(records, settings)?);
        for snapshot in snapshots {
            let name = format!("reduced_{}", snapshot.label());
            section(&mut out, &name, &render_reduced(snapshot, features)?);
        }
        self.write(self.root.join(NARRATION_FILE), &out)
    }

    fn archive_reduced(&self) -> Result<usize, SignalError> {
        let stamp = chrono::Local::now().format(ARCHIVE_STAMP).to_string();
        self.archive_reduced_as(&stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::RowMeta;
    use crate::domain::summary::IndicatorRanking;
    use tempfile::TempDir;

    fn sample_snapshot() -> Snapshot {
        let mut snap = Snapshot::new("1D");
        snap.push_row(
            RowMeta {
                ticker: "AAA".into(),
                timeframe: "1D".into(),
                date: Some("03/01/24".into()),
                time: Some("16:00".into()),
                complete: true,
            },
            vec![
                (ColumnKey::base("RSI", "1D"), Some(70.5)),
                (ColumnKey::base("CMF", "1D"), Some(0.1)),
            ],
        );
        snap.push_row(RowMeta::placeholder("BBB", "1D"), Vec::new());
        snap
    }

    fn summary_settings(context: bool) -> SummarySettings {
        SummarySettings {
            indicators: vec![FeatureName::base("RSI"), FeatureName::parse("VWAP_Z")],
            top_n: 1,
            include_context: context,
            precision: 2,
        }
    }

    fn sample_records() -> Vec<SummaryRecord> {
        vec![SummaryRecord {
            timeframe: "1D".into(),
            rankings: vec![IndicatorRanking {
                feature: FeatureName::base("RSI"),
                top: vec!["AAA".into(), "CCC".into()],
                bottom: vec!["BBB".into()],
                avg_mean: Some(55.25),
                slope_mean: None,
            }],
        }]
    }

    #[test]
    fn snapshot_table_has_metadata_then_features() {
        let body = render_snapshot(&sample_snapshot()).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines[0], "Ticker,Timeframe,Date,Time,RSI_1D,CMF_1D");
        assert_eq!(lines[1], "AAA,1D,03/01/24,16:00,70.5,0.1");
        assert_eq!(lines[2], "BBB,1D,,,,");
    }

    #[test]
    fn table_follows_requested_key_order() {
        let keys = vec![
            ColumnKey::base("CMF", "1D"),
            ColumnKey::base("ADX", "1D"),
            ColumnKey::base("RSI", "1D"),
        ];
        let body = render_table(&sample_snapshot(), &keys).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines[0], "Ticker,Timeframe,Date,Time,CMF_1D,ADX_1D,RSI_1D");
        assert_eq!(lines[1], "AAA,1D,03/01/24,16:00,0.1,,70.5");
        assert_eq!(lines[2], "BBB,1D,,,,,");
    }

    #[test]
    fn reduced_table_keeps_present_allow_listed_columns() {
        let features = vec![FeatureName::base("CMF"), FeatureName::parse("RSI_Z")];
        let body = render_reduced(&sample_snapshot(), &features).unwrap();
        assert_eq!(body.lines().next().unwrap(), "Ticker,Timeframe,Date,Time,CMF_1D");
    }

    #[test]
    fn summary_joins_tickers_and_blanks_missing_rankings() {
        let body = render_summary(&sample_records(), &summary_settings(false)).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines[0], "Timeframe,RSI_Top,RSI_Bottom,VWAP_Z_Top,VWAP_Z_Bottom");
        assert_eq!(lines[1], "1D,AAA|CCC,BBB,,");
    }

    #[test]
    fn summary_with_context_columns() {
        let body = render_summary(&sample_records(), &summary_settings(true)).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert!(lines[0].starts_with("Timeframe,RSI_Top,RSI_Bottom,RSI_AvgMean,RSI_SlopeMean,"));
        assert!(lines[1].starts_with("1D,AAA|CCC,BBB,55.25,,"));
    }

    #[test]
    fn publish_writes_layout() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvArtifactAdapter::new(dir.path().to_path_buf());
        let snapshots = vec![sample_snapshot()];
        let features = vec![FeatureName::base("RSI")];

        let written = adapter
            .publish(&snapshots, &sample_records(), &summary_settings(false), &features)
            .unwrap();

        assert_eq!(written.len(), 4);
        assert!(dir.path().join("marketData/marketData_1D.csv").is_file());
        assert!(dir.path().join("reduced/reduced_1D.csv").is_file());
        assert!(dir.path().join(SUMMARY_FILE).is_file());

        let narration = fs::read_to_string(dir.path().join(NARRATION_FILE)).unwrap();
        let summary_at = narration.find("======== indicatorSummary ========").unwrap();
        let reduced_at = narration.find("======== reduced_1D ========").unwrap();
        assert!(summary_at < reduced_at);
        assert!(narration.contains("AAA,1D,03/01/24,16:00,70.5"));
    }

    #[test]
    fn archive_copies_reduced_files_with_stamp() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvArtifactAdapter::new(dir.path().to_path_buf());
        assert_eq!(adapter.archive_reduced_as("20240101_000000").unwrap(), 0);

        let features = vec![FeatureName::base("RSI")];
        adapter.write_reduced(&sample_snapshot(), &features).unwrap();
        let mut other = Snapshot::new("1H");
        other.push_row(RowMeta::placeholder("AAA", "1H"), Vec::new());
        adapter.write_reduced(&other, &features).unwrap();

        let n = adapter.archive_reduced_as("20240301_160000").unwrap();
        assert_eq!(n, 2);
        assert!(adapter.history_dir().join("reduced_1D_20240301_160000.csv").is_file());
        assert!(adapter.history_dir().join("reduced_1H_20240301_160000.csv").is_file());
    }

    #[test]
    fn identical_input_gives_identical_bytes() {
        let a = render_snapshot(&sample_snapshot()).unwrap();
        let b = render_snapshot(&sample_snapshot()).unwrap();
        assert_eq!(a, b);
    }
}
