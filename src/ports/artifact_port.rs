//! Persisted artifact port trait.

use crate::domain::column::FeatureName;
use crate::domain::error::SignalError;
use crate::domain::settings::SummarySettings;
use crate::domain::snapshot::Snapshot;
use crate::domain::summary::SummaryRecord;
use std::path::PathBuf;

/// Sink for the run's outputs. Each method returns the path it wrote.
pub trait ArtifactPort {
    /// Full snapshot table for one timeframe.
    fn write_snapshot(&self, snapshot: &Snapshot) -> Result<PathBuf, SignalError>;

    /// Metadata plus the allow-listed features present in the snapshot.
    fn write_reduced(
        &self,
        snapshot: &Snapshot,
        features: &[FeatureName],
    ) -> Result<PathBuf, SignalError>;

    fn write_summary(
        &self,
        records: &[SummaryRecord],
        settings: &SummarySettings,
    ) -> Result<PathBuf, SignalError>;

    /// The single text blob handed to narration: the summary followed by
    /// every reduced table.
    fn write_narration_input(
        &self,
        records: &[SummaryRecord],
        settings: &SummarySettings,
        snapshots: &[Snapshot],
        features: &[FeatureName],
    ) -> Result<PathBuf, SignalError>;

    /// Copies the current reduced tables into a timestamped history folder.
    /// Returns how many files were archived.
    fn archive_reduced(&self) -> Result<usize, SignalError>;

    /// Every artifact of a run, in a fixed order.
    fn publish(
        &self,
        snapshots: &[Snapshot],
        records: &[SummaryRecord],
        settings: &SummarySettings,
        features: &[FeatureName],
    ) -> Result<Vec<PathBuf>, SignalError> {
        let mut written = Vec::with_capacity(snapshots.len() * 2 + 2);
        for snapshot in snapshots {
            written.push(self.write_snapshot(snapshot)?);
            written.push(self.write_reduced(snapshot, features)?);
        }
        written.push(self.write_summary(records, settings)?);
        written.push(self.write_narration_input(records, settings, snapshots, features)?);
        Ok(written)
    }
}
