//! One full run: snapshots for every timeframe, then the rankings.

use crate::domain::diagnostics::Diagnostics;
use crate::domain::registry::Registry;
use crate::domain::settings::PipelineSettings;
use crate::domain::snapshot::{Snapshot, SnapshotBuilder};
use crate::domain::summary::{SummaryRecord, summarize};
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone)]
pub struct RunReport {
    pub snapshots: Vec<Snapshot>,
    pub summaries: Vec<SummaryRecord>,
    pub diagnostics: Diagnostics,
}

impl RunReport {
    /// A timeframe is usable when it has at least one row with a value.
    pub fn usable_timeframes(&self) -> usize {
        self.snapshots
            .iter()
            .filter(|s| !s.is_empty() && !s.is_all_missing())
            .count()
    }

    pub fn snapshot(&self, label: &str) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| s.label() == label)
    }
}

pub fn run_pipeline(
    data: &dyn DataPort,
    registry: &Registry,
    settings: &PipelineSettings,
) -> RunReport {
    let mut diagnostics = Diagnostics::new();
    let snapshots = SnapshotBuilder::new(data, registry, settings).build_all(&mut diagnostics);
    let summaries = summarize(&snapshots, &settings.summary, &mut diagnostics);
    tracing::info!(
        timeframes = snapshots.len(),
        skipped = diagnostics.len(),
        "pipeline finished"
    );
    RunReport {
        snapshots,
        summaries,
        diagnostics,
    }
}
