//! What the control plane hands to whoever displays it.
//!
//! Reports carry only [`Snapshot`]s, [`Diff`]s and topology listings; no
//! strategy internals leak out.

use tracing::info;

use tether_core::{Diff, Snapshot, StrategyKind, TopologyLine};

/// The outcome of one applied command.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// A mutation and the churn it caused on the probe set.
    Remap {
        /// What happened, e.g. `ADD` or `STRATEGY:rr`.
        label: String,
        /// Before/after mapping of the probe keys.
        diff: Diff,
    },
    /// The current probe-set mapping.
    Mapping(Snapshot),
    /// The active strategy's view of the topology.
    Topology {
        /// The active strategy.
        strategy: StrategyKind,
        /// One line per backend, or per ring entry for consistent-hash.
        lines: Vec<TopologyLine>,
    },
    /// The control plane stopped.
    Exited,
}

impl Report {
    /// Render the report as operator-facing lines.
    pub fn render(&self) -> Vec<String> {
        match self {
            Report::Remap { label, diff } => {
                let mut out = vec![format!("=== {label} ===")];
                out.extend(diff.rows.iter().map(|row| {
                    let flag = if row.changed { "  <-- MOVED" } else { "" };
                    format!("key={:<12}  {} -> {}{}", row.key, row.before, row.after, flag)
                }));
                out.push(format!("moved={}/{} keys", diff.moved, diff.total));
                out
            }
            Report::Mapping(snapshot) => {
                let mut out = vec!["=== SHOW ===".to_string()];
                out.extend(
                    snapshot
                        .iter()
                        .map(|(key, backend)| format!("key={key:<12}  -> {backend}")),
                );
                out
            }
            Report::Topology { strategy, lines } => {
                let mut out = vec![format!("=== TOPOLOGY ({strategy}) ===")];
                out.extend(lines.iter().map(ToString::to_string));
                out
            }
            Report::Exited => vec!["gracefully terminating".to_string()],
        }
    }

    /// Write the rendered report to the log, one event per line.
    pub fn log(&self) {
        for line in self.render() {
            info!("{line}");
        }
    }
}
