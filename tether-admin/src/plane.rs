//! The control-plane state machine and its task loop.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use tether_core::{
    diff, ProbeSet, RoutingTable, SharedRoutingTable, Snapshot, Strategy, StrategyKind, Topology,
    DEFAULT_REPLICAS,
};

use crate::command::Command;
use crate::error::ControlError;
use crate::report::Report;

/// Lifecycle of the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneState {
    /// Accepting commands.
    Running,
    /// Terminal; every further command is rejected.
    Exited,
}

/// Sole owner of the topology and sole writer of the routing table.
///
/// Commands are applied one at a time. Each mutation builds a complete
/// replacement strategy before publishing it, so data-plane readers only ever
/// see a fully built strategy.
#[derive(Debug)]
pub struct ControlPlane {
    topology: Topology,
    routing: SharedRoutingTable,
    probes: ProbeSet,
    replicas: usize,
    state: PlaneState,
    reports: Option<mpsc::UnboundedSender<Report>>,
}

impl ControlPlane {
    /// Start serving `topology` with a fresh strategy of `kind`.
    pub fn new(topology: Topology, kind: StrategyKind, probes: ProbeSet) -> Self {
        Self::with_replicas(topology, kind, probes, DEFAULT_REPLICAS)
    }

    /// Like [`ControlPlane::new`], with an explicit ring replica count.
    pub fn with_replicas(
        topology: Topology,
        kind: StrategyKind,
        probes: ProbeSet,
        replicas: usize,
    ) -> Self {
        let strategy = Strategy::with_replicas(kind, topology.snapshot(), replicas);
        Self {
            routing: Arc::new(RoutingTable::new(strategy)),
            topology,
            probes,
            replicas,
            state: PlaneState::Running,
            reports: None,
        }
    }

    /// Also forward every report to `reports`, e.g. for a display.
    pub fn with_reports(mut self, reports: mpsc::UnboundedSender<Report>) -> Self {
        self.reports = Some(reports);
        self
    }

    /// The routing table to hand to the data plane.
    pub fn routing(&self) -> SharedRoutingTable {
        self.routing.clone()
    }

    /// The current topology.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PlaneState {
        self.state
    }

    /// Map the probe set under the active strategy without touching it.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.routing.current(), &self.probes)
    }

    /// Apply one command.
    ///
    /// On error nothing was mutated.
    pub fn apply(&mut self, command: Command) -> Result<Report, ControlError> {
        if self.state == PlaneState::Exited {
            return Err(ControlError::Exited);
        }

        let label = command.label();
        match command {
            Command::Exit => {
                info!("control plane exiting");
                self.state = PlaneState::Exited;
                Ok(Report::Exited)
            }
            Command::AddBackend(backend) => {
                let before = self.snapshot();
                let id = backend.id().clone();
                self.topology.add(Arc::new(backend))?;
                self.reinit();
                info!(backend = %id, backends = self.topology.len(), "backend added");
                Ok(self.remap(label, &before))
            }
            Command::RemoveBackend(id) => {
                let before = self.snapshot();
                self.topology.remove(&id)?;
                self.reinit();
                info!(backend = %id, backends = self.topology.len(), "backend removed");
                Ok(self.remap(label, &before))
            }
            Command::ChangeStrategy(name) => {
                let before = self.snapshot();
                let kind = name.parse::<StrategyKind>().unwrap_or_else(|err| {
                    warn!(%err, fallback = %StrategyKind::ConsistentHash, "unknown strategy");
                    StrategyKind::ConsistentHash
                });
                self.routing.publish(Strategy::with_replicas(
                    kind,
                    self.topology.snapshot(),
                    self.replicas,
                ));
                info!(strategy = %kind, "strategy changed");
                Ok(self.remap(label, &before))
            }
            Command::ShowMapping => Ok(Report::Mapping(self.snapshot())),
            Command::ShowTopology => {
                let strategy = self.routing.current();
                Ok(Report::Topology {
                    strategy: strategy.kind(),
                    lines: strategy.describe(),
                })
            }
        }
    }

    /// Consume commands until `Exit` arrives or every sender is gone, then
    /// flip `shutdown` so the accept loop stops.
    ///
    /// A rejected command is logged and skipped; it never stops the loop.
    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        shutdown: watch::Sender<bool>,
    ) {
        info!(
            strategy = %self.routing.current().kind(),
            backends = self.topology.len(),
            "control plane running"
        );

        while let Some(command) = commands.recv().await {
            debug!(command = %command.label(), "applying command");
            match self.apply(command) {
                Ok(report) => {
                    report.log();
                    if let Some(reports) = &self.reports {
                        let _ = reports.send(report);
                    }
                }
                Err(err) => warn!(%err, "command rejected"),
            }
            if self.state == PlaneState::Exited {
                break;
            }
        }

        let _ = shutdown.send(true);
        info!("control plane stopped");
    }

    /// Rebuild the active strategy, same kind, over the current topology.
    fn reinit(&self) {
        let next = self.routing.current().reinit(self.topology.snapshot());
        self.routing.publish(next);
    }

    fn remap(&self, label: String, before: &Snapshot) -> Report {
        Report::Remap {
            label,
            diff: diff(before, &self.snapshot()),
        }
    }
}
