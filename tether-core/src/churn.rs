//! Churn analysis: how many probe keys change backend across a mutation.
//!
//! The control plane captures a [`Snapshot`] of a fixed [`ProbeSet`] before
//! and after every topology or strategy change and reports their [`Diff`].
//! Snapshots are taken with [`Strategy::peek`], so measuring churn never
//! disturbs live routing state.

use std::collections::HashMap;

use crate::load_balancer::strategy::Strategy;

/// Backend identity recorded for a key when no backend is available.
pub const NO_BACKEND: &str = "none";

/// The fixed keys churn is measured on. Not real traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSet {
    keys: Vec<String>,
}

impl ProbeSet {
    /// Probe with the given keys, in order.
    pub fn new(keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Twelve synthetic client addresses, `10.0.0.1` to `10.0.0.12`.
    pub fn demo() -> Self {
        Self::new((1..=12).map(|i| format!("10.0.0.{i}")))
    }

    /// The probe keys.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Number of probe keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when there is nothing to probe.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for ProbeSet {
    fn default() -> Self {
        Self::demo()
    }
}

/// Probe key to backend identity, in probe order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: Vec<(String, String)>,
}

impl Snapshot {
    /// Evaluate `strategy` for every probe key without touching its state.
    pub fn capture(strategy: &Strategy, probes: &ProbeSet) -> Self {
        probes
            .keys()
            .iter()
            .map(|key| {
                let backend = strategy
                    .peek(key)
                    .map_or_else(|| NO_BACKEND.to_string(), |b| b.id().to_string());
                (key.clone(), backend)
            })
            .collect()
    }

    /// The backend recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, backend)| backend.as_str())
    }

    /// `(key, backend)` pairs in probe order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, b)| (k.as_str(), b.as_str()))
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no key was probed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// One key's routing before and after a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRow {
    /// The probe key.
    pub key: String,
    /// Backend identity before the change.
    pub before: String,
    /// Backend identity after the change.
    pub after: String,
    /// `before != after`.
    pub changed: bool,
}

/// The churn between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    /// Keys whose backend changed.
    pub moved: usize,
    /// Keys compared.
    pub total: usize,
    /// One row per key.
    pub rows: Vec<DiffRow>,
}

impl Diff {
    /// `moved / total`, or 0 for an empty diff.
    pub fn moved_fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.moved as f64 / self.total as f64
        }
    }
}

/// Compare two snapshots key by key.
///
/// Rows follow `before`'s order, then keys only `after` has. A key missing
/// from one side counts as [`NO_BACKEND`] there.
pub fn diff(before: &Snapshot, after: &Snapshot) -> Diff {
    let after_map: HashMap<&str, &str> = after.iter().collect();
    let before_map: HashMap<&str, &str> = before.iter().collect();

    let rows: Vec<DiffRow> = before
        .iter()
        .map(|(key, b)| (key, b, after_map.get(key).copied().unwrap_or(NO_BACKEND)))
        .chain(
            after
                .iter()
                .filter(|(key, _)| !before_map.contains_key(key))
                .map(|(key, a)| (key, NO_BACKEND, a)),
        )
        .map(|(key, b, a)| DiffRow {
            key: key.to_string(),
            before: b.to_string(),
            after: a.to_string(),
            changed: b != a,
        })
        .collect();

    Diff {
        moved: rows.iter().filter(|row| row.changed).count(),
        total: rows.len(),
        rows,
    }
}
