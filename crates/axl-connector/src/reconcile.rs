//! Ambiguous association detection for user/device/line rows.
//!
//! A device or line that shows up under more than one user cannot be
//! attributed to anyone. Every row touching it is excluded and a diagnostic
//! names the users involved; no user is ever picked as the owner.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info};

use crate::rows::UserDeviceLine;

/// Kind of shared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Device,
    Line,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Device => f.write_str("Device"),
            ResourceKind::Line => f.write_str("Line"),
        }
    }
}

/// A device or line associated with several users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguity {
    pub kind: ResourceKind,
    /// Device name or directory number.
    pub name: String,
    /// Device description or line alerting name.
    pub description: String,
    /// Display names of the users, in first-observed order.
    pub users: Vec<String>,
}

impl fmt::Display for Ambiguity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} - {}] is associated with users: [{}]",
            self.kind,
            self.name,
            self.description,
            self.users.join(", ")
        )
    }
}

#[derive(Debug, Clone)]
struct Association {
    key: String,
    name: String,
    description: String,
    users: Vec<String>,
}

/// Insertion-ordered resource key to distinct user keys.
#[derive(Debug, Clone, Default)]
struct Associations {
    entries: Vec<Association>,
    positions: HashMap<String, usize>,
}

impl Associations {
    fn observe(&mut self, key: &str, name: &str, description: &str, user: &str) {
        match self.positions.get(key) {
            Some(&pos) => {
                let users = &mut self.entries[pos].users;
                if !users.iter().any(|u| u == user) {
                    users.push(user.to_string());
                }
            }
            None => {
                self.positions.insert(key.to_string(), self.entries.len());
                self.entries.push(Association {
                    key: key.to_string(),
                    name: name.to_string(),
                    description: description.to_string(),
                    users: vec![user.to_string()],
                });
            }
        }
    }

    /// Keep only associations with more than one user.
    fn prune_singletons(&mut self) {
        self.entries.retain(|a| a.users.len() > 1);
        self.positions = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, a)| (a.key.clone(), pos))
            .collect();
    }

    fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Device, line and user lookups built from one row batch.
///
/// After [`AssociationIndex::build`] only ambiguous devices and lines remain.
#[derive(Debug, Clone, Default)]
pub struct AssociationIndex {
    devices: Associations,
    lines: Associations,
    users: HashMap<String, String>,
}

impl AssociationIndex {
    /// Fold the rows into the index and prune unique associations.
    pub fn build(rows: &[UserDeviceLine]) -> Self {
        let mut index = Self::default();
        for row in rows {
            index.devices.observe(
                &row.device_pkid,
                &row.device_name,
                &row.device_description,
                &row.user_pkid,
            );
            index.lines.observe(
                &row.line_pkid,
                &row.line_number,
                &row.line_alerting_name,
                &row.user_pkid,
            );
            index
                .users
                .entry(row.user_pkid.clone())
                .or_insert_with(|| display_name(row));
        }
        index.devices.prune_singletons();
        index.lines.prune_singletons();
        index
    }

    pub fn is_device_ambiguous(&self, device_pkid: &str) -> bool {
        self.devices.contains(device_pkid)
    }

    pub fn is_line_ambiguous(&self, line_pkid: &str) -> bool {
        self.lines.contains(line_pkid)
    }

    /// Whether the row references an ambiguous device or line.
    pub fn touches(&self, row: &UserDeviceLine) -> bool {
        self.is_device_ambiguous(&row.device_pkid) || self.is_line_ambiguous(&row.line_pkid)
    }

    pub fn ambiguous_count(&self) -> usize {
        self.devices.len() + self.lines.len()
    }

    /// Ambiguous devices, then ambiguous lines, each in first-observed order.
    pub fn ambiguities(&self) -> Vec<Ambiguity> {
        let devices = self
            .devices
            .entries
            .iter()
            .map(|a| (ResourceKind::Device, a));
        let lines = self.lines.entries.iter().map(|a| (ResourceKind::Line, a));

        devices
            .chain(lines)
            .map(|(kind, a)| Ambiguity {
                kind,
                name: a.name.clone(),
                description: a.description.clone(),
                users: a
                    .users
                    .iter()
                    .map(|u| self.users.get(u).cloned().unwrap_or_else(|| u.clone()))
                    .collect(),
            })
            .collect()
    }
}

fn display_name(row: &UserDeviceLine) -> String {
    if row.user_id.is_empty() {
        row.user_pkid.clone()
    } else {
        row.user_id.clone()
    }
}

/// Result of reconciling one batch.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Rows free of ambiguous associations, in input order.
    pub rows: Vec<UserDeviceLine>,
    /// One entry per ambiguous device or line.
    pub ambiguities: Vec<Ambiguity>,
    /// Number of input rows dropped.
    pub removed: usize,
}

impl Reconciliation {
    pub fn is_clean(&self) -> bool {
        self.ambiguities.is_empty()
    }
}

/// Drop every row that touches an ambiguous device or line.
pub fn reconcile(rows: Vec<UserDeviceLine>) -> Reconciliation {
    debug!(rows = rows.len(), "Reconciling user/device/line rows");

    let index = AssociationIndex::build(&rows);
    let ambiguities = index.ambiguities();
    let total = rows.len();
    let rows: Vec<UserDeviceLine> = rows.into_iter().filter(|r| !index.touches(r)).collect();
    let removed = total - rows.len();

    info!(
        removed_rows = removed,
        ambiguous = ambiguities.len(),
        "Removed rows with ambiguous associations"
    );

    Reconciliation {
        rows,
        ambiguities,
        removed,
    }
}
