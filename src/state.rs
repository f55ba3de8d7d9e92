use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ddl::{DropBehavior, ObjectType};
use reconcile::{Binding, BindingUpdate, ObjectIdentity, Outcome, PendingIdentity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

const STATE_VERSION: u32 = 1;

// ============================================================================
// State Structures
// ============================================================================

/// Identities of every object mzform manages, keyed by manifest address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,

    /// Last time the state was written
    pub last_updated: Option<DateTime<Utc>>,

    #[serde(default)]
    pub resources: BTreeMap<String, ResourceRecord>,

    /// Objects whose CREATE ran but whose id was never resolved
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pending: BTreeMap<String, PendingRecord>,
}

/// One managed object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub object_type: ObjectType,

    /// Server-assigned id
    pub id: ObjectIdentity,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_behavior: Option<DropBehavior>,

    pub updated_at: DateTime<Utc>,

    /// Last-applied attributes; secret values only as fingerprints
    #[serde(default)]
    pub applied: BTreeMap<String, String>,
}

impl ResourceRecord {
    pub fn from_binding(binding: Binding, now: DateTime<Utc>) -> Self {
        Self {
            object_type: binding.object_type,
            id: binding.id,
            drop_behavior: binding.drop_behavior,
            updated_at: now,
            applied: binding.applied,
        }
    }

    pub fn binding(&self) -> Binding {
        Binding {
            object_type: self.object_type,
            id: self.id.clone(),
            applied: self.applied.clone(),
            drop_behavior: self.drop_behavior,
        }
    }
}

/// An object created without a resolved id, remembered by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRecord {
    pub updated_at: DateTime<Utc>,
    pub identity: PendingIdentity,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            last_updated: None,
            resources: BTreeMap::new(),
            pending: BTreeMap::new(),
        }
    }
}

// ============================================================================
// StateFile Implementation
// ============================================================================

impl StateFile {
    /// Load state from disk, or return default if file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file {} does not exist, starting empty", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        if state.version != STATE_VERSION {
            anyhow::bail!(
                "State file {} has version {}, expected {}",
                path.display(),
                state.version,
                STATE_VERSION
            );
        }

        log::debug!(
            "Loaded {} resources ({} pending) from {}",
            state.resources.len(),
            state.pending.len(),
            path.display()
        );
        Ok(state)
    }

    /// Save state to disk
    ///
    /// Written to a sibling file first and renamed over the old one, so an
    /// interrupted write never loses recorded identities.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.last_updated = Some(Utc::now());
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content = toml::to_string_pretty(&self).context("Failed to serialize state to TOML")?;
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, &content)
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    pub fn binding(&self, address: &str) -> Option<Binding> {
        self.resources.get(address).map(ResourceRecord::binding)
    }

    pub fn bindings(&self) -> Vec<(String, Binding)> {
        self.resources
            .iter()
            .map(|(address, record)| (address.clone(), record.binding()))
            .collect()
    }

    pub fn set(&mut self, address: &str, binding: Binding) {
        self.pending.remove(address);
        self.resources.insert(
            address.to_string(),
            ResourceRecord::from_binding(binding, Utc::now()),
        );
    }

    pub fn remove(&mut self, address: &str) -> Option<ResourceRecord> {
        self.pending.remove(address);
        self.resources.remove(address)
    }

    /// Name of an object whose id is still unknown
    pub fn pending_identity(&self, address: &str) -> Option<PendingIdentity> {
        self.pending.get(address).map(|r| r.identity.clone())
    }

    /// Remember an object by name; any identity recorded for the address is
    /// stale once a new CREATE ran
    pub fn set_pending(&mut self, address: &str, identity: PendingIdentity) {
        self.resources.remove(address);
        self.pending.insert(
            address.to_string(),
            PendingRecord {
                updated_at: Utc::now(),
                identity,
            },
        );
    }

    pub fn forget_pending(&mut self, address: &str) -> bool {
        self.pending.remove(address).is_some()
    }

    /// Recorded objects whose address the manifest no longer declares
    pub fn undeclared(&self, declared: &HashSet<&str>) -> Vec<(String, Binding)> {
        self.bindings()
            .into_iter()
            .filter(|(address, _)| !declared.contains(address.as_str()))
            .collect()
    }

    /// Pending objects whose address the manifest no longer declares
    pub fn undeclared_pending(&self, declared: &HashSet<&str>) -> Vec<(String, PendingIdentity)> {
        self.pending
            .iter()
            .filter(|(address, _)| !declared.contains(address.as_str()))
            .map(|(address, record)| (address.clone(), record.identity.clone()))
            .collect()
    }

    /// Record what an apply did; returns how many records changed
    pub fn apply_outcomes(&mut self, outcomes: &[Outcome]) -> usize {
        let mut changed = 0;
        for outcome in outcomes {
            match &outcome.binding {
                BindingUpdate::Keep => continue,
                BindingUpdate::Set(binding) => {
                    if self.binding(&outcome.address).as_ref() == Some(binding)
                        && !self.pending.contains_key(&outcome.address)
                    {
                        continue;
                    }
                    self.set(&outcome.address, binding.clone());
                }
                BindingUpdate::Clear => {
                    let had_pending = self.pending.contains_key(&outcome.address);
                    if self.remove(&outcome.address).is_none() && !had_pending {
                        continue;
                    }
                }
                BindingUpdate::Pending(identity) => {
                    self.set_pending(&outcome.address, identity.clone());
                }
            }
            changed += 1;
        }
        changed
    }
}

// ============================================================================
// Tests
// ============================================================================
