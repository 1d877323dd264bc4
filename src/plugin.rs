//! Sort-relevant facts about an installed plugin file.

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::metadata::trim_ghost;
use crate::prelude::*;

/// A record identifier, unique within one load order.
///
/// Plugins override records declared by their masters; two plugins that carry
/// the same identifier touch the same record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordId {
    id: u32,
    plugin: String,
}

impl RecordId {
    pub fn new(id: u32, plugin: &str) -> Self {
        Self {
            id,
            plugin: plugin.to_owned(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// The master plugin that declared this record.
    pub fn plugin(&self) -> &str {
        &self.plugin
    }
}

impl PartialEq for RecordId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.plugin.eq_ignore_ascii_case(&other.plugin)
    }
}

impl Eq for RecordId {}

impl Hash for RecordId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.plugin.to_lowercase().hash(state);
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id
            .cmp(&other.id)
            .then_with(|| self.plugin.to_lowercase().cmp(&other.plugin.to_lowercase()))
    }
}

/// An installed plugin, as seen by the sorter.
///
/// These facts come from whatever parsed the plugin's header and records; the
/// sorter itself never reads plugin files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plugin {
    name: String,
    masters: Vec<String>,
    is_master: bool,
    crc: Option<u32>,
    override_records: BTreeSet<RecordId>,
    is_empty: bool,
    is_active: bool,
    loads_archive: bool,
    version: Option<String>,
}

impl Plugin {
    /// A plugin with the given name and no recorded facts. A trailing
    /// '.ghost' extension is trimmed; ghosting does not change identity.
    pub fn new(name: &str) -> Self {
        Self {
            name: trim_ghost(name).to_owned(),
            masters: Vec::new(),
            is_master: false,
            crc: None,
            override_records: BTreeSet::new(),
            is_empty: false,
            is_active: false,
            loads_archive: false,
            version: None,
        }
    }

    pub fn with_masters(mut self, masters: Vec<String>) -> Self {
        self.masters = masters;
        self
    }

    pub fn with_master_flag(mut self, is_master: bool) -> Self {
        self.is_master = is_master;
        self
    }

    pub fn with_crc(mut self, crc: u32) -> Self {
        self.crc = Some(crc);
        self
    }

    pub fn with_override_records(mut self, records: BTreeSet<RecordId>) -> Self {
        self.override_records = records;
        self
    }

    pub fn with_empty_flag(mut self, is_empty: bool) -> Self {
        self.is_empty = is_empty;
        self
    }

    pub fn with_active_flag(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    pub fn with_archive_flag(mut self, loads_archive: bool) -> Self {
        self.loads_archive = loads_archive;
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_owned());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The masters this plugin depends on, in header order.
    pub fn masters(&self) -> &[String] {
        &self.masters
    }

    pub fn is_master(&self) -> bool {
        self.is_master
    }

    pub fn crc(&self) -> Option<u32> {
        self.crc
    }

    pub fn set_crc(&mut self, crc: u32) {
        self.crc = Some(crc);
    }

    pub fn override_records(&self) -> &BTreeSet<RecordId> {
        &self.override_records
    }

    pub fn override_record_count(&self) -> usize {
        self.override_records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn set_active(&mut self, is_active: bool) {
        self.is_active = is_active;
    }

    pub fn loads_archive(&self) -> bool {
        self.loads_archive
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Whether the two plugins override at least one record in common.
    pub fn overlaps(&self, other: &Plugin) -> bool {
        self.override_records
            .intersection(&other.override_records)
            .next()
            .is_some()
    }
}

/// Whether a file name looks like a plugin, ghosted or not.
pub fn is_plugin_file(name: &str) -> bool {
    let name = trim_ghost(name).to_lowercase();
    name.ends_with(".esp") || name.ends_with(".esm")
}
