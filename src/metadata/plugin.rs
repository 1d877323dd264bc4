//! Per-plugin metadata aggregation: merging, diffing and evaluation.

use std::hash::Hash;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::{is_name_pattern, trim_ghost, Conditional};
use crate::prelude::*;

/// Everything a masterlist or userlist can say about one plugin name.
///
/// The name may also be a pattern entry (see [*is_name_pattern*]) matching a
/// family of plugins; such entries act as templates that evaluation expands
/// against the installed plugin set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMetadata {
    name: String,
    enabled: bool,
    priority: Priority,
    load_after: IndexSet<File>,
    requirements: IndexSet<File>,
    incompatibilities: IndexSet<File>,
    messages: Vec<Message>,
    tags: IndexSet<Tag>,
    dirty_info: IndexSet<DirtyInfo>,
    locations: IndexSet<Location>,
}

impl PluginMetadata {
    /// An empty metadata value for the given name. A trailing '.ghost'
    /// extension is trimmed, so ghosted plugins share their metadata.
    pub fn new(name: &str) -> Self {
        Self {
            name: trim_ghost(name).to_owned(),
            enabled: true,
            priority: Priority::default(),
            load_after: IndexSet::new(),
            requirements: IndexSet::new(),
            incompatibilities: IndexSet::new(),
            messages: Vec::new(),
            tags: IndexSet::new(),
            dirty_info: IndexSet::new(),
            locations: IndexSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    pub fn load_after(&self) -> &IndexSet<File> {
        &self.load_after
    }

    pub fn set_load_after(&mut self, files: IndexSet<File>) {
        self.load_after = files;
    }

    pub fn requirements(&self) -> &IndexSet<File> {
        &self.requirements
    }

    pub fn set_requirements(&mut self, files: IndexSet<File>) {
        self.requirements = files;
    }

    pub fn incompatibilities(&self) -> &IndexSet<File> {
        &self.incompatibilities
    }

    pub fn set_incompatibilities(&mut self, files: IndexSet<File>) {
        self.incompatibilities = files;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn set_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn tags(&self) -> &IndexSet<Tag> {
        &self.tags
    }

    pub fn set_tags(&mut self, tags: IndexSet<Tag>) {
        self.tags = tags;
    }

    pub fn dirty_info(&self) -> &IndexSet<DirtyInfo> {
        &self.dirty_info
    }

    pub fn set_dirty_info(&mut self, dirty_info: IndexSet<DirtyInfo>) {
        self.dirty_info = dirty_info;
    }

    pub fn locations(&self) -> &IndexSet<Location> {
        &self.locations
    }

    pub fn set_locations(&mut self, locations: IndexSet<Location>) {
        self.locations = locations;
    }

    /// True when nothing beyond the name is set. Merging such a value is a
    /// no-op, and serializers skip it entirely.
    pub fn has_name_only(&self) -> bool {
        self.enabled
            && !self.priority.is_explicit()
            && self.load_after.is_empty()
            && self.requirements.is_empty()
            && self.incompatibilities.is_empty()
            && self.messages.is_empty()
            && self.tags.is_empty()
            && self.dirty_info.is_empty()
            && self.locations.is_empty()
    }

    /// Whether this entry's name is a pattern matching a family of plugins.
    pub fn is_regex_entry(&self) -> bool {
        is_name_pattern(&self.name)
    }

    /// Whether this entry applies to the given plugin name.
    ///
    /// If exactly one side is a pattern, the other side's literal name is
    /// matched against it case-insensitively; otherwise the names are
    /// compared as plain case-insensitive strings.
    pub fn name_matches(&self, other: &str) -> Result<bool, MetadataError> {
        let other = trim_ghost(other);

        if self.is_regex_entry() == is_name_pattern(other) {
            return Ok(self.name.to_lowercase() == other.to_lowercase());
        }

        if self.is_regex_entry() {
            Ok(compile_name_pattern(&self.name)?.is_match(other))
        } else {
            Ok(compile_name_pattern(other)?.is_match(&self.name))
        }
    }

    /// A copy of this entry under a different (concrete) name. Used when
    /// expanding pattern entries against the installed plugin set.
    pub fn renamed(&self, name: &str) -> Self {
        let mut copy = self.clone();
        copy.name = trim_ghost(name).to_owned();
        copy
    }

    /// Merges another entry's metadata into this one.
    ///
    /// The enabled flag and (explicitly set) priority are replaced by the
    /// other entry's values; File, Tag, DirtyInfo and Location sets are
    /// unioned; messages are concatenated, preserving order and duplicates.
    /// The merged-from value is left untouched.
    pub fn merge_metadata(&mut self, other: &PluginMetadata) {
        trace!("Merging metadata for: {}", self.name);

        if other.has_name_only() {
            return;
        }

        self.enabled = other.enabled;
        if other.priority.is_explicit() {
            self.priority = other.priority;
        }

        self.load_after.extend(other.load_after.iter().cloned());
        self.requirements.extend(other.requirements.iter().cloned());
        self.incompatibilities
            .extend(other.incompatibilities.iter().cloned());
        self.tags.extend(other.tags.iter().cloned());
        self.messages.extend(other.messages.iter().cloned());
        self.dirty_info.extend(other.dirty_info.iter().cloned());
        self.locations.extend(other.locations.iter().cloned());
    }

    /// The symmetric difference against another entry, for minimal-list
    /// generation and change detection.
    ///
    /// The priority is zeroed when both sides agree on value and global flag;
    /// otherwise the other side's priority is kept. The enabled flag stays
    /// this entry's own; a boolean has no symmetric difference.
    pub fn diff_metadata(&self, other: &PluginMetadata) -> PluginMetadata {
        trace!("Calculating metadata difference for: {}", self.name);

        let mut diff = self.clone();

        if self.priority.value() == other.priority.value()
            && self.priority.is_global() == other.priority.is_global()
        {
            diff.priority = Priority::default();
        } else {
            diff.priority = other.priority;
        }

        diff.load_after = symmetric_difference(&self.load_after, &other.load_after);
        diff.requirements = symmetric_difference(&self.requirements, &other.requirements);
        diff.incompatibilities =
            symmetric_difference(&self.incompatibilities, &other.incompatibilities);
        diff.tags = symmetric_difference(&self.tags, &other.tags);
        diff.dirty_info = symmetric_difference(&self.dirty_info, &other.dirty_info);
        diff.locations = symmetric_difference(&self.locations, &other.locations);

        diff.messages = self
            .messages
            .iter()
            .filter(|m| !other.messages.contains(m))
            .chain(other.messages.iter().filter(|m| !self.messages.contains(m)))
            .cloned()
            .collect();

        diff
    }

    /// The asymmetric difference: metadata in this entry that the other entry
    /// does not already have. Used to strip redundant userlist entries.
    pub fn new_metadata(&self, other: &PluginMetadata) -> PluginMetadata {
        let mut new = self.clone();

        new.load_after = difference(&self.load_after, &other.load_after);
        new.requirements = difference(&self.requirements, &other.requirements);
        new.incompatibilities = difference(&self.incompatibilities, &other.incompatibilities);
        new.tags = difference(&self.tags, &other.tags);
        new.dirty_info = difference(&self.dirty_info, &other.dirty_info);
        new.locations = difference(&self.locations, &other.locations);

        new.messages = self
            .messages
            .iter()
            .filter(|m| !other.messages.contains(m))
            .cloned()
            .collect();

        new
    }

    /// Evaluates every condition in this metadata against the session's
    /// environment, removing entries whose condition is false.
    ///
    /// DirtyInfo entries additionally require their CRC to match the target
    /// plugin's current checksum, and are dropped wholesale for pattern
    /// entries, since dirty-record provenance cannot apply to a pattern.
    ///
    /// On error the pass is aborted; callers evaluate derived copies, so the
    /// raw metadata stays intact and a retry is always possible.
    pub fn eval_all_conditions(&mut self, session: &mut EvalSession) -> AppResult<()> {
        filter_set(&mut self.load_after, session)?;
        filter_set(&mut self.requirements, session)?;
        filter_set(&mut self.incompatibilities, session)?;
        filter_set(&mut self.tags, session)?;

        let mut verdicts = Vec::with_capacity(self.messages.len());
        for message in &mut self.messages {
            verdicts.push(message.eval_condition(session)?);
        }
        let mut verdicts = verdicts.into_iter();
        self.messages.retain(|_| verdicts.next().unwrap_or(false));

        if self.is_regex_entry() {
            self.dirty_info.clear();
        } else {
            let plugin_crc = session.crc_of(&self.name)?;
            let mut verdicts = Vec::with_capacity(self.dirty_info.len());
            for info in self.dirty_info.iter() {
                verdicts.push(info.eval(plugin_crc, session)?);
            }
            let mut verdicts = verdicts.into_iter();
            self.dirty_info.retain(|_| verdicts.next().unwrap_or(false));
        }

        Ok(())
    }
}

fn compile_name_pattern(pattern: &str) -> Result<Regex, MetadataError> {
    RegexBuilder::new(&format!("^(?:{pattern})$"))
        .case_insensitive(true)
        .build()
        .map_err(|source| MetadataError::InvalidNamePattern {
            pattern: pattern.to_owned(),
            source,
        })
}

fn symmetric_difference<T>(a: &IndexSet<T>, b: &IndexSet<T>) -> IndexSet<T>
where
    T: Clone + Eq + Hash,
{
    a.iter()
        .filter(|x| !b.contains(*x))
        .chain(b.iter().filter(|x| !a.contains(*x)))
        .cloned()
        .collect()
}

fn difference<T>(a: &IndexSet<T>, b: &IndexSet<T>) -> IndexSet<T>
where
    T: Clone + Eq + Hash,
{
    a.iter().filter(|x| !b.contains(*x)).cloned().collect()
}

/// Evaluates each entry's condition in order, keeping only those that pass.
/// Removal goes through *retain*, so iteration never skips or revisits.
fn filter_set<T>(set: &mut IndexSet<T>, session: &mut EvalSession) -> Result<(), ConditionError>
where
    T: Conditional + Eq + Hash,
{
    let mut verdicts = Vec::with_capacity(set.len());
    for entry in set.iter() {
        verdicts.push(entry.eval_condition(session)?);
    }

    let mut verdicts = verdicts.into_iter();
    set.retain(|_| verdicts.next().unwrap_or(false));

    Ok(())
}

/// The raw masterlist and userlist entries for a game, as loaded by an
/// external deserializer.
///
/// The raw lists are retained unmodified across evaluation passes; every pass
/// derives fresh evaluated copies, so re-evaluating after the environment
/// changed (say, the user toggled plugins) always starts from the same
/// baseline.
#[derive(Debug, Clone, Default)]
pub struct MetadataDb {
    masterlist: Vec<PluginMetadata>,
    userlist: Vec<PluginMetadata>,
}

impl MetadataDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_masterlist(&mut self, entries: Vec<PluginMetadata>) {
        self.masterlist = entries;
    }

    pub fn set_userlist(&mut self, entries: Vec<PluginMetadata>) {
        self.userlist = entries;
    }

    pub fn masterlist(&self) -> &[PluginMetadata] {
        &self.masterlist
    }

    pub fn userlist(&self) -> &[PluginMetadata] {
        &self.userlist
    }

    /// The merged, evaluated metadata for one installed plugin.
    ///
    /// Masterlist entries apply first, then userlist entries override and
    /// extend them, then conditions are resolved.
    pub fn evaluated_for(
        &self,
        plugin_name: &str,
        session: &mut EvalSession,
    ) -> AppResult<PluginMetadata> {
        let mut merged = PluginMetadata::new(plugin_name);

        for entry in &self.masterlist {
            if entry.name_matches(merged.name())? {
                merged.merge_metadata(entry);
            }
        }
        for entry in &self.userlist {
            if entry.name_matches(merged.name())? {
                merged.merge_metadata(entry);
            }
        }

        merged.eval_all_conditions(session)?;
        Ok(merged)
    }

    /// Expands pattern entries and produces evaluated metadata for every
    /// installed plugin, keyed by lower-cased plugin name.
    pub fn evaluate_all(
        &self,
        installed: &[String],
        session: &mut EvalSession,
    ) -> AppResult<IndexMap<String, PluginMetadata>> {
        let masterlist = expand_pattern_entries(&self.masterlist, installed)?;
        let userlist = expand_pattern_entries(&self.userlist, installed)?;

        let mut evaluated = IndexMap::with_capacity(installed.len());
        for name in installed {
            let mut merged = PluginMetadata::new(name);
            let key = merged.name().to_lowercase();

            for entry in masterlist
                .iter()
                .chain(userlist.iter())
                .filter(|e| e.name().to_lowercase() == key)
            {
                merged.merge_metadata(entry);
            }

            merged.eval_all_conditions(session)?;
            evaluated.insert(key, merged);
        }

        Ok(evaluated)
    }
}

/// Expands pattern entries against the installed plugin name set.
///
/// A pattern entry is a template: it contributes one concrete copy per
/// matching installed plugin (identical in everything but the name) and is
/// itself discarded. Literal entries pass through untouched.
pub fn expand_pattern_entries(
    entries: &[PluginMetadata],
    installed: &[String],
) -> Result<Vec<PluginMetadata>, MetadataError> {
    let mut expanded = Vec::with_capacity(entries.len());

    for entry in entries {
        if !entry.is_regex_entry() {
            expanded.push(entry.clone());
            continue;
        }

        let regex = compile_name_pattern(entry.name())?;
        for name in installed {
            let concrete = trim_ghost(name);
            if regex.is_match(concrete) {
                trace!("Expanding pattern entry \"{}\" for: {concrete}", entry.name());
                expanded.push(entry.renamed(concrete));
            }
        }
    }

    Ok(expanded)
}
