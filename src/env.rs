//! Environment access and per-pass evaluation state.
//!
//! The sorting core never reaches into the filesystem directly; everything it
//! needs to know about the installed game goes through the [*Environment*]
//! trait. [*DataDir*] is the real, filesystem-backed implementation; tests
//! substitute mocks to instrument probe counts.
//!
//! [*EvalSession*] owns the condition result cache and the CRC cache as
//! explicit state scoped to one evaluation pass, so multiple game profiles
//! stay isolated and cache lifetime is testable. Call
//! [*EvalSession::clear*] (or build a fresh session) before re-evaluating
//! after the environment changed, e.g. after the active plugin set was
//! edited; stale booleans from a previous pass must never leak into the next.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::metadata::Language;
use crate::prelude::*;

/// Queries the sorting core makes about the installed environment.
pub trait Environment {
    /// Checks whether the named file exists under the data directory.
    /// Plugin files may be present with a '.ghost' suffix instead.
    fn file_exists(&self, name: &str) -> io::Result<bool>;

    /// The CRC-32 of the named file, or *None* if it does not exist.
    fn crc(&self, name: &str) -> io::Result<Option<u32>>;

    /// Whether the named plugin is in the game's active load order.
    fn is_plugin_active(&self, name: &str) -> bool;

    /// The version string of the named file, if one can be read from it.
    /// For plugins this comes from the description field of their headers; for
    /// executables, from a version resource. Both are external concerns, which
    /// is why the core asks rather than parses.
    fn file_version(&self, name: &str) -> io::Result<Option<String>>;

    /// The names of all files at the top level of the data directory.
    fn installed_names(&self) -> io::Result<Vec<String>>;
}

/// A game data directory on disk.
///
/// The active plugin set and any known version strings are supplied by the
/// caller, since reading them requires game-specific parsing this crate does
/// not do.
pub struct DataDir {
    root: PathBuf,
    active: IndexSet<String>,
    versions: HashMap<String, String>,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            active: IndexSet::new(),
            versions: HashMap::new(),
        }
    }

    /// Replaces the set of active plugin names.
    pub fn set_active_plugins<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active = names.into_iter().map(|n| n.into().to_lowercase()).collect();
    }

    /// Records a version string for a file, as read by an external parser.
    pub fn set_file_version(&mut self, name: impl Into<String>, version: impl Into<String>) {
        self.versions
            .insert(name.into().to_lowercase(), version.into());
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a name to an on-disk path, trying the '.ghost' suffix too.
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let direct = self.root.join(name);
        if direct.exists() {
            return Some(direct);
        }

        let ghosted = self.root.join(format!("{name}.ghost"));
        ghosted.exists().then_some(ghosted)
    }
}

impl Environment for DataDir {
    fn file_exists(&self, name: &str) -> io::Result<bool> {
        Ok(self.resolve(name).is_some())
    }

    fn crc(&self, name: &str) -> io::Result<Option<u32>> {
        let Some(path) = self.resolve(name) else {
            return Ok(None);
        };

        let contents = std::fs::read(&path)?;
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&contents);
        Ok(Some(hasher.finalize()))
    }

    fn is_plugin_active(&self, name: &str) -> bool {
        self.active.contains(&name.to_lowercase())
    }

    fn file_version(&self, name: &str) -> io::Result<Option<String>> {
        Ok(self.versions.get(&name.to_lowercase()).cloned())
    }

    fn installed_names(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(io::Error::from)?;
            if entry.file_type().is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }
}

/// State for one evaluation pass: the environment, the selected message
/// language, and the memoization caches.
pub struct EvalSession<'a> {
    env: &'a dyn Environment,
    language: Language,
    conditions: HashMap<String, bool>,
    crcs: HashMap<String, Option<u32>>,
    names: Option<Vec<String>>,
}

impl<'a> EvalSession<'a> {
    pub fn new(env: &'a dyn Environment, language: Language) -> Self {
        Self {
            env,
            language,
            conditions: HashMap::new(),
            crcs: HashMap::new(),
            names: None,
        }
    }

    pub fn env(&self) -> &dyn Environment {
        self.env
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Looks up a memoized condition result. Keys are lower-cased condition
    /// texts; see [*Condition::eval*](crate::condition::Condition::eval).
    pub fn cached_condition(&self, key: &str) -> Option<bool> {
        self.conditions.get(key).copied()
    }

    pub fn cache_condition(&mut self, key: String, value: bool) {
        self.conditions.insert(key, value);
    }

    /// The CRC-32 of the named file, memoized by lower-cased name.
    pub fn crc_of(&mut self, name: &str) -> Result<Option<u32>, ConditionError> {
        let key = name.to_lowercase();
        if let Some(&cached) = self.crcs.get(&key) {
            return Ok(cached);
        }

        let crc = self.env.crc(name).map_err(|source| ConditionError::Probe {
            path: PathBuf::from(name),
            source,
        })?;
        self.crcs.insert(key, crc);

        Ok(crc)
    }

    pub fn file_exists(&self, name: &str) -> Result<bool, ConditionError> {
        self.env
            .file_exists(name)
            .map_err(|source| ConditionError::Probe {
                path: PathBuf::from(name),
                source,
            })
    }

    pub fn file_version(&self, name: &str) -> Result<Option<String>, ConditionError> {
        self.env
            .file_version(name)
            .map_err(|source| ConditionError::Probe {
                path: PathBuf::from(name),
                source,
            })
    }

    /// The installed file name list, scanned once per pass.
    pub fn installed_names(&mut self) -> Result<Vec<String>, ConditionError> {
        if let Some(names) = &self.names {
            return Ok(names.clone());
        }

        let names = self
            .env
            .installed_names()
            .map_err(|source| ConditionError::Probe {
                path: PathBuf::from("."),
                source,
            })?;
        self.names = Some(names.clone());

        Ok(names)
    }

    /// Drops all memoized state ahead of a new evaluation pass.
    pub fn clear(&mut self) {
        self.conditions.clear();
        self.crcs.clear();
        self.names = None;
    }
}
