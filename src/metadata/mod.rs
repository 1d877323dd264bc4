//! Metadata entities attached to plugins by masterlists and userlists.
//!
//! Every entity here except *Location* can carry a condition string gating
//! whether it applies to the current install; the [*Conditional*] trait
//! exposes that capability. Set-like entities compare case-insensitively by
//! their identity field only, so merging collapses duplicates even when their
//! display strings or conditions differ.

pub mod plugin;

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Priorities with a magnitude at or beyond this divisor are global: they
/// order plugins regardless of whether their records overlap. The value is
/// part of the metadata list contract and must not change.
pub const GLOBAL_PRIORITY_DIVISOR: i32 = 1_000_000;

/// Characters that cannot appear in a real filename but are meaningful in a
/// regex. A metadata entry whose name contains one is a pattern entry that
/// matches a family of plugins. This trigger set is a documented heuristic
/// existing metadata lists rely on; it must be preserved exactly.
const NAME_PATTERN_CHARS: [char; 5] = [':', '\\', '*', '?', '|'];

/// Whether a metadata name is a pattern entry rather than a literal filename.
pub fn is_name_pattern(name: &str) -> bool {
    name.chars().any(|c| NAME_PATTERN_CHARS.contains(&c))
}

/// Strips a trailing '.ghost' extension, case-insensitively.
pub(crate) fn trim_ghost(name: &str) -> &str {
    let len = name.len();
    if len >= 6 && name.is_char_boundary(len - 6) && name[len - 6..].eq_ignore_ascii_case(".ghost")
    {
        &name[..len - 6]
    } else {
        name
    }
}

/// The capability of being gated by a condition.
pub trait Conditional {
    /// The compiled condition, if one is set.
    fn condition(&self) -> Option<&Condition>;

    fn is_conditional(&self) -> bool {
        self.condition().is_some()
    }

    /// Evaluates the condition, defaulting to true when none is set.
    fn eval_condition(&self, session: &mut EvalSession) -> Result<bool, ConditionError> {
        match self.condition() {
            Some(condition) => condition.eval(session),
            None => Ok(true),
        }
    }
}

/// The languages metadata messages may be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "any")]
    Any,
    #[serde(rename = "en")]
    English,
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "ru")]
    Russian,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "zh")]
    Chinese,
    #[serde(rename = "pl")]
    Polish,
    #[serde(rename = "pt_BR")]
    BrazilianPortuguese,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "da")]
    Danish,
    #[serde(rename = "ko")]
    Korean,
}

impl Language {
    /// Maps an ISO-style code to a language, falling back to *Any*.
    pub fn from_code(code: &str) -> Self {
        match code.to_lowercase().as_str() {
            "en" => Self::English,
            "es" => Self::Spanish,
            "ru" => Self::Russian,
            "fr" => Self::French,
            "zh" => Self::Chinese,
            "pl" => Self::Polish,
            "pt_br" | "pt-br" => Self::BrazilianPortuguese,
            "de" => Self::German,
            "da" => Self::Danish,
            "ko" => Self::Korean,
            _ => Self::Any,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::English => "en",
            Self::Spanish => "es",
            Self::Russian => "ru",
            Self::French => "fr",
            Self::Chinese => "zh",
            Self::Polish => "pl",
            Self::BrazilianPortuguese => "pt_BR",
            Self::German => "de",
            Self::Danish => "da",
            Self::Korean => "ko",
        }
    }
}

/// How severe a message is when shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Say,
    Warn,
    Error,
}

/// One localization of a message's text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageContent {
    text: String,
    language: Language,
}

impl MessageContent {
    pub fn new(text: impl Into<String>, language: Language) -> Self {
        Self {
            text: text.into(),
            language,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> Language {
        self.language
    }
}

impl PartialEq for MessageContent {
    fn eq(&self, other: &Self) -> bool {
        self.language == other.language && self.text.to_lowercase() == other.text.to_lowercase()
    }
}

impl Eq for MessageContent {}

/// A message attached to a plugin, shown in reports.
///
/// Messages live in an order-preserving list rather than a set: their order
/// affects display, and merging concatenates rather than deduplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    kind: MessageType,
    content: Vec<MessageContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    condition: Option<Condition>,
}

impl Message {
    /// A message with a single, language-neutral content string.
    pub fn new(kind: MessageType, text: impl Into<String>) -> Self {
        Self {
            kind,
            content: vec![MessageContent::new(text, Language::Any)],
            condition: None,
        }
    }

    pub fn with_content(kind: MessageType, content: Vec<MessageContent>) -> Self {
        Self {
            kind,
            content,
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn kind(&self) -> MessageType {
        self.kind
    }

    pub fn content(&self) -> &[MessageContent] {
        &self.content
    }

    /// Multilingual messages must carry an English entry to fall back on.
    /// Loaders call this when deserializing a metadata list.
    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.content.len() > 1
            && !self
                .content
                .iter()
                .any(|c| c.language() == Language::English)
        {
            return Err(MetadataError::MissingEnglishContent);
        }
        Ok(())
    }

    /// Reduces the content list to the single entry for the given language.
    ///
    /// With one entry, or when any language is acceptable, the first entry
    /// wins. Otherwise an exact match is preferred, then English, then the
    /// first entry. Idempotent, so re-evaluation within a pass cannot pick a
    /// different entry.
    pub fn select_language(&mut self, language: Language) {
        if self.content.len() <= 1 {
            return;
        }

        let chosen = if language == Language::Any {
            0
        } else {
            self.content
                .iter()
                .position(|c| c.language() == language)
                .or_else(|| {
                    self.content
                        .iter()
                        .position(|c| c.language() == Language::English)
                })
                .unwrap_or(0)
        };

        self.content.swap(0, chosen);
        self.content.truncate(1);
    }

    /// Like *select_language*, but without mutating the message.
    pub fn chosen_content(&self, language: Language) -> Option<&MessageContent> {
        if self.content.len() <= 1 || language == Language::Any {
            return self.content.first();
        }

        self.content
            .iter()
            .find(|c| c.language() == language)
            .or_else(|| {
                self.content
                    .iter()
                    .find(|c| c.language() == Language::English)
            })
            .or_else(|| self.content.first())
    }

    /// Resolves the message's language for the session, then evaluates its
    /// condition. Language resolution happens at most once per pass; once the
    /// content is reduced, re-evaluation leaves it untouched.
    pub fn eval_condition(&mut self, session: &mut EvalSession) -> Result<bool, ConditionError> {
        self.select_language(session.language());
        Conditional::eval_condition(&*self, session)
    }
}

impl Conditional for Message {
    fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }
}

/// A named file reference, used for load-after hints, requirements and
/// incompatibilities. Identity is the case-insensitive name; the display
/// string and condition are ignored by comparison, so merging sets keeps
/// whichever value arrived first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    condition: Option<Condition>,
}

impl File {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display: None,
            condition: None,
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The display string if set, otherwise the file name.
    pub fn display_name(&self) -> &str {
        self.display.as_deref().unwrap_or(&self.name)
    }
}

impl Conditional for File {
    fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }
}

impl PartialEq for File {
    fn eq(&self, other: &Self) -> bool {
        self.name.to_lowercase() == other.name.to_lowercase()
    }
}

impl Eq for File {}

impl Hash for File {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.to_lowercase().hash(state);
    }
}

impl PartialOrd for File {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for File {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.to_lowercase().cmp(&other.name.to_lowercase())
    }
}

/// A Bash Tag suggestion: either an addition or a removal of a named tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    name: String,
    is_addition: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    condition: Option<Condition>,
}

impl Tag {
    pub fn new(name: impl Into<String>, is_addition: bool) -> Self {
        Self {
            name: name.into(),
            is_addition,
            condition: None,
        }
    }

    /// Parses the masterlist spelling, where a leading '-' marks a removal.
    pub fn from_spec(spec: &str) -> Self {
        match spec.strip_prefix('-') {
            Some(name) => Self::new(name, false),
            None => Self::new(spec, true),
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_addition(&self) -> bool {
        self.is_addition
    }
}

impl Conditional for Tag {
    fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.is_addition == other.is_addition
            && self.name.to_lowercase() == other.name.to_lowercase()
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.is_addition.hash(state);
        self.name.to_lowercase().hash(state);
    }
}

impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tag {
    fn cmp(&self, other: &Self) -> Ordering {
        // Additions sort before removals; the exact choice matters less than
        // it being stable.
        other
            .is_addition
            .cmp(&self.is_addition)
            .then_with(|| self.name.to_lowercase().cmp(&other.name.to_lowercase()))
    }
}

/// Dirty-plugin information for one exact build of a plugin, identified by
/// CRC. Counts cover identical-to-master records, undeleted-but-disabled
/// records and deleted navmeshes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirtyInfo {
    crc: u32,
    #[serde(default)]
    itm: u32,
    #[serde(default)]
    udr: u32,
    #[serde(default)]
    nav: u32,
    utility: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    condition: Option<Condition>,
}

impl DirtyInfo {
    pub fn new(crc: u32, itm: u32, udr: u32, nav: u32, utility: impl Into<String>) -> Self {
        Self {
            crc,
            itm,
            udr,
            nav,
            utility: utility.into(),
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn crc(&self) -> u32 {
        self.crc
    }

    /// Identical-to-master record count.
    pub fn itm_count(&self) -> u32 {
        self.itm
    }

    /// Undeleted-but-disabled record count.
    pub fn udr_count(&self) -> u32 {
        self.udr
    }

    pub fn deleted_navmesh_count(&self) -> u32 {
        self.nav
    }

    pub fn cleaning_utility(&self) -> &str {
        &self.utility
    }

    /// Whether this entry applies to a plugin with the given CRC.
    ///
    /// The CRC must match before the condition is even consulted; dirty info
    /// recorded for a different build of the same plugin never applies.
    pub fn eval(
        &self,
        plugin_crc: Option<u32>,
        session: &mut EvalSession,
    ) -> Result<bool, ConditionError> {
        if plugin_crc != Some(self.crc) {
            return Ok(false);
        }
        self.eval_condition(session)
    }
}

impl Conditional for DirtyInfo {
    fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }
}

impl PartialEq for DirtyInfo {
    fn eq(&self, other: &Self) -> bool {
        self.crc == other.crc
    }
}

impl Eq for DirtyInfo {}

impl Hash for DirtyInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.crc.hash(state);
    }
}

impl PartialOrd for DirtyInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DirtyInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.crc.cmp(&other.crc)
    }
}

/// An informational URL for a plugin, e.g. its download page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl Location {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.url.to_lowercase() == other.url.to_lowercase()
    }
}

impl Eq for Location {}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.to_lowercase().hash(state);
    }
}

/// A plugin's sorting priority: a bounded value, a global flag, and whether
/// the value was set explicitly rather than defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Priority {
    value: i32,
    is_global: bool,
    explicit: bool,
}

impl Priority {
    /// An explicitly set priority. The magnitude must stay below
    /// [*GLOBAL_PRIORITY_DIVISOR*]; larger values are reserved for encoding
    /// the global flag in serialized lists.
    pub fn new(value: i32, is_global: bool) -> Result<Self, MetadataError> {
        if value.unsigned_abs() >= GLOBAL_PRIORITY_DIVISOR as u32 {
            return Err(MetadataError::PriorityOutOfRange(i64::from(value)));
        }

        Ok(Self {
            value,
            is_global,
            explicit: true,
        })
    }

    /// Decodes the combined on-disk value, where a magnitude at or beyond the
    /// divisor marks the priority as global. The remainder is taken
    /// sign-preserving: -1000005 decodes to a global -5, never +999995.
    pub fn from_raw(raw: i64) -> Self {
        let divisor = i64::from(GLOBAL_PRIORITY_DIVISOR);
        let is_global = raw.abs() >= divisor;
        let value = if raw < 0 {
            -((-raw) % divisor)
        } else {
            raw % divisor
        };

        Self {
            value: value as i32,
            is_global,
            explicit: raw != 0,
        }
    }

    /// The normalized value, always below the divisor in magnitude.
    pub fn value(self) -> i32 {
        self.value
    }

    pub fn is_global(self) -> bool {
        self.is_global
    }

    /// A zero priority only counts as explicit if it was actually set; a
    /// nonzero value is always explicit.
    pub fn is_explicit(self) -> bool {
        self.value != 0 || self.explicit
    }

    /// Re-encodes the combined value used by serialized metadata lists.
    pub fn raw(self) -> i64 {
        let value = i64::from(self.value);
        if !self.is_global {
            value
        } else if value < 0 {
            value - i64::from(GLOBAL_PRIORITY_DIVISOR)
        } else {
            value + i64::from(GLOBAL_PRIORITY_DIVISOR)
        }
    }
}

#[cfg(test)]
mod tests;
