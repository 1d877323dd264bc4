//! This module re-exports a bunch of utilities used across this crate.

#![allow(unused_imports)]

pub use tap::prelude::*;

pub use indexmap::{IndexMap, IndexSet};
pub use itertools::Itertools;
pub use thiserror::Error;

pub use log::debug;
pub use log::error;
pub use log::info;
pub use log::trace;
pub use log::warn;

pub use crate::error::AppError;
pub use crate::error::AppResult;
pub use crate::error::ConditionError;
pub use crate::error::MetadataError;
pub use crate::error::SortError;

pub use crate::condition::Condition;
pub use crate::env::{DataDir, Environment, EvalSession};
pub use crate::metadata::plugin::{MetadataDb, PluginMetadata};
pub use crate::metadata::{
    Conditional, DirtyInfo, File, Language, Location, Message, MessageContent, MessageType,
    Priority, Tag, GLOBAL_PRIORITY_DIVISOR,
};
pub use crate::plugin::{Plugin, RecordId};
pub use crate::sorter::{evaluate_and_sort, sort_load_order};
pub use crate::version::Version;
