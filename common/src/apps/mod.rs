//! Map/Reduce applications the worker can run.
//!
//! The framework treats these as opaque callbacks: it hands them file
//! contents or grouped values and never looks inside.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::MrError;

pub mod indexer;
pub mod wordcount;

/// One pair emitted by a Map callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

pub trait MapReduceApp: Send + Sync {
    fn name(&self) -> &'static str;

    /// `(filename, contents) -> [(key, value)]`, in any order.
    fn map(&self, filename: &str, contents: &str) -> anyhow::Result<Vec<KeyValue>>;

    /// Called once per distinct key of a partition.
    fn reduce(&self, key: &str, values: &[String]) -> anyhow::Result<String>;
}

pub const AVAILABLE_APPS: &[&str] = &["wordcount", "indexer"];

pub fn by_name(name: &str) -> Result<Arc<dyn MapReduceApp>, MrError> {
    match name {
        "wordcount" | "wc" => Ok(Arc::new(wordcount::WordCount)),
        "indexer" => Ok(Arc::new(indexer::Indexer)),
        other => Err(MrError::UnknownApp(other.to_string())),
    }
}
