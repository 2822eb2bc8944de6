use std::collections::BTreeSet;
use std::path::Path;

use super::wordcount::tokenize;
use super::{KeyValue, MapReduceApp};

/// Inverted index: word -> documents containing it.
///
/// Output value is `"<count> <doc1>,<doc2>,..."` with documents sorted.
pub struct Indexer;

fn document_name(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string())
}

impl MapReduceApp for Indexer {
    fn name(&self) -> &'static str {
        "indexer"
    }

    fn map(&self, filename: &str, contents: &str) -> anyhow::Result<Vec<KeyValue>> {
        let doc = document_name(filename);
        let words: BTreeSet<String> = tokenize(contents).collect();
        Ok(words
            .into_iter()
            .map(|w| KeyValue::new(w, doc.clone()))
            .collect())
    }

    fn reduce(&self, _key: &str, values: &[String]) -> anyhow::Result<String> {
        let docs: BTreeSet<&str> = values.iter().map(String::as_str).collect();
        let joined = docs.iter().copied().collect::<Vec<_>>().join(",");
        Ok(format!("{} {}", docs.len(), joined))
    }
}
