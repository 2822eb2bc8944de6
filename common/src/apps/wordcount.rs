use super::{KeyValue, MapReduceApp};

/// Classic word count: every token maps to "1", reduce counts them.
pub struct WordCount;

/// Normalizes a raw whitespace-separated chunk into a token:
/// keeps alphanumerics and '_', lowercased.
pub fn clean_token(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect::<String>()
        .to_lowercase()
}

pub fn tokenize(contents: &str) -> impl Iterator<Item = String> + '_ {
    contents
        .split_whitespace()
        .map(clean_token)
        .filter(|t| !t.is_empty())
}

impl MapReduceApp for WordCount {
    fn name(&self) -> &'static str {
        "wordcount"
    }

    fn map(&self, _filename: &str, contents: &str) -> anyhow::Result<Vec<KeyValue>> {
        Ok(tokenize(contents).map(|t| KeyValue::new(t, "1")).collect())
    }

    fn reduce(&self, _key: &str, values: &[String]) -> anyhow::Result<String> {
        Ok(values.len().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_normalizes_and_emits_one_per_token() {
        let out = WordCount
            .map("in.txt", "Hola hola, mundo!!\nmundo   mundo_prueba")
            .unwrap();
        let keys: Vec<&str> = out.iter().map(|kv| kv.key.as_str()).collect();
        assert_eq!(keys, vec!["hola", "hola", "mundo", "mundo", "mundo_prueba"]);
        assert!(out.iter().all(|kv| kv.value == "1"));
    }

    #[test]
    fn map_on_empty_input_emits_nothing() {
        assert!(WordCount.map("empty.txt", "").unwrap().is_empty());
        assert!(WordCount.map("punct.txt", "!! ?? ...").unwrap().is_empty());
    }

    #[test]
    fn reduce_counts_values() {
        let values = vec!["1".to_string(); 3];
        assert_eq!(WordCount.reduce("test", &values).unwrap(), "3");
    }
}
