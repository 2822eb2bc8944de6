//! Task execution. Everything here is blocking file I/O plus the user
//! callbacks; the worker loop runs it on the blocking pool.

use std::{collections::BTreeMap, fs, path::Path};

use common::{
    partition::bucketize,
    store::{read_intermediate, write_intermediate, write_output},
    MapReduceApp, MrError, TaskKind,
};

/// Map task `task_index`: reads `input_path`, maps it, publishes
/// `mr-{task_index}-{r}` for every `r < n_reduce`. Returns the number of
/// pairs emitted.
pub fn execute_map(
    app: &dyn MapReduceApp,
    work_dir: &Path,
    task_index: usize,
    input_path: &str,
    n_reduce: usize,
) -> Result<usize, MrError> {
    let contents = fs::read_to_string(input_path)?;
    let pairs = app
        .map(input_path, &contents)
        .map_err(|e| MrError::callback(TaskKind::Map, e))?;
    let emitted = pairs.len();

    let buckets = bucketize(pairs, n_reduce);
    write_intermediate(work_dir, task_index, &buckets)?;
    Ok(emitted)
}

/// Reduce task for partition `task_index`: gathers `mr-{m}-{task_index}`
/// from every map task, reduces each distinct key once and publishes
/// `mr-out-{task_index}` sorted by key. Returns the number of keys.
pub fn execute_reduce(
    app: &dyn MapReduceApp,
    work_dir: &Path,
    task_index: usize,
    n_map: usize,
) -> Result<usize, MrError> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for m in 0..n_map {
        for kv in read_intermediate(work_dir, m, task_index)? {
            grouped.entry(kv.key).or_default().push(kv.value);
        }
    }

    let mut entries = Vec::with_capacity(grouped.len());
    for (key, values) in grouped {
        let value = app
            .reduce(&key, &values)
            .map_err(|e| MrError::callback(TaskKind::Reduce, e))?;
        entries.push((key, value));
    }

    write_output(work_dir, task_index, &entries)?;
    Ok(entries.len())
}
