use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use common::split::split_by_lines;
use glob::glob;
use tracing::info;

use crate::config::CoordinatorConfig;

/// Expands every input (plain path or glob pattern) into regular files,
/// in the order given. Patterns that match nothing are an error.
pub fn resolve_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for pattern in patterns {
        let before = files.len();
        let entries = glob(pattern).with_context(|| format!("invalid input pattern '{}'", pattern))?;
        let mut matched: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .collect();
        matched.sort();
        files.extend(matched);

        if files.len() == before {
            bail!("input '{}' matched no files", pattern);
        }
    }

    Ok(files)
}

/// Builds the map task inputs: the resolved files themselves, or their
/// line chunks under `work_dir/splits/{input_index}/` when splitting is
/// configured.
pub fn prepare_map_inputs(config: &CoordinatorConfig) -> Result<Vec<String>> {
    let files = resolve_inputs(&config.inputs)?;

    let Some(max_lines) = config.split_lines else {
        return Ok(files.iter().map(|p| path_string(p)).collect());
    };

    // one directory per input, same-named files from different dirs must not collide
    let split_root = config.work_dir.join("splits");
    let mut chunks = Vec::new();
    for (i, file) in files.iter().enumerate() {
        let split_dir = split_root.join(i.to_string());
        let pieces = split_by_lines(file, &split_dir, max_lines)
            .with_context(|| format!("splitting {}", file.display()))?;
        info!("{} split into {} chunk(s)", file.display(), pieces.len());
        chunks.extend(pieces.into_iter().map(|c| path_string(&c.path)));
    }
    Ok(chunks)
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
