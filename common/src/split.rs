use std::{
    fs::{self, File},
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::error::{MrError, Result};

/// A slice of an input file that becomes its own map task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputChunk {
    pub source: PathBuf,
    pub line_start: usize,
    pub line_end: usize,
    pub path: PathBuf,
}

impl InputChunk {
    pub fn line_count(&self) -> usize {
        self.line_end - self.line_start
    }
}

/// Cuts `path` into files of at most `max_lines` lines under `out_dir`,
/// named `{file_name}.chunk-{i}`.
///
/// An empty source still yields one (empty) chunk.
pub fn split_by_lines(path: &Path, out_dir: &Path, max_lines: usize) -> Result<Vec<InputChunk>> {
    if max_lines == 0 {
        return Err(MrError::InvalidConfig(
            "split size must be at least one line".to_string(),
        ));
    }
    fs::create_dir_all(out_dir)?;

    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());

    let mut lines = BufReader::new(File::open(path)?).lines().peekable();
    let mut chunks = Vec::new();
    let mut line_start = 0;

    loop {
        let chunk_path = out_dir.join(format!("{}.chunk-{}", file_name, chunks.len()));
        let mut writer = BufWriter::new(File::create(&chunk_path)?);
        let mut written = 0;

        while written < max_lines {
            match lines.next() {
                Some(line) => {
                    writer.write_all(line?.as_bytes())?;
                    writer.write_all(b"\n")?;
                    written += 1;
                }
                None => break,
            }
        }
        writer.flush()?;

        chunks.push(InputChunk {
            source: path.to_path_buf(),
            line_start,
            line_end: line_start + written,
            path: chunk_path,
        });
        line_start += written;

        if lines.peek().is_none() {
            break;
        }
    }

    Ok(chunks)
}
