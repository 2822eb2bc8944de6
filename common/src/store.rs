//! File hand-off between mappers and reducers.
//!
//! Names encode ownership (`mr-{m}-{r}`, `mr-out-{r}`), so no locking is
//! needed. Every file is written under a temporary name in the target
//! directory and renamed into place once flushed: readers only ever see
//! complete files, and when two executions of the same task race, whichever
//! rename lands last wins with identical content.

use std::{
    fs::{self, File},
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::apps::KeyValue;
use crate::error::{MrError, Result};

pub const OUTPUT_PREFIX: &str = "mr-out-";

pub fn intermediate_name(map_index: usize, reduce_index: usize) -> String {
    format!("mr-{}-{}", map_index, reduce_index)
}

pub fn output_name(reduce_index: usize) -> String {
    format!("{}{}", OUTPUT_PREFIX, reduce_index)
}

pub fn intermediate_path(dir: &Path, map_index: usize, reduce_index: usize) -> PathBuf {
    dir.join(intermediate_name(map_index, reduce_index))
}

pub fn output_path(dir: &Path, reduce_index: usize) -> PathBuf {
    dir.join(output_name(reduce_index))
}

/// Writes `path` through a temp file in the same directory plus rename.
pub fn write_atomic<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        fill(&mut writer)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| MrError::Io(e.error))?;
    Ok(())
}

/// Publishes every bucket of one map task, one JSON object per line.
/// Empty buckets still produce an (empty) file.
pub fn write_intermediate(dir: &Path, map_index: usize, buckets: &[Vec<KeyValue>]) -> Result<()> {
    for (reduce_index, bucket) in buckets.iter().enumerate() {
        let path = intermediate_path(dir, map_index, reduce_index);
        write_atomic(&path, |w| {
            for kv in bucket {
                serde_json::to_writer(&mut *w, kv)?;
                w.write_all(b"\n")?;
            }
            Ok(())
        })?;
    }
    Ok(())
}

pub fn read_intermediate(dir: &Path, map_index: usize, reduce_index: usize) -> Result<Vec<KeyValue>> {
    let path = intermediate_path(dir, map_index, reduce_index);
    let file = match File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(MrError::MissingIntermediate(path));
        }
        Err(e) => return Err(e.into()),
    };

    let mut out = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        out.push(serde_json::from_str(&line)?);
    }
    Ok(out)
}

/// Writes the final `"key value"` lines of one reduce partition.
pub fn write_output(dir: &Path, reduce_index: usize, entries: &[(String, String)]) -> Result<()> {
    let path = output_path(dir, reduce_index);
    write_atomic(&path, |w| {
        for (key, value) in entries {
            writeln!(w, "{} {}", key, value)?;
        }
        Ok(())
    })
}

/// Removes all intermediate files of a finished job. Returns how many
/// files were actually deleted.
pub fn cleanup_intermediate(dir: &Path, n_map: usize, n_reduce: usize) -> Result<usize> {
    let mut removed = 0;
    for m in 0..n_map {
        for r in 0..n_reduce {
            match fs::remove_file(intermediate_path(dir, m, r)) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tmp() -> TempDir {
        TempDir::new().unwrap()
    }

    #[test]
    fn names_are_bit_exact() {
        assert_eq!(intermediate_name(3, 1), "mr-3-1");
        assert_eq!(output_name(7), "mr-out-7");
    }

    #[test]
    fn intermediate_files_are_written_per_bucket_and_read_back() {
        let dir = tmp();
        let buckets = vec![
            vec![KeyValue::new("a", "1"), KeyValue::new("a", "1")],
            vec![],
            vec![KeyValue::new("with space", "x y")],
        ];

        write_intermediate(dir.path(), 4, &buckets).unwrap();

        for r in 0..3 {
            assert!(intermediate_path(dir.path(), 4, r).exists());
        }
        assert_eq!(read_intermediate(dir.path(), 4, 0).unwrap(), buckets[0]);
        assert!(read_intermediate(dir.path(), 4, 1).unwrap().is_empty());
        assert_eq!(read_intermediate(dir.path(), 4, 2).unwrap(), buckets[2]);
    }

    #[test]
    fn reading_unpublished_intermediate_is_a_distinct_error() {
        let dir = tmp();
        let err = read_intermediate(dir.path(), 0, 0).unwrap_err();
        assert!(matches!(err, MrError::MissingIntermediate(_)));
    }

    #[test]
    fn output_uses_key_space_value_lines() {
        let dir = tmp();
        let entries = vec![
            ("a".to_string(), "2".to_string()),
            ("b".to_string(), "1".to_string()),
        ];
        write_output(dir.path(), 1, &entries).unwrap();

        let content = fs::read_to_string(output_path(dir.path(), 1)).unwrap();
        assert_eq!(content, "a 2\nb 1\n");
    }

    #[test]
    fn rewriting_a_file_replaces_it_whole() {
        let dir = tmp();
        let first = vec![("old".to_string(), "1".to_string()); 50];
        write_output(dir.path(), 0, &first).unwrap();

        let second = vec![("new".to_string(), "9".to_string())];
        write_output(dir.path(), 0, &second).unwrap();

        let content = fs::read_to_string(output_path(dir.path(), 0)).unwrap();
        assert_eq!(content, "new 9\n");
    }

    #[test]
    fn failed_fill_leaves_no_file_behind() {
        let dir = tmp();
        let path = dir.path().join("mr-out-0");
        let res = write_atomic(&path, |w| {
            w.write_all(b"partial")?;
            Err(io::Error::new(io::ErrorKind::Other, "boom"))
        });

        assert!(res.is_err());
        assert!(!path.exists());
        // temp file is dropped along with the error
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn write_atomic_creates_parent_directories() {
        let dir = tmp();
        let nested = dir.path().join("sub1").join("sub2");
        write_output(&nested, 0, &[]).unwrap();
        assert!(output_path(&nested, 0).exists());
    }

    #[test]
    fn cleanup_removes_only_existing_intermediates() {
        let dir = tmp();
        write_intermediate(dir.path(), 0, &[vec![], vec![]]).unwrap();
        write_output(dir.path(), 0, &[]).unwrap();

        // map 1 never ran, its files are simply absent
        let removed = cleanup_intermediate(dir.path(), 2, 2).unwrap();
        assert_eq!(removed, 2);
        assert!(output_path(dir.path(), 0).exists());
        assert!(!intermediate_path(dir.path(), 0, 0).exists());
    }
}
