//! Completion checks based purely on what is already on disk.
//!
//! There is no run ledger and no input fingerprinting: an output that exists
//! (with enough rows) is trusted even if its inputs changed since.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::error::{PipelineError, Result};

/// Counts non-empty lines, stopping once `limit` is reached.
pub fn count_rows<P: AsRef<Path>>(path: P, limit: Option<usize>) -> Result<usize> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut n_rows = 0;
    for line in BufReader::new(file).split(b'\n') {
        let line = line.map_err(|e| PipelineError::io(path, e))?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        n_rows += 1;
        if limit.map_or(false, |l| n_rows >= l) {
            break;
        }
    }
    Ok(n_rows)
}

/// True if `path` is a file and, when `min_rows` > 0, holds at least that many
/// records. An empty or truncated file from a failed run is not complete.
pub fn is_complete<P: AsRef<Path>>(path: P, min_rows: usize) -> Result<bool> {
    let path = path.as_ref();
    if !path.is_file() {
        log::debug!("{} is not a file yet", path.display());
        return Ok(false);
    }
    if min_rows == 0 {
        return Ok(true);
    }
    let n_rows = count_rows(path, Some(min_rows))?;
    log::debug!("{} has at least {n_rows} rows, need {min_rows}", path.display());
    Ok(n_rows >= min_rows)
}

#[cfg(test)]
mod test {
    use assert_fs::{prelude::*, TempDir};

    use super::*;

    #[test]
    fn test_missing() -> eyre::Result<()> {
        let temp_dir = TempDir::new()?;
        let output = temp_dir.child("RUN_AllEnhancers.table.txt");
        assert!(!is_complete(&output, 0)?);
        assert!(!is_complete(&output, 5)?);
        Ok(())
    }

    #[test]
    fn test_rows() -> eyre::Result<()> {
        let temp_dir = TempDir::new()?;
        let output = temp_dir.child("RUN_AllEnhancers.table.txt");
        output.write_str("REGION_ID\tCHROM\n\n1\tchr1\n2\tchr2\n")?;
        assert_eq!(count_rows(&output, None)?, 3);
        assert_eq!(count_rows(&output, Some(2))?, 2);
        assert!(is_complete(&output, 0)?);
        assert!(is_complete(&output, 3)?);
        assert!(!is_complete(&output, 4)?);
        Ok(())
    }

    #[test]
    fn test_directory_is_not_output() -> eyre::Result<()> {
        let temp_dir = TempDir::new()?;
        let output = temp_dir.child("RUN/RUN_AllEnhancers.table.txt");
        output.create_dir_all()?;
        assert!(!is_complete(&output, 0)?);
        assert!(!is_complete(&output, 1)?);
        Ok(())
    }

    #[test]
    fn test_empty_file() -> eyre::Result<()> {
        let temp_dir = TempDir::new()?;
        let output = temp_dir.child("empty.txt");
        output.touch()?;
        assert!(is_complete(&output, 0)?);
        assert!(!is_complete(&output, 1)?);
        Ok(())
    }
}
