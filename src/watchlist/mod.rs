//! Input watch-list and ranked output list files.

use crate::models::RankedList;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Read one symbol per line; blank lines are skipped, repeats keep the first.
pub fn read_symbols(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read watch-list {:?}", path))?;

    let mut seen = HashSet::new();
    let mut symbols = Vec::new();

    for line in text.lines() {
        let symbol = line.trim();
        if symbol.is_empty() {
            continue;
        }
        if !seen.insert(symbol.to_string()) {
            warn!("{}: listed more than once in {:?}", symbol, path);
            continue;
        }
        symbols.push(symbol.to_string());
    }

    debug!("{} symbols in {:?}", symbols.len(), path);
    Ok(symbols)
}

/// Replace `path` with the ranked symbols, one per line.
///
/// Goes through a uniquely named temp file in the same directory and a rename,
/// so readers never see a half-written list. The temp file is removed if any
/// step fails.
pub fn write_ranked(path: &Path, ranked: &RankedList) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(parent).with_context(|| format!("Could not create dir {:?}", parent))?;

    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {:?}", parent))?;
    for entry in ranked {
        writeln!(tmp, "{}", entry.symbol)?;
    }
    tmp.as_file().sync_all()?;

    tmp.persist(path)
        .with_context(|| format!("Failed to replace {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RankedEntry;

    #[test]
    fn test_read_symbols_skips_blanks_and_repeats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watch.txt");
        fs::write(&path, "DUK\n\n  NEE  \r\n\nDUK\nSO\n   \n").unwrap();

        assert_eq!(read_symbols(&path).unwrap(), vec!["DUK", "NEE", "SO"]);
    }

    #[test]
    fn test_read_symbols_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_symbols(&dir.path().join("nope.txt")).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read watch-list"));
    }

    #[test]
    fn test_write_ranked_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("buy-list.txt");

        let first = vec![
            RankedEntry { symbol: "A".into(), one_day: 5.0 },
            RankedEntry { symbol: "B".into(), one_day: 2.0 },
            RankedEntry { symbol: "C".into(), one_day: 1.5 },
        ];
        write_ranked(&path, &first).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "A\nB\nC\n");

        write_ranked(&path, &vec![RankedEntry { symbol: "D".into(), one_day: 3.0 }]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "D\n");
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_ranked_to_tmp_named_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buy-list.tmp");
        fs::write(&path, "OLD\n").unwrap();

        write_ranked(&path, &vec![RankedEntry { symbol: "A".into(), one_day: 3.0 }]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "A\n");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_ranked_failure_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in the way makes the final rename fail.
        let path = dir.path().join("buy-list.txt");
        fs::create_dir(&path).unwrap();

        let ranked = vec![RankedEntry { symbol: "A".into(), one_day: 3.0 }];
        assert!(write_ranked(&path, &ranked).is_err());

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("buy-list.txt")]);
    }

    #[test]
    fn test_write_ranked_empty_list_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buy-list.txt");
        fs::write(&path, "OLD\n").unwrap();

        write_ranked(&path, &Vec::new()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
