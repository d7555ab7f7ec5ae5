use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::GameRecord;

/// Lists the `.jsonl` files making up a dump: the file itself, or every
/// shard under a directory sorted by path.
pub fn dump_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        return Err(Error::NotFound(format!("dump {}", path.display())));
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(path).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
        let p = entry.path(); if p.extension().and_then(|s| s.to_str()) == Some("jsonl") { files.push(p.to_path_buf()); }
    }
    files.sort();
    Ok(files)
}

/// Reads every record of a dump in file order.
pub fn read_dump(path: &Path) -> Result<Vec<GameRecord>> {
    let mut records = Vec::new();
    for file in dump_files(path)? {
        let content = fs::read_to_string(&file)?;
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() { continue; }
            let record: GameRecord = serde_json::from_str(line).map_err(|e| {
                Error::Operation(format!("{}:{}: {}", file.display(), line_no + 1, e))
            })?;
            records.push(record);
        }
    }
    Ok(records)
}
