//! JSON helpers for traces and reports.
//!
//! - `load_trace_json`: read a `{ "distance": [...], "raw_height": [...] }` file.
//! - `write_json_file`: pretty-print a serializable value to disk.
use crate::types::Trace;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load and validate a trace stored as two JSON columns.
pub fn load_trace_json(path: &Path) -> Result<Trace, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read trace {}: {e}", path.display()))?;
    serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse trace {}: {e}", path.display()))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}
