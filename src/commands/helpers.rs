//! Command helper utilities

use std::io::{Read, Write};
use std::path::Path;

use serde::Serialize;

use crate::bundle::ensure_file;
use crate::error::fs::{io_error, write_failed};
use crate::error::{Result, fs};

/// Marker for stdin / stdout in place of a file path
pub const STDIO: &str = "-";

/// Read a whole input file, or stdin for `-`
pub fn read_input(source: &str) -> Result<String> {
    if source == STDIO {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| io_error(format!("Failed to read stdin: {}", e)))?;
        return Ok(text);
    }

    let path = Path::new(source);
    ensure_file(path)?;
    fs::read_to_string(path)
}

/// Write `value` as pretty JSON to a file, or stdout for `-`
pub fn write_output<T: Serialize + ?Sized>(destination: &str, value: &T) -> Result<()> {
    let mut json = serde_json::to_string_pretty(value)
        .map_err(|e| write_failed(destination, e.to_string()))?;
    json.push('\n');

    if destination == STDIO {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(json.as_bytes())
            .and_then(|()| stdout.flush())
            .map_err(|e| io_error(format!("Failed to write stdout: {}", e)))?;
        return Ok(());
    }

    std::fs::write(destination, json).map_err(|e| write_failed(destination, e.to_string()))
}
