use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::prelude::*;
use serde::Serialize;

/// Write `value` as JSON to `destination`, or to stdout when there is none
pub fn write_json<T: Serialize>(
    value: &T,
    destination: Option<&Path>,
    pretty: bool,
) -> Result<()> {
    match destination {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            encode_to_writer(value, BufWriter::new(file), pretty)?;
            debug!("Process forest written to {}", path.display());
        }
        None => encode_to_writer(value, io::stdout().lock(), pretty)?,
    }
    Ok(())
}

fn encode_to_writer<T: Serialize, W: Write>(
    value: &T,
    mut writer: W,
    pretty: bool,
) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, value)?;
    } else {
        serde_json::to_writer(&mut writer, value)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_encode_compact_and_pretty() {
        let value = json!({ "detected_cycles": false });

        let mut compact = Vec::new();
        encode_to_writer(&value, &mut compact, false).unwrap();
        assert_eq!(String::from_utf8(compact).unwrap(), "{\"detected_cycles\":false}\n");

        let mut pretty = Vec::new();
        encode_to_writer(&value, &mut pretty, true).unwrap();
        assert_eq!(
            String::from_utf8(pretty).unwrap(),
            "{\n  \"detected_cycles\": false\n}\n"
        );
    }

    #[test]
    fn test_write_json_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports").join("forest.json");

        write_json(&json!([1, 2]), Some(&path), false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[1,2]\n");
    }
}
