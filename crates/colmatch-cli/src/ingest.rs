//! Loading datasets and contexts from disk.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use colmatch_model::{Dataset, DatasetContext};

const UTF8_BOM: char = '\u{feff}';

/// Read a CSV file with a header row into a [`Dataset`].
///
/// Short rows are kept as-is; rows longer than the header are rejected.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("read header of {}", path.display()))?
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let header = if idx == 0 {
                header.trim_start_matches(UTF8_BOM)
            } else {
                header
            };
            header.trim().to_string()
        })
        .collect();

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("read record {} of {}", idx + 1, path.display()))?;
        rows.push(record.iter().map(|value| value.trim().to_string()).collect());
    }

    let dataset = Dataset::new(headers, rows)
        .with_context(|| format!("invalid dataset {}", path.display()))?;
    tracing::info!(
        "Loaded {} ({} columns, {} rows)",
        path.display(),
        dataset.column_count(),
        dataset.row_count()
    );
    Ok(dataset)
}

/// Read a dataset context from a `.json` or `.toml` file.
pub fn load_context(path: &Path) -> Result<DatasetContext> {
    let content =
        fs::read_to_string(path).with_context(|| format!("read context {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let context = if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("parse JSON context {}", path.display()))?
    } else {
        toml::from_str(&content).with_context(|| format!("parse TOML context {}", path.display()))?
    };
    Ok(context)
}
