use std::path::Path;

use anyhow::{Context, Result};
use ckt_sch::Diagram;

/// Reads and settles a diagram file.
pub fn load_diagram(path: &Path) -> Result<Diagram> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    log::debug!("Loading {}", path.display());
    Diagram::from_json_str(&text).with_context(|| format!("Failed to load diagram {}", path.display()))
}

/// Display name used in status lines.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
