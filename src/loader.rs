use anyhow::{Context as AnyhowContext, Result};
use std::fs;
use std::path::Path;

use crate::document::locator;
use crate::schema::ConstructSchema;

/// Reads a document from disk. The text is returned as is; only the
/// presence of a top-level `workflows:` key is checked.
pub fn load_document(file_path: impl AsRef<Path>) -> Result<String> {
    let path = file_path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read document from {}", path.display()))?;

    let lines: Vec<String> = text.lines().map(str::to_string).collect();
    let has_root = (0..lines.len())
        .filter_map(|i| locator::entry_at(&lines, i))
        .any(|b| b.key == "workflows" && b.indent == 0);
    if !has_root {
        anyhow::bail!("{} has no top-level 'workflows' key", path.display());
    }
    Ok(text)
}

/// Writes a document back, replacing the file.
pub fn save_document(file_path: impl AsRef<Path>, text: &str) -> Result<()> {
    let path = file_path.as_ref();
    fs::write(path, text).with_context(|| format!("Failed to write document to {}", path.display()))
}

pub fn load_schema_from_yaml(file_path: impl AsRef<Path>) -> Result<ConstructSchema> {
    let path = file_path.as_ref();
    let yaml_content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema YAML from {}", path.display()))?;

    let schema = ConstructSchema::from_yaml_str(&yaml_content)
        .with_context(|| format!("Failed to load schema from {}", path.display()))?;

    Ok(schema)
}

/// The schema at `path` when given, otherwise [`ConstructSchema::builtin`].
pub fn resolve_schema(path: Option<&Path>) -> Result<ConstructSchema> {
    match path {
        Some(p) => load_schema_from_yaml(p),
        None => Ok(ConstructSchema::builtin()),
    }
}
