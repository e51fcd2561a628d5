use anyhow::{Context as AnyhowContext, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::dsl::ActionListDef;

pub fn load_list_from_yaml(file_path: impl AsRef<Path>) -> Result<ActionListDef> {
    let file_path = file_path.as_ref();
    let yaml_content = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read YAML file from {}", file_path.display()))?;

    let list: ActionListDef = serde_yaml::from_str(&yaml_content)
        .with_context(|| format!("Failed to deserialize YAML content from {}", file_path.display()))?;

    Ok(list)
}

/// Loads every `.yaml`/`.yml` file in `dir` (not recursive), in file name order.
pub fn load_lists_from_dir(dir: impl AsRef<Path>) -> Result<Vec<ActionListDef>> {
    let dir = dir.as_ref();
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml"))
        })
        .collect();
    paths.sort();

    paths.iter().map(load_list_from_yaml).collect()
}
