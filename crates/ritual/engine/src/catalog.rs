//! Ritual catalog: TOML ritual definitions
//!
//! Definitions are parsed into [`RitualDefinition`] and then go through
//! the same validating constructor as any other ritual. The built-in
//! rituals are compiled into the binary.

use ritual_types::{Ritual, RitualDefinition, RitualError, RitualResult};
use std::path::{Path, PathBuf};

/// Built-in ritual sources: (file name, TOML)
pub const BUILTIN_RITUALS: &[(&str, &str)] = &[
    ("bloody-mary.toml", include_str!("../rituals/bloody-mary.toml")),
    ("enochian.toml", include_str!("../rituals/enochian.toml")),
];

/// Parse and validate a ritual from TOML
pub fn parse_ritual_toml(source: &str) -> RitualResult<Ritual> {
    let definition: RitualDefinition =
        toml::from_str(source).map_err(|e| RitualError::Definition(e.message().to_string()))?;
    Ritual::try_from(definition)
}

/// The built-in rituals, validated
pub fn builtin_rituals() -> RitualResult<Vec<Ritual>> {
    BUILTIN_RITUALS
        .iter()
        .map(|(name, source)| {
            parse_ritual_toml(source).map_err(|e| {
                tracing::warn!(file = %name, error = %e, "Built-in ritual rejected");
                e
            })
        })
        .collect()
}

/// Read and validate one ritual file
pub fn load_file(path: &Path) -> RitualResult<Ritual> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| RitualError::Definition(format!("{}: {}", path.display(), e)))?;
    parse_ritual_toml(&source)
}

/// Load every `*.toml` file in `dir`, in file-name order
///
/// The first invalid file aborts the load.
pub fn load_dir(dir: &Path) -> RitualResult<Vec<Ritual>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| RitualError::Definition(format!("{}: {}", dir.display(), e)))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();

    let mut rituals = Vec::with_capacity(paths.len());
    for path in paths {
        tracing::debug!(path = %path.display(), "Loading ritual file");
        rituals.push(load_file(&path)?);
    }
    Ok(rituals)
}
