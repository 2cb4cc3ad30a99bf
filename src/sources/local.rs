use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::TrackRef;

/// Una fila de la tabla de assets tal como está en el JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetEntry {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: String,
    /// Archivo relativo al directorio de assets, `<name>.mp3` si se omite.
    #[serde(default)]
    pub file: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LocalAsset {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: String,
    pub path: PathBuf,
}

impl LocalAsset {
    pub fn track(&self) -> TrackRef {
        TrackRef::Asset {
            name: self.name.clone(),
            path: self.path.clone(),
        }
    }

    fn matches(&self, needle: &str) -> bool {
        self.name.eq_ignore_ascii_case(needle)
            || self.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(needle))
    }
}

/// Tabla estática de clips de sonido, fija durante todo el proceso.
#[derive(Debug, Clone, Default)]
pub struct LocalAssets {
    assets: Vec<LocalAsset>,
}

impl LocalAssets {
    pub fn from_entries(entries: Vec<AssetEntry>, dir: &Path) -> Self {
        let assets = entries
            .into_iter()
            .map(|entry| {
                let file = entry
                    .file
                    .unwrap_or_else(|| format!("{}.mp3", entry.name));
                LocalAsset {
                    path: dir.join(file),
                    name: entry.name,
                    aliases: entry.aliases,
                    description: entry.description,
                }
            })
            .collect();

        Self { assets }
    }

    /// Loads the table from `file`. A missing file falls back to a single
    /// `sample` clip so a fresh checkout still answers `$meme sample`.
    pub fn load(file: &Path, dir: &Path) -> Result<Self> {
        if !file.exists() {
            warn!(
                "⚠️ Tabla de assets {} no encontrada, usando la entrada sample incluida",
                file.display()
            );
            return Ok(Self::from_entries(vec![Self::sample_entry()], dir));
        }

        let raw = std::fs::read_to_string(file)
            .with_context(|| format!("reading asset table {}", file.display()))?;
        let entries = Self::parse(&raw)
            .with_context(|| format!("parsing asset table {}", file.display()))?;

        let assets = Self::from_entries(entries, dir);
        info!("🔉 Cargados {} assets de sonido locales", assets.len());
        Ok(assets)
    }

    pub fn parse(raw: &str) -> Result<Vec<AssetEntry>> {
        let entries: Vec<AssetEntry> = serde_json::from_str(raw)?;
        if let Some(entry) = entries.iter().find(|e| e.name.trim().is_empty()) {
            anyhow::bail!("asset entry with empty name (aliases: {:?})", entry.aliases);
        }
        Ok(entries)
    }

    fn sample_entry() -> AssetEntry {
        AssetEntry {
            name: "sample".to_string(),
            aliases: vec!["sample".into(), "samp".into(), "s".into()],
            description: "Sample sound".to_string(),
            file: None,
        }
    }

    pub fn lookup(&self, needle: &str) -> Option<&LocalAsset> {
        let needle = needle.trim();
        self.assets.iter().find(|asset| asset.matches(needle))
    }

    pub fn describe(&self) -> Vec<String> {
        self.assets
            .iter()
            .map(|asset| {
                let aliases: Vec<&str> = asset
                    .aliases
                    .iter()
                    .map(String::as_str)
                    .filter(|alias| *alias != asset.name)
                    .collect();
                if aliases.is_empty() {
                    format!("`{}`: {}", asset.name, asset.description)
                } else {
                    format!("`{}` ({}): {}", asset.name, aliases.join(", "), asset.description)
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TABLE: &str = r#"[
        { "name": "airhorn", "aliases": ["horn", "AH"], "description": "Loud horn" },
        { "name": "bruh", "description": "bruh", "file": "clips/bruh.ogg" }
    ]"#;

    fn assets() -> LocalAssets {
        LocalAssets::from_entries(LocalAssets::parse(TABLE).unwrap(), Path::new("/srv/sounds"))
    }

    #[test]
    fn lookup_matches_name_and_aliases_case_insensitively() {
        let assets = assets();
        assert_eq!(assets.lookup("airhorn").unwrap().name, "airhorn");
        assert_eq!(assets.lookup("HORN").unwrap().name, "airhorn");
        assert_eq!(assets.lookup(" ah ").unwrap().name, "airhorn");
        assert!(assets.lookup("trombone").is_none());
    }

    #[test]
    fn file_defaults_to_name_under_assets_dir() {
        let assets = assets();
        assert_eq!(
            assets.lookup("airhorn").unwrap().path,
            PathBuf::from("/srv/sounds/airhorn.mp3")
        );
        assert_eq!(
            assets.lookup("bruh").unwrap().track(),
            TrackRef::Asset {
                name: "bruh".into(),
                path: PathBuf::from("/srv/sounds/clips/bruh.ogg"),
            }
        );
    }

    #[test]
    fn describe_lists_aliases_only_when_present() {
        assert_eq!(
            assets().describe(),
            vec![
                "`airhorn` (horn, AH): Loud horn".to_string(),
                "`bruh`: bruh".to_string(),
            ]
        );
    }

    #[test]
    fn rejects_entries_without_name() {
        assert!(LocalAssets::parse(r#"[{ "name": " " }]"#).is_err());
    }

    #[test]
    fn missing_table_falls_back_to_sample() {
        let assets = LocalAssets::load(
            Path::new("/definitely/not/here.json"),
            Path::new("/srv/sounds"),
        )
        .unwrap();
        assert!(LocalAssets::default().is_empty());
        assert!(!assets.is_empty());
        assert_eq!(assets.len(), 1);
        assert_eq!(assets.lookup("samp").unwrap().name, "sample");
    }
}
