//! Troop and tower base definitions

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Base troop definition as stored in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TroopDef {
    pub name: String,
    pub hp: i32,
    #[serde(rename = "atk")]
    pub attack: i32,
    #[serde(rename = "def")]
    pub defense: i32,
    /// Mana cost to deploy
    #[serde(rename = "mana")]
    pub cost: i32,
    /// Experience value, also the base of the upgrade cost
    #[serde(rename = "exp", default)]
    pub exp_value: i32,
    #[serde(default)]
    pub special: String,
}

/// Targeting tier of a tower
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TowerRole {
    /// Attacked first
    Guard,
    /// Attacked once every guard is down
    King,
    /// Counts as a surviving tower but is never targeted
    Other,
}

impl TowerRole {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Guard Tower" => Self::Guard,
            "King Tower" => Self::King,
            _ => Self::Other,
        }
    }
}

/// Base tower definition as stored in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerDef {
    pub name: String,
    pub hp: i32,
    #[serde(rename = "atk")]
    pub attack: i32,
    #[serde(rename = "def")]
    pub defense: i32,
    #[serde(rename = "crit", default)]
    pub critical_chance: f64,
    #[serde(rename = "exp", default)]
    pub exp_value: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<TowerRole>,
}

impl TowerDef {
    /// Explicit role if the catalog sets one, otherwise inferred from the name
    pub fn role(&self) -> TowerRole {
        self.role.unwrap_or_else(|| TowerRole::from_name(&self.name))
    }
}

/// Catalog loading errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Source of immutable base definitions
pub trait CatalogSource: Send + Sync {
    fn load_troops(&self) -> Result<Vec<TroopDef>, CatalogError>;
    fn load_towers(&self) -> Result<Vec<TowerDef>, CatalogError>;
}

/// Catalog backed by `troops.json` and `towers.json` in a directory.
/// Files are re-read on every call so edits apply to the next session.
#[derive(Debug, Clone)]
pub struct JsonCatalog {
    dir: PathBuf,
}

impl JsonCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, CatalogError> {
        let path = self.dir.join(file);
        read_json(&path)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, CatalogError> {
    let data = fs::read(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_slice(&data).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl CatalogSource for JsonCatalog {
    fn load_troops(&self) -> Result<Vec<TroopDef>, CatalogError> {
        self.read("troops.json")
    }

    fn load_towers(&self) -> Result<Vec<TowerDef>, CatalogError> {
        self.read("towers.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_catalog_field_names() {
        let troops: Vec<TroopDef> = serde_json::from_str(
            r#"[{"name":"Pawn","hp":50,"atk":150,"def":100,"mana":3,"exp":5,"special":""}]"#,
        )
        .unwrap();
        assert_eq!(troops[0].attack, 150);
        assert_eq!(troops[0].cost, 3);
        assert_eq!(troops[0].exp_value, 5);

        let towers: Vec<TowerDef> = serde_json::from_str(
            r#"[{"name":"King Tower","hp":2000,"atk":500,"def":300,"crit":0.1,"exp":200},
                {"name":"Moat","hp":10,"atk":0,"def":0,"role":"guard"}]"#,
        )
        .unwrap();
        assert_eq!(towers[0].role(), TowerRole::King);
        assert_eq!(towers[1].role(), TowerRole::Guard);
        assert_eq!(towers[1].critical_chance, 0.0);
    }

    #[test]
    fn unknown_tower_names_are_untargetable() {
        assert_eq!(TowerRole::from_name("Guard Tower"), TowerRole::Guard);
        assert_eq!(TowerRole::from_name("Wall"), TowerRole::Other);
    }

    #[test]
    fn json_catalog_reads_bundled_data() {
        let catalog = JsonCatalog::new(concat!(env!("CARGO_MANIFEST_DIR"), "/data/catalog"));
        let troops = catalog.load_troops().unwrap();
        let towers = catalog.load_towers().unwrap();
        assert!(troops.len() >= 4);
        assert!(towers.iter().any(|t| t.role() == TowerRole::King));
    }

    #[test]
    fn missing_catalog_is_an_io_error() {
        let catalog = JsonCatalog::new("/nonexistent/catalog");
        assert!(matches!(catalog.load_troops(), Err(CatalogError::Io { .. })));
    }
}
