use log::warn;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};
use thiserror::Error;

mod lua;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Unsupported manifest format \"{0}\", expected \"json\" or \"lua\"")]
    UnsupportedFormat(String),

    #[error("Failed to encode manifest as JSON")]
    Json(#[from] serde_json::Error),
}

/// Drops the last `.`-delimited segment of `file_name`, if any.
pub fn strip_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(index) => &file_name[..index],
        None => file_name,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestFormat {
    #[default]
    Json,
    Lua,
}

impl ManifestFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Lua => "lua",
        }
    }

    pub fn file_name(self) -> String {
        format!("manifest.{}", self.extension())
    }
}

impl FromStr for ManifestFormat {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "lua" => Ok(Self::Lua),
            _ => Err(ManifestError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Where a rendered image sits inside its canvas, in output pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub width: u32,
    pub height: u32,
    pub left: u32,
    pub top: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtendedPlacement {
    pub color: Option<String>,
    pub width: u32,
    pub height: u32,
    pub bbox: Placement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ManifestEntry {
    Minimal(Placement),
    Extended(ExtendedPlacement),
}

#[derive(Debug, Default)]
pub struct Manifest {
    extended: bool,
    entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    pub fn new(extended: bool) -> Self {
        Self {
            extended,
            entries: BTreeMap::new(),
        }
    }

    /// Builds the entry shape this manifest records.
    pub fn entry(
        &self,
        bbox: Placement,
        color: Option<String>,
        canvas: (u32, u32),
    ) -> ManifestEntry {
        if self.extended {
            ManifestEntry::Extended(ExtendedPlacement {
                color,
                width: canvas.0,
                height: canvas.1,
                bbox,
            })
        } else {
            ManifestEntry::Minimal(bbox)
        }
    }

    /// Records `entry` under `key`; a later record for the same key wins.
    pub fn record(&mut self, key: impl Into<String>, entry: ManifestEntry) {
        let key = key.into();
        if self.entries.insert(key.clone(), entry).is_some() {
            warn!("Manifest entry \"{key}\" was overwritten by a later file");
        }
    }

    /// Puts back what `key` held before a failed render touched it.
    pub fn restore(&mut self, key: &str, previous: Option<ManifestEntry>) {
        match previous {
            Some(entry) => {
                self.entries.insert(key.to_string(), entry);
            }
            None => {
                self.entries.remove(key);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&ManifestEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn serialize(&self, format: ManifestFormat) -> Result<String, ManifestError> {
        match format {
            ManifestFormat::Json => Ok(serde_json::to_string(&self.entries)?),
            ManifestFormat::Lua => {
                let value = serde_json::to_value(&self.entries)?;
                Ok(lua::table_literal(&value))
            }
        }
    }
}
