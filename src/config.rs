use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::layout::DataLayout;

fn default_gffread() -> PathBuf {
    PathBuf::from("gffread")
}

fn default_gffcompare() -> PathBuf {
    PathBuf::from("gffcompare")
}

fn default_attribute_value_cap() -> usize {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
    #[serde(default = "default_gffread")]
    pub gffread: PathBuf,
    #[serde(default = "default_gffcompare")]
    pub gffcompare: PathBuf,
    #[serde(default = "default_attribute_value_cap")]
    pub attribute_value_cap: usize,
}

impl EngineConfig {
    /// Defaults for everything but the data directory.
    #[must_use]
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            store_path: None,
            gffread: default_gffread(),
            gffcompare: default_gffcompare(),
            attribute_value_cap: default_attribute_value_cap(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn write_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json + "\n")
            .with_context(|| format!("failed to write config file: {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            bail!("dataDir must not be empty");
        }
        for (name, tool) in [("gffread", &self.gffread), ("gffcompare", &self.gffcompare)] {
            if tool.as_os_str().is_empty() {
                bail!("{name} executable must not be empty");
            }
        }
        if self.attribute_value_cap == 0 {
            bail!("attributeValueCap must be greater than 0");
        }
        Ok(())
    }

    /// Store document location; `<dataDir>/store.json` unless configured.
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("store.json"))
    }

    #[must_use]
    pub fn layout(&self) -> DataLayout {
        DataLayout::new(&self.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(json: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(json.as_bytes()).unwrap();
        f
    }

    #[test]
    fn valid_config_all_fields() {
        let json = r#"{
            "dataDir": "/srv/concordia",
            "storePath": "/srv/db/store.json",
            "gffread": "/opt/bin/gffread",
            "gffcompare": "/opt/bin/gffcompare",
            "attributeValueCap": 25
        }"#;
        let f = write_config(json);
        let config = EngineConfig::from_file(f.path()).unwrap();
        assert_eq!(config.store_path(), PathBuf::from("/srv/db/store.json"));
        assert_eq!(config.gffcompare, PathBuf::from("/opt/bin/gffcompare"));
        assert_eq!(config.attribute_value_cap, 25);
    }

    #[test]
    fn valid_config_optional_fields_omitted() {
        let f = write_config(r#"{ "dataDir": "data" }"#);
        let config = EngineConfig::from_file(f.path()).unwrap();
        assert_eq!(config.store_path(), PathBuf::from("data/store.json"));
        assert_eq!(config.gffread, PathBuf::from("gffread"));
        assert_eq!(config.attribute_value_cap, 100);
    }

    #[test]
    fn zero_cap_rejected() {
        let f = write_config(r#"{ "dataDir": "data", "attributeValueCap": 0 }"#);
        let err = EngineConfig::from_file(f.path()).unwrap_err();
        assert!(err.to_string().contains("attributeValueCap"));
    }

    #[test]
    fn missing_data_dir_rejected() {
        let f = write_config(r#"{ "gffread": "gffread" }"#);
        let err = EngineConfig::from_file(f.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));
    }

    #[test]
    fn write_then_read() {
        let f = NamedTempFile::new().unwrap();
        let config = EngineConfig::for_data_dir(Path::new("/tmp/concordia"));
        config.write_file(f.path()).unwrap();
        let text = std::fs::read_to_string(f.path()).unwrap();
        assert!(text.contains("\"dataDir\""));
        assert!(!text.contains("storePath"));
        assert_eq!(EngineConfig::from_file(f.path()).unwrap().data_dir, config.data_dir);
    }
}
