use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub title: String,
    pub description: Option<String>,
    pub essays_dir: String,
    pub output_dir: String,
    pub s3_bucket: String,
    pub s3_region: String,
    pub upload_to_s3: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Quill".to_string(),
            description: Some("A minimal essay archive".to_string()),
            essays_dir: "essays".to_string(),
            output_dir: "dist".to_string(),
            s3_bucket: "essay-archive".to_string(),
            s3_region: "us-east-1".to_string(),
            upload_to_s3: false,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = if path.as_ref().exists() {
            let content = fs::read_to_string(path)
                .context("Failed to read config file")?;
            let config: Config = serde_json::from_str(&content)
                .context("Failed to parse config file")?;
            config
        } else {
            // Create default config
            let config = Config::default();
            let content = serde_json::to_string_pretty(&config)
                .context("Failed to serialize default config")?;
            fs::write(path, content)
                .context("Failed to write default config")?;
            config
        };

        // Environment overrides for deployment settings
        if let Ok(bucket) = std::env::var("S3_BUCKET") {
            config.s3_bucket = bucket;
        }
        if let Ok(region) = std::env::var("AWS_REGION") {
            config.s3_region = region;
        }
        if let Ok(flag) = std::env::var("UPLOAD_TO_S3") {
            config.upload_to_s3 = flag == "true";
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.essays_dir, "essays");
        assert_eq!(config.output_dir, "dist");
        assert_eq!(config.s3_region, "us-east-1");
        assert!(!config.upload_to_s3);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.title, config.title);
        assert_eq!(parsed.s3_bucket, config.s3_bucket);
    }

    #[test]
    fn test_load_creates_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.essays_dir, "essays");
        assert!(path.exists());
    }
}
