use super::Config;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::Path;

impl Config {
    /// Load `~/.graphmind/config.toml`, writing defaults on first run.
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let graphmind_dir = home.join(".graphmind");

        if !graphmind_dir.exists() {
            fs::create_dir_all(&graphmind_dir).context("Failed to create .graphmind directory")?;
        }

        let mut config = Self::load_from_path(&graphmind_dir.join("config.toml"))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, creating it with defaults if missing.
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        let data_dir = config_path
            .parent()
            .map_or_else(|| Path::new(".").to_path_buf(), Path::to_path_buf);

        if config_path.exists() {
            let contents =
                fs::read_to_string(config_path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = config_path.to_path_buf();
            config.data_dir = data_dir;
            Ok(config)
        } else {
            let config = Self {
                config_path: config_path.to_path_buf(),
                data_dir,
                ..Self::default()
            };
            config.validate()?;
            config.save()?;
            tracing::info!(path = %config_path.display(), "wrote default config");
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_load_writes_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");

        let config = Config::load_from_path(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.config_path, path);
        assert_eq!(config.data_dir, tmp.path());

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("[refinement]"));
        assert!(written.contains("max_revisions = 3"));
    }

    #[test]
    fn saved_changes_survive_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");

        let mut config = Config::load_from_path(&path).unwrap();
        config.refinement.threshold = 8.5;
        config.default_provider = Some("openai".into());
        config.save().unwrap();

        let reloaded = Config::load_from_path(&path).unwrap();
        assert!((reloaded.refinement.threshold - 8.5).abs() < f64::EPSILON);
        assert_eq!(reloaded.provider_name(), "openai");
    }

    #[test]
    fn malformed_file_is_reported() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "default_temperature = \"hot\"").unwrap();

        let err = Config::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
