use super::Config;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("GRAPHMIND_API_KEY").or_else(|_| std::env::var("API_KEY"))
            && !key.is_empty()
        {
            self.api_key = Some(key);
        }

        if let Ok(provider) =
            std::env::var("GRAPHMIND_PROVIDER").or_else(|_| std::env::var("PROVIDER"))
            && !provider.is_empty()
        {
            self.default_provider = Some(provider);
        }

        if let Ok(model) = std::env::var("GRAPHMIND_MODEL")
            && !model.is_empty()
        {
            self.default_model = Some(model);
        }

        if let Ok(temp_str) = std::env::var("GRAPHMIND_TEMPERATURE")
            && let Ok(temp) = temp_str.parse::<f64>()
            && (0.0..=2.0).contains(&temp)
        {
            self.default_temperature = temp;
        }

        if let Ok(db_path) = std::env::var("GRAPHMIND_SESSION_DB")
            && !db_path.is_empty()
        {
            self.sessions.db_path = db_path;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_env::{ENV_LOCK, EnvVarGuard};

    #[test]
    fn env_overrides_replace_file_values() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _key = EnvVarGuard::set("GRAPHMIND_API_KEY", "gsk-test");
        let _provider = EnvVarGuard::set("GRAPHMIND_PROVIDER", "openrouter");
        let _model = EnvVarGuard::set("GRAPHMIND_MODEL", "meta/llama");
        let _db = EnvVarGuard::set("GRAPHMIND_SESSION_DB", "/tmp/graphmind-test.db");
        let _temp = EnvVarGuard::set("GRAPHMIND_TEMPERATURE", "0.25");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.api_key.as_deref(), Some("gsk-test"));
        assert_eq!(config.provider_name(), "openrouter");
        assert_eq!(config.model_name(), "meta/llama");
        assert_eq!(config.sessions.db_path, "/tmp/graphmind-test.db");
        assert!((config.default_temperature - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn out_of_range_temperature_is_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _temp = EnvVarGuard::set("GRAPHMIND_TEMPERATURE", "9.0");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert!((config.default_temperature - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_values_do_not_clobber() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _provider = EnvVarGuard::set("GRAPHMIND_PROVIDER", "");
        let _fallback = EnvVarGuard::unset("PROVIDER");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.provider_name(), "groq");
    }
}
