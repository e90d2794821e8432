use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads application configuration by merging TOML and environment
    /// variables (`UPDOWN_` prefix).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load(path: &str) -> Result<AppConfig> {
        let config: AppConfig = Figment::new()
            .merge(figment::providers::Serialized::defaults(
                AppConfig::default(),
            ))
            .merge(Toml::file(path))
            .merge(Env::prefixed("UPDOWN_").split("__"))
            .extract()?;

        Ok(config)
    }

    /// Loads application configuration with a profile overlay
    /// (`<path stem>.<profile>.toml`).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(path: &str, profile: &str) -> Result<AppConfig> {
        let overlay = match path.strip_suffix(".toml") {
            Some(stem) => format!("{stem}.{profile}.toml"),
            None => format!("{path}.{profile}"),
        };

        let config: AppConfig = Figment::new()
            .merge(figment::providers::Serialized::defaults(
                AppConfig::default(),
            ))
            .merge(Toml::file(path))
            .merge(Toml::file(overlay))
            .merge(Env::prefixed("UPDOWN_").split("__"))
            .extract()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let cfg = ConfigLoader::load("/nonexistent/Config.toml").unwrap();
        assert_eq!(cfg.polymarket.chain_id, 137);
        assert!(cfg.strategy.validate().is_ok());
    }
}
