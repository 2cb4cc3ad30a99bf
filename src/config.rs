use anyhow::{Context, Result};
use std::{path::PathBuf, time::Duration};

use crate::audio::player::PlayerSettings;

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub command_prefix: String,

    // Assets locales
    pub assets_file: PathBuf,
    pub assets_dir: PathBuf,

    // Backend de búsqueda
    pub ytdlp_path: String,
    pub ytdlp_cookies: Option<PathBuf>,

    // Límites
    pub gateway_timeout: Duration,
    pub resolve_timeout: Duration,
    pub max_queue_size: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Construye la configuración desde cualquier fuente clave/valor.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let duration = |key: &str, default: &str| -> Result<Duration> {
            let raw = var(key, default);
            humantime::parse_duration(raw.trim())
                .with_context(|| format!("{key} must be a duration like `15s`, got `{raw}`"))
        };

        let config = Self {
            discord_token: lookup("DISCORD_TOKEN").context("DISCORD_TOKEN is not set")?,
            command_prefix: var("COMMAND_PREFIX", "$").trim().to_string(),

            assets_file: var("ASSETS_FILE", "assets/config.json").into(),
            assets_dir: var("ASSETS_DIR", "assets").into(),

            ytdlp_path: var("YTDLP_PATH", "yt-dlp"),
            ytdlp_cookies: lookup("YTDLP_COOKIES")
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),

            gateway_timeout: duration("GATEWAY_TIMEOUT", "15s")?,
            resolve_timeout: duration("RESOLVE_TIMEOUT", "30s")?,
            max_queue_size: var("MAX_QUEUE_SIZE", "100")
                .parse()
                .context("MAX_QUEUE_SIZE must be a positive integer")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("DISCORD_TOKEN is empty");
        }

        if self.command_prefix.is_empty() {
            anyhow::bail!("Command prefix must not be empty");
        }

        if self.gateway_timeout.is_zero() || self.resolve_timeout.is_zero() {
            anyhow::bail!("Timeouts must be greater than 0");
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        Ok(())
    }

    pub fn player_settings(&self) -> PlayerSettings {
        PlayerSettings {
            gateway_timeout: self.gateway_timeout,
            max_queue_size: self.max_queue_size,
        }
    }

    /// Resumen para logs, sin credenciales.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Prefix: {}\n  \
            Assets: {} (dir {})\n  \
            yt-dlp: {} (cookies: {})\n  \
            Limits: {} queue, {} gateway timeout, {} resolve timeout",
            self.command_prefix,
            self.assets_file.display(),
            self.assets_dir.display(),
            self.ytdlp_path,
            if self.ytdlp_cookies.is_some() { "yes" } else { "no" },
            self.max_queue_size,
            humantime::format_duration(self.gateway_timeout),
            humantime::format_duration(self.resolve_timeout),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_token_is_set() {
        let config = load(&[("DISCORD_TOKEN", "abc")]).unwrap();

        assert_eq!(config.command_prefix, "$");
        assert_eq!(config.assets_file, PathBuf::from("assets/config.json"));
        assert_eq!(config.ytdlp_path, "yt-dlp");
        assert_eq!(config.ytdlp_cookies, None);
        assert_eq!(config.gateway_timeout, Duration::from_secs(15));
        assert_eq!(config.resolve_timeout, Duration::from_secs(30));
        assert_eq!(config.max_queue_size, 100);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("DISCORD_TOKEN", "abc"),
            ("COMMAND_PREFIX", "!"),
            ("GATEWAY_TIMEOUT", "2s 500ms"),
            ("YTDLP_COOKIES", "/run/secrets/cookies.txt"),
            ("MAX_QUEUE_SIZE", "5"),
        ])
        .unwrap();

        assert_eq!(config.command_prefix, "!");
        assert_eq!(config.gateway_timeout, Duration::from_millis(2500));
        assert_eq!(
            config.ytdlp_cookies,
            Some(PathBuf::from("/run/secrets/cookies.txt"))
        );
        assert_eq!(config.player_settings().max_queue_size, 5);
    }

    #[test]
    fn missing_token_is_an_error() {
        assert!(load(&[]).is_err());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(load(&[("DISCORD_TOKEN", "abc"), ("MAX_QUEUE_SIZE", "0")]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "abc"), ("GATEWAY_TIMEOUT", "0s")]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "abc"), ("RESOLVE_TIMEOUT", "soon")]).is_err());
    }

    #[test]
    fn summary_hides_the_token() {
        let config = load(&[("DISCORD_TOKEN", "super-secret")]).unwrap();
        assert!(!config.summary().contains("super-secret"));
    }
}
