/// Server configuration, built once at startup and shared through `AppState`.
#[derive(Debug, Clone)]
pub struct DeskConfig {
    pub port: u16,
    /// Completion token budget for one summary call.
    pub max_tokens: u32,
    /// Shared secret for the cron endpoint. None rejects every cron call.
    pub cron_secret: Option<String>,
    pub llm_base_url: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    /// How far back "recent" reaches when building insights.
    pub window_days: i64,
    pub llm_timeout_secs: u64,
}

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_TOKENS: u32 = 900;
pub const DEFAULT_WINDOW_DAYS: i64 = 7;
pub const MAX_WINDOW_DAYS: i64 = 366;
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

/// Raw string values as they come from the environment.
#[derive(Debug, Default, Clone)]
pub struct RawConfig<'a> {
    pub port: Option<&'a str>,
    pub max_tokens: Option<&'a str>,
    pub cron_secret: Option<&'a str>,
    pub llm_base_url: Option<&'a str>,
    pub llm_api_key: Option<&'a str>,
    pub llm_model: Option<&'a str>,
    pub window_days: Option<&'a str>,
    pub llm_timeout_secs: Option<&'a str>,
}

impl DeskConfig {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok();
        let port = var("PORT");
        let max_tokens = var("INTELLIGENCE_MAX_TOKENS");
        let cron_secret = var("CRON_SECRET");
        let llm_base_url = var("OPENAI_BASE_URL");
        let llm_api_key = var("OPENAI_API_KEY");
        let llm_model = var("OPENAI_MODEL");
        let window_days = var("INTELLIGENCE_WINDOW_DAYS");
        let llm_timeout_secs = var("OPENAI_TIMEOUT_SECS");

        Self::from_raw_values(RawConfig {
            port: port.as_deref(),
            max_tokens: max_tokens.as_deref(),
            cron_secret: cron_secret.as_deref(),
            llm_base_url: llm_base_url.as_deref(),
            llm_api_key: llm_api_key.as_deref(),
            llm_model: llm_model.as_deref(),
            window_days: window_days.as_deref(),
            llm_timeout_secs: llm_timeout_secs.as_deref(),
        })
    }

    /// Build a config from raw strings. Used directly in tests to avoid
    /// mutating process-global environment.
    pub fn from_raw_values(raw: RawConfig<'_>) -> Self {
        fn non_empty(v: Option<&str>) -> Option<String> {
            v.map(str::trim).filter(|s| !s.is_empty()).map(String::from)
        }

        let port = raw
            .port
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let max_tokens = raw
            .max_tokens
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let window_days = raw
            .window_days
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|n| (1..=MAX_WINDOW_DAYS).contains(n))
            .unwrap_or(DEFAULT_WINDOW_DAYS);

        let llm_timeout_secs = raw
            .llm_timeout_secs
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS);

        let llm_base_url = non_empty(raw.llm_base_url)
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string());

        DeskConfig {
            port,
            max_tokens,
            cron_secret: non_empty(raw.cron_secret),
            llm_base_url,
            llm_api_key: non_empty(raw.llm_api_key),
            llm_model: non_empty(raw.llm_model).unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            window_days,
            llm_timeout_secs,
        }
    }
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self::from_raw_values(RawConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_nothing_set() {
        let config = DeskConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_tokens, 900);
        assert_eq!(config.window_days, 7);
        assert!(config.cron_secret.is_none());
        assert!(config.llm_api_key.is_none());
        assert_eq!(config.llm_model, "gpt-4o-mini");
    }

    #[test]
    fn max_tokens_override() {
        let config = DeskConfig::from_raw_values(RawConfig {
            max_tokens: Some("1500"),
            ..Default::default()
        });
        assert_eq!(config.max_tokens, 1500);
    }

    #[test]
    fn invalid_max_tokens_falls_back() {
        for bad in ["lots", "0", "-5", ""] {
            let config = DeskConfig::from_raw_values(RawConfig {
                max_tokens: Some(bad),
                ..Default::default()
            });
            assert_eq!(config.max_tokens, 900, "input {bad:?}");
        }
    }

    #[test]
    fn window_days_out_of_range_falls_back() {
        for bad in ["0", "-3", "367", "1000000000", "week"] {
            let config = DeskConfig::from_raw_values(RawConfig {
                window_days: Some(bad),
                ..Default::default()
            });
            assert_eq!(config.window_days, DEFAULT_WINDOW_DAYS, "input {bad:?}");
        }
        let config = DeskConfig::from_raw_values(RawConfig {
            window_days: Some("366"),
            ..Default::default()
        });
        assert_eq!(config.window_days, 366);
    }

    #[test]
    fn blank_secret_is_none() {
        let config = DeskConfig::from_raw_values(RawConfig {
            cron_secret: Some("   "),
            ..Default::default()
        });
        assert!(config.cron_secret.is_none());
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let config = DeskConfig::from_raw_values(RawConfig {
            llm_base_url: Some("http://localhost:9000/v1/"),
            ..Default::default()
        });
        assert_eq!(config.llm_base_url, "http://localhost:9000/v1");
    }
}
