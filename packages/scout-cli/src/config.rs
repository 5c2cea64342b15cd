use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use property_scout::security::ApiKey;
use property_scout::{PipelineConfig, Site};
use std::env;
use std::time::Duration;

/// Which inference provider writes the narratives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    OpenAI,
}

impl Provider {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAI),
            other => bail!("SCOUT_INFERENCE_PROVIDER must be gemini or openai, got {other:?}"),
        }
    }
}

/// CLI configuration loaded from environment variables
///
/// Keys are held as [`ApiKey`], so `{:?}` shows only their last characters.
#[derive(Debug, Clone)]
pub struct Config {
    pub firecrawl_api_key: ApiKey,
    pub gemini_api_key: Option<ApiKey>,
    pub openai_api_key: Option<ApiKey>,
    pub provider: Provider,
    pub model: Option<String>,
    pub sites: Vec<Site>,
    pub fetch_timeout: Option<Duration>,
    pub inference_timeout: Option<Duration>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let gemini_api_key = ApiKey::from_env(&["GEMINI_API_KEY", "GOOGLE_API_KEY"]);
        let openai_api_key = ApiKey::from_env(&["OPENAI_API_KEY"]);

        let provider = match env::var("SCOUT_INFERENCE_PROVIDER") {
            Ok(value) => Provider::parse(&value)?,
            Err(_) if gemini_api_key.is_none() && openai_api_key.is_some() => Provider::OpenAI,
            Err(_) => Provider::Gemini,
        };

        let sites = match env::var("SCOUT_SITES") {
            Ok(list) => parse_sites(&list).context("SCOUT_SITES must list known sites")?,
            Err(_) => Site::ALL.to_vec(),
        };

        Ok(Self {
            firecrawl_api_key: ApiKey::from_env(&["FIRECRAWL_API_KEY"])
                .context("FIRECRAWL_API_KEY must be set")?,
            gemini_api_key,
            openai_api_key,
            provider,
            model: env::var("SCOUT_MODEL").ok(),
            sites,
            fetch_timeout: seconds("SCOUT_FETCH_TIMEOUT_SECS")?,
            inference_timeout: seconds("SCOUT_INFERENCE_TIMEOUT_SECS")?,
        })
    }

    /// Pipeline settings derived from this configuration.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new().with_sites(self.sites.iter().copied());
        if let Some(timeout) = self.fetch_timeout {
            config = config.with_fetch_timeout(timeout);
        }
        if let Some(timeout) = self.inference_timeout {
            config = config.with_inference_timeout(timeout);
        }
        config
    }
}

/// Comma-separated site names, ids or domains.
pub fn parse_sites(list: &str) -> Result<Vec<Site>> {
    let sites = list
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| name.parse::<Site>().map_err(anyhow::Error::from))
        .collect::<Result<Vec<_>>>()?;
    if sites.is_empty() {
        bail!("no sites given");
    }
    Ok(sites)
}

fn seconds(var: &str) -> Result<Option<Duration>> {
    match env::var(var) {
        Ok(value) => {
            let secs: u64 = value
                .trim()
                .parse()
                .with_context(|| format!("{var} must be a whole number of seconds"))?;
            Ok(Some(Duration::from_secs(secs)))
        }
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sites() {
        let sites = parse_sites("bikroy, bproperty.com ,").unwrap();
        assert_eq!(sites, vec![Site::Bikroy, Site::Bproperty]);
        assert!(parse_sites("craigslist").is_err());
        assert!(parse_sites(" , ").is_err());
    }

    #[test]
    fn test_debug_does_not_leak_keys() {
        let config = Config {
            firecrawl_api_key: ApiKey::new("fc-live-0123456789abcdef"),
            gemini_api_key: Some(ApiKey::new("AIzaSyExampleGeminiKey9876")),
            openai_api_key: None,
            provider: Provider::Gemini,
            model: None,
            sites: vec![Site::Bikroy],
            fetch_timeout: None,
            inference_timeout: None,
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("fc-live"));
        assert!(!debug.contains("AIzaSy"));
        assert!(debug.contains("ApiKey(…cdef)"));
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(Provider::parse("Gemini").unwrap(), Provider::Gemini);
        assert_eq!(Provider::parse("openai").unwrap(), Provider::OpenAI);
        assert!(Provider::parse("llama").is_err());
    }
}
