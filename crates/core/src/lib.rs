pub mod dashboard;
pub mod domain;
pub mod i18n;
pub mod llm;
pub mod report;
pub mod session;

pub mod config {
    use anyhow::Context;

    use crate::domain::settings::ApiConfig;
    use crate::llm::Provider;

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub openai_api_key: Option<String>,
        pub perplexity_api_key: Option<String>,
        pub openrouter_api_key: Option<String>,
        pub provider: Option<String>,
        pub model: Option<String>,
        pub language: Option<String>,
        pub complexity: Option<String>,
        pub timeout_secs: Option<u64>,
        pub base_url: Option<String>,
        /// Public URL of this deployment; OpenRouter receives it as `HTTP-Referer`.
        pub app_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub port: Option<u16>,
    }

    fn var(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let timeout_secs = var("AETHER_TIMEOUT_SECS")
                .map(|v| v.trim().parse::<u64>())
                .transpose()
                .context("AETHER_TIMEOUT_SECS must be a whole number of seconds")?;
            let port = var("PORT")
                .map(|v| v.trim().parse::<u16>())
                .transpose()
                .context("PORT must be a valid port number")?;

            Ok(Self {
                openai_api_key: var("OPENAI_API_KEY"),
                perplexity_api_key: var("PERPLEXITY_API_KEY"),
                openrouter_api_key: var("OPENROUTER_API_KEY"),
                provider: var("AETHER_PROVIDER"),
                model: var("AETHER_MODEL"),
                language: var("AETHER_LANGUAGE"),
                complexity: var("AETHER_COMPLEXITY"),
                timeout_secs,
                base_url: var("AETHER_BASE_URL"),
                app_url: var("AETHER_APP_URL"),
                sentry_dsn: var("SENTRY_DSN"),
                port,
            })
        }

        pub fn api_key(&self, provider: Provider) -> Option<&str> {
            match provider {
                Provider::OpenAI => self.openai_api_key.as_deref(),
                Provider::Perplexity => self.perplexity_api_key.as_deref(),
                Provider::OpenRouter => self.openrouter_api_key.as_deref(),
            }
        }

        /// Session configuration seeded from the environment.
        ///
        /// A configured provider without an explicit model gets that provider's first model.
        pub fn api_config(&self) -> anyhow::Result<ApiConfig> {
            let mut config = ApiConfig::default();

            if let Some(provider) = &self.provider {
                let provider = provider.parse::<Provider>().context("invalid AETHER_PROVIDER")?;
                config = config.with_provider(provider);
            }
            if let Some(model) = &self.model {
                config.model = model.trim().to_string();
            }
            if let Some(language) = &self.language {
                config.language = language.parse().context("invalid AETHER_LANGUAGE")?;
            }
            if let Some(complexity) = &self.complexity {
                config.complexity = complexity.parse().context("invalid AETHER_COMPLEXITY")?;
            }
            if let Some(key) = self.api_key(config.provider) {
                config.api_key = key.trim().to_string();
            }
            Ok(config)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::domain::settings::{Complexity, Language};

        #[test]
        fn defaults_to_openrouter_with_its_key() {
            let settings = Settings {
                openrouter_api_key: Some("sk-or".to_string()),
                openai_api_key: Some("sk-oa".to_string()),
                ..Settings::default()
            };
            let config = settings.api_config().unwrap();
            assert_eq!(config.provider, Provider::OpenRouter);
            assert_eq!(config.model, "openai/gpt-4o");
            assert_eq!(config.api_key, "sk-or");
        }

        #[test]
        fn provider_switch_picks_first_model_and_matching_key() {
            let settings = Settings {
                provider: Some("perplexity".to_string()),
                perplexity_api_key: Some("pplx".to_string()),
                language: Some("es".to_string()),
                complexity: Some("simple".to_string()),
                ..Settings::default()
            };
            let config = settings.api_config().unwrap();
            assert_eq!(config.provider, Provider::Perplexity);
            assert_eq!(config.model, "sonar-pro");
            assert_eq!(config.api_key, "pplx");
            assert_eq!(config.language, Language::Es);
            assert_eq!(config.complexity, Complexity::Simple);
        }

        #[test]
        fn rejects_unknown_provider() {
            let settings = Settings {
                provider: Some("bedrock".to_string()),
                ..Settings::default()
            };
            assert!(settings.api_config().is_err());
        }
    }
}
