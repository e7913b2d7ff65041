//! Configuration management.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub gateway: GatewayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Connection details for the hosted data gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let environment = Self::parse_environment();

        Self {
            gateway: GatewayConfig {
                url: env::var("GATEWAY_URL").expect("GATEWAY_URL must be set"),
                api_key: env::var("GATEWAY_API_KEY").expect("GATEWAY_API_KEY must be set"),
            },
            logging: Self::parse_logging_config(&environment),
            environment,
        }
    }

    fn parse_environment() -> Environment {
        match env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            "staging" | "stage" => Environment::Staging,
            _ => Environment::Development,
        }
    }

    fn parse_logging_config(environment: &Environment) -> LoggingConfig {
        let is_dev = environment.is_development();

        LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| {
                if is_dev {
                    "debug".to_string()
                } else {
                    "info".to_string()
                }
            }),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| {
                    if is_dev {
                        "pretty".to_string()
                    } else {
                        "json".to_string()
                    }
                })
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        }
    }

    pub fn validate_for_production(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.environment.is_production() {
            if self.gateway.url.contains("localhost") || self.gateway.url.contains("127.0.0.1") {
                issues.push("Gateway URL appears to be localhost in production".to_string());
            }
            if self.gateway.api_key.is_empty() {
                issues.push("Gateway API key is empty".to_string());
            }
            if !self.gateway.url.starts_with("https://") {
                issues.push("Gateway URL should use https in production".to_string());
            }
        }

        issues
    }
}

impl Config {
    pub fn default_for_testing() -> Self {
        Self {
            environment: Environment::Development,
            gateway: GatewayConfig {
                url: "http://127.0.0.1:54321".to_string(),
                api_key: "test-api-key".to_string(),
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }
}
