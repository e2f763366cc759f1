use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

// Environment names (DB_HOST, POSTGRES_USER, FLASK_ENV, ...) are kept
// verbatim so existing container deployments keep working unchanged.
#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default = "default_db_host")]
    pub db_host: String,
    #[serde(default = "default_db_port")]
    pub db_port: u16,
    #[serde(rename = "postgres_user", default = "default_db_user")]
    pub db_user: String,
    #[serde(rename = "postgres_password", default)]
    pub db_password: String,
    #[serde(rename = "postgres_db", default = "default_db_name")]
    pub db_name: String,
    #[serde(rename = "flask_env", default = "default_run_env")]
    pub run_env: String,
    #[serde(rename = "flask_run_host", default = "default_http_host")]
    pub http_host: String,
    #[serde(rename = "flask_run_port", default = "default_http_port")]
    pub http_port: u16,
}

fn default_db_host() -> String {
    "db".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_db_user() -> String {
    "postgres".to_string()
}

fn default_db_name() -> String {
    "postgres".to_string()
}

fn default_run_env() -> String {
    "production".to_string()
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    4000
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.run_env == "development"
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> AppConfig {
        let mut builder = Config::builder();
        for (key, value) in pairs {
            builder = builder
                .set_override(*key, *value)
                .expect("override should apply");
        }
        builder
            .build()
            .expect("config should build")
            .try_deserialize()
            .expect("config should deserialize")
    }

    #[test]
    fn defaults_match_container_contract() {
        let config = from_pairs(&[]);
        assert_eq!(config.db_host, "db");
        assert_eq!(config.db_port, 5432);
        assert_eq!(config.db_user, "postgres");
        assert_eq!(config.db_name, "postgres");
        assert_eq!(config.http_host, "0.0.0.0");
        assert_eq!(config.http_port, 4000);
        assert!(!config.is_development());
    }

    #[test]
    fn development_flag_selects_dev_mode() {
        let config = from_pairs(&[("flask_env", "development")]);
        assert!(config.is_development());

        let config = from_pairs(&[("flask_env", "staging")]);
        assert!(!config.is_development());
    }

    #[test]
    fn overrides_are_applied() {
        let config = from_pairs(&[
            ("db_host", "postgres.internal"),
            ("db_port", "5433"),
            ("postgres_user", "support"),
            ("flask_run_host", "127.0.0.1"),
            ("flask_run_port", "8080"),
        ]);
        assert_eq!(config.db_host, "postgres.internal");
        assert_eq!(config.db_port, 5433);
        assert_eq!(config.db_user, "support");
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }
}
