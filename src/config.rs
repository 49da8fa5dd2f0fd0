use config::{Config, ConfigError, File};
use secrecy::{ExposeSecret, Secret};
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::ConnectOptions;
use std::str::FromStr;
use std::time;

#[derive(Debug)]
pub enum Environment {
    Development,
    Production,
}

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub smtp: SmtpSettings,
    pub newsletter: NewsletterSettings,
    pub content: ContentSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    // Browser origins allowed to call the API, e.g. "http://localhost:3000"
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    // Any sqlx sqlite url, e.g. "sqlite://newsletter.db" or "sqlite::memory:"
    pub url: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_connections: u32,
}

#[derive(serde::Deserialize, Clone)]
pub struct SmtpSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub tls: SmtpTls,
    // The sending account: login user, From address and visible To of every batch.
    pub email: Option<String>,
    pub password: Option<Secret<String>>,
    pub from_name: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_seconds: u64,
}

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SmtpTls {
    Starttls,
    Tls,
    None,
}

#[derive(serde::Deserialize, Clone)]
pub struct NewsletterSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub batch_size: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub batch_delay_seconds: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub send_timeout_seconds: u64,
    pub unsubscribe_url: String,
}

#[derive(serde::Deserialize, Clone)]
pub struct ContentSettings {
    pub provider: AiProvider,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_seconds: u64,
    pub ollama: Option<OllamaSettings>,
    pub openai: Option<OpenAiSettings>,
}

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    Ollama,
    OpenAi,
}

#[derive(serde::Deserialize, Clone)]
pub struct OllamaSettings {
    pub base_url: String,
    pub model: String,
}

#[derive(serde::Deserialize, Clone)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub api_key: Option<Secret<String>>,
    pub model: String,
}

impl Settings {
    pub fn get_address(&self) -> String {
        format!(
            "{}:{}",
            self.application.get_host(),
            self.application.get_port()
        )
    }

    pub fn set_db_url(&mut self, db_url: String) {
        self.database.url = db_url
    }

    pub fn set_app_port(&mut self, port: u16) {
        self.application.port = port;
    }
}

impl ApplicationSettings {
    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn get_host(&self) -> String {
        self.host.clone()
    }
}

impl DatabaseSettings {
    pub fn get_db_options(&self) -> Result<SqliteConnectOptions, sqlx::Error> {
        let mut db_options = SqliteConnectOptions::from_str(&self.url)?.create_if_missing(true);

        db_options.log_statements(log::LevelFilter::Trace);

        Ok(db_options)
    }
}

impl SmtpSettings {
    pub fn get_timeout(&self) -> time::Duration {
        time::Duration::from_secs(self.timeout_seconds)
    }

    /// Returns the sending account and its password, if both are set and non-empty.
    pub fn get_credentials(&self) -> Option<(String, Secret<String>)> {
        let email = self.email.as_deref().map(str::trim).unwrap_or_default();
        let password = self.password.as_ref()?;

        if email.is_empty() || password.expose_secret().is_empty() {
            return None;
        }

        Some((email.to_string(), password.clone()))
    }
}

impl NewsletterSettings {
    pub fn get_batch_delay(&self) -> time::Duration {
        time::Duration::from_secs(self.batch_delay_seconds)
    }

    pub fn get_send_timeout(&self) -> time::Duration {
        time::Duration::from_secs(self.send_timeout_seconds)
    }
}

impl ContentSettings {
    pub fn get_timeout(&self) -> time::Duration {
        time::Duration::from_secs(self.timeout_seconds)
    }
}

impl OpenAiSettings {
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_ref()
            .map(|key| !key.expose_secret().trim().is_empty())
            .unwrap_or(false)
    }
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            unknown_env => Err(format!(
                "{} is not supported environment. Use either 'development' or 'production'.",
                unknown_env
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let root_path = std::env::current_dir()
        .map_err(|err| ConfigError::Message(format!("Failed to determine the current directory: {}", err)))?;
    let config_directory = root_path.join("config");
    // Uses development environment by default
    let enviroment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "development".into())
        .try_into()
        .map_err(ConfigError::Message)?;
    let config_base_filepath = config_directory.join("base");
    let config_env_filepath = config_directory.join(enviroment.as_str());

    // It merges the base configuration file with the one from the specific environment (development or production)
    let settings = Config::builder()
        .add_source(File::from(config_base_filepath).required(true))
        .add_source(File::from(config_env_filepath).required(true))
        // Merge settings from environment variables with a prefix of APP and "__" separator
        // E.g APP_SMTP__PASSWORD would set Settings.smtp.password
        .add_source(config::Environment::with_prefix("app").separator("__"))
        .build()?;

    tracing::info!("Application environment = {:?}", enviroment);

    // Try to convert the value from the configuration file into a Settings type
    settings.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim::{assert_none, assert_some};

    fn smtp_settings(email: Option<&str>, password: Option<&str>) -> SmtpSettings {
        SmtpSettings {
            host: String::from("smtp.example.com"),
            port: 587,
            tls: SmtpTls::Starttls,
            email: email.map(String::from),
            password: password.map(|password| Secret::new(password.to_string())),
            from_name: String::from("DataDispatch"),
            timeout_seconds: 10,
        }
    }

    #[test]
    fn credentials_require_both_email_and_password() {
        assert_none!(smtp_settings(None, Some("secret")).get_credentials());
        assert_none!(smtp_settings(Some("sender@example.com"), None).get_credentials());
        assert_none!(smtp_settings(Some("  "), Some("secret")).get_credentials());
        assert_none!(smtp_settings(Some("sender@example.com"), Some("")).get_credentials());
        assert_some!(smtp_settings(Some("sender@example.com"), Some("secret")).get_credentials());
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let result: Result<Environment, String> = String::from("staging").try_into();

        assert!(result.is_err());
    }

    #[test]
    fn in_memory_database_url_is_accepted() {
        let settings = DatabaseSettings {
            url: String::from("sqlite::memory:"),
            max_connections: 1,
        };

        assert!(settings.get_db_options().is_ok());
    }
}
