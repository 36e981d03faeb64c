use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

const DEFAULT_CSV_PATH: &str = "data/fichas_ingreso.csv";
const DEFAULT_SPREADSHEET_TITLE: &str = "Base de Datos CIS";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the intake service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub sink: SinkConfig,
    pub access: AccessConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let ansi = match env::var("APP_LOG_ANSI") {
            Ok(raw) => parse_flag("APP_LOG_ANSI", &raw)?,
            Err(_) => false,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, ansi },
            sink: SinkConfig::from_env()?,
            access: AccessConfig::from_env(),
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

/// Where submitted records are appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkConfig {
    Csv {
        path: PathBuf,
    },
    Sheets {
        spreadsheet_title: String,
        credentials: CredentialSource,
    },
}

impl SinkConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let kind = env::var("INTAKE_SINK").unwrap_or_else(|_| "csv".to_string());

        match kind.trim().to_ascii_lowercase().as_str() {
            "csv" | "file" => {
                let path = env::var("INTAKE_CSV_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_CSV_PATH));
                Ok(Self::Csv { path })
            }
            "sheets" | "gsheets" | "google" => {
                let spreadsheet_title = env::var("INTAKE_SPREADSHEET_TITLE")
                    .unwrap_or_else(|_| DEFAULT_SPREADSHEET_TITLE.to_string());

                let credentials = if let Ok(inline) = env::var("INTAKE_CREDENTIALS_JSON") {
                    CredentialSource::Inline(inline)
                } else if let Ok(path) = env::var("INTAKE_CREDENTIALS_PATH") {
                    CredentialSource::File(PathBuf::from(path))
                } else {
                    return Err(ConfigError::MissingCredentials);
                };

                Ok(Self::Sheets {
                    spreadsheet_title,
                    credentials,
                })
            }
            _ => Err(ConfigError::InvalidSink { value: kind }),
        }
    }
}

/// Service-account key material for the spreadsheet sink.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    File(PathBuf),
    Inline(String),
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::File(path) => f.debug_tuple("File").field(path).finish(),
            CredentialSource::Inline(_) => f.write_str("Inline(<redacted>)"),
        }
    }
}

/// Shared passphrase guarding the form. `None` leaves the form open.
#[derive(Clone, Default)]
pub struct AccessConfig {
    pub passphrase: Option<String>,
}

impl AccessConfig {
    fn from_env() -> Self {
        let passphrase = env::var("INTAKE_PASSPHRASE")
            .ok()
            .filter(|value| !value.trim().is_empty());
        Self { passphrase }
    }
}

impl fmt::Debug for AccessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessConfig")
            .field("gated", &self.passphrase.is_some())
            .finish()
    }
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { name }),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidFlag { name: &'static str },
    InvalidSink { value: String },
    MissingCredentials,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidFlag { name } => {
                write!(f, "{name} must be one of true/false/1/0/yes/no")
            }
            ConfigError::InvalidSink { value } => {
                write!(f, "INTAKE_SINK must be 'csv' or 'sheets' (found '{value}')")
            }
            ConfigError::MissingCredentials => write!(
                f,
                "INTAKE_CREDENTIALS_PATH or INTAKE_CREDENTIALS_JSON is required for the sheets sink"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidFlag { .. }
            | ConfigError::InvalidSink { .. }
            | ConfigError::MissingCredentials => None,
        }
    }
}
