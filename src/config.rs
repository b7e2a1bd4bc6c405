//! This module holds the configuration for the server

use std::net::IpAddr;

use actix_toolbox::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

/// Configuration regarding the server
#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct ServerConfig {
    /// The address the server should bind to
    pub listen_address: IpAddr,
    /// The port the server should bind to
    pub listen_port: u16,
}

/// Configuration regarding the database
#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct DBConfig {
    /// Host the database is running on
    pub host: String,
    /// Port the database is running on
    pub port: u16,
    /// Name of the database
    pub name: String,
    /// Username to use for the database connection
    pub user: String,
    /// Password to use for the database connection
    pub password: String,
}

/// This struct can be parsed from the configuration file
#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    /// Configuration regarding the server
    pub server: ServerConfig,
    /// Configuration regarding the database
    pub database: DBConfig,
    /// The logging configuration
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::{DBConfig, ServerConfig};

    #[test]
    fn parses_server_section() {
        let config: ServerConfig = toml::from_str(
            r#"
ListenAddress = "127.0.0.1"
ListenPort = 8080
"#,
        )
        .unwrap();
        assert_eq!(config.listen_port, 8080);
    }

    #[test]
    fn parses_database_section() {
        let config: DBConfig = toml::from_str(
            r#"
Host = "127.0.0.1"
Port = 5432
Name = "amity"
User = "amity"
Password = "change-me"
"#,
        )
        .unwrap();
        assert_eq!(config.port, 5432);
        assert_eq!(config.name, "amity");
    }
}
