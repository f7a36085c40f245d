use std::{net::SocketAddr, path::PathBuf};

use serde::Deserialize;

use crate::Error;

/// Describing the server configuration.
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Base url used to build links in emails, without a trailing slash.
    #[serde(default = "Config::default_site")]
    pub site: String,
    /// Directory holding persisted accounts.
    #[serde(default = "Config::default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub server: Server,
    pub activation: Activation,
    #[serde(default)]
    pub session: Session,
    pub smtp: Smtp,
    /// A staff account created at startup if absent.
    pub admin: Option<Admin>,
}

impl Config {
    /// Reads the config from a toml file.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, Error> {
        let string = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&string)?)
    }

    fn default_site() -> String {
        "http://localhost:8080".to_owned()
    }

    fn default_data_dir() -> PathBuf {
        PathBuf::from("./data")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: Self::default_site(),
            data_dir: Self::default_data_dir(),
            server: Server::default(),
            activation: Activation::default(),
            session: Session::default(),
            smtp: Smtp::default(),
            admin: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Server {
    pub addr: SocketAddr,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

/// Activation link configuration.
#[derive(Deserialize, Debug, Clone)]
pub struct Activation {
    /// Key of activation tokens. Changing it invalidates every link sent.
    pub secret: String,
    /// How long an activation link stays valid.
    #[serde(default = "Activation::default_timeout_hours")]
    pub timeout_hours: i64,
}

impl Activation {
    fn default_timeout_hours() -> i64 {
        72
    }
}

impl Default for Activation {
    /// A random secret, links won't survive a restart.
    fn default() -> Self {
        Self {
            secret: sha256::digest(rand::random::<u64>().to_string()),
            timeout_hours: Self::default_timeout_hours(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Session {
    /// The expiration time of a session in days.
    /// `0` means never expire.
    pub expire_days: u16,
}

impl Default for Session {
    fn default() -> Self {
        Self { expire_days: 7 }
    }
}

/// Describing mailing configuration.
#[derive(Deserialize, Debug, Clone)]
pub struct Smtp {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub address: lettre::Address,
}

impl Default for Smtp {
    fn default() -> Self {
        Self {
            server: String::default(),
            port: 0,
            username: String::default(),
            password: String::default(),
            address: lettre::Address::new("noreply", "example.com").unwrap(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Admin {
    pub username: String,
    pub email: lettre::Address,
    pub password: String,
}
