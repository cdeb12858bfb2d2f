// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use outsource_db::{ConnectParams, DEFAULT_CONNECT_TIMEOUT};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const APP_NAME: &str = "outsource";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub connection: Connection,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            connection: Connection::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Connection {
    pub host: Option<String>,
    /// Accepts an integer or a string; anything unparsable falls back to
    /// 5432 the same way the input form does.
    pub port: Option<toml::Value>,
    pub dbname: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub sslmode: Option<String>,
    pub connect_timeout_secs: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub path: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("OUTSOURCE_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!(
                "cannot resolve config directory; set OUTSOURCE_CONFIG_PATH to the config file"
            )
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and move values under [connection] and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(sslmode) = &self.connection.sslmode
            && !matches!(sslmode.as_str(), "disable" | "prefer" | "require")
        {
            bail!(
                "connection.sslmode in {} must be disable, prefer, or require, got {:?}",
                path.display(),
                sslmode
            );
        }

        if let Some(secs) = self.connection.connect_timeout_secs
            && secs <= 0
        {
            bail!(
                "connection.connect_timeout_secs in {} must be positive, got {}",
                path.display(),
                secs
            );
        }

        Ok(())
    }

    fn port(&self) -> u16 {
        match &self.connection.port {
            Some(toml::Value::Integer(port)) => {
                u16::try_from(*port).unwrap_or(outsource_db::DEFAULT_PORT)
            }
            Some(toml::Value::String(port)) => ConnectParams::parse_port(port),
            _ => outsource_db::DEFAULT_PORT,
        }
    }

    pub fn connect_params(&self) -> ConnectParams {
        let defaults = ConnectParams::default();
        ConnectParams {
            host: self.connection.host.clone().unwrap_or(defaults.host),
            port: self.port(),
            dbname: self.connection.dbname.clone().unwrap_or(defaults.dbname),
            user: self.connection.user.clone().unwrap_or(defaults.user),
            password: self.connection.password.clone().unwrap_or_default(),
            sslmode: self.connection.sslmode.clone().unwrap_or(defaults.sslmode),
            connect_timeout: self
                .connection
                .connect_timeout_secs
                .map_or(DEFAULT_CONNECT_TIMEOUT, |secs| {
                    Duration::from_secs(secs as u64)
                }),
        }
    }

    /// Event log location. Defaults next to the config file so both live in
    /// the app's config directory.
    pub fn log_path(&self, config_path: &Path) -> PathBuf {
        match &self.log.path {
            Some(path) => PathBuf::from(path),
            None => config_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("outsource.log"),
        }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# outsource config\n# Place this file at: {}\n\nversion = 1\n\n[connection]\nhost = \"localhost\"\nport = 5432\ndbname = \"outsource\"\nuser = \"postgres\"\n# password = \"\"\nsslmode = \"prefer\"\nconnect_timeout_secs = 5\n\n[log]\n# Default is outsource.log next to this file\n# path = \"/absolute/path/to/outsource.log\"\n",
            path.display(),
        )
    }
}
