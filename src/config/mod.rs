use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;

use log::{debug, trace, LevelFilter};
use once_cell::sync::Lazy;
use pingora::server::configuration::{Opt, ServerConf};
use pingora_error::{Error, ErrorType::*, OrErr, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::core::User;

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_\-]*$").expect("valid identifier regex"));

#[derive(Default, Debug, Serialize, Deserialize, Validate)]
pub struct Config {
    #[serde(default)]
    pub pingora: ServerConf,

    #[validate(length(min = 1))]
    #[validate(nested)]
    pub listeners: Vec<Listener>,

    #[validate(nested)]
    #[serde(default)]
    pub lifecycle: LifecycleSettings,

    #[validate(nested)]
    #[serde(default)]
    pub log: Log,

    #[validate(nested)]
    #[serde(default)]
    pub auth: Auth,
}

// Config file load and validation
impl Config {
    pub fn load_from_yaml<P>(path: P) -> Result<Self>
    where
        P: AsRef<std::path::Path> + std::fmt::Display,
    {
        let conf_str = fs::read_to_string(&path).or_err_with(ReadError, || {
            format!("Unable to read conf file from {path}")
        })?;
        debug!("Conf file read from {path}");
        Self::from_yaml(&conf_str)
    }

    // config file load entry point
    pub fn load_yaml_with_opt_override(opt: &Opt) -> Result<Self> {
        if let Some(path) = &opt.conf {
            let mut conf = Self::load_from_yaml(path)?;
            conf.merge_with_opt(opt);
            Ok(conf)
        } else {
            Error::e_explain(ReadError, "No path specified")
        }
    }

    pub fn from_yaml(conf_str: &str) -> Result<Self> {
        trace!("Read conf file: {conf_str}");
        let conf: Config = serde_yaml::from_str(conf_str).or_err_with(ReadError, || {
            format!("Unable to parse yaml conf {conf_str}")
        })?;

        trace!("Loaded conf: {conf:?}");

        conf.validate()
            .or_err_with(FileReadError, || "Conf file valid failed")?;

        Ok(conf)
    }

    pub fn merge_with_opt(&mut self, opt: &Opt) {
        if opt.daemon {
            self.pingora.daemon = true;
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "Listener::validate_tls_for_offer_h2"))]
pub struct Listener {
    pub address: SocketAddr,
    pub tls: Option<Tls>,
    #[serde(default)]
    pub offer_h2: bool,
    #[serde(default)]
    pub offer_h2c: bool,
}

impl Listener {
    fn validate_tls_for_offer_h2(&self) -> Result<(), ValidationError> {
        if self.offer_h2 && self.tls.is_none() {
            Err(ValidationError::new("tls_required_for_h2"))
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tls {
    pub cert_path: String,
    pub key_path: String,
}

/// Settings consumed by the lifecycle engine itself
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct LifecycleSettings {
    /// Body written when the render stage has no view bound
    #[serde(default = "LifecycleSettings::default_ack_body")]
    #[validate(length(min = 1))]
    pub ack_body: String,

    /// Status used for error responses
    #[serde(default = "LifecycleSettings::default_error_status")]
    #[validate(range(min = 500, max = 599))]
    pub error_status: u16,

    /// Reserved data-bag key holding flash messages
    #[serde(default = "LifecycleSettings::default_flash_key")]
    #[validate(regex(path = *IDENT_RE))]
    pub flash_key: String,

    /// Request parameter carrying the action name
    #[serde(default = "LifecycleSettings::default_action_param")]
    #[validate(regex(path = *IDENT_RE))]
    pub action_param: String,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            ack_body: Self::default_ack_body(),
            error_status: Self::default_error_status(),
            flash_key: Self::default_flash_key(),
            action_param: Self::default_action_param(),
        }
    }
}

impl LifecycleSettings {
    fn default_ack_body() -> String {
        "OK".to_string()
    }

    fn default_error_status() -> u16 {
        500
    }

    fn default_flash_key() -> String {
        "flashMessages".to_string()
    }

    fn default_action_param() -> String {
        "action".to_string()
    }

    pub fn error_status_code(&self) -> http::StatusCode {
        http::StatusCode::from_u16(self.error_status)
            .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Log {
    #[serde(default = "Log::default_level")]
    #[validate(custom(function = "Log::validate_level"))]
    pub level: String,
    /// Append log lines to this file instead of stderr
    pub path: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            path: None,
        }
    }
}

impl Log {
    fn default_level() -> String {
        "info".to_string()
    }

    fn validate_level(level: &str) -> Result<(), ValidationError> {
        level
            .parse::<LevelFilter>()
            .map(|_| ())
            .map_err(|_| ValidationError::new("invalid_log_level"))
    }

    pub fn level_filter(&self) -> LevelFilter {
        self.level.parse().unwrap_or(LevelFilter::Info)
    }
}

/// API-key authentication for controller routes
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Auth {
    #[serde(default = "Auth::default_header")]
    #[validate(length(min = 1))]
    pub header: String,
    #[serde(default = "Auth::default_query")]
    #[validate(length(min = 1))]
    pub query: String,
    #[serde(default)]
    #[validate(custom(function = "Auth::validate_keys"))]
    pub keys: HashMap<String, User>,
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            header: Self::default_header(),
            query: Self::default_query(),
            keys: HashMap::new(),
        }
    }
}

impl Auth {
    fn default_header() -> String {
        "apikey".to_string()
    }

    fn default_query() -> String {
        "apikey".to_string()
    }

    fn validate_keys(keys: &HashMap<String, User>) -> Result<(), ValidationError> {
        for (key, user) in keys {
            if key.is_empty() || user.id.is_empty() {
                let mut err = ValidationError::new("invalid_auth_key");
                err.add_param("user".into(), &user.id);
                return Err(err);
            }
        }
        Ok(())
    }
}
