use std::{env, time::Duration};

use log::*;
use loyalty_common::{helpers::parse_duration, Secret};
use loyalty_engine::accrual::{
    AccrualClientConfig,
    ReconciliationOptions,
    DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_RETRY_AFTER,
    DEFAULT_RETRY_INTERVAL,
};
use rand::{distributions::Alphanumeric, thread_rng, Rng};

use crate::{cli::Cli, errors::ServerError};

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATABASE_URI: &str = "sqlite://data/loyalty.db";
const DEFAULT_ACCRUAL_ADDRESS: &str = "http://localhost:8081";
const DEFAULT_TOKEN_DURATION: Duration = Duration::from_secs(60 * 60);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    pub accrual: AccrualConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database_url: DEFAULT_DATABASE_URI.to_string(),
            auth: AuthConfig::default(),
            accrual: AccrualConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        Self::from_env_or_flags(&Cli::default())
    }

    /// Builds the configuration from environment variables, falling back to the command line flags and then to the
    /// defaults for anything that is not set.
    pub fn from_env_or_flags(cli: &Cli) -> Self {
        let run_address = env_or_flag("RUN_ADDRESS", &cli.run_address);
        let (host, port) = match run_address {
            Some(addr) => parse_run_address(&addr).unwrap_or_else(|e| {
                error!("🪛️ {e} Using the default, {DEFAULT_HOST}:{DEFAULT_PORT}, instead.");
                (DEFAULT_HOST.to_string(), DEFAULT_PORT)
            }),
            None => {
                info!("🪛️ RUN_ADDRESS is not set. Listening on {DEFAULT_HOST}:{DEFAULT_PORT}.");
                (DEFAULT_HOST.to_string(), DEFAULT_PORT)
            },
        };
        let database_url = env_or_flag("DATABASE_URI", &cli.database_uri).unwrap_or_else(|| {
            warn!("🪛️ DATABASE_URI is not set. Using the default database at {DEFAULT_DATABASE_URI}.");
            DEFAULT_DATABASE_URI.to_string()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let accrual = AccrualConfig::from_env_or_flags(cli);
        Self { host, port, database_url, auth, accrual }
    }
}

fn env_or_flag(name: &str, flag: &Option<String>) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty()).or_else(|| flag.clone())
}

fn duration_from_env(name: &str, default: Duration) -> Duration {
    match env::var(name) {
        Ok(s) => parse_duration(&s).unwrap_or_else(|e| {
            warn!("🪛️ Invalid configuration value for {name}. {e}. Using the default of {default:?}.");
            default
        }),
        Err(_) => {
            debug!("🪛️ {name} is not set. Using the default value of {default:?}.");
            default
        },
    }
}

/// Splits a `host:port` listen address. An empty host (`:8080`) listens on all interfaces.
pub fn parse_run_address(value: &str) -> Result<(String, u16), String> {
    let value = value.trim();
    let (host, port) =
        value.rsplit_once(':').ok_or_else(|| format!("'{value}' is not a valid RUN_ADDRESS. Expected host:port."))?;
    let port = port.parse::<u16>().map_err(|e| format!("'{port}' is not a valid port in RUN_ADDRESS. {e}."))?;
    let host = if host.is_empty() { "0.0.0.0" } else { host };
    Ok((host.to_string(), port))
}

//-------------------------------------------------  AccrualConfig  ----------------------------------------------------
#[derive(Clone, Debug)]
pub struct AccrualConfig {
    /// Base address of the accrual service.
    pub address: String,
    /// Upper bound on a single request to the accrual service.
    pub timeout: Duration,
    /// Minimum time between two queries about the same order.
    pub retry_interval: Duration,
    /// Rate-limit delay used when the accrual service does not say how long to wait.
    pub default_retry_after: Duration,
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ACCRUAL_ADDRESS.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            default_retry_after: DEFAULT_RETRY_AFTER,
        }
    }
}

impl AccrualConfig {
    pub fn from_env_or_flags(cli: &Cli) -> Self {
        let address = env_or_flag("ACCRUAL_SYSTEM_ADDRESS", &cli.accrual_address).unwrap_or_else(|| {
            error!(
                "🪛️ ACCRUAL_SYSTEM_ADDRESS is not set. Please set it to the address of the accrual service. Using \
                 {DEFAULT_ACCRUAL_ADDRESS} for now."
            );
            DEFAULT_ACCRUAL_ADDRESS.to_string()
        });
        let timeout = duration_from_env("CANCEL_INTERVAL", DEFAULT_REQUEST_TIMEOUT);
        let retry_interval = duration_from_env("ACCRUAL_RETRY_INTERVAL", DEFAULT_RETRY_INTERVAL);
        let default_retry_after = duration_from_env("ACCRUAL_DEFAULT_RETRY_AFTER", DEFAULT_RETRY_AFTER);
        Self { address, timeout, retry_interval, default_retry_after }
    }

    pub fn client_config(&self) -> AccrualClientConfig {
        AccrualClientConfig::new(&self.address)
            .with_timeout(self.timeout)
            .with_default_retry_after(self.default_retry_after)
    }

    pub fn reconciliation_options(&self) -> ReconciliationOptions {
        ReconciliationOptions { retry_interval: self.retry_interval, call_timeout: self.timeout }
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Shared secret used to sign and verify access tokens (HS256).
    pub jwt_secret: Secret<String>,
    /// Key for the HMAC-SHA256 password digests. Changing it invalidates every stored password.
    pub password_key: Secret<String>,
    /// How long an access token stays valid.
    pub token_duration: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret and password key have not been set. I'm using random values for this session. DO \
             NOT operate on production like this since users will not be able to log in after a restart. 🚨️🚨️🚨️"
        );
        Self {
            jwt_secret: Secret::new(random_key()),
            password_key: Secret::new(random_key()),
            token_duration: DEFAULT_TOKEN_DURATION,
        }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, ServerError> {
        let jwt_secret = env::var("LOYALTY_JWT_SECRET")
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [LOYALTY_JWT_SECRET]")))?;
        let password_key = env::var("LOYALTY_PASSWORD_KEY")
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [LOYALTY_PASSWORD_KEY]")))?;
        if jwt_secret.is_empty() || password_key.is_empty() {
            return Err(ServerError::ConfigurationError(
                "LOYALTY_JWT_SECRET and LOYALTY_PASSWORD_KEY may not be empty".to_string(),
            ));
        }
        let token_duration = duration_from_env("TOKEN_DURATION", DEFAULT_TOKEN_DURATION);
        Ok(Self { jwt_secret: Secret::new(jwt_secret), password_key: Secret::new(password_key), token_duration })
    }
}

fn random_key() -> String {
    thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn run_address() {
        assert_eq!(parse_run_address("localhost:8080"), Ok(("localhost".to_string(), 8080)));
        assert_eq!(parse_run_address(":9000"), Ok(("0.0.0.0".to_string(), 9000)));
        assert_eq!(parse_run_address(" 127.0.0.1:1 "), Ok(("127.0.0.1".to_string(), 1)));
        assert!(parse_run_address("localhost").is_err());
        assert!(parse_run_address("localhost:http").is_err());
        assert!(parse_run_address("localhost:70000").is_err());
    }

    #[test]
    fn flags_fill_in_for_missing_env_vars() {
        let flag = Some("from-flag".to_string());
        assert_eq!(env_or_flag("LOYALTY_TEST_SURELY_UNSET_VARIABLE", &flag), flag);
        assert_eq!(env_or_flag("LOYALTY_TEST_SURELY_UNSET_VARIABLE", &None), None);
    }

    #[test]
    fn accrual_settings_flow_into_engine_config() {
        let config = AccrualConfig {
            address: "accrual:8081".into(),
            timeout: Duration::from_secs(5),
            retry_interval: Duration::from_millis(250),
            default_retry_after: Duration::from_secs(30),
        };
        let client = config.client_config();
        assert_eq!(client.address, "accrual:8081");
        assert_eq!(client.timeout, Duration::from_secs(5));
        assert_eq!(client.default_retry_after, Duration::from_secs(30));
        let options = config.reconciliation_options();
        assert_eq!(options.retry_interval, Duration::from_millis(250));
        assert_eq!(options.call_timeout, Duration::from_secs(5));
    }

    #[test]
    fn random_keys_differ() {
        let a = random_key();
        assert_eq!(a.len(), 48);
        assert_ne!(a, random_key());
    }
}
