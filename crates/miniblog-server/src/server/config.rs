use anyhow::{Context, bail};
use clap::Parser;
use core::{fmt, time::Duration};
use std::net::SocketAddr;

/// Runtime configuration for the `miniblog-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file in the working directory is honoured), with defaults suitable for a
/// local deployment. Only the JWT secret has no default.
#[derive(Parser, Clone)]
#[command(
    name = "miniblog-server",
    version,
    about = "A user-management REST service with coalesced reads"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `MINIBLOG_ADDR`
    #[arg(long, env = "MINIBLOG_ADDR", default_value_t = String::from("0.0.0.0:8080"))]
    pub addr: String,

    /// Secret used to sign and verify HS256 bearer tokens.
    ///
    /// Environment variable: `MINIBLOG_JWT_SECRET`
    #[arg(long, env = "MINIBLOG_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Subject that is allowed to perform every action, including listing
    /// all users.
    ///
    /// Environment variable: `MINIBLOG_ADMIN`
    #[arg(long, env = "MINIBLOG_ADMIN", default_value_t = String::from("root"))]
    pub admin: String,

    /// Page size used when a list request omits `limit` or sets it to 0.
    ///
    /// Environment variable: `MINIBLOG_DEFAULT_LIMIT`
    #[arg(long, env = "MINIBLOG_DEFAULT_LIMIT", default_value_t = 20)]
    pub default_limit: usize,

    /// Largest page a list request may ask for. Larger values are clamped.
    ///
    /// Environment variable: `MINIBLOG_MAX_LIMIT`
    #[arg(long, env = "MINIBLOG_MAX_LIMIT", default_value_t = 100)]
    pub max_limit: usize,

    /// Seconds between two runs of the user statistics job.
    ///
    /// Environment variable: `MINIBLOG_STATS_INTERVAL_SECS`
    #[arg(long, env = "MINIBLOG_STATS_INTERVAL_SECS", default_value_t = 5)]
    pub stats_interval_secs: u64,

    /// Seconds background tasks get to stop once shutdown has begun.
    ///
    /// Environment variable: `MINIBLOG_SHUTDOWN_TIMEOUT_SECS`
    #[arg(long, env = "MINIBLOG_SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,

    /// Print a day-long admin token to stderr at startup. For local
    /// development only.
    ///
    /// Environment variable: `MINIBLOG_DEV_TOKEN`
    #[arg(long, env = "MINIBLOG_DEV_TOKEN", default_value_t = false)]
    pub dev_token: bool,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub jwt_secret: String,
    pub admin: String,
    pub default_limit: usize,
    pub max_limit: usize,
    pub stats_interval: Duration,
    pub shutdown_timeout: Duration,
    pub dev_token: bool,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("addr", &self.addr)
            .field("jwt_secret", &"<redacted>")
            .field("admin", &self.admin)
            .field("default_limit", &self.default_limit)
            .field("max_limit", &self.max_limit)
            .field("stats_interval", &self.stats_interval)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("dev_token", &self.dev_token)
            .finish()
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let addr = args
            .addr
            .parse::<SocketAddr>()
            .with_context(|| format!("MINIBLOG_ADDR ({}) is not a socket address", args.addr))?;

        if args.jwt_secret.is_empty() {
            bail!("MINIBLOG_JWT_SECRET must not be empty");
        }

        if args.admin.is_empty() {
            bail!("MINIBLOG_ADMIN must not be empty");
        }

        if args.default_limit == 0 {
            bail!("MINIBLOG_DEFAULT_LIMIT must be greater than 0");
        }

        if args.default_limit > args.max_limit {
            bail!(
                "MINIBLOG_DEFAULT_LIMIT ({}) exceeds MINIBLOG_MAX_LIMIT ({})",
                args.default_limit,
                args.max_limit
            );
        }

        if args.stats_interval_secs == 0 {
            bail!("MINIBLOG_STATS_INTERVAL_SECS must be greater than 0");
        }

        Ok(Self {
            addr,
            jwt_secret: args.jwt_secret,
            admin: args.admin,
            default_limit: args.default_limit,
            max_limit: args.max_limit,
            stats_interval: Duration::from_secs(args.stats_interval_secs),
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout_secs),
            dev_token: args.dev_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["miniblog-server", "--jwt-secret", "s3cret"];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_validate() {
        let config = ServerConfig::try_from(parse(&[])).unwrap();
        assert_eq!(config.addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.admin, "root");
        assert_eq!(config.default_limit, 20);
        assert_eq!(config.max_limit, 100);
        assert_eq!(config.stats_interval, Duration::from_secs(5));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(10));
        assert!(!config.dev_token);
    }

    #[test]
    fn dev_token_is_opt_in() {
        let config = ServerConfig::try_from(parse(&["--dev-token"])).unwrap();
        assert!(config.dev_token);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = ServerConfig::try_from(parse(&["--stats-interval-secs", "0"])).unwrap_err();
        assert!(err.to_string().contains("STATS_INTERVAL"));
    }

    #[test]
    fn default_limit_cannot_exceed_max() {
        let args = parse(&["--default-limit", "50", "--max-limit", "10"]);
        assert!(ServerConfig::try_from(args).is_err());
    }

    #[test]
    fn bad_address_is_rejected() {
        assert!(ServerConfig::try_from(parse(&["--addr", "not-an-addr"])).is_err());
    }

    #[test]
    fn empty_secret_is_rejected() {
        let mut args = parse(&[]);
        args.jwt_secret.clear();
        assert!(ServerConfig::try_from(args).is_err());
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let config = ServerConfig::try_from(parse(&[])).unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("s3cret"));
    }
}
