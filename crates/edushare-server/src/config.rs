use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Result, bail};
use tracing::info;

use edushare_api::auth::Economy;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub economy: Economy,
}

impl Config {
    pub fn load() -> Result<Self> {
        let jwt_secret = env::var("EDUSHARE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("EDUSHARE_JWT_SECRET is unset or still a placeholder; set it in .env and restart");
        }

        let defaults = Economy::default();
        Ok(Self {
            host: try_load("EDUSHARE_HOST", "0.0.0.0".to_string())?,
            port: try_load("EDUSHARE_PORT", 3000)?,
            db_path: try_load::<String>("EDUSHARE_DB_PATH", "edushare.db".into())?.into(),
            jwt_secret,
            economy: Economy {
                initial_points: try_load("EDUSHARE_INITIAL_POINTS", defaults.initial_points)?,
                question_cost: try_load("EDUSHARE_QUESTION_COST", defaults.question_cost)?,
                daily_sign_reward: try_load(
                    "EDUSHARE_DAILY_SIGN_REWARD",
                    defaults.daily_sign_reward,
                )?,
            },
        })
    }
}

fn try_load<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {key} value '{raw}': {e}")),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
