//! Runtime configuration
//!
//! Everything is read from environment variables once at start-up.
//! Priority for each value: environment variable > built-in default.

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

pub const ENV_DB_PATH: &str = "TOKENGATE_DB_PATH";
pub const ENV_JWT_SECRET: &str = "TOKENGATE_JWT_SECRET";
pub const ENV_DAY_BOUNDARY: &str = "TOKENGATE_DAY_BOUNDARY";
pub const ENV_BIND: &str = "TOKENGATE_BIND";
pub const ENV_PLAN_CATALOG: &str = "TOKENGATE_PLAN_CATALOG";
pub const ENV_RAZORPAY_KEY_ID: &str = "RAZORPAY_KEY_ID";
pub const ENV_RAZORPAY_KEY_SECRET: &str = "RAZORPAY_KEY_SECRET";

const DEFAULT_BIND: &str = "127.0.0.1:8080";
const MIN_SECRET_LEN: usize = 32;

// ============================================================================
// Day Boundary
// ============================================================================

/// Which clock defines "today" for the daily quota rollover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DayBoundary {
    /// Midnight UTC
    #[default]
    Utc,
    /// Midnight in the server's local timezone
    Local,
    /// Midnight at a fixed UTC offset (e.g. `+05:30`)
    Fixed(FixedOffset),
}

impl DayBoundary {
    /// Calendar date that `now` falls on under this boundary
    pub fn date_of(&self, now: DateTime<Utc>) -> NaiveDate {
        match self {
            DayBoundary::Utc => now.date_naive(),
            DayBoundary::Local => now.with_timezone(&Local).date_naive(),
            DayBoundary::Fixed(offset) => now.with_timezone(offset).date_naive(),
        }
    }

    /// Today's calendar date
    pub fn today(&self) -> NaiveDate {
        self.date_of(Utc::now())
    }
}

impl std::fmt::Display for DayBoundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DayBoundary::Utc => write!(f, "utc"),
            DayBoundary::Local => write!(f, "local"),
            DayBoundary::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

impl std::str::FromStr for DayBoundary {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "utc" | "z" | "" => Ok(DayBoundary::Utc),
            "local" => Ok(DayBoundary::Local),
            other => parse_offset(other)
                .map(DayBoundary::Fixed)
                .ok_or_else(|| format!("Invalid day boundary: {}", s)),
        }
    }
}

/// Parse `+HH:MM` / `-HH:MM` / `+HHMM`
fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

// ============================================================================
// AppConfig
// ============================================================================

/// Razorpay API credentials
#[derive(Clone)]
pub struct RazorpayCredentials {
    pub key_id: String,
    pub key_secret: String,
}

impl std::fmt::Debug for RazorpayCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayCredentials")
            .field("key_id", &self.key_id)
            .field("key_secret", &"****")
            .finish()
    }
}

/// Process-wide configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub jwt_secret: Vec<u8>,
    pub day_boundary: DayBoundary,
    pub bind_addr: String,
    pub plan_catalog_path: Option<PathBuf>,
    pub razorpay: Option<RazorpayCredentials>,
}

impl AppConfig {
    /// Build configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let day_boundary = match std::env::var(ENV_DAY_BOUNDARY) {
            Ok(value) => value.parse().map_err(Error::config)?,
            Err(_) => DayBoundary::default(),
        };

        Ok(Self {
            db_path: get_db_path()?,
            jwt_secret: load_jwt_secret(),
            day_boundary,
            bind_addr: std::env::var(ENV_BIND).unwrap_or_else(|_| DEFAULT_BIND.to_string()),
            plan_catalog_path: std::env::var(ENV_PLAN_CATALOG)
                .ok()
                .filter(|p| !p.is_empty())
                .map(|p| expand_path(&p)),
            razorpay: load_razorpay_credentials(),
        })
    }

    /// Key/value view for display, secrets masked
    pub fn entries(&self) -> Vec<ConfigEntry> {
        vec![
            ConfigEntry::new(ENV_DB_PATH, self.db_path.display().to_string()),
            ConfigEntry::new(ENV_JWT_SECRET, "****".to_string()),
            ConfigEntry::new(ENV_DAY_BOUNDARY, self.day_boundary.to_string()),
            ConfigEntry::new(ENV_BIND, self.bind_addr.clone()),
            ConfigEntry::new(
                ENV_PLAN_CATALOG,
                self.plan_catalog_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "built-in".to_string()),
            ),
            ConfigEntry::new(
                ENV_RAZORPAY_KEY_ID,
                self.razorpay
                    .as_ref()
                    .map(|c| c.key_id.clone())
                    .unwrap_or_else(|| "development gateway".to_string()),
            ),
        ]
    }
}

/// One configuration value and where it came from
#[derive(Debug, Clone, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub source: String,
}

impl ConfigEntry {
    fn new(key: &str, value: String) -> Self {
        let source = if std::env::var(key).is_ok() { "env" } else { "default" };
        Self {
            key: key.to_string(),
            value,
            source: source.to_string(),
        }
    }
}

/// Get database file path
/// Priority: TOKENGATE_DB_PATH env var > default app data directory
pub fn get_db_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(ENV_DB_PATH) {
        return Ok(expand_path(&path));
    }

    let dirs = directories::ProjectDirs::from("com", "tokengate", "Tokengate")
        .ok_or_else(|| Error::config("Could not determine project directories"))?;

    Ok(dirs.data_dir().join("tokengate.db"))
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

/// JWT secret from the environment, or a random one for this process
fn load_jwt_secret() -> Vec<u8> {
    match std::env::var(ENV_JWT_SECRET) {
        Ok(secret) if secret.len() >= MIN_SECRET_LEN => secret.into_bytes(),
        Ok(secret) if !secret.is_empty() => {
            log::warn!(
                "{} is shorter than {} characters. Consider using a longer secret.",
                ENV_JWT_SECRET,
                MIN_SECRET_LEN
            );
            secret.into_bytes()
        }
        _ => {
            // Tokens won't survive a restart
            log::warn!("{} not set. Generating random secret.", ENV_JWT_SECRET);
            use rand::Rng;
            let mut rng = rand::thread_rng();
            (0..64).map(|_| rng.gen::<u8>()).collect()
        }
    }
}

fn load_razorpay_credentials() -> Option<RazorpayCredentials> {
    let key_id = std::env::var(ENV_RAZORPAY_KEY_ID).ok()?;
    let key_secret = std::env::var(ENV_RAZORPAY_KEY_SECRET).ok()?;

    let placeholder = key_id.is_empty()
        || key_secret.is_empty()
        || key_id == "rzp_test_placeholder"
        || key_secret == "placeholder_secret";
    if placeholder {
        log::warn!("Razorpay credentials are placeholders; using development gateway");
        return None;
    }

    Some(RazorpayCredentials { key_id, key_secret })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    // Mutex to ensure env var tests don't run in parallel
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_get_db_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        std::env::remove_var(ENV_DB_PATH);
        let path = get_db_path().unwrap();
        assert!(path.to_string_lossy().contains("tokengate.db"));
    }

    #[test]
    fn test_get_db_path_env_override() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let test_path = "/tmp/test_tokengate.db";
        std::env::set_var(ENV_DB_PATH, test_path);
        let path = get_db_path().unwrap();
        assert_eq!(path.to_string_lossy(), test_path);
        std::env::remove_var(ENV_DB_PATH);
    }

    #[test]
    fn test_day_boundary_parse() {
        assert_eq!("utc".parse::<DayBoundary>().unwrap(), DayBoundary::Utc);
        assert_eq!("LOCAL".parse::<DayBoundary>().unwrap(), DayBoundary::Local);
        assert_eq!(
            "+05:30".parse::<DayBoundary>().unwrap(),
            DayBoundary::Fixed(FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap())
        );
        assert_eq!(
            "-0800".parse::<DayBoundary>().unwrap(),
            DayBoundary::Fixed(FixedOffset::west_opt(8 * 3600).unwrap())
        );
        assert!("tomorrow".parse::<DayBoundary>().is_err());
        assert!("+25:00".parse::<DayBoundary>().is_err());
    }

    #[test]
    fn test_day_boundary_date_of() {
        // 2026-03-01 20:00 UTC is already 2026-03-02 in IST
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap();
        assert_eq!(
            DayBoundary::Utc.date_of(now),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
        );
        let ist: DayBoundary = "+05:30".parse().unwrap();
        assert_eq!(ist.date_of(now), NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
    }

    #[test]
    fn test_razorpay_placeholders_ignored() {
        let _lock = ENV_MUTEX.lock().unwrap();
        std::env::set_var(ENV_RAZORPAY_KEY_ID, "rzp_test_placeholder");
        std::env::set_var(ENV_RAZORPAY_KEY_SECRET, "placeholder_secret");
        assert!(load_razorpay_credentials().is_none());
        std::env::remove_var(ENV_RAZORPAY_KEY_ID);
        std::env::remove_var(ENV_RAZORPAY_KEY_SECRET);
    }
}
