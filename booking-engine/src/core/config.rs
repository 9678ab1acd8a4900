use chrono::NaiveDate;
use chrono_tz::Tz;

/// Engine configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | COMMUNITY_NAME | Skraaningen | Community name used in export file names |
/// | BUSINESS_TZ | Europe/Copenhagen | Time zone that defines "today" |
/// | SCAFFOLD_BATCH_SIZE | 50 | Rows per batch when applying a bucket |
/// | DEFAULT_CANCELLATION_DAYS | 10 | Deadline (days before dinner) when a season has none |
/// | LOG_LEVEL | info | Logger level |
/// | LOG_JSON | false | JSON log lines |
/// | LOG_DIR | (unset) | Enables daily rolling log files |
///
/// # Example
///
/// ```ignore
/// BUSINESS_TZ=Europe/Copenhagen SCAFFOLD_BATCH_SIZE=100 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub community_name: String,
    pub business_tz: Tz,
    pub scaffold_batch_size: usize,
    pub default_cancellation_days: i64,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
}

impl Config {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            community_name: std::env::var("COMMUNITY_NAME")
                .unwrap_or_else(|_| "Skraaningen".into()),
            business_tz: std::env::var("BUSINESS_TZ")
                .ok()
                .and_then(|v| v.parse::<Tz>().ok())
                .unwrap_or(chrono_tz::Europe::Copenhagen),
            scaffold_batch_size: std::env::var("SCAFFOLD_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(50),
            default_cancellation_days: std::env::var("DEFAULT_CANCELLATION_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &i64| *n >= 0)
                .unwrap_or(10),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: std::env::var("LOG_DIR").ok().filter(|v| !v.is_empty()),
        }
    }

    /// Override the values tests care about
    pub fn with_overrides(
        community_name: impl Into<String>,
        scaffold_batch_size: usize,
        default_cancellation_days: i64,
    ) -> Self {
        let mut config = Self::from_env();
        config.community_name = community_name.into();
        config.scaffold_batch_size = scaffold_batch_size.max(1);
        config.default_cancellation_days = default_cancellation_days;
        config
    }

    /// Today in the business time zone
    pub fn today(&self) -> NaiveDate {
        chrono::Utc::now().with_timezone(&self.business_tz).date_naive()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
