use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration, loaded once at startup from the environment.
/// Every field has a hard default so a dev run needs nothing but a bot token.
#[derive(Debug, Clone)]
pub struct Config {
    /// Chat-platform bot token.
    pub bot_token: String,
    /// Bot username used when building share URLs.
    pub bot_username: String,
    /// Principals allowed to drive sessions.
    pub owner_ids: Vec<i64>,
    /// Public announcement channel. When unset, no public status surface or
    /// announcement post is created.
    pub main_channel: Option<i64>,
    /// Durable storage channel backing share tokens.
    pub db_channel: i64,

    /// Download daemon RPC endpoint.
    pub aria2_host: String,
    pub aria2_port: u16,
    pub aria2_secret: Option<String>,

    /// Read-only assets, configured once and passed to the media tool by path.
    pub thumbnail: PathBuf,
    pub font: PathBuf,
    /// Font family name written into normalized subtitle styles.
    pub font_name: String,
    /// Optional greeter sticker sent with /start.
    pub sticker_id: Option<String>,
    /// Subtitle track title written during the mux.
    pub track_title: String,

    /// Base directory for per-session temp files.
    pub workdir: PathBuf,
    /// Health endpoint port; no listener when unset.
    pub port: Option<u16>,
    pub log_file: Option<PathBuf>,

    /// Feed watcher.
    pub rss_url: Option<String>,
    pub feed_interval: Duration,
    pub feed_item_delay: Duration,
    /// Channels feed items are republished to; defaults to the main channel.
    pub feed_channels: Vec<i64>,

    /// Concurrent mux permit count.
    pub mux_jobs: usize,
    pub mux_timeout: Duration,
    pub upload_timeout: Duration,
    /// Sessions idle longer than this are reaped.
    pub idle_horizon: Duration,
    pub reap_interval: Duration,
    /// Seek point for still capture.
    pub still_timecode: String,
    /// Truncate long synopses in announcement posts.
    pub short_synopsis: bool,
}

fn env_str(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_str(key).and_then(|v| v.parse().ok())
}

impl Config {
    pub fn from_env() -> Self {
        let owner_ids: Vec<i64> = env_str("OWNER_IDS")
            .map(|v| v.split(',').filter_map(|s| s.trim().parse().ok()).collect())
            .unwrap_or_default();
        let mut owner_ids = owner_ids;
        if let Some(primary) = env_parse::<i64>("OWNER_ID") {
            if !owner_ids.contains(&primary) {
                owner_ids.push(primary);
            }
        }

        let main_channel = env_parse::<i64>("MAIN_CHANNEL");
        let feed_channels = env_str("FEED_CHANNELS")
            .map(|v| v.split(',').filter_map(|s| s.trim().parse().ok()).collect())
            .unwrap_or_else(|| main_channel.into_iter().collect());

        Self {
            bot_token: env_str("TELEGRAM_TOKEN").unwrap_or_else(|| "0".into()),
            bot_username: env_str("BOT_USERNAME").unwrap_or_else(|| "submux_bot".into()),
            owner_ids,
            main_channel,
            db_channel: env_parse("DB_CHANNEL").unwrap_or(-1002279496397),
            aria2_host: env_str("ARIA2_HOST").unwrap_or_else(|| "http://localhost".into()),
            aria2_port: env_parse("ARIA2_PORT").unwrap_or(6800),
            aria2_secret: env_str("ARIA2_SECRET"),
            thumbnail: env_str("THUMBNAIL")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("assets/thumbnail.jpg")),
            font: env_str("FONT_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("assets/OathBold.otf")),
            font_name: env_str("FONT_NAME").unwrap_or_else(|| "Oath-Bold".into()),
            sticker_id: env_str("STICKER_ID"),
            track_title: env_str("SUB_TRACK_TITLE").unwrap_or_else(|| "submux".into()),
            workdir: env_str("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            port: env_parse("PORT"),
            log_file: env_str("LOG_FILE_NAME").map(PathBuf::from),
            rss_url: env_str("RSS_URL"),
            feed_interval: Duration::from_secs(env_parse("CHECK_INTERVAL").unwrap_or(60)),
            feed_item_delay: Duration::from_secs(env_parse("FEED_ITEM_DELAY").unwrap_or(5)),
            feed_channels,
            mux_jobs: env_parse("MUX_JOBS").unwrap_or(1),
            mux_timeout: Duration::from_secs(env_parse("MUX_TIMEOUT_SECS").unwrap_or(30 * 60)),
            upload_timeout: Duration::from_secs(env_parse("UPLOAD_TIMEOUT_SECS").unwrap_or(30 * 60)),
            idle_horizon: Duration::from_secs(env_parse("SESSION_IDLE_SECS").unwrap_or(30 * 60)),
            reap_interval: Duration::from_secs(env_parse("REAP_INTERVAL_SECS").unwrap_or(60)),
            still_timecode: env_str("STILL_TIMECODE").unwrap_or_else(|| "00:00:05".into()),
            short_synopsis: env_parse("SHORT_SYNOPSIS").unwrap_or(true),
        }
    }

    pub fn is_owner(&self, principal: i64) -> bool {
        self.owner_ids.contains(&principal)
    }

    pub fn aria2_endpoint(&self) -> String {
        format!("{}:{}/jsonrpc", self.aria2_host, self.aria2_port)
    }
}
