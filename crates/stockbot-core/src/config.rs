use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    dispatch::DispatchSettings, errors::Error, source::RetryPolicy, Result,
};

/// Typed configuration for the notifier.
///
/// Defaults mirror the constants the bot has always shipped with.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub telegram_safe_limit: usize,

    // Inventory source
    pub database_url: String,
    pub db_connect_timeout: Duration,
    pub source_retry_attempts: u32,
    pub source_retry_delay: Duration,

    // Poll loop
    pub poll_interval: Duration,

    // Notifications
    pub page_size: usize,
    pub send_delay: Duration,
    pub page_delay: Duration,
    pub buy_url_template: String,
    pub notify_channel_tag: Option<String>,
    pub currency_symbol: String,

    // Persistence
    pub subscribers_file: PathBuf,
    pub snapshot_file: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }
        let telegram_safe_limit = env_usize("TELEGRAM_SAFE_LIMIT").unwrap_or(4000);

        let database_url = match env_str("DATABASE_URL").and_then(non_empty) {
            Some(url) => url,
            None => database_url_from_parts(
                env_str("DB_HOST"),
                env_u16("DB_PORT"),
                env_str("DB_USER"),
                env_str("DB_PASSWORD"),
                env_str("DB_NAME"),
            )?,
        };
        let db_connect_timeout =
            Duration::from_secs(env_u64("DB_CONNECT_TIMEOUT_SECS").unwrap_or(10));
        let source_retry_attempts = env_u32("SOURCE_RETRY_ATTEMPTS").unwrap_or(3).max(1);
        let source_retry_delay =
            Duration::from_millis(env_u64("SOURCE_RETRY_DELAY_MS").unwrap_or(2000));

        let poll_interval = Duration::from_secs(env_u64("POLL_INTERVAL_SECS").unwrap_or(30));

        let page_size = env_usize("PAGE_SIZE").unwrap_or(20).max(1);
        let send_delay = Duration::from_millis(env_u64("SEND_DELAY_MS").unwrap_or(50));
        let page_delay = Duration::from_millis(env_u64("PAGE_DELAY_MS").unwrap_or(100));

        let buy_url_template = env_str("BUY_URL_TEMPLATE").unwrap_or_default();
        validate_url_template(&buy_url_template)?;
        let notify_channel_tag = env_str("NOTIFY_CHANNEL_TAG").and_then(non_empty);
        let currency_symbol = env_str("CURRENCY_SYMBOL").unwrap_or_else(|| "¥".to_string());

        let subscribers_file =
            PathBuf::from(env_str("SUBSCRIBERS_FILE").unwrap_or("user.config".to_string()));
        let snapshot_file =
            PathBuf::from(env_str("SNAPSHOT_FILE").unwrap_or("product_cache.json".to_string()));

        Ok(Self {
            telegram_bot_token,
            telegram_safe_limit,
            database_url,
            db_connect_timeout,
            source_retry_attempts,
            source_retry_delay,
            poll_interval,
            page_size,
            send_delay,
            page_delay,
            buy_url_template,
            notify_channel_tag,
            currency_symbol,
            subscribers_file,
            snapshot_file,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.source_retry_attempts,
            delay: self.source_retry_delay,
        }
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            page_size: self.page_size,
            send_delay: self.send_delay,
            page_delay: self.page_delay,
            safe_text_limit: self.telegram_safe_limit,
            buy_url_template: self.buy_url_template.clone(),
            channel_tag: self.notify_channel_tag.clone(),
            currency_symbol: self.currency_symbol.clone(),
        }
    }
}

fn database_url_from_parts(
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    name: Option<String>,
) -> Result<String> {
    let missing = |key: &str| {
        Error::Config(format!(
            "DATABASE_URL or {key} environment variable is required"
        ))
    };
    let host = host.and_then(non_empty).ok_or_else(|| missing("DB_HOST"))?;
    let user = user.and_then(non_empty).ok_or_else(|| missing("DB_USER"))?;
    let name = name.and_then(non_empty).ok_or_else(|| missing("DB_NAME"))?;
    let port = port.unwrap_or(3306);

    let credentials = match password.filter(|p| !p.is_empty()) {
        Some(p) => format!("{}:{}", percent_encode(&user), percent_encode(&p)),
        None => percent_encode(&user),
    };
    Ok(format!("mysql://{credentials}@{host}:{port}/{name}"))
}

fn validate_url_template(template: &str) -> Result<()> {
    if template.trim().is_empty() {
        return Err(Error::Config(
            "BUY_URL_TEMPLATE environment variable is required".to_string(),
        ));
    }
    if !template.contains("{id}") {
        return Err(Error::Config(
            "BUY_URL_TEMPLATE must contain an {id} placeholder".to_string(),
        ));
    }
    Ok(())
}

/// Percent-encode userinfo characters that would break URL parsing.
fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_u16(key: &str) -> Option<u16> {
    env_str(key).and_then(|s| s.trim().parse::<u16>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
