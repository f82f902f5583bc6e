use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, history::DEFAULT_HISTORY_LIMIT, phone::country_code_digits, Result};

pub const DEFAULT_CHAT_BASE_URL: &str = "https://wa.me";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_PREVIEW_CHARS: usize = 20;

const APP_DIR: &str = "whatsalink";
const HISTORY_FILENAME: &str = "history.json";

/// Typed configuration, read from the environment (and an optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // History
    pub history_file: PathBuf,
    pub history_limit: usize,
    pub undo_window: Duration,

    // Normalization
    pub default_country_code: String,
    pub enforce_length: bool,
    pub preview_chars: usize,

    // Chat links
    pub chat_base_url: String,

    // Extraction
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub extraction_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_file: PathBuf::from(HISTORY_FILENAME),
            history_limit: DEFAULT_HISTORY_LIMIT,
            undo_window: Duration::from_millis(5_000),
            default_country_code: String::new(),
            enforce_length: false,
            preview_chars: DEFAULT_PREVIEW_CHARS,
            chat_base_url: DEFAULT_CHAT_BASE_URL.to_string(),
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            extraction_timeout: Duration::from_millis(10_000),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let history_file = match env_path("WAL_HISTORY_FILE") {
            Some(p) => p,
            None => default_history_file()?,
        };
        let history_limit = env_usize("WAL_HISTORY_LIMIT")
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_HISTORY_LIMIT);
        let undo_window = Duration::from_millis(env_u64("WAL_UNDO_WINDOW_MS").unwrap_or(5_000));

        let default_country_code =
            country_code_digits(&env_str("WAL_DEFAULT_COUNTRY_CODE").unwrap_or_default());
        let enforce_length = env_bool("WAL_ENFORCE_LENGTH").unwrap_or(false);
        let preview_chars = env_usize("WAL_PREVIEW_CHARS")
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_PREVIEW_CHARS);

        let chat_base_url = env_str("WAL_CHAT_BASE_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_CHAT_BASE_URL.to_string());

        // API_KEY is what the hosted web build reads; keep it as a fallback.
        let gemini_api_key = env_str("GEMINI_API_KEY")
            .and_then(non_empty)
            .or_else(|| env_str("API_KEY").and_then(non_empty));
        let gemini_model = env_str("GEMINI_MODEL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        let extraction_timeout =
            Duration::from_millis(env_u64("WAL_EXTRACTION_TIMEOUT_MS").unwrap_or(10_000));

        Ok(Self {
            history_file,
            history_limit,
            undo_window,
            default_country_code,
            enforce_length,
            preview_chars,
            chat_base_url,
            gemini_api_key,
            gemini_model,
            extraction_timeout,
        })
    }

    pub fn extraction_available(&self) -> bool {
        self.gemini_api_key.is_some()
    }
}

fn default_history_file() -> Result<PathBuf> {
    history_file_under(env_path("XDG_DATA_HOME"), dirs::home_dir())
}

/// `$XDG_DATA_HOME/whatsalink/history.json`, else under `~/.local/share`.
fn history_file_under(xdg_data_home: Option<PathBuf>, home: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = xdg_data_home.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(dir.join(APP_DIR).join(HISTORY_FILENAME));
    }
    let home = home.ok_or_else(|| {
        Error::Config("home directory not found; set WAL_HISTORY_FILE".to_string())
    })?;
    Ok(home
        .join(".local/share")
        .join(APP_DIR)
        .join(HISTORY_FILENAME))
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

        let key = k.trim().trim_start_matches("export ").trim();
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

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| parse_bool(&s))
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotenv_skips_comments_and_strips_quotes() {
        let parsed = parse_dotenv(
            "# comment\n\nGEMINI_API_KEY=\"abc\"\nexport WAL_HISTORY_LIMIT = 5\nbroken line\n=x\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("GEMINI_API_KEY".to_string(), "abc".to_string()),
                ("WAL_HISTORY_LIMIT".to_string(), "5".to_string()),
            ]
        );
    }

    #[test]
    fn bool_values() {
        for v in ["1", "true", "YES", " on "] {
            assert!(parse_bool(v), "{v}");
        }
        for v in ["0", "false", "", "nope"] {
            assert!(!parse_bool(v), "{v}");
        }
    }

    #[test]
    fn history_file_prefers_xdg_data_home() {
        let path = history_file_under(
            Some(PathBuf::from("/data")),
            Some(PathBuf::from("/home/dana")),
        )
        .unwrap();
        assert_eq!(path, PathBuf::from("/data/whatsalink/history.json"));
    }

    #[test]
    fn history_file_falls_back_to_home() {
        let path =
            history_file_under(Some(PathBuf::new()), Some(PathBuf::from("/home/dana"))).unwrap();
        assert_eq!(
            path,
            PathBuf::from("/home/dana/.local/share/whatsalink/history.json")
        );

        let err = history_file_under(None, None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.history_limit, 10);
        assert_eq!(cfg.undo_window, Duration::from_secs(5));
        assert_eq!(cfg.preview_chars, 20);
        assert_eq!(cfg.chat_base_url, "https://wa.me");
        assert!(!cfg.extraction_available());
    }
}
