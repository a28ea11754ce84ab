use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use crate::{
    currency::{CurrencyCode, LocaleConfig},
    errors::{LedgerError, LedgerResult},
    utils::paths::{ensure_dir, PathResolver},
};

const BACKUP_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S%3f";
const TMP_SUFFIX: &str = "tmp";

/// User-level settings for the ledger core and its reporting heuristics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub base_currency: CurrencyCode,
    pub locale: LocaleConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_root: Option<PathBuf>,
    pub backup_retention: usize,
    /// Name fragments that mark an asset or liability account as cash-like.
    pub cash_keywords: Vec<String>,
    pub cash_code_prefix: String,
    /// Name fragments that mark an expense account as essential.
    pub essential_keywords: Vec<String>,
    /// Share of non-essential spending counted as potential savings.
    pub savings_factor: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_currency: CurrencyCode::default(),
            locale: LocaleConfig::default(),
            data_root: None,
            backup_retention: 5,
            cash_keywords: to_strings(&["cash", "checking", "savings", "bank", "wallet", "debit"]),
            cash_code_prefix: "10".into(),
            essential_keywords: to_strings(&[
                "rent",
                "mortgage",
                "groceries",
                "utilities",
                "transport",
                "insurance",
                "health",
                "medical",
                "education",
                "loan",
            ]),
            savings_factor: 0.3,
        }
    }
}

impl Config {
    pub fn validate(&self) -> LedgerResult<()> {
        CurrencyCode::parse(self.base_currency.as_str())?;
        if !(0.0..=1.0).contains(&self.savings_factor) {
            return Err(LedgerError::validation(format!(
                "savings factor must be between 0 and 1 (got {})",
                self.savings_factor
            )));
        }
        if self.backup_retention == 0 {
            return Err(LedgerError::validation("backup retention must be at least 1"));
        }
        Ok(())
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

pub struct ConfigManager {
    path: PathBuf,
    backups_dir: PathBuf,
}

impl ConfigManager {
    pub fn new() -> LedgerResult<Self> {
        Self::with_base_dir(PathResolver::base_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> LedgerResult<Self> {
        ensure_dir(&base)?;
        ensure_dir(&PathResolver::config_dir_in(&base))?;
        let backups_dir = PathResolver::config_backup_dir_in(&base);
        ensure_dir(&backups_dir)?;
        Ok(Self {
            path: PathResolver::config_file_in(&base),
            backups_dir,
        })
    }

    /// Reads the stored config, falling back to defaults when none exists.
    pub fn load(&self) -> LedgerResult<Config> {
        if !self.path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&self.path)?;
        let config: Config = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> LedgerResult<()> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config)?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        tracing::info!(path = %self.path.display(), "configuration saved");
        Ok(())
    }

    pub fn backup(&self, config: &Config, note: Option<&str>) -> LedgerResult<String> {
        ensure_dir(&self.backups_dir)?;
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let label = sanitize_note(note);
        let json = serde_json::to_string_pretty(config)?;
        let mut counter = 0u32;
        loop {
            let mut name = format!("config_{}", timestamp);
            if counter > 0 {
                name.push_str(&format!("_{}", counter));
            }
            if let Some(label) = &label {
                name.push('_');
                name.push_str(label);
            }
            name.push_str(&format!(".{}", BACKUP_EXTENSION));
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.backups_dir.join(&name))
            {
                Ok(mut file) => {
                    file.write_all(json.as_bytes())?;
                    file.flush()?;
                    return Ok(name);
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => counter += 1,
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub fn restore(&self, backup_name: &str) -> LedgerResult<Config> {
        if Path::new(backup_name).file_name().and_then(|name| name.to_str()) != Some(backup_name)
            || backup_name.contains('\\')
        {
            return Err(LedgerError::validation(format!(
                "backup name `{}` must be a plain file name",
                backup_name
            )));
        }
        let path = self.backups_dir.join(backup_name);
        if !path.is_file() {
            return Err(LedgerError::not_found(format!(
                "configuration backup `{}`",
                backup_name
            )));
        }
        let data = fs::read_to_string(&path)?;
        let config: Config = serde_json::from_str(&data)?;
        self.save(&config)?;
        Ok(config)
    }

    /// Backup file names, newest first.
    pub fn list_backups(&self) -> LedgerResult<Vec<String>> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.backups_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BACKUP_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                entries.push(name.to_string());
            }
        }
        entries.sort_by(|a, b| {
            parse_timestamp(b)
                .cmp(&parse_timestamp(a))
                .then_with(|| b.cmp(a))
        });
        Ok(entries)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn sanitize_note(note: Option<&str>) -> Option<String> {
    let raw = note?.trim();
    let mut sanitized = String::new();
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
        } else if (ch.is_whitespace() || matches!(ch, '-' | '.'))
            && !sanitized.is_empty()
            && !sanitized.ends_with('-')
        {
            sanitized.push('-');
        }
    }
    let trimmed = sanitized.trim_matches('-');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let trimmed = name.strip_suffix(&format!(".{}", BACKUP_EXTENSION))?;
    let mut segments = trimmed.split('_').skip(1);
    let date_part = segments.next()?;
    let time_part = segments.next()?;
    if date_part.len() != 8 || time_part.len() != 9 {
        return None;
    }
    NaiveDateTime::parse_from_str(&format!("{}{}", date_part, time_part), "%Y%m%d%H%M%S%3f")
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> LedgerResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_defaults() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        assert_eq!(manager.load().unwrap(), Config::default());
    }

    #[test]
    fn save_backup_and_restore() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        let mut config = Config {
            base_currency: CurrencyCode::new("MXN"),
            ..Config::default()
        };
        manager.save(&config).unwrap();
        let name = manager.backup(&config, Some("Before FX switch!")).unwrap();
        assert!(name.ends_with("_before-fx-switch.json"));

        config.base_currency = CurrencyCode::new("EUR");
        manager.save(&config).unwrap();
        assert_eq!(manager.load().unwrap().base_currency.as_str(), "EUR");

        let restored = manager.restore(&name).unwrap();
        assert_eq!(restored.base_currency.as_str(), "MXN");
        assert_eq!(manager.load().unwrap().base_currency.as_str(), "MXN");
        assert_eq!(manager.list_backups().unwrap(), vec![name]);
    }

    #[test]
    fn backups_taken_together_never_overwrite() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        let names: Vec<String> = (0..3)
            .map(|_| manager.backup(&Config::default(), None).unwrap())
            .collect();
        assert_eq!(manager.list_backups().unwrap().len(), 3);
        assert!(names.iter().all(|name| parse_timestamp(name).is_some()));
    }

    #[test]
    fn restore_rejects_nested_names() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        for name in ["../config.json", "..", "a/b.json", ""] {
            assert!(
                matches!(manager.restore(name), Err(LedgerError::Validation(_))),
                "{name}"
            );
        }
    }

    #[test]
    fn out_of_range_savings_factor_is_rejected() {
        let config = Config {
            savings_factor: 1.5,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(LedgerError::Validation(_))));
    }
}
