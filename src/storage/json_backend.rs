use std::{
    cmp::Reverse,
    fs::{self, File, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use super::{
    records::{decode_document, encode_document, LedgerDocument},
    LedgerStore, NetWorthStore,
};
use crate::{
    errors::{LedgerError, LedgerResult},
    ledger::{Account, ExternalAccount, OwnerId, Transaction, TransactionFilter},
    networth::{Snapshot, YearMonth},
    utils::paths::{ensure_dir, PathResolver},
};

const DOCUMENT_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S%3f";
const TMP_SUFFIX: &str = "tmp";
const DEFAULT_RETENTION: usize = 5;

/// Describes a persisted backup of one owner's document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    pub owner: String,
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub path: PathBuf,
}

/// Filesystem-backed JSON persistence: one document per owner, rewritten
/// atomically on every change, with rolling timestamped backups.
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
    ledgers_dir: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
    write_lock: Arc<Mutex<()>>,
}

impl JsonStore {
    pub fn new(root: Option<PathBuf>, retention: Option<usize>) -> LedgerResult<Self> {
        let root = PathResolver::resolve_base(root);
        ensure_dir(&root)?;
        let ledgers_dir = PathResolver::ledger_dir_in(&root);
        let backups_dir = PathResolver::backup_dir_in(&root);
        ensure_dir(&ledgers_dir)?;
        ensure_dir(&backups_dir)?;
        Ok(Self {
            root,
            ledgers_dir,
            backups_dir,
            retention: retention.unwrap_or(DEFAULT_RETENTION).max(1),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn new_default() -> LedgerResult<Self> {
        Self::new(None, None)
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    pub fn document_path(&self, owner: &OwnerId) -> PathBuf {
        self.ledgers_dir
            .join(format!("{}.{}", owner.file_stem(), DOCUMENT_EXTENSION))
    }

    /// Owners with a stored document.
    pub fn list_owners(&self) -> LedgerResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.ledgers_dir)? {
            let path = entry?.path();
            if !path.is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some(DOCUMENT_EXTENSION)
            {
                continue;
            }
            if let Some(owner) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(OwnerId::from_file_stem)
            {
                names.push(owner.0);
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn load_document(&self, owner: &OwnerId) -> LedgerResult<LedgerDocument> {
        let path = self.document_path(owner);
        if !path.exists() {
            return Ok(LedgerDocument::new(owner.clone()));
        }
        let document = load_document_from_path(&path)?;
        if document.owner != *owner {
            return Err(LedgerError::Storage(format!(
                "document `{}` belongs to a different owner",
                path.display()
            )));
        }
        Ok(document)
    }

    pub fn backup(&self, owner: &OwnerId, note: Option<&str>) -> LedgerResult<BackupInfo> {
        let _guard = self.lock()?;
        let document = self.load_document(owner)?;
        let path = self.write_backup(owner, note, &encode_document(&document)?)?;
        self.prune_backups(owner)?;
        let file_name = backup_file_name(&path)?;
        tracing::info!(owner = %owner, backup = %file_name, "ledger backup written");
        Ok(BackupInfo {
            owner: owner.to_string(),
            created_at: parse_backup_timestamp(&file_name),
            id: file_name,
            path,
        })
    }

    /// Backups for `owner`, newest first.
    pub fn list_backups(&self, owner: &OwnerId) -> LedgerResult<Vec<BackupInfo>> {
        let dir = self.backup_dir(owner);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            if let Some(file_name) = path.file_name().and_then(|name| name.to_str()) {
                entries.push(BackupInfo {
                    owner: owner.to_string(),
                    id: file_name.to_string(),
                    created_at: parse_backup_timestamp(file_name),
                    path: path.clone(),
                });
            }
        }
        entries.sort_by(|a, b| {
            Reverse(a.created_at)
                .cmp(&Reverse(b.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(entries)
    }

    pub fn restore_backup(&self, owner: &OwnerId, backup_id: &str) -> LedgerResult<LedgerDocument> {
        if !is_bare_file_name(backup_id) {
            return Err(LedgerError::validation(format!(
                "backup id `{}` must be a plain file name",
                backup_id
            )));
        }
        let backup_path = self.backup_dir(owner).join(backup_id);
        if !backup_path.is_file() {
            return Err(LedgerError::not_found(format!("backup `{}`", backup_id)));
        }
        let document = load_document_from_path(&backup_path)?;
        if document.owner != *owner {
            return Err(LedgerError::Storage(format!(
                "backup `{}` belongs to a different owner",
                backup_id
            )));
        }
        let _guard = self.lock()?;
        let path = self.document_path(owner);
        self.backup_existing_file(owner, &path)?;
        save_document_to_path(&document, &path)?;
        tracing::info!(owner = %owner, backup = backup_id, "ledger restored from backup");
        Ok(document)
    }

    fn backup_dir(&self, owner: &OwnerId) -> PathBuf {
        self.backups_dir.join(owner.file_stem())
    }

    fn lock(&self) -> LedgerResult<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| LedgerError::Storage("json store lock poisoned".into()))
    }

    fn modify<T>(
        &self,
        owner: &OwnerId,
        f: impl FnOnce(&mut LedgerDocument) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let _guard = self.lock()?;
        let mut document = self.load_document(owner)?;
        let out = f(&mut document)?;
        let path = self.document_path(owner);
        self.backup_existing_file(owner, &path)?;
        save_document_to_path(&document, &path)?;
        Ok(out)
    }

    fn backup_existing_file(&self, owner: &OwnerId, path: &Path) -> LedgerResult<()> {
        if !path.exists() {
            return Ok(());
        }
        let data = fs::read_to_string(path)?;
        self.write_backup(owner, None, &data)?;
        self.prune_backups(owner)
    }

    /// Writes `data` under a fresh backup name; existing backups are never
    /// overwritten, a counter segment is added on collision instead.
    fn write_backup(
        &self,
        owner: &OwnerId,
        note: Option<&str>,
        data: &str,
    ) -> LedgerResult<PathBuf> {
        let dir = self.backup_dir(owner);
        ensure_dir(&dir)?;
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let label = sanitize_backup_note(note);
        let mut counter = 0u32;
        loop {
            let mut stem = format!("{}_{}", owner.file_stem(), timestamp);
            if counter > 0 {
                stem.push_str(&format!("_{}", counter));
            }
            if let Some(label) = &label {
                stem.push('_');
                stem.push_str(label);
            }
            let path = dir.join(format!("{}.{}", stem, DOCUMENT_EXTENSION));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(data.as_bytes())?;
                    file.flush()?;
                    return Ok(path);
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => counter += 1,
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn prune_backups(&self, owner: &OwnerId) -> LedgerResult<()> {
        for entry in self.list_backups(owner)?.into_iter().skip(self.retention) {
            if let Err(err) = fs::remove_file(&entry.path) {
                tracing::warn!(path = %entry.path.display(), %err, "failed to prune backup");
            }
        }
        Ok(())
    }
}

impl LedgerStore for JsonStore {
    fn load_accounts(&self, owner: &OwnerId) -> LedgerResult<Vec<Account>> {
        Ok(self.load_document(owner)?.accounts)
    }

    fn load_transactions(
        &self,
        owner: &OwnerId,
        filter: &TransactionFilter,
    ) -> LedgerResult<Vec<Transaction>> {
        Ok(self.load_document(owner)?.filtered_transactions(filter))
    }

    fn save_account(&self, owner: &OwnerId, account: &Account) -> LedgerResult<()> {
        self.modify(owner, |doc| {
            doc.upsert_account(account);
            Ok(())
        })
    }

    fn save_transaction(&self, owner: &OwnerId, transaction: &Transaction) -> LedgerResult<()> {
        self.modify(owner, |doc| {
            doc.upsert_transaction(transaction);
            Ok(())
        })
    }

    fn delete_transaction(&self, owner: &OwnerId, id: Uuid) -> LedgerResult<()> {
        self.modify(owner, |doc| doc.remove_transaction(id))
    }
}

impl NetWorthStore for JsonStore {
    fn load_external_accounts(&self, owner: &OwnerId) -> LedgerResult<Vec<ExternalAccount>> {
        Ok(self.load_document(owner)?.external_accounts)
    }

    fn save_external_account(
        &self,
        owner: &OwnerId,
        account: &ExternalAccount,
    ) -> LedgerResult<()> {
        self.modify(owner, |doc| {
            doc.upsert_external_account(account);
            Ok(())
        })
    }

    fn delete_external_account(&self, owner: &OwnerId, id: Uuid) -> LedgerResult<()> {
        self.modify(owner, |doc| doc.remove_external_account(id))
    }

    fn load_snapshots(&self, owner: &OwnerId) -> LedgerResult<Vec<Snapshot>> {
        Ok(self.load_document(owner)?.snapshots)
    }

    fn save_snapshot(&self, owner: &OwnerId, snapshot: &Snapshot) -> LedgerResult<()> {
        self.modify(owner, |doc| {
            doc.upsert_snapshot(snapshot);
            Ok(())
        })
    }

    fn delete_snapshot(&self, owner: &OwnerId, month: YearMonth) -> LedgerResult<()> {
        self.modify(owner, |doc| doc.remove_snapshot(month))
    }
}

/// Writes a document to an arbitrary path by staging to a sibling temp file.
pub fn save_document_to_path(document: &LedgerDocument, path: &Path) -> LedgerResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let tmp = tmp_path(path);
    write_atomic(&tmp, &encode_document(document)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn load_document_from_path(path: &Path) -> LedgerResult<LedgerDocument> {
    let data = fs::read_to_string(path)?;
    decode_document(&data)
}

fn sanitize_backup_note(note: Option<&str>) -> Option<String> {
    let raw = note?.trim();
    if raw.is_empty() {
        return None;
    }
    let mut sanitized = String::new();
    let mut last_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if (ch.is_whitespace() || matches!(ch, '-' | '.'))
            && !sanitized.is_empty()
            && !last_dash
        {
            sanitized.push('-');
            last_dash = true;
        }
    }
    let trimmed = sanitized.trim_matches('-').to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_backup_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let trimmed = name.strip_suffix(&format!(".{}", DOCUMENT_EXTENSION))?;
    let segments: Vec<&str> = trimmed.split('_').collect();
    // Owner stems may contain `_`, so scan from the right for the date/time pair.
    segments.windows(2).rev().find_map(|pair| {
        let (date, time) = (pair[0], pair[1]);
        if !is_digits(date, 8) || !is_digits(time, 9) {
            return None;
        }
        NaiveDateTime::parse_from_str(&format!("{}{}", date, time), "%Y%m%d%H%M%S%3f")
            .ok()
            .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
    })
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_digit())
}

fn is_bare_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\'])
        && name != "."
        && name != ".."
        && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
}

fn backup_file_name(path: &Path) -> LedgerResult<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| LedgerError::Storage(format!("invalid backup path `{}`", path.display())))
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
