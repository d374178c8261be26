//! Flat-file user store
//!
//! A repository over one JSON file mapping access code -> user record.
//! Stands in for a real database: every operation is a pure value
//! transform over the loaded mapping, followed by a full-store rewrite
//! only when the mapping actually changed, so callers never observe
//! partial record writes and pure validations leave the file alone.
//!
//! Concurrency model:
//! - a store-scoped `tokio::sync::Mutex` serializes read-modify-write
//!   cycles between tasks in this process
//! - an `fs2` exclusive lock on `<store>.lock` extends that exclusion
//!   across processes sharing the file
//! - writes go to a temp file in the same directory, fsync, then atomic
//!   rename, so a crash mid-write never leaves a half-written store
//! - file I/O runs on `spawn_blocking`; handlers stay non-blocking

use advisor_common::config::{Config, ACCESS_CODE_MAX_LENGTH, MAX_SESSIONS_PER_USER};
use advisor_common::sanitize::sanitize;
use advisor_common::types::{ChatSession, Profile, UserRecord};
use advisor_common::{now_secs, Error, Result};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

pub type UserMap = BTreeMap<String, UserRecord>;

/// Outcome of checking an access code against the store.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenStatus {
    /// No usable record for this code (includes corrupt records, which
    /// are deleted as a side effect of the check).
    Unknown,
    /// Record existed but the expiry window elapsed; deleted as a side
    /// effect of the check.
    Expired,
    /// Code is valid; carries the stored profile, if any.
    Active { profile: Option<Profile> },
}

struct Inner {
    path: PathBuf,
    guard: Mutex<()>,
    capacity: usize,
    expiry_window: f64,
}

/// Handle to the user store. Cheap to clone.
#[derive(Clone)]
pub struct UserStore {
    inner: Arc<Inner>,
}

impl UserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_limits(path, MAX_SESSIONS_PER_USER, Config::expiry_window_secs())
    }

    /// Store with explicit session capacity and expiry window, used by
    /// tests to exercise the bounds without waiting out real windows.
    pub fn with_limits(path: impl Into<PathBuf>, capacity: usize, expiry_window: f64) -> Self {
        Self {
            inner: Arc::new(Inner {
                path: path.into(),
                guard: Mutex::new(()),
                capacity,
                expiry_window,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Configured sessions-per-user bound.
    pub fn session_capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Whether the store location accepts writes (health reporting).
    /// A missing parent directory counts as writable if it can be
    /// created, matching what the first save would do.
    pub fn is_writable(&self) -> bool {
        let dir = match self.inner.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dir.exists() && fs::create_dir_all(&dir).is_err() {
            return false;
        }
        let probe = dir.join(".store_probe");
        match File::create(&probe) {
            Ok(_) => {
                let _ = fs::remove_file(&probe);
                true
            }
            Err(_) => false,
        }
    }

    /// Check an access code: sanitizes it, backfills a missing
    /// `created_at`, deletes corrupt or expired records, and reports
    /// what remains.
    pub async fn check_token(&self, code: &str) -> Result<TokenStatus> {
        let code = sanitize(code, ACCESS_CODE_MAX_LENGTH);
        if code.is_empty() {
            return Ok(TokenStatus::Unknown);
        }

        let window = self.inner.expiry_window;
        self.update(move |users| {
            let record = match users.get_mut(&code) {
                Some(record) => record,
                None => return (TokenStatus::Unknown, false),
            };

            match record.created_at_secs() {
                Err(()) => {
                    // Corruption is an implicit logout, not a crash.
                    warn!("deleting user record with unreadable created_at (code: {}...)", code_prefix(&code));
                    users.remove(&code);
                    (TokenStatus::Unknown, true)
                }
                Ok(None) => {
                    // Legacy record predating timestamps: grandfather it in.
                    record.created_at = Some(serde_json::Value::from(now_secs()));
                    let profile = record.profile.clone();
                    (TokenStatus::Active { profile }, true)
                }
                Ok(Some(created_at)) => {
                    if now_secs() > created_at + window {
                        users.remove(&code);
                        (TokenStatus::Expired, true)
                    } else {
                        let profile = record.profile.clone();
                        (TokenStatus::Active { profile }, false)
                    }
                }
            }
        })
        .await
    }

    /// True only for codes that resolve to a live, unexpired record.
    pub async fn validate(&self, code: &str) -> Result<bool> {
        Ok(matches!(self.check_token(code).await?, TokenStatus::Active { .. }))
    }

    /// Insert a fresh record. False if the code is already present.
    pub async fn create(&self, code: &str) -> Result<bool> {
        let code = code.to_string();
        self.update(move |users| {
            if users.contains_key(&code) {
                return (false, false);
            }
            users.insert(code, UserRecord::new(now_secs()));
            (true, true)
        })
        .await
    }

    /// Remove the whole record. Deletion is revocation: logout and
    /// expiry cleanup both come through here. False if absent.
    pub async fn delete(&self, code: &str) -> Result<bool> {
        let code = code.to_string();
        self.update(move |users| {
            let removed = users.remove(&code).is_some();
            (removed, removed)
        })
        .await
    }

    pub async fn get_profile(&self, code: &str) -> Result<Option<Profile>> {
        let code = code.to_string();
        self.read(move |users| users.get(&code).and_then(|r| r.profile.clone()))
            .await
    }

    /// Replace the profile wholesale. False if the code is absent.
    pub async fn update_profile(&self, code: &str, profile: Profile) -> Result<bool> {
        let code = code.to_string();
        self.update(move |users| match users.get_mut(&code) {
            Some(record) => {
                record.profile = Some(profile);
                (true, true)
            }
            None => (false, false),
        })
        .await
    }

    /// Saved sessions in insertion order; empty if the code is absent.
    pub async fn list_sessions(&self, code: &str) -> Result<Vec<ChatSession>> {
        let code = code.to_string();
        self.read(move |users| {
            users
                .get(&code)
                .map(|r| r.chat_sessions.clone())
                .unwrap_or_default()
        })
        .await
    }

    /// Append a session. False if the code is absent or the session
    /// count is already at capacity; a full list is never evicted.
    pub async fn add_session(&self, code: &str, session: ChatSession) -> Result<bool> {
        let code = code.to_string();
        let capacity = self.inner.capacity;
        self.update(move |users| match users.get_mut(&code) {
            Some(record) if record.chat_sessions.len() < capacity => {
                record.chat_sessions.push(session);
                (true, true)
            }
            _ => (false, false),
        })
        .await
    }

    /// Remove the first session matching `session_id`. False if the
    /// code is absent or nothing matched, so a no-op delete is
    /// distinguishable from a successful one.
    pub async fn delete_session(&self, code: &str, session_id: &str) -> Result<bool> {
        let code = code.to_string();
        let session_id = session_id.to_string();
        self.update(move |users| match users.get_mut(&code) {
            Some(record) => {
                match record.chat_sessions.iter().position(|s| s.id == session_id) {
                    Some(index) => {
                        record.chat_sessions.remove(index);
                        (true, true)
                    }
                    None => (false, false),
                }
            }
            None => (false, false),
        })
        .await
    }

    /// Read-only pass over the loaded mapping. Atomic rename on the
    /// write side guarantees readers never see a partial store, so no
    /// lock is taken here.
    async fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&UserMap) -> T + Send + 'static,
        T: Send + 'static,
    {
        let path = self.inner.path.clone();
        spawn_store_task(move || {
            let users = load_map(&path)?;
            Ok(f(&users))
        })
        .await
    }

    /// Exclusive load + mutate + save cycle. The closure reports
    /// whether it changed the mapping; the save is skipped when it
    /// did not, so pure validations never rewrite the store file.
    async fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut UserMap) -> (T, bool) + Send + 'static,
        T: Send + 'static,
    {
        let _task_guard = self.inner.guard.lock().await;
        let path = self.inner.path.clone();
        spawn_store_task(move || {
            let _file_lock = FileLock::acquire(&path)?;
            let mut users = load_map(&path)?;
            let (out, changed) = f(&mut users);
            if changed {
                save_map(&path, &users)?;
            }
            Ok(out)
        })
        .await
    }
}

/// First characters of an access code, safe to log.
pub fn code_prefix(code: &str) -> String {
    code.chars().take(8).collect()
}

async fn spawn_store_task<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("store task panicked: {e}")))?
}

fn load_map(path: &Path) -> Result<UserMap> {
    if !path.exists() {
        return Ok(UserMap::new());
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(UserMap::new());
    }
    Ok(serde_json::from_str(&content)?)
}

fn save_map(path: &Path, users: &UserMap) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = temp_path(path)?;
    let mut tmp = File::create(&tmp_path)?;
    tmp.write_all(serde_json::to_string_pretty(users)?.as_bytes())?;
    tmp.sync_all()?;
    drop(tmp);

    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> Result<PathBuf> {
    let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let name = path
        .file_name()
        .ok_or_else(|| Error::Config(format!("store path has no file name: {}", path.display())))?;
    Ok(parent.join(format!(".{}.tmp", name.to_string_lossy())))
}

/// Exclusive lock on `<store>.lock`, released on drop. Excludes writers
/// in other processes sharing the same store file.
struct FileLock {
    _file: File,
}

impl FileLock {
    fn acquire(store_path: &Path) -> Result<Self> {
        let lock_path = store_path.with_extension("lock");
        if let Some(parent) = lock_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .open(&lock_path)?;

        fs2::FileExt::lock_exclusive(&file)
            .map_err(|e| Error::Internal(format!("failed to lock user store: {e}")))?;

        Ok(Self { _file: file })
    }
}
