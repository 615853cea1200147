//! Session persistence across restarts
//!
//! The session file is sealed: a base64 payload followed by an HMAC-SHA256
//! tag. A file whose tag does not verify is discarded, never trusted.

use super::types::Session;
use crate::error::{EssError, EssResult};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use parking_lot::Mutex;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const SEAL_VERSION: &str = "ess1";

type HmacSha256 = Hmac<Sha256>;

/// Where the session store writes through to
pub trait SessionPersistence: Send + Sync {
    /// Load the persisted session, if any
    fn load(&self) -> EssResult<Option<Session>>;

    /// Persist `session`, replacing whatever was there
    fn save(&self, session: &Session) -> EssResult<()>;

    /// Remove the persisted session
    fn clear(&self) -> EssResult<()>;
}

/// Process-local persistence; nothing survives a restart
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    slot: Mutex<Option<Session>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether anything is currently persisted
    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}

impl SessionPersistence for MemoryPersistence {
    fn load(&self) -> EssResult<Option<Session>> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, session: &Session) -> EssResult<()> {
        *self.slot.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> EssResult<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}

/// Owner-only, integrity-sealed session file
pub struct SealedFileStore {
    path: PathBuf,
    secret: Vec<u8>,
}

impl std::fmt::Debug for SealedFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealedFileStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SealedFileStore {
    /// Create a store at `path` keyed with `secret`
    pub fn new(path: impl Into<PathBuf>, secret: impl AsRef<[u8]>) -> Self {
        Self {
            path: path.into(),
            secret: secret.as_ref().to_vec(),
        }
    }

    /// `~/.ess/session`, creating `~/.ess` with `0700` on Unix
    pub fn default_location(secret: impl AsRef<[u8]>) -> EssResult<Self> {
        let dir = default_dir()?;
        ensure_private_dir(&dir)?;
        Ok(Self::new(dir.join("session"), secret))
    }

    /// Path of the session file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mac(&self, payload: &str) -> EssResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| EssError::storage(format!("Unusable session secret: {}", e)))?;
        mac.update(SEAL_VERSION.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        Ok(mac)
    }

    fn seal(&self, session: &Session) -> EssResult<String> {
        let json = serde_json::to_vec(session)?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let tag = URL_SAFE_NO_PAD.encode(self.mac(&payload)?.finalize().into_bytes());
        Ok(format!("{}.{}.{}", SEAL_VERSION, payload, tag))
    }

    fn unseal(&self, content: &str) -> EssResult<Session> {
        let mut parts = content.trim().splitn(3, '.');
        let (Some(version), Some(payload), Some(tag)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(EssError::storage("Malformed session file"));
        };
        if version != SEAL_VERSION {
            return Err(EssError::storage(format!(
                "Unsupported session file version '{}'",
                version
            )));
        }
        let tag = URL_SAFE_NO_PAD
            .decode(tag)
            .map_err(|_| EssError::storage("Session file failed integrity check"))?;
        self.mac(payload)?
            .verify_slice(&tag)
            .map_err(|_| EssError::storage("Session file failed integrity check"))?;
        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| EssError::storage(format!("Corrupt session payload: {}", e)))?;
        Ok(serde_json::from_slice(&json)?)
    }

    fn discard(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::debug!("Could not remove session file: {}", e);
        }
    }
}

impl SessionPersistence for SealedFileStore {
    fn load(&self) -> EssResult<Option<Session>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(EssError::io_with_path(
                    e.to_string(),
                    self.path.display().to_string(),
                ));
            }
        };

        let unsealed = std::str::from_utf8(&bytes)
            .map_err(|e| EssError::storage(format!("Session file is not text: {}", e)))
            .and_then(|content| self.unseal(content));
        match unsealed {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!("Discarding persisted session: {}", e);
                self.discard();
                Ok(None)
            }
        }
    }

    fn save(&self, session: &Session) -> EssResult<()> {
        if let Some(parent) = self.path.parent() {
            ensure_private_dir(parent)?;
        }

        let sealed = self.seal(session)?;
        let tmp_path = self.path.with_extension("tmp");
        write_private(&tmp_path, sealed.as_bytes())?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|e| EssError::io_with_path(e.to_string(), self.path.display().to_string()))?;
        Ok(())
    }

    fn clear(&self) -> EssResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                EssError::io_with_path(e.to_string(), self.path.display().to_string())
            })?;
        }
        Ok(())
    }
}

/// `~/.ess`
pub(crate) fn default_dir() -> EssResult<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| EssError::storage("Cannot find home directory"))?;
    Ok(home.join(".ess"))
}

/// Create `dir` if needed and restrict it to the owner on Unix
pub(crate) fn ensure_private_dir(dir: &Path) -> EssResult<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::{DirBuilderExt, PermissionsExt};

        if !dir.exists() {
            fs::DirBuilder::new()
                .recursive(true)
                .mode(0o700)
                .create(dir)
                .map_err(|e| EssError::io_with_path(e.to_string(), dir.display().to_string()))?;
        }

        let mode = fs::metadata(dir)?.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            tracing::warn!(
                "Session directory has insecure permissions: {:o}. Expected 0700. Fixing...",
                mode
            );
            fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
        }
    }

    #[cfg(not(unix))]
    {
        fs::create_dir_all(dir)
            .map_err(|e| EssError::io_with_path(e.to_string(), dir.display().to_string()))?;
    }

    Ok(())
}

/// Write `bytes` to a file only the owner can read
pub(crate) fn write_private(path: &Path, bytes: &[u8]) -> EssResult<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .map_err(|e| EssError::io_with_path(e.to_string(), path.display().to_string()))?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Read the session secret at `path`, creating it with `fresh()` first if
/// it does not exist yet. The file is readable by the owner only.
pub fn load_or_create_secret(
    path: &Path,
    fresh: impl FnOnce() -> String,
) -> EssResult<String> {
    match fs::read_to_string(path) {
        Ok(secret) if !secret.trim().is_empty() => return Ok(secret.trim().to_string()),
        Ok(_) => tracing::warn!("Session secret file is empty, generating a new one"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(EssError::io_with_path(e.to_string(), path.display().to_string())),
    }

    if let Some(dir) = path.parent() {
        ensure_private_dir(dir)?;
    }
    let secret = fresh();
    write_private(path, secret.as_bytes())?;
    tracing::debug!("Created session secret at {}", path.display());
    Ok(secret)
}

/// `~/.ess/secret`
pub fn default_secret_path() -> EssResult<PathBuf> {
    Ok(default_dir()?.join("secret"))
}
