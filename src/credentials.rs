/*!
 * Credential storage for provider API keys.
 *
 * Keys are looked up by provider and read synchronously at the start of each
 * task run. A value that is blank after trimming counts as absent.
 */

use anyhow::{Context, Result};
use log::debug;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::ProviderKind;

/// Default directory name under the platform config directory
const DEFAULT_CREDENTIALS_DIRNAME: &str = "subtrans";

/// Default credentials file name
const DEFAULT_CREDENTIALS_FILENAME: &str = "credentials.json";

/// Key-value store for provider secrets
pub trait CredentialStore: Send + Sync + Debug {
    /// Stored key for a provider, if any
    fn get(&self, provider: ProviderKind) -> Option<String>;

    /// Store a key for a provider; a blank key removes the entry
    fn set(&self, provider: ProviderKind, api_key: &str) -> Result<()>;

    /// Forget the key for a provider
    fn remove(&self, provider: ProviderKind) -> Result<()>;
}

fn normalize(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

/// Process-local store, lost on exit
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    keys: RwLock<BTreeMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with one key
    pub fn with_key(provider: ProviderKind, api_key: &str) -> Self {
        let store = Self::new();
        if let Some(value) = normalize(api_key) {
            store.keys.write().insert(provider.to_lowercase_string(), value);
        }
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, provider: ProviderKind) -> Option<String> {
        self.keys.read().get(&provider.to_lowercase_string()).cloned()
    }

    fn set(&self, provider: ProviderKind, api_key: &str) -> Result<()> {
        let mut keys = self.keys.write();
        match normalize(api_key) {
            Some(value) => keys.insert(provider.to_lowercase_string(), value),
            None => keys.remove(&provider.to_lowercase_string()),
        };
        Ok(())
    }

    fn remove(&self, provider: ProviderKind) -> Result<()> {
        self.keys.write().remove(&provider.to_lowercase_string());
        Ok(())
    }
}

/// JSON file store persisted across sessions
///
/// The file is read once on open and rewritten on every change.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    keys: RwLock<BTreeMap<String, String>>,
}

impl FileCredentialStore {
    /// Open the store at `path`, starting empty if the file does not exist
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let keys = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read credentials file: {:?}", path))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str::<BTreeMap<String, String>>(&content)
                    .with_context(|| format!("Failed to parse credentials file: {:?}", path))?
            }
        } else {
            BTreeMap::new()
        };

        debug!("Opened credential store at {:?} ({} keys)", path, keys.len());
        Ok(Self {
            path,
            keys: RwLock::new(keys),
        })
    }

    /// Open the store at its default location
    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    /// Default location under the platform config directory
    pub fn default_path() -> Result<PathBuf> {
        let base_dir = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(base_dir.join(DEFAULT_CREDENTIALS_DIRNAME).join(DEFAULT_CREDENTIALS_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, keys: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        let content = serde_json::to_string_pretty(keys)?;
        let mut file = open_private(&self.path)?;
        file.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write credentials file: {:?}", self.path))?;
        Ok(())
    }
}

// @opens: Credentials file for writing, owner-only from the moment it exists
#[cfg(unix)]
fn open_private(path: &Path) -> Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .with_context(|| format!("Failed to open credentials file: {:?}", path))?;
    // mode() only applies on creation; tighten a file left by an older run
    file.set_permissions(fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to restrict permissions on {:?}", path))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("Failed to open credentials file: {:?}", path))
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, provider: ProviderKind) -> Option<String> {
        self.keys
            .read()
            .get(&provider.to_lowercase_string())
            .and_then(|value| normalize(value))
    }

    fn set(&self, provider: ProviderKind, api_key: &str) -> Result<()> {
        let mut keys = self.keys.write();
        match normalize(api_key) {
            Some(value) => keys.insert(provider.to_lowercase_string(), value),
            None => keys.remove(&provider.to_lowercase_string()),
        };
        self.persist(&keys)
    }

    fn remove(&self, provider: ProviderKind) -> Result<()> {
        let mut keys = self.keys.write();
        if keys.remove(&provider.to_lowercase_string()).is_some() {
            self.persist(&keys)?;
        }
        Ok(())
    }
}

/// Name of the environment variable overriding a provider's stored key
pub fn env_var_name(provider: ProviderKind) -> String {
    format!("SUBTRANS_{}_API_KEY", provider.to_lowercase_string().to_uppercase())
}

/// Store that prefers `SUBTRANS_<PROVIDER>_API_KEY` over the wrapped store
///
/// Writes always go to the wrapped store.
#[derive(Debug, Clone)]
pub struct EnvOverrideStore {
    inner: Arc<dyn CredentialStore>,
}

impl EnvOverrideStore {
    pub fn new(inner: Arc<dyn CredentialStore>) -> Self {
        Self { inner }
    }
}

impl CredentialStore for EnvOverrideStore {
    fn get(&self, provider: ProviderKind) -> Option<String> {
        std::env::var(env_var_name(provider))
            .ok()
            .and_then(|value| normalize(&value))
            .or_else(|| self.inner.get(provider))
    }

    fn set(&self, provider: ProviderKind, api_key: &str) -> Result<()> {
        self.inner.set(provider, api_key)
    }

    fn remove(&self, provider: ProviderKind) -> Result<()> {
        self.inner.remove(provider)
    }
}
