use crate::credentials::AuthTokenType;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const KEY_OC_BASE_URL: &str = "oc_base_url";
pub const KEY_DISPLAY_NAME: &str = "oc_display_name";
pub const KEY_OC_VERSION: &str = "oc_version";
pub const KEY_SUPPORTS_OAUTH2: &str = "oc_supports_oauth2";
pub const KEY_SUPPORTS_SAML_WEB_SSO: &str = "oc_supports_saml_web_sso";

/// Opaque reference to an account record owned by an [`AccountStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PersistedAccount {
    name: String,
}

impl PersistedAccount {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Attribute and token lookup for persisted accounts.
///
/// Lookups on an unknown account yield `Ok(None)`, the same as a missing key.
pub trait AccountStore {
    fn user_data(&self, account: &PersistedAccount, key: &str) -> Result<Option<String>>;
    fn auth_token(
        &self,
        account: &PersistedAccount,
        token_type: AuthTokenType,
    ) -> Result<Option<String>>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AccountBook {
    #[serde(default)]
    accounts: Vec<StoredAccount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredAccount {
    name: String,
    #[serde(default)]
    user_data: BTreeMap<String, String>,
    #[serde(default)]
    tokens: BTreeMap<String, String>,
}

/// Account store kept in a single TOML file.
///
/// Mutations only touch memory until [`FileAccountStore::save`] is called.
pub struct FileAccountStore {
    path: PathBuf,
    book: AccountBook,
}

impl FileAccountStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "account file missing, starting empty");
            return Ok(Self {
                path,
                book: AccountBook::default(),
            });
        }

        let raw = fs::read_to_string(&path)?;
        let book: AccountBook = toml::from_str(&raw)
            .map_err(|e| Error::Store(format!("failed to parse {}: {e}", path.display())))?;
        tracing::debug!(
            path = %path.display(),
            accounts = book.accounts.len(),
            "loaded account file"
        );
        Ok(Self { path, book })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn accounts(&self) -> Vec<PersistedAccount> {
        self.book
            .accounts
            .iter()
            .map(|a| PersistedAccount::new(a.name.clone()))
            .collect()
    }

    pub fn find(&self, name: &str) -> Option<PersistedAccount> {
        self.book
            .accounts
            .iter()
            .find(|a| a.name == name)
            .map(|a| PersistedAccount::new(a.name.clone()))
    }

    /// Registers `name`, or returns the existing handle if already present.
    pub fn add_account(&mut self, name: &str) -> Result<PersistedAccount> {
        if name.trim().is_empty() {
            return Err(Error::invalid("account name cannot be empty"));
        }
        if let Some(existing) = self.find(name) {
            return Ok(existing);
        }
        self.book.accounts.push(StoredAccount {
            name: name.to_string(),
            user_data: BTreeMap::new(),
            tokens: BTreeMap::new(),
        });
        Ok(PersistedAccount::new(name))
    }

    /// Sets or clears (`None`) one attribute.
    pub fn set_user_data(
        &mut self,
        account: &PersistedAccount,
        key: &str,
        value: Option<&str>,
    ) -> Result<()> {
        let entry = self.entry_mut(account)?;
        match value {
            Some(v) => entry.user_data.insert(key.to_string(), v.to_string()),
            None => entry.user_data.remove(key),
        };
        Ok(())
    }

    pub fn set_auth_token(
        &mut self,
        account: &PersistedAccount,
        token_type: AuthTokenType,
        value: Option<&str>,
    ) -> Result<()> {
        let entry = self.entry_mut(account)?;
        match value {
            Some(v) => entry
                .tokens
                .insert(token_type.as_str().to_string(), v.to_string()),
            None => entry.tokens.remove(token_type.as_str()),
        };
        Ok(())
    }

    /// Returns whether an account was removed.
    pub fn remove_account(&mut self, account: &PersistedAccount) -> bool {
        let before = self.book.accounts.len();
        self.book.accounts.retain(|a| a.name != account.name());
        self.book.accounts.len() != before
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string(&self.book)
            .map_err(|e| Error::Store(format!("failed to encode accounts: {e}")))?;
        write_private(&self.path, raw.as_bytes())?;
        tracing::debug!(
            path = %self.path.display(),
            accounts = self.book.accounts.len(),
            "saved account file"
        );
        Ok(())
    }

    fn entry(&self, account: &PersistedAccount) -> Option<&StoredAccount> {
        self.book.accounts.iter().find(|a| a.name == account.name())
    }

    fn entry_mut(&mut self, account: &PersistedAccount) -> Result<&mut StoredAccount> {
        self.book
            .accounts
            .iter_mut()
            .find(|a| a.name == account.name())
            .ok_or_else(|| Error::AccountNotFound(account.name().to_string()))
    }
}

impl AccountStore for FileAccountStore {
    fn user_data(&self, account: &PersistedAccount, key: &str) -> Result<Option<String>> {
        Ok(self
            .entry(account)
            .and_then(|a| a.user_data.get(key))
            .cloned())
    }

    fn auth_token(
        &self,
        account: &PersistedAccount,
        token_type: AuthTokenType,
    ) -> Result<Option<String>> {
        Ok(self
            .entry(account)
            .and_then(|a| a.tokens.get(token_type.as_str()))
            .cloned())
    }
}

/// Writes `data` to a file only the owner can read. The mode is set before
/// any bytes land, including when the file already existed.
#[cfg(unix)]
fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(data)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    fs::write(path, data)?;
    Ok(())
}
