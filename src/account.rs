//! A single ownCloud account: endpoint, identity and current credentials.
//!
//! An [`Account`] comes from one of two places and never mixes them: a record
//! in the platform account store ([`Account::from_persisted`]) or a base URL
//! plus credentials supplied by the caller ([`Account::from_endpoint`]).

use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::resolver::Platform;
use crate::store::{KEY_DISPLAY_NAME, KEY_OC_BASE_URL, PersistedAccount};
use url::Url;

#[derive(Debug, Clone)]
pub struct Account {
    base_url: String,
    credentials: Credentials,
    display_name: Option<String>,
    name: Option<String>,
    saved: Option<PersistedAccount>,
}

impl Account {
    /// Loads an account that already lives in the platform store.
    ///
    /// Credentials are resolved before the base URL is looked up, so a
    /// resolver failure wins over a missing `oc_base_url`.
    pub fn from_persisted(saved: PersistedAccount, platform: &Platform<'_>) -> Result<Self> {
        if saved.name().trim().is_empty() {
            return Err(Error::invalid("persisted account handle has an empty name"));
        }

        let credentials = platform.resolve_credentials(&saved)?;

        let base_url = platform
            .store
            .user_data(&saved, KEY_OC_BASE_URL)?
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| Error::AccountNotFound(saved.name().to_string()))?;
        let display_name = platform.store.user_data(&saved, KEY_DISPLAY_NAME)?;

        tracing::debug!(
            account = saved.name(),
            base_url = %base_url,
            "loaded persisted account"
        );

        Ok(Self {
            base_url,
            credentials,
            display_name,
            name: Some(saved.name().to_string()),
            saved: Some(saved),
        })
    }

    /// Builds an account that is not (yet) persisted.
    ///
    /// `None` credentials mean anonymous access.
    pub fn from_endpoint(
        base_url: impl Into<String>,
        credentials: Option<Credentials>,
    ) -> Result<Self> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(Error::invalid("base URL cannot be empty"));
        }

        let credentials = credentials.unwrap_or_default();
        let name = credentials
            .username()
            .map(|username| build_account_name(&base_url, username));

        Ok(Self {
            base_url,
            credentials,
            display_name: None,
            name,
            saved: None,
        })
    }

    /// Re-reads the credentials of a persisted account.
    ///
    /// Accounts built with [`Account::from_endpoint`] are left untouched. On
    /// failure the previous credentials stay in place.
    pub fn reload_credentials(&mut self, platform: &Platform<'_>) -> Result<()> {
        if let Some(saved) = &self.saved {
            self.credentials = platform.resolve_credentials(saved)?;
            tracing::debug!(account = saved.name(), "reloaded credentials");
        }
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Stable key of this account in the store namespace.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn saved(&self) -> Option<&PersistedAccount> {
        self.saved.as_ref()
    }

    /// Stored display name, else the credentials' username, else the
    /// username part of the persisted handle's name.
    ///
    /// Anonymous credentials carry no username, so a persisted account
    /// signed in anonymously still reports the handle's username.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| self.credentials.username())
            .or_else(|| {
                self.saved
                    .as_ref()
                    .and_then(|saved| username_for_account_name(saved.name()))
            })
    }
}

/// Canonical store name for `username` on the server at `base_url`:
/// `user@host[:port][/path]`.
pub fn build_account_name(base_url: &str, username: &str) -> String {
    let trimmed = base_url.trim();
    let parsed = Url::parse(trimmed)
        .ok()
        .filter(|url| url.has_host())
        .or_else(|| Url::parse(&format!("https://{trimmed}")).ok())
        .filter(|url| url.has_host());

    let Some(url) = parsed else {
        let rest = trimmed
            .split_once("://")
            .map_or(trimmed, |(_, rest)| rest)
            .trim_end_matches('/');
        return format!("{username}@{rest}");
    };

    let mut name = format!("{username}@{}", url.host_str().unwrap_or_default());
    if let Some(port) = url.port() {
        name.push_str(&format!(":{port}"));
    }
    let path = url.path().trim_end_matches('/');
    if !path.is_empty() {
        name.push_str(path);
    }
    name
}

/// Username part of a store name. Usernames may contain `@`, so the host
/// starts after the last one.
pub fn username_for_account_name(name: &str) -> Option<&str> {
    name.rsplit_once('@').map(|(user, _)| user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::AuthTokenType;
    use crate::resolver::CredentialResolver;
    use crate::store::{AccountStore, FileAccountStore};
    use std::cell::Cell;

    #[test]
    fn endpoint_without_credentials_is_anonymous() {
        let account = Account::from_endpoint("https://cloud.example/", None).unwrap();
        assert_eq!(account.credentials(), &Credentials::Anonymous);
        assert_eq!(account.credentials().username(), None);
        assert_eq!(account.name(), None);
        assert_eq!(account.saved(), None);
        assert_eq!(account.display_name(), None);
    }

    #[test]
    fn endpoint_keeps_base_url_verbatim() {
        let account = Account::from_endpoint("https://cloud.example/owncloud/", None).unwrap();
        assert_eq!(account.base_url(), "https://cloud.example/owncloud/");
    }

    #[test]
    fn endpoint_with_username_derives_stable_name() {
        let creds = Credentials::basic("alice", "pw");
        let a = Account::from_endpoint("https://cloud.example/", Some(creds.clone())).unwrap();
        let b = Account::from_endpoint("https://cloud.example/", Some(creds)).unwrap();
        assert_eq!(a.name(), Some("alice@cloud.example"));
        assert_eq!(a.name(), b.name());
        assert_eq!(
            a.name().map(str::to_string),
            Some(build_account_name("https://cloud.example/", "alice"))
        );
    }

    #[test]
    fn empty_base_url_is_rejected() {
        for url in ["", "   "] {
            let err = Account::from_endpoint(url, Some(Credentials::basic("a", "b"))).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
    }

    #[test]
    fn account_name_rules() {
        assert_eq!(
            build_account_name("https://cloud.example:8443/oc/", "bob"),
            "bob@cloud.example:8443/oc"
        );
        assert_eq!(build_account_name("cloud.example", "bob"), "bob@cloud.example");
        assert_eq!(
            build_account_name("http://10.0.0.2:8080", "me@mail.example"),
            "me@mail.example@10.0.0.2:8080"
        );
        // default port is not part of the name
        assert_eq!(
            build_account_name("https://cloud.example:443/", "bob"),
            "bob@cloud.example"
        );
    }

    #[test]
    fn username_is_before_last_at() {
        assert_eq!(
            username_for_account_name("me@mail.example@cloud.example"),
            Some("me@mail.example")
        );
        assert_eq!(username_for_account_name("nohost"), None);
    }

    fn seeded_store(
        dir: &tempfile::TempDir,
        base_url: Option<&str>,
    ) -> (FileAccountStore, PersistedAccount) {
        let mut store = FileAccountStore::open(dir.path().join("accounts.toml")).unwrap();
        let handle = store.add_account("alice@cloud.example").unwrap();
        store
            .set_user_data(&handle, KEY_OC_BASE_URL, base_url)
            .unwrap();
        store
            .set_auth_token(&handle, AuthTokenType::Password, Some("pw"))
            .unwrap();
        (store, handle)
    }

    #[test]
    fn persisted_account_loads_everything() {
        let dir = tempfile::tempdir().unwrap();
        let (mut store, handle) = seeded_store(&dir, Some("https://cloud.example"));
        store
            .set_user_data(&handle, KEY_DISPLAY_NAME, Some("Alice A."))
            .unwrap();

        let platform = Platform::with_stored_credentials(&store);
        let account = Account::from_persisted(handle.clone(), &platform).unwrap();
        assert_eq!(account.base_url(), "https://cloud.example");
        assert_eq!(account.credentials(), &Credentials::basic("alice", "pw"));
        assert_eq!(account.name(), Some("alice@cloud.example"));
        assert_eq!(account.saved(), Some(&handle));
        assert_eq!(account.display_name(), Some("Alice A."));
    }

    #[test]
    fn persisted_account_without_base_url_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (store, handle) = seeded_store(&dir, None);
        let platform = Platform::with_stored_credentials(&store);
        let err = Account::from_persisted(handle, &platform).unwrap_err();
        assert!(matches!(err, Error::AccountNotFound(_)));
    }

    #[test]
    fn persisted_handle_with_empty_name_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = seeded_store(&dir, Some("https://cloud.example"));
        let platform = Platform::with_stored_credentials(&store);
        let err = Account::from_persisted(PersistedAccount::new(""), &platform).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    struct Failing(fn() -> Error);

    impl CredentialResolver for Failing {
        fn resolve(&self, _: &dyn AccountStore, _: &PersistedAccount) -> Result<Credentials> {
            Err((self.0)())
        }
    }

    #[test]
    fn resolver_failures_propagate_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let (store, handle) = seeded_store(&dir, Some("https://cloud.example"));

        let canceled = Failing(|| Error::Canceled);
        let err = Account::from_persisted(handle.clone(), &Platform::new(&store, &canceled))
            .unwrap_err();
        assert!(matches!(err, Error::Canceled));

        let io = Failing(|| Error::Io(std::io::Error::other("disk gone")));
        let err =
            Account::from_persisted(handle, &Platform::new(&store, &io)).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    /// Hands out a new password on every call.
    struct Rotating(Cell<u32>);

    impl CredentialResolver for Rotating {
        fn resolve(&self, _: &dyn AccountStore, account: &PersistedAccount) -> Result<Credentials> {
            let n = self.0.get() + 1;
            self.0.set(n);
            let user = username_for_account_name(account.name()).unwrap_or_default();
            Ok(Credentials::basic(user, format!("pw-{n}")))
        }
    }

    #[test]
    fn reload_replaces_credentials_of_persisted_account() {
        let dir = tempfile::tempdir().unwrap();
        let (store, handle) = seeded_store(&dir, Some("https://cloud.example"));
        let rotating = Rotating(Cell::new(0));
        let platform = Platform::new(&store, &rotating);

        let mut account = Account::from_persisted(handle, &platform).unwrap();
        assert_eq!(account.credentials(), &Credentials::basic("alice", "pw-1"));
        account.reload_credentials(&platform).unwrap();
        assert_eq!(account.credentials(), &Credentials::basic("alice", "pw-2"));
    }

    #[test]
    fn reload_keeps_old_credentials_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (store, handle) = seeded_store(&dir, Some("https://cloud.example"));
        let mut account =
            Account::from_persisted(handle, &Platform::with_stored_credentials(&store)).unwrap();

        let failing = Failing(|| Error::Authenticator("token revoked".into()));
        let err = account
            .reload_credentials(&Platform::new(&store, &failing))
            .unwrap_err();
        assert!(matches!(err, Error::Authenticator(_)));
        assert_eq!(account.credentials(), &Credentials::basic("alice", "pw"));
    }

    #[test]
    fn reload_is_noop_without_persisted_handle() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = seeded_store(&dir, Some("https://cloud.example"));
        let failing = Failing(|| Error::Canceled);

        let creds = Credentials::bearer("carol", "tok");
        let mut account =
            Account::from_endpoint("https://cloud.example", Some(creds.clone())).unwrap();
        account
            .reload_credentials(&Platform::new(&store, &failing))
            .unwrap();
        assert_eq!(account.credentials(), &creds);
    }

    #[test]
    fn display_name_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let (mut store, handle) = seeded_store(&dir, Some("https://cloud.example"));

        store
            .set_user_data(&handle, KEY_DISPLAY_NAME, Some("Alice A."))
            .unwrap();
        let platform = Platform::with_stored_credentials(&store);
        let stored = Account::from_persisted(handle.clone(), &platform).unwrap();
        assert_eq!(stored.display_name(), Some("Alice A."));

        store
            .set_user_data(&handle, KEY_DISPLAY_NAME, Some(""))
            .unwrap();
        let bob = Rotating(Cell::new(0));
        let mut empty = Account::from_persisted(handle.clone(), &Platform::new(&store, &bob))
            .unwrap();
        empty.credentials = Credentials::basic("bob", "x");
        assert_eq!(empty.display_name(), Some("bob"));

        // anonymous credentials fall through to the handle's name
        empty.credentials = Credentials::Anonymous;
        assert_eq!(empty.display_name(), Some("alice"));
    }
}
