use crate::account::username_for_account_name;
use crate::credentials::{AuthTokenType, Credentials};
use crate::error::{Error, Result};
use crate::store::{
    AccountStore, KEY_SUPPORTS_OAUTH2, KEY_SUPPORTS_SAML_WEB_SSO, PersistedAccount,
};

/// Produces the current credentials for a persisted account.
pub trait CredentialResolver {
    fn resolve(
        &self,
        store: &dyn AccountStore,
        account: &PersistedAccount,
    ) -> Result<Credentials>;
}

/// Reads credentials straight out of the account store.
///
/// The auth flags on the account pick the variant: OAuth2 wins over SAML,
/// and plain passwords are the fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct StoredCredentialResolver;

impl CredentialResolver for StoredCredentialResolver {
    fn resolve(
        &self,
        store: &dyn AccountStore,
        account: &PersistedAccount,
    ) -> Result<Credentials> {
        let username = username_for_account_name(account.name()).ok_or_else(|| {
            Error::AccountNotFound(format!("malformed account name '{}'", account.name()))
        })?;

        let token_type = if flag_set(store, account, KEY_SUPPORTS_OAUTH2)? {
            AuthTokenType::AccessToken
        } else if flag_set(store, account, KEY_SUPPORTS_SAML_WEB_SSO)? {
            AuthTokenType::SamlSessionCookie
        } else {
            AuthTokenType::Password
        };

        let token = store.auth_token(account, token_type)?.ok_or_else(|| {
            Error::Authenticator(format!(
                "no {} stored for {}",
                token_type.as_str(),
                account.name()
            ))
        })?;

        tracing::debug!(
            account = account.name(),
            token = token_type.as_str(),
            "resolved credentials"
        );

        Ok(match token_type {
            AuthTokenType::AccessToken => Credentials::bearer(username, token),
            AuthTokenType::SamlSessionCookie => Credentials::saml_sso(username, token),
            AuthTokenType::Password => Credentials::basic(username, token),
        })
    }
}

/// Auth flags are stored as `"TRUE"`; anything else, or no value, is off.
fn flag_set(store: &dyn AccountStore, account: &PersistedAccount, key: &str) -> Result<bool> {
    Ok(store
        .user_data(account, key)?
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true")))
}

/// Access to the platform's account services.
#[derive(Clone, Copy)]
pub struct Platform<'a> {
    pub store: &'a dyn AccountStore,
    pub resolver: &'a dyn CredentialResolver,
}

impl<'a> Platform<'a> {
    pub fn new(store: &'a dyn AccountStore, resolver: &'a dyn CredentialResolver) -> Self {
        Self { store, resolver }
    }

    pub fn with_stored_credentials(store: &'a dyn AccountStore) -> Self {
        Self {
            store,
            resolver: &StoredCredentialResolver,
        }
    }

    pub fn resolve_credentials(&self, account: &PersistedAccount) -> Result<Credentials> {
        self.resolver.resolve(self.store, account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FileAccountStore;

    fn store_with(name: &str) -> (tempfile::TempDir, FileAccountStore, PersistedAccount) {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileAccountStore::open(dir.path().join("accounts.toml")).unwrap();
        let account = store.add_account(name).unwrap();
        (dir, store, account)
    }

    #[test]
    fn password_is_the_default() {
        let (_dir, mut store, acc) = store_with("alice@cloud.example");
        store
            .set_auth_token(&acc, AuthTokenType::Password, Some("pw"))
            .unwrap();
        let creds = StoredCredentialResolver.resolve(&store, &acc).unwrap();
        assert_eq!(creds, Credentials::basic("alice", "pw"));
    }

    #[test]
    fn oauth2_flag_selects_bearer() {
        let (_dir, mut store, acc) = store_with("alice@cloud.example");
        store
            .set_user_data(&acc, KEY_SUPPORTS_OAUTH2, Some("TRUE"))
            .unwrap();
        store
            .set_user_data(&acc, KEY_SUPPORTS_SAML_WEB_SSO, Some("TRUE"))
            .unwrap();
        store
            .set_auth_token(&acc, AuthTokenType::AccessToken, Some("tok"))
            .unwrap();
        let creds = StoredCredentialResolver.resolve(&store, &acc).unwrap();
        assert_eq!(creds, Credentials::bearer("alice", "tok"));
    }

    #[test]
    fn flags_other_than_true_are_off() {
        let (_dir, mut store, acc) = store_with("alice@cloud.example");
        store
            .set_user_data(&acc, KEY_SUPPORTS_OAUTH2, Some("FALSE"))
            .unwrap();
        store
            .set_user_data(&acc, KEY_SUPPORTS_SAML_WEB_SSO, Some(""))
            .unwrap();
        store
            .set_auth_token(&acc, AuthTokenType::AccessToken, Some("tok"))
            .unwrap();
        store
            .set_auth_token(&acc, AuthTokenType::Password, Some("pw"))
            .unwrap();
        let creds = StoredCredentialResolver.resolve(&store, &acc).unwrap();
        assert_eq!(creds, Credentials::basic("alice", "pw"));
    }

    #[test]
    fn saml_flag_selects_cookie() {
        let (_dir, mut store, acc) = store_with("me@mail.example@sso.example");
        store
            .set_user_data(&acc, KEY_SUPPORTS_SAML_WEB_SSO, Some("TRUE"))
            .unwrap();
        store
            .set_auth_token(&acc, AuthTokenType::SamlSessionCookie, Some("c=1"))
            .unwrap();
        let creds = Platform::with_stored_credentials(&store)
            .resolve_credentials(&acc)
            .unwrap();
        assert_eq!(creds, Credentials::saml_sso("me@mail.example", "c=1"));
    }

    #[test]
    fn missing_token_is_an_authenticator_error() {
        let (_dir, store, acc) = store_with("alice@cloud.example");
        let err = StoredCredentialResolver.resolve(&store, &acc).unwrap_err();
        assert!(matches!(err, Error::Authenticator(_)));
    }

    #[test]
    fn name_without_host_is_rejected() {
        let (_dir, store, acc) = store_with("justaname");
        let err = StoredCredentialResolver.resolve(&store, &acc).unwrap_err();
        assert!(matches!(err, Error::AccountNotFound(_)));
    }
}
