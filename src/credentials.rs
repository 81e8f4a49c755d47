//! Authentication material for a server account.
//!
//! Each variant knows its username (if any) and how to decorate an outgoing
//! request. Secrets are never printed by `Debug`.

use base64::Engine as _;
use reqwest::blocking::RequestBuilder;
use reqwest::header::{AUTHORIZATION, COOKIE, HeaderName};
use std::fmt;

/// Kind of secret an authenticator hands out for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthTokenType {
    Password,
    AccessToken,
    SamlSessionCookie,
}

impl AuthTokenType {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthTokenType::Password => "password",
            AuthTokenType::AccessToken => "access_token",
            AuthTokenType::SamlSessionCookie => "saml_web_sso_session_cookie",
        }
    }
}

#[derive(Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    #[default]
    Anonymous,
    Basic {
        username: String,
        password: String,
    },
    /// OAuth2 access token.
    Bearer {
        username: String,
        access_token: String,
    },
    /// Session cookie obtained through a SAML web SSO login.
    SamlSso {
        username: String,
        session_cookie: String,
    },
}

impl Credentials {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn bearer(username: impl Into<String>, access_token: impl Into<String>) -> Self {
        Credentials::Bearer {
            username: username.into(),
            access_token: access_token.into(),
        }
    }

    pub fn saml_sso(username: impl Into<String>, session_cookie: impl Into<String>) -> Self {
        Credentials::SamlSso {
            username: username.into(),
            session_cookie: session_cookie.into(),
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Credentials::Anonymous => None,
            Credentials::Basic { username, .. }
            | Credentials::Bearer { username, .. }
            | Credentials::SamlSso { username, .. } => Some(username),
        }
    }

    pub fn auth_token(&self) -> Option<&str> {
        match self {
            Credentials::Anonymous => None,
            Credentials::Basic { password, .. } => Some(password),
            Credentials::Bearer { access_token, .. } => Some(access_token),
            Credentials::SamlSso { session_cookie, .. } => Some(session_cookie),
        }
    }

    pub fn auth_token_type(&self) -> Option<AuthTokenType> {
        match self {
            Credentials::Anonymous => None,
            Credentials::Basic { .. } => Some(AuthTokenType::Password),
            Credentials::Bearer { .. } => Some(AuthTokenType::AccessToken),
            Credentials::SamlSso { .. } => Some(AuthTokenType::SamlSessionCookie),
        }
    }

    /// Only OAuth2 tokens can be renewed without asking the user again.
    pub fn can_refresh(&self) -> bool {
        matches!(self, Credentials::Bearer { .. })
    }

    /// The header this variant adds to every request, if any.
    pub fn header(&self) -> Option<(HeaderName, String)> {
        match self {
            Credentials::Anonymous => None,
            Credentials::Basic { username, password } => {
                let raw = format!("{username}:{password}");
                let encoded = base64::engine::general_purpose::STANDARD.encode(raw);
                Some((AUTHORIZATION, format!("Basic {encoded}")))
            }
            Credentials::Bearer { access_token, .. } => {
                Some((AUTHORIZATION, format!("Bearer {access_token}")))
            }
            Credentials::SamlSso { session_cookie, .. } => {
                Some((COOKIE, session_cookie.clone()))
            }
        }
    }

    pub fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        match self.header() {
            Some((name, value)) => request.header(name, value),
            None => request,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Anonymous => f.write_str("Anonymous"),
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::Bearer { username, .. } => f
                .debug_struct("Bearer")
                .field("username", username)
                .field("access_token", &"<redacted>")
                .finish(),
            Credentials::SamlSso { username, .. } => f
                .debug_struct("SamlSso")
                .field("username", username)
                .field("session_cookie", &"<redacted>")
                .finish(),
        }
    }
}
