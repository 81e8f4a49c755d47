//! Account model and WebDAV listing for ownCloud-compatible servers.

pub mod account;
pub mod client;
pub mod config;
pub mod credentials;
pub mod dav;
pub mod error;
pub mod resolver;
pub mod store;

pub use account::{Account, build_account_name, username_for_account_name};
pub use client::OcClient;
pub use config::AppConfig;
pub use credentials::{AuthTokenType, Credentials};
pub use dav::{DavError, DavMember, DavResource, Depth, Propfind, PropfindOutcome};
pub use error::{Error, Result};
pub use resolver::{CredentialResolver, Platform, StoredCredentialResolver};
pub use store::{AccountStore, FileAccountStore, PersistedAccount};
