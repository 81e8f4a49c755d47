use crate::account::Account;
use crate::config::AppConfig;
use crate::dav::{
    DavError, DavMember, Depth, HttpDavResource, PropertySet, Propfind, PropfindOutcome,
};
use crate::error::{Error, Result};
use crate::resolver::Platform;
use url::Url;

/// WebDAV root of ownCloud 4.0 and later, relative to the server base URL.
pub const WEBDAV_PATH: &str = "/remote.php/webdav";

/// An [`Account`] bound to an HTTP client.
pub struct OcClient {
    account: Account,
    http: reqwest::blocking::Client,
}

impl OcClient {
    pub fn new(account: Account, config: &AppConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()
            .map_err(DavError::from)?;
        Ok(Self::with_http(account, http))
    }

    pub fn with_http(account: Account, http: reqwest::blocking::Client) -> Self {
        Self { account, http }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn reload_credentials(&mut self, platform: &Platform<'_>) -> Result<()> {
        self.account.reload_credentials(platform)
    }

    /// Absolute WebDAV URL of an account-relative `path`. A trailing `/` on
    /// `path` (or the root) is kept.
    pub fn webdav_url(&self, path: &str) -> Result<Url> {
        let base = self.account.base_url().trim();
        let mut url = Url::parse(base)
            .map_err(|e| Error::invalid(format!("bad base URL '{base}': {e}")))?;

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let trailing = segments.is_empty() || path.ends_with('/');
        {
            let mut parts = url
                .path_segments_mut()
                .map_err(|()| Error::invalid(format!("base URL '{base}' cannot hold a path")))?;
            parts.pop_if_empty();
            parts.extend(WEBDAV_PATH.split('/').filter(|s| !s.is_empty()));
            parts.extend(segments);
            if trailing {
                parts.push("");
            }
        }
        Ok(url)
    }

    fn resource(&self, path: &str) -> Result<HttpDavResource> {
        Ok(HttpDavResource::new(
            self.http.clone(),
            self.webdav_url(path)?,
            self.account.credentials().clone(),
        ))
    }

    /// Lists `path`, returning the executed request.
    ///
    /// A 401 is not an error; check [`Propfind::status_code`] or the outcome.
    pub fn list(&self, path: &str, depth: Depth) -> Result<Propfind<HttpDavResource>> {
        let mut method = Propfind::new(self.resource(path)?, depth);
        method.execute()?;
        Ok(method)
    }

    /// Metadata of `path` itself, or `None` when the server refused the credentials.
    pub fn stat(&self, path: &str) -> Result<Option<DavMember>> {
        let mut method = Propfind::new(self.resource(path)?, Depth::Zero)
            .with_properties(PropertySet::standard());
        match method.execute()? {
            PropfindOutcome::Unauthorized { .. } => Ok(None),
            PropfindOutcome::Listed { members, .. } => {
                let own = method.resource().this().cloned();
                Ok(own.or_else(|| members.into_iter().next()))
            }
        }
    }

    pub fn check_credentials(&self) -> Result<bool> {
        Ok(self.stat("/")?.is_some())
    }
}
