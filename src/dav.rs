//! WebDAV PROPFIND listing.
//!
//! [`Propfind`] drives a single listing through any [`DavResource`]. A 401
//! from the server is not an error at this level: it comes back as
//! [`PropfindOutcome::Unauthorized`] so callers branch on the outcome instead
//! of catching a failure. Every other failure is returned as a [`DavError`].

use crate::credentials::Credentials;
use percent_encoding::percent_decode_str;
use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use std::fmt::Write as _;
use thiserror::Error;
use url::Url;

pub const DAV_NS: &str = "DAV:";
pub const OC_NS: &str = "http://owncloud.org/ns";

/// How far below the target a listing reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Depth {
    /// The resource itself.
    Zero,
    /// The resource and its direct children.
    One,
    Infinity,
}

impl Depth {
    pub fn as_str(self) -> &'static str {
        match self {
            Depth::Zero => "0",
            Depth::One => "1",
            Depth::Infinity => "infinity",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" => Some(Depth::Zero),
            "1" => Some(Depth::One),
            "infinity" | "inf" => Some(Depth::Infinity),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyName {
    pub namespace: String,
    pub name: String,
}

impl PropertyName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn dav(name: impl Into<String>) -> Self {
        Self::new(DAV_NS, name)
    }
}

/// Properties requested by a PROPFIND.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertySet {
    AllProp,
    Prop(Vec<PropertyName>),
}

impl PropertySet {
    /// The properties [`DavMember`] knows how to read.
    pub fn standard() -> Self {
        PropertySet::Prop(vec![
            PropertyName::dav("resourcetype"),
            PropertyName::dav("displayname"),
            PropertyName::dav("getcontentlength"),
            PropertyName::dav("getcontenttype"),
            PropertyName::dav("getetag"),
            PropertyName::dav("getlastmodified"),
            PropertyName::new(OC_NS, "size"),
        ])
    }

    pub fn to_xml(&self) -> String {
        let mut body = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        body.push_str(r#"<d:propfind xmlns:d="DAV:">"#);
        match self {
            PropertySet::AllProp => body.push_str("<d:allprop/>"),
            PropertySet::Prop(names) => {
                body.push_str("<d:prop>");
                for p in names {
                    let _ = write!(
                        body,
                        r#"<{} xmlns="{}"/>"#,
                        quick_xml::escape::escape(p.name.as_str()),
                        quick_xml::escape::escape(p.namespace.as_str())
                    );
                }
                body.push_str("</d:prop>");
            }
        }
        body.push_str("</d:propfind>");
        body
    }
}

/// Request and response summary of the last round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exchange {
    pub url: String,
    pub depth: Depth,
    pub status: u16,
}

/// One `<d:response>` entry of a multistatus body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DavMember {
    pub href: String,
    /// `displayname` when the server sent one, else the decoded last path segment.
    pub name: String,
    pub is_collection: bool,
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

#[derive(Debug, Error)]
pub enum DavError {
    #[error("unauthorized: {} returned {}", .exchange.url, .exchange.status)]
    Unauthorized { exchange: Exchange },

    #[error("PROPFIND {} failed with status {}: {body}", .exchange.url, .exchange.status)]
    Status { exchange: Exchange, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed multistatus response: {0}")]
    Malformed(String),

    #[error("invalid request: {0}")]
    Request(String),
}

/// A remote collection or file that can be listed.
pub trait DavResource {
    /// Sends one PROPFIND. A 401 must be reported as [`DavError::Unauthorized`].
    fn propfind(&mut self, depth: Depth, props: &PropertySet) -> Result<Exchange, DavError>;

    /// Children found by the last successful [`DavResource::propfind`].
    fn members(&self) -> &[DavMember];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PropfindOutcome {
    Listed {
        exchange: Exchange,
        members: Vec<DavMember>,
    },
    /// The server rejected the credentials; the call itself went through.
    Unauthorized { exchange: Exchange },
}

impl PropfindOutcome {
    pub fn exchange(&self) -> &Exchange {
        match self {
            PropfindOutcome::Listed { exchange, .. }
            | PropfindOutcome::Unauthorized { exchange } => exchange,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.exchange().status
    }

    pub fn members(&self) -> Option<&[DavMember]> {
        match self {
            PropfindOutcome::Listed { members, .. } => Some(members),
            PropfindOutcome::Unauthorized { .. } => None,
        }
    }

    pub fn is_authorized(&self) -> bool {
        matches!(self, PropfindOutcome::Listed { .. })
    }
}

/// One PROPFIND listing against a [`DavResource`].
pub struct Propfind<R> {
    resource: R,
    depth: Depth,
    props: PropertySet,
    outcome: Option<PropfindOutcome>,
}

impl<R: DavResource> Propfind<R> {
    /// A listing that asks for all properties.
    pub fn new(resource: R, depth: Depth) -> Self {
        Self {
            resource,
            depth,
            props: PropertySet::AllProp,
            outcome: None,
        }
    }

    pub fn with_properties(mut self, props: PropertySet) -> Self {
        self.props = props;
        self
    }

    pub fn execute(&mut self) -> Result<PropfindOutcome, DavError> {
        self.outcome = None;
        let outcome = match self.resource.propfind(self.depth, &self.props) {
            Ok(exchange) => PropfindOutcome::Listed {
                exchange,
                members: self.resource.members().to_vec(),
            },
            Err(DavError::Unauthorized { exchange }) => {
                tracing::debug!(url = %exchange.url, "PROPFIND unauthorized");
                PropfindOutcome::Unauthorized { exchange }
            }
            Err(e) => return Err(e),
        };
        self.outcome = Some(outcome.clone());
        Ok(outcome)
    }

    pub fn depth(&self) -> Depth {
        self.depth
    }

    pub fn outcome(&self) -> Option<&PropfindOutcome> {
        self.outcome.as_ref()
    }

    pub fn into_outcome(self) -> Option<PropfindOutcome> {
        self.outcome
    }

    pub fn exchange(&self) -> Option<&Exchange> {
        self.outcome.as_ref().map(PropfindOutcome::exchange)
    }

    pub fn status_code(&self) -> Option<u16> {
        self.outcome.as_ref().map(PropfindOutcome::status_code)
    }

    pub fn members(&self) -> Option<&[DavMember]> {
        self.outcome.as_ref().and_then(PropfindOutcome::members)
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }
}

/// A resource reached over HTTP with reqwest.
pub struct HttpDavResource {
    http: reqwest::blocking::Client,
    url: Url,
    credentials: Credentials,
    this: Option<DavMember>,
    members: Vec<DavMember>,
}

impl HttpDavResource {
    pub fn new(http: reqwest::blocking::Client, url: Url, credentials: Credentials) -> Self {
        Self {
            http,
            url,
            credentials,
            this: None,
            members: Vec::new(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The entry describing the requested resource itself, if the server sent one.
    pub fn this(&self) -> Option<&DavMember> {
        self.this.as_ref()
    }
}

impl DavResource for HttpDavResource {
    fn propfind(&mut self, depth: Depth, props: &PropertySet) -> Result<Exchange, DavError> {
        self.this = None;
        self.members.clear();

        let method = reqwest::Method::from_bytes(b"PROPFIND")
            .map_err(|e| DavError::Request(e.to_string()))?;
        let request = self
            .http
            .request(method, self.url.clone())
            .header("Depth", depth.as_str())
            .header(CONTENT_TYPE, "application/xml; charset=utf-8")
            .body(props.to_xml());

        tracing::debug!(url = %self.url, depth = depth.as_str(), "sending PROPFIND");
        let response = self.credentials.authenticate(request).send()?;
        let status = response.status();
        tracing::debug!(url = %self.url, status = status.as_u16(), "PROPFIND response");

        let exchange = Exchange {
            url: self.url.to_string(),
            depth,
            status: status.as_u16(),
        };

        if status == StatusCode::UNAUTHORIZED {
            return Err(DavError::Unauthorized { exchange });
        }

        let body = response.text()?;
        if !status.is_success() {
            return Err(DavError::Status {
                exchange,
                body: sanitize(&body),
            });
        }

        let own_path = normalize_path(self.url.path());
        for member in parse_multistatus(&body)? {
            if self.this.is_none() && normalize_path(href_path(&member.href)) == own_path {
                self.this = Some(member);
            } else {
                self.members.push(member);
            }
        }
        tracing::trace!(members = self.members.len(), "parsed multistatus");

        Ok(exchange)
    }

    fn members(&self) -> &[DavMember] {
        &self.members
    }
}

/// Parses a `<d:multistatus>` body into its `<d:response>` entries.
///
/// Only the `href` directly under `response` names the entry, and only
/// direct children of `prop` are read as properties. Nested hrefs such as
/// the ones inside `lockdiscovery` are ignored.
pub fn parse_multistatus(xml: &str) -> Result<Vec<DavMember>, DavError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut members = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut current: Option<DavMember> = None;
    let mut current_tag: Option<String> = None;
    let mut oc_size: Option<u64> = None;
    let mut saw_multistatus = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match (open.last().map(String::as_str), local.as_str()) {
                    (None, "multistatus") => saw_multistatus = true,
                    (Some("multistatus"), "response") => {
                        current = Some(DavMember::default());
                        oc_size = None;
                    }
                    (Some("resourcetype"), "collection") => mark_collection(current.as_mut()),
                    (Some("response"), "href")
                    | (
                        Some("prop"),
                        "displayname" | "getcontentlength" | "getcontenttype" | "getetag"
                        | "getlastmodified" | "size",
                    ) => current_tag = Some(local.clone()),
                    _ => current_tag = None,
                }
                open.push(local);
            }
            Ok(Event::Empty(e)) => {
                if open.last().map(String::as_str) == Some("resourcetype")
                    && e.local_name().as_ref() == b"collection"
                {
                    mark_collection(current.as_mut());
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| DavError::Malformed(e.to_string()))?
                    .into_owned();
                read_property(current_tag.as_deref(), current.as_mut(), text, &mut oc_size);
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                read_property(current_tag.as_deref(), current.as_mut(), text, &mut oc_size);
            }
            Ok(Event::End(e)) => {
                open.pop();
                current_tag = None;
                if e.local_name().as_ref() == b"response" {
                    if let Some(mut m) = current.take() {
                        if m.content_length.is_none() {
                            m.content_length = oc_size;
                        }
                        if m.name.is_empty() {
                            m.name = name_from_href(&m.href);
                        }
                        members.push(m);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(DavError::Malformed(format!(
                    "at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            Ok(_) => {}
        }
    }

    if !saw_multistatus {
        return Err(DavError::Malformed("missing multistatus element".into()));
    }
    Ok(members)
}

fn mark_collection(member: Option<&mut DavMember>) {
    if let Some(m) = member {
        m.is_collection = true;
    }
}

fn read_property(
    tag: Option<&str>,
    member: Option<&mut DavMember>,
    text: String,
    oc_size: &mut Option<u64>,
) {
    let (Some(tag), Some(m)) = (tag, member) else {
        return;
    };
    match tag {
        "href" => m.href = text,
        "displayname" => m.name = text,
        "getcontentlength" => m.content_length = text.parse().ok(),
        "getcontenttype" => m.content_type = Some(text),
        "getetag" => m.etag = Some(text.trim_matches('"').to_string()),
        "getlastmodified" => m.last_modified = Some(text),
        "size" => *oc_size = text.parse().ok(),
        _ => {}
    }
}

fn href_path(href: &str) -> &str {
    match href.find("://") {
        Some(i) => {
            let rest = &href[i + 3..];
            rest.find('/').map_or("/", |j| &rest[j..])
        }
        None => href,
    }
}

fn normalize_path(path: &str) -> String {
    let decoded = percent_decode_str(path).decode_utf8_lossy();
    let trimmed = decoded.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn name_from_href(href: &str) -> String {
    let path = href_path(href).trim_end_matches('/');
    let last = path.rsplit('/').next().unwrap_or(path);
    percent_decode_str(last).decode_utf8_lossy().into_owned()
}

fn sanitize(s: &str) -> String {
    if s.len() > 240 {
        let mut end = 240;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    } else {
        s.to_string()
    }
}
