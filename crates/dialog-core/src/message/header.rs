//! Typed SIP headers used by dialog processing
//!
//! Only the headers that dialog and route-set handling inspect are typed;
//! anything else is carried as [`Header::Other`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DialogError;
use super::method::Method;
use super::parser;
use super::uri::{Param, SipUri};

/// `[display-name] <uri>;params` as found in To, From, Contact and route headers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameAddr {
    pub display_name: Option<String>,
    pub uri: SipUri,
    /// Header parameters (outside the angle brackets)
    pub params: Vec<Param>,
}

impl NameAddr {
    pub fn new(uri: SipUri) -> Self {
        Self {
            display_name: None,
            uri,
            params: Vec::new(),
        }
    }

    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }

    /// The `tag` header parameter, if present
    pub fn tag(&self) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.is("tag"))
            .and_then(|p| p.value.as_deref())
    }

    /// Replace (or add) the `tag` header parameter
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.set_tag(tag);
        self
    }

    pub fn set_tag(&mut self, tag: &str) {
        self.params.retain(|p| !p.is("tag"));
        self.params.push(Param::new("tag", Some(tag)));
    }
}

impl fmt::Display for NameAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.display_name {
            write!(f, "\"{}\" ", name)?;
        }
        write!(f, "<{}>", self.uri)?;
        for param in &self.params {
            write!(f, ";{}", param)?;
        }
        Ok(())
    }
}

impl FromStr for NameAddr {
    type Err = DialogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parser::parse_name_addr(s.trim())
    }
}

/// A single Route or Record-Route hop
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteHop(pub NameAddr);

impl RouteHop {
    pub fn new(uri: SipUri) -> Self {
        Self(NameAddr::new(uri))
    }

    pub fn uri(&self) -> &SipUri {
        &self.0.uri
    }

    /// A hop is a loose router when its URI carries `;lr`
    pub fn is_loose_routing(&self) -> bool {
        self.0.uri.is_loose_router()
    }
}

impl fmt::Display for RouteHop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RouteHop {
    type Err = DialogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<NameAddr>().map(RouteHop)
    }
}

/// CSeq header value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CSeq {
    pub seq: u32,
    pub method: Method,
}

impl CSeq {
    pub fn new(seq: u32, method: Method) -> Self {
        Self { seq, method }
    }
}

impl fmt::Display for CSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.seq, self.method)
    }
}

/// SIP header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Header {
    To(NameAddr),
    From(NameAddr),
    CallId(String),
    CSeq(CSeq),
    Contact(NameAddr),
    RecordRoute(RouteHop),
    Route(RouteHop),
    RSeq(u32),
    Other { name: String, value: String },
}

/// Header discriminant used for lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderKind {
    To,
    From,
    CallId,
    CSeq,
    Contact,
    RecordRoute,
    Route,
    RSeq,
    Other,
}

impl Header {
    pub fn kind(&self) -> HeaderKind {
        match self {
            Header::To(_) => HeaderKind::To,
            Header::From(_) => HeaderKind::From,
            Header::CallId(_) => HeaderKind::CallId,
            Header::CSeq(_) => HeaderKind::CSeq,
            Header::Contact(_) => HeaderKind::Contact,
            Header::RecordRoute(_) => HeaderKind::RecordRoute,
            Header::Route(_) => HeaderKind::Route,
            Header::RSeq(_) => HeaderKind::RSeq,
            Header::Other { .. } => HeaderKind::Other,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Header::To(_) => "To",
            Header::From(_) => "From",
            Header::CallId(_) => "Call-ID",
            Header::CSeq(_) => "CSeq",
            Header::Contact(_) => "Contact",
            Header::RecordRoute(_) => "Record-Route",
            Header::Route(_) => "Route",
            Header::RSeq(_) => "RSeq",
            Header::Other { name, .. } => name,
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.name())?;
        match self {
            Header::To(addr) | Header::From(addr) | Header::Contact(addr) => write!(f, "{}", addr),
            Header::CallId(id) => f.write_str(id),
            Header::CSeq(cseq) => write!(f, "{}", cseq),
            Header::RecordRoute(hop) | Header::Route(hop) => write!(f, "{}", hop),
            Header::RSeq(rseq) => write!(f, "{}", rseq),
            Header::Other { value, .. } => f.write_str(value),
        }
    }
}
