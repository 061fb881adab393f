//! SIP URI representation
//!
//! A deliberately small URI model: enough structure to tell loose from strict
//! routers (the `lr` parameter) and to strip header parameters, which are not
//! allowed in a Request-URI (RFC 3261 Section 19.1.5).
//!
//! ```text
//! sip:alice@atlanta.example.com:5060;transport=tcp;lr?subject=project
//! └┬┘ └─┬─┘ └────────┬────────┘ └┬─┘ └──────┬───────┘ └──────┬──────┘
//! scheme user       host        port     params           headers
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DialogError;
use super::parser;

/// URI scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    Sip,
    Sips,
    Tel,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Sip => f.write_str("sip"),
            Scheme::Sips => f.write_str("sips"),
            Scheme::Tel => f.write_str("tel"),
        }
    }
}

/// A `name[=value]` parameter, used for URI and header parameters alike
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub value: Option<String>,
}

impl Param {
    pub fn new(name: &str, value: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            value: value.map(str::to_string),
        }
    }

    /// Parameter names compare case-insensitively
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.name, value),
            None => f.write_str(&self.name),
        }
    }
}

/// SIP URI
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SipUri {
    pub scheme: Scheme,
    pub user: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    /// URI parameters (`;name=value` or `;name`)
    pub params: Vec<Param>,
    /// URI headers (`?name=value&...`)
    pub headers: Vec<(String, String)>,
}

impl SipUri {
    /// Create a `sip:` URI for the given host
    pub fn sip(host: &str) -> Self {
        Self {
            scheme: Scheme::Sip,
            user: None,
            host: host.to_string(),
            port: None,
            params: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_user(mut self, user: &str) -> Self {
        self.user = Some(user.to_string());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_param(mut self, name: &str, value: Option<&str>) -> Self {
        self.params.push(Param::new(name, value));
        self
    }

    /// Mark this URI as a loose router
    pub fn with_lr(self) -> Self {
        self.with_param("lr", None)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.is(name))
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.is(name))
    }

    /// Whether the URI carries the `lr` loose-routing marker
    pub fn is_loose_router(&self) -> bool {
        self.has_param("lr")
    }

    /// Copy of this URI without `?headers`
    pub fn without_headers(&self) -> Self {
        let mut uri = self.clone();
        uri.headers.clear();
        uri
    }
}

impl fmt::Display for SipUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if let Some(user) = &self.user {
            write!(f, "{}@", user)?;
        }
        f.write_str(&self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        for param in &self.params {
            write!(f, ";{}", param)?;
        }
        for (i, (name, value)) in self.headers.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, name, value)?;
        }
        Ok(())
    }
}

impl FromStr for SipUri {
    type Err = DialogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parser::parse_uri(s.trim())
    }
}
