//! The message interface consumed by dialog processing
//!
//! Dialog, fork and route-set code never parses wire text. It sees a message
//! only through [`SipMessage`]: ordered header enumeration by kind, header
//! insertion at the head or tail, and request-target replacement. Callers with
//! their own message types implement the trait; [`Message`] is a plain owned
//! implementation for everyone else.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{DialogError, DialogResult};
use super::header::{CSeq, Header, HeaderKind, NameAddr, RouteHop};
use super::method::Method;
use super::uri::SipUri;

/// Where a header is inserted relative to existing headers of the same kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderPosition {
    Head,
    Tail,
}

/// Generic SIP message access
pub trait SipMessage: Send + Sync {
    /// Request method, or `None` for a response
    fn method(&self) -> Option<Method>;

    /// Response status code, or `None` for a request
    fn status_code(&self) -> Option<u16>;

    /// All headers of `kind`, in wire order
    fn headers_of(&self, kind: HeaderKind) -> Vec<&Header>;

    /// Insert a header before or after every existing header of the same kind
    fn push_header(&mut self, header: Header, position: HeaderPosition);

    fn request_uri(&self) -> Option<&SipUri>;

    /// Replace the Request-URI. Fails on a response.
    fn set_request_uri(&mut self, uri: SipUri) -> DialogResult<()>;

    fn is_request(&self) -> bool {
        self.method().is_some()
    }

    fn call_id(&self) -> Option<&str> {
        self.headers_of(HeaderKind::CallId).into_iter().find_map(|h| match h {
            Header::CallId(id) => Some(id.as_str()),
            _ => None,
        })
    }

    fn from_header(&self) -> Option<&NameAddr> {
        self.headers_of(HeaderKind::From).into_iter().find_map(|h| match h {
            Header::From(addr) => Some(addr),
            _ => None,
        })
    }

    fn to_header(&self) -> Option<&NameAddr> {
        self.headers_of(HeaderKind::To).into_iter().find_map(|h| match h {
            Header::To(addr) => Some(addr),
            _ => None,
        })
    }

    fn cseq(&self) -> Option<&CSeq> {
        self.headers_of(HeaderKind::CSeq).into_iter().find_map(|h| match h {
            Header::CSeq(cseq) => Some(cseq),
            _ => None,
        })
    }

    /// First Contact header
    fn contact(&self) -> Option<&NameAddr> {
        self.headers_of(HeaderKind::Contact).into_iter().find_map(|h| match h {
            Header::Contact(addr) => Some(addr),
            _ => None,
        })
    }

    fn rseq(&self) -> Option<u32> {
        self.headers_of(HeaderKind::RSeq).into_iter().find_map(|h| match h {
            Header::RSeq(rseq) => Some(*rseq),
            _ => None,
        })
    }

    fn record_routes(&self) -> Vec<&RouteHop> {
        self.headers_of(HeaderKind::RecordRoute)
            .into_iter()
            .filter_map(|h| match h {
                Header::RecordRoute(hop) => Some(hop),
                _ => None,
            })
            .collect()
    }

    fn routes(&self) -> Vec<&RouteHop> {
        self.headers_of(HeaderKind::Route)
            .into_iter()
            .filter_map(|h| match h {
                Header::Route(hop) => Some(hop),
                _ => None,
            })
            .collect()
    }
}

/// Request or status line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartLine {
    Request { method: Method, uri: SipUri },
    Response { status: u16, reason: String },
}

/// Owned SIP message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub start_line: StartLine,
    pub headers: Vec<Header>,
}

impl Message {
    pub fn request(method: Method, uri: SipUri) -> Self {
        Self {
            start_line: StartLine::Request { method, uri },
            headers: Vec::new(),
        }
    }

    pub fn response(status: u16, reason: &str) -> Self {
        Self {
            start_line: StartLine::Response {
                status,
                reason: reason.to_string(),
            },
            headers: Vec::new(),
        }
    }

    /// Append a header after all existing headers
    pub fn with_header(mut self, header: Header) -> Self {
        self.headers.push(header);
        self
    }

    pub fn with_call_id(self, call_id: &str) -> Self {
        self.with_header(Header::CallId(call_id.to_string()))
    }

    pub fn with_from(self, from: NameAddr) -> Self {
        self.with_header(Header::From(from))
    }

    pub fn with_to(self, to: NameAddr) -> Self {
        self.with_header(Header::To(to))
    }

    pub fn with_cseq(self, seq: u32, method: Method) -> Self {
        self.with_header(Header::CSeq(CSeq::new(seq, method)))
    }

    pub fn with_contact(self, contact: NameAddr) -> Self {
        self.with_header(Header::Contact(contact))
    }

    pub fn with_record_route(self, hop: RouteHop) -> Self {
        self.with_header(Header::RecordRoute(hop))
    }

    pub fn with_rseq(self, rseq: u32) -> Self {
        self.with_header(Header::RSeq(rseq))
    }
}

impl SipMessage for Message {
    fn method(&self) -> Option<Method> {
        match &self.start_line {
            StartLine::Request { method, .. } => Some(method.clone()),
            StartLine::Response { .. } => None,
        }
    }

    fn status_code(&self) -> Option<u16> {
        match &self.start_line {
            StartLine::Request { .. } => None,
            StartLine::Response { status, .. } => Some(*status),
        }
    }

    fn headers_of(&self, kind: HeaderKind) -> Vec<&Header> {
        self.headers.iter().filter(|h| h.kind() == kind).collect()
    }

    fn push_header(&mut self, header: Header, position: HeaderPosition) {
        let kind = header.kind();
        let index = match position {
            HeaderPosition::Head => self.headers.iter().position(|h| h.kind() == kind),
            HeaderPosition::Tail => self
                .headers
                .iter()
                .rposition(|h| h.kind() == kind)
                .map(|i| i + 1),
        };
        match index {
            Some(i) => self.headers.insert(i, header),
            None => self.headers.push(header),
        }
    }

    fn request_uri(&self) -> Option<&SipUri> {
        match &self.start_line {
            StartLine::Request { uri, .. } => Some(uri),
            StartLine::Response { .. } => None,
        }
    }

    fn set_request_uri(&mut self, new_uri: SipUri) -> DialogResult<()> {
        match &mut self.start_line {
            StartLine::Request { uri, .. } => {
                *uri = new_uri;
                Ok(())
            }
            StartLine::Response { status, .. } => Err(DialogError::illegal_action(&format!(
                "cannot set a Request-URI on a {} response",
                status
            ))),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.start_line {
            StartLine::Request { method, uri } => writeln!(f, "{} {} SIP/2.0", method, uri)?,
            StartLine::Response { status, reason } => writeln!(f, "SIP/2.0 {} {}", status, reason)?,
        }
        for header in &self.headers {
            writeln!(f, "{}", header)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hop(host: &str) -> RouteHop {
        RouteHop::new(SipUri::sip(host).with_lr())
    }

    #[test]
    fn test_push_header_positions() {
        let mut msg = Message::request(Method::Bye, SipUri::sip("bob.example.com"))
            .with_call_id("a84b4c76e66710")
            .with_header(Header::Route(hop("p1")))
            .with_cseq(2, Method::Bye);

        msg.push_header(Header::Route(hop("p2")), HeaderPosition::Tail);
        msg.push_header(Header::Route(hop("p0")), HeaderPosition::Head);

        let hosts: Vec<&str> = msg.routes().iter().map(|h| h.uri().host.as_str()).collect();
        assert_eq!(hosts, vec!["p0", "p1", "p2"]);
        // Route headers stay grouped ahead of CSeq
        assert_eq!(msg.headers.last().map(Header::kind), Some(HeaderKind::CSeq));
    }

    #[test]
    fn test_push_header_without_existing_kind_appends() {
        let mut msg = Message::response(180, "Ringing").with_call_id("x");
        msg.push_header(Header::RecordRoute(hop("p1")), HeaderPosition::Head);
        assert_eq!(msg.headers.len(), 2);
        assert_eq!(msg.record_routes().len(), 1);
    }

    #[test]
    fn test_request_uri_only_on_requests() {
        let mut req = Message::request(Method::Invite, SipUri::sip("a.example.com"));
        req.set_request_uri(SipUri::sip("b.example.com")).unwrap();
        assert_eq!(req.request_uri().map(|u| u.host.as_str()), Some("b.example.com"));

        let mut resp = Message::response(200, "OK");
        assert!(resp.set_request_uri(SipUri::sip("c.example.com")).is_err());
        assert!(resp.request_uri().is_none());
        assert_eq!(resp.status_code(), Some(200));
    }

    #[test]
    fn test_accessors() {
        let msg = Message::response(183, "Session Progress")
            .with_call_id("cid")
            .with_from("<sip:alice@a.example.com>;tag=f1".parse().unwrap())
            .with_to("<sip:bob@b.example.com>;tag=t1".parse().unwrap())
            .with_cseq(1, Method::Invite)
            .with_rseq(7);
        assert_eq!(msg.call_id(), Some("cid"));
        assert_eq!(msg.from_header().and_then(|a| a.tag()), Some("f1"));
        assert_eq!(msg.to_header().and_then(|a| a.tag()), Some("t1"));
        assert_eq!(msg.cseq().map(|c| c.seq), Some(1));
        assert_eq!(msg.rseq(), Some(7));
        assert!(!msg.is_request());
    }
}
