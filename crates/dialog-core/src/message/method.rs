//! SIP request methods

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DialogError;

/// SIP request method
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Invite,
    Ack,
    Bye,
    Cancel,
    Prack,
    Update,
    Refer,
    Subscribe,
    Notify,
    Options,
    Info,
    Message,
    Register,
    Publish,
    /// Any method token not listed above
    Extension(String),
}

impl Method {
    /// Methods whose responses may establish a dialog
    pub fn creates_dialog(&self) -> bool {
        matches!(self, Method::Invite | Method::Refer | Method::Subscribe)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Invite => "INVITE",
            Method::Ack => "ACK",
            Method::Bye => "BYE",
            Method::Cancel => "CANCEL",
            Method::Prack => "PRACK",
            Method::Update => "UPDATE",
            Method::Refer => "REFER",
            Method::Subscribe => "SUBSCRIBE",
            Method::Notify => "NOTIFY",
            Method::Options => "OPTIONS",
            Method::Info => "INFO",
            Method::Message => "MESSAGE",
            Method::Register => "REGISTER",
            Method::Publish => "PUBLISH",
            Method::Extension(name) => name,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = DialogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Method names are case-sensitive (RFC 3261 Section 7.1)
        let method = match s {
            "INVITE" => Method::Invite,
            "ACK" => Method::Ack,
            "BYE" => Method::Bye,
            "CANCEL" => Method::Cancel,
            "PRACK" => Method::Prack,
            "UPDATE" => Method::Update,
            "REFER" => Method::Refer,
            "SUBSCRIBE" => Method::Subscribe,
            "NOTIFY" => Method::Notify,
            "OPTIONS" => Method::Options,
            "INFO" => Method::Info,
            "MESSAGE" => Method::Message,
            "REGISTER" => Method::Register,
            "PUBLISH" => Method::Publish,
            "" => return Err(DialogError::protocol_error("empty method token")),
            other
                if other
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "-.!%*_+`'~".contains(c)) =>
            {
                Method::Extension(other.to_string())
            }
            other => {
                return Err(DialogError::protocol_error(&format!(
                    "invalid method token: {}",
                    other
                )));
            }
        };
        Ok(method)
    }
}
