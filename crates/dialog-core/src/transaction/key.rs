//! Transaction key extraction

use std::fmt;

use crate::errors::{DialogError, DialogResult};
use crate::message::{Method, SipMessage};

/// Identity fields of the transaction a message belongs to
///
/// For a response the method is taken from CSeq.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionKey {
    pub call_id: String,
    pub from_tag: Option<String>,
    pub to_tag: Option<String>,
    pub cseq: u32,
    pub method: Method,
}

impl TransactionKey {
    /// Extract the key from a message
    ///
    /// Fails with `BadParameter` when Call-ID, From, To or CSeq is missing.
    pub fn from_message(message: &dyn SipMessage) -> DialogResult<Self> {
        let call_id = message
            .call_id()
            .ok_or_else(|| DialogError::bad_parameter("message has no Call-ID header"))?;
        let from = message
            .from_header()
            .ok_or_else(|| DialogError::bad_parameter("message has no From header"))?;
        let to = message
            .to_header()
            .ok_or_else(|| DialogError::bad_parameter("message has no To header"))?;
        let cseq = message
            .cseq()
            .ok_or_else(|| DialogError::bad_parameter("message has no CSeq header"))?;

        let method = message.method().unwrap_or_else(|| cseq.method.clone());

        Ok(Self {
            call_id: call_id.to_string(),
            from_tag: from.tag().map(str::to_string),
            to_tag: to.tag().map(str::to_string),
            cseq: cseq.seq,
            method,
        })
    }
}

impl fmt::Display for TransactionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{} ({} {})",
            self.call_id,
            self.from_tag.as_deref().unwrap_or("-"),
            self.to_tag.as_deref().unwrap_or("-"),
            self.cseq,
            self.method
        )
    }
}
