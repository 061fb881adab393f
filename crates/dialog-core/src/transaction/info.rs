//! Transaction queries used by route-set handling

use crate::message::Method;

/// Read-only view of the transaction an outbound message belongs to
pub trait TransactionInfo: Send + Sync {
    /// Method of the transaction (INVITE for an ACK to a non-2xx, and so on)
    fn method(&self) -> Method;

    /// Last response code sent or received on the transaction, if any
    fn response_code(&self) -> Option<u16>;

    /// The transaction asked for the dialog's route-set to survive a
    /// failure response
    fn preserve_route_set(&self) -> bool {
        false
    }

    /// Whether this is the SUBSCRIBE that creates a subscription dialog
    fn is_initial_subscription(&self) -> bool {
        false
    }
}

/// Plain [`TransactionInfo`] value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSnapshot {
    pub method: Method,
    pub response_code: Option<u16>,
    pub preserve_route_set: bool,
    pub initial_subscription: bool,
}

impl TransactionSnapshot {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            response_code: None,
            preserve_route_set: false,
            initial_subscription: false,
        }
    }

    pub fn with_response_code(mut self, code: u16) -> Self {
        self.response_code = Some(code);
        self
    }

    pub fn with_preserve_route_set(mut self, preserve: bool) -> Self {
        self.preserve_route_set = preserve;
        self
    }

    pub fn with_initial_subscription(mut self, initial: bool) -> Self {
        self.initial_subscription = initial;
        self
    }
}

impl TransactionInfo for TransactionSnapshot {
    fn method(&self) -> Method {
        self.method.clone()
    }

    fn response_code(&self) -> Option<u16> {
        self.response_code
    }

    fn preserve_route_set(&self) -> bool {
        self.preserve_route_set
    }

    fn is_initial_subscription(&self) -> bool {
        self.initial_subscription
    }
}
