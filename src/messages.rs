//! Message service invoked once a request has been authorized.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::routing::Endpoint;

/// A message returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct MessageError(pub String);

/// Produces the message for an endpoint.
pub trait MessageService: Send + Sync {
    fn message(&self, endpoint: Endpoint) -> Result<Message, MessageError>;
}

/// The fixed messages served by the API.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedMessages;

impl MessageService for CannedMessages {
    fn message(&self, endpoint: Endpoint) -> Result<Message, MessageError> {
        let text = match endpoint {
            Endpoint::Public => "This is a public message.",
            Endpoint::Protected => "This is a protected message.",
            Endpoint::Admin => "This is an admin message.",
        };
        Ok(Message::new(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canned_messages() {
        let service = CannedMessages;
        assert_eq!(
            service.message(Endpoint::Public).unwrap().text,
            "This is a public message."
        );
        assert_eq!(
            service.message(Endpoint::Protected).unwrap().text,
            "This is a protected message."
        );
        assert_eq!(
            service.message(Endpoint::Admin).unwrap().text,
            "This is an admin message."
        );
    }
}
