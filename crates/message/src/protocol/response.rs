//! Response: a message with a status code and a reason phrase.

use http::StatusCode;

use crate::ensure;
use crate::environment::Environment;
use crate::protocol::message::Sealed;
use crate::protocol::{HttpMessage, InvalidArgument, Message, MessageError};

/// An immutable HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    message: Message,
    status: StatusCode,
    reason_phrase: String,
}

impl Response {
    /// Builds a response with `status` and `reason`, falling back to the
    /// default reason phrase of `status` when `reason` is `None` or empty.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if `status` is outside `100..=599` or the
    /// reason contains a control character.
    pub fn new(status: u16, reason: Option<&str>) -> Result<Self, MessageError> {
        Self::assemble(Message::new(), status, reason)
    }

    /// Builds a response with the protocol version and header lines of `env`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] for an invalid status, reason or environment value.
    pub fn from_environment(env: &Environment, status: u16, reason: Option<&str>) -> Result<Self, MessageError> {
        Self::assemble(Message::from_environment(env)?, status, reason)
    }

    fn assemble(message: Message, status: u16, reason: Option<&str>) -> Result<Self, MessageError> {
        let (status, reason_phrase) = resolve_status(status, reason)?;
        Ok(Self { message, status, reason_phrase })
    }

    pub fn status(&self) -> u16 {
        self.status.as_u16()
    }

    /// The reason phrase, empty for a status without a default one.
    pub fn reason_phrase(&self) -> &str {
        &self.reason_phrase
    }

    /// Returns a response with the given status, `None` or an empty reason
    /// selects the default reason phrase.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if `status` is outside `100..=599` or the
    /// reason contains a control character.
    pub fn with_status(&self, status: u16, reason: Option<&str>) -> Result<Self, MessageError> {
        let (status, reason_phrase) = resolve_status(status, reason)?;
        Ok(Self { status, reason_phrase, ..self.clone() })
    }
}

impl Default for Response {
    fn default() -> Self {
        Self { message: Message::new(), status: StatusCode::OK, reason_phrase: default_reason(StatusCode::OK) }
    }
}

fn resolve_status(status: u16, reason: Option<&str>) -> Result<(StatusCode, String), InvalidArgument> {
    ensure!((100..=599).contains(&status), InvalidArgument::status_code(status));
    let status = StatusCode::from_u16(status).map_err(|_| InvalidArgument::status_code(status))?;

    let reason_phrase = match reason.filter(|reason| !reason.is_empty()) {
        Some(reason) => {
            ensure!(!reason.bytes().any(|b| b.is_ascii_control() && b != b'\t'), InvalidArgument::reason_phrase(reason));
            reason.to_owned()
        }
        None => default_reason(status),
    };
    Ok((status, reason_phrase))
}

/// Status codes of the HTTP/1.1 registry (RFC 7231 section 6.1) that carry a
/// default reason phrase. Anything else, e.g. 418, gets an empty one.
const REGISTERED: [u16; 41] = [
    100, 101, 200, 201, 202, 203, 204, 205, 206, 300, 301, 302, 303, 304, 305, 307, 400, 401, 402, 403, 404, 405, 406,
    407, 408, 409, 410, 411, 412, 413, 414, 415, 416, 417, 426, 500, 501, 502, 503, 504, 505,
];

fn default_reason(status: StatusCode) -> String {
    if !REGISTERED.contains(&status.as_u16()) {
        return String::new();
    }
    status.canonical_reason().unwrap_or_default().to_owned()
}

impl AsRef<Message> for Response {
    fn as_ref(&self) -> &Message {
        &self.message
    }
}

impl Sealed for Response {
    fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }
}

impl HttpMessage for Response {}
