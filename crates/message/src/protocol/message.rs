//! The message-family base: protocol version, headers and an optional body.
//!
//! [`Message`] holds the state shared by every message. [`HttpMessage`]
//! provides the read operations and the `with_*` derivations to [`Message`],
//! [`Request`](crate::protocol::Request) and [`Response`](crate::protocol::Response)
//! alike. Derivations clone the receiver, change the clone and return it, so the
//! receiver is never observed to change.

use triomphe::Arc;

use crate::environment::Environment;
use crate::protocol::{HeaderBag, IntoHeaderValues, MessageError, ProtocolVersion, RuntimeFailure, Stream};

/// Shared reference to a body stream.
///
/// Deriving a message shares its body, a message never closes the stream it references.
pub type Body = Arc<Stream>;

/// Protocol version, headers and an optional body.
#[derive(Debug, Clone, Default)]
pub struct Message {
    protocol_version: ProtocolVersion,
    headers: HeaderBag,
    body: Option<Body>,
}

impl Message {
    /// An HTTP/1.1 message without headers or body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a message from the protocol version and header lines of `env`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`](crate::protocol::InvalidArgument) if the
    /// protocol version or any header line is malformed.
    pub fn from_environment(env: &Environment) -> Result<Self, MessageError> {
        Ok(Self { protocol_version: env.protocol_version()?, headers: env.headers()?, body: None })
    }

    pub(crate) fn headers_mut(&mut self) -> &mut HeaderBag {
        &mut self.headers
    }
}

impl AsRef<Message> for Message {
    fn as_ref(&self) -> &Message {
        self
    }
}

mod sealed {
    use super::Message;

    pub trait Sealed {
        fn message_mut(&mut self) -> &mut Message;
    }

    impl Sealed for Message {
        fn message_mut(&mut self) -> &mut Message {
            self
        }
    }
}

pub(crate) use sealed::Sealed;

/// Operations shared by every message-family value.
///
/// The trait is sealed: it is implemented for [`Message`],
/// [`Request`](crate::protocol::Request) and [`Response`](crate::protocol::Response) only.
///
/// ```
/// use micro_message::protocol::{HttpMessage, Message};
///
/// let message = Message::new().with_header("X-Powered-By", "PHP").unwrap();
/// let added = message.with_added_header("x-powered-by", "Stark").unwrap();
///
/// assert_eq!(added.header_line("X-POWERED-BY"), "PHP, Stark");
/// assert_eq!(message.header("x-powered-by"), ["PHP"]);
/// ```
pub trait HttpMessage: AsRef<Message> + Sealed + Clone {
    /// The numeric protocol version, e.g. `1.1`.
    fn protocol_version(&self) -> &ProtocolVersion {
        &self.as_ref().protocol_version
    }

    /// # Errors
    ///
    /// Returns [`InvalidArgument::ProtocolVersion`](crate::protocol::InvalidArgument::ProtocolVersion)
    /// if `version` is not numeric.
    fn with_protocol_version(&self, version: &str) -> Result<Self, MessageError> {
        let version = ProtocolVersion::parse(version)?;
        let mut derived = self.clone();
        derived.message_mut().protocol_version = version;
        Ok(derived)
    }

    fn headers(&self) -> &HeaderBag {
        &self.as_ref().headers
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers().contains(name)
    }

    /// Values of `name`, empty if the header is absent.
    fn header(&self, name: &str) -> &[String] {
        self.headers().get(name)
    }

    /// Values of `name` joined with `", "`, empty if the header is absent.
    fn header_line(&self, name: &str) -> String {
        self.headers().get_line(name)
    }

    /// Returns a message where `name` has exactly the given values.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`](crate::protocol::InvalidArgument) for an invalid name or value.
    fn with_header<V: IntoHeaderValues>(&self, name: &str, values: V) -> Result<Self, MessageError> {
        let mut derived = self.clone();
        derived.message_mut().headers.set(name, values)?;
        Ok(derived)
    }

    /// Returns a message where the values are appended to those of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`](crate::protocol::InvalidArgument) for an invalid name or value.
    fn with_added_header<V: IntoHeaderValues>(&self, name: &str, values: V) -> Result<Self, MessageError> {
        let mut derived = self.clone();
        derived.message_mut().headers.append(name, values)?;
        Ok(derived)
    }

    /// Returns a message without `name`, absent headers are not an error.
    fn without_header(&self, name: &str) -> Self {
        let mut derived = self.clone();
        derived.message_mut().headers.remove(name);
        derived
    }

    /// The body stream.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeFailure::MissingBody`] if no body was ever set, an
    /// empty body is a stream of length 0 instead.
    fn body(&self) -> Result<&Body, MessageError> {
        Ok(self.as_ref().body.as_ref().ok_or(RuntimeFailure::MissingBody)?)
    }

    fn with_body(&self, body: Body) -> Self {
        let mut derived = self.clone();
        derived.message_mut().body = Some(body);
        derived
    }
}

impl HttpMessage for Message {}
