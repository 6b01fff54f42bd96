//! Immutable HTTP message value objects.
//!
//! # Architecture
//!
//! - **Addressing** ([`uri`]): [`Uri`] and its raw [`UriParts`]
//!
//! - **Messages** ([`message`], [`request`], [`response`]):
//!   - [`Message`]: protocol version, [`HeaderBag`] and an optional [`Body`]
//!   - [`Request`]: adds a [`Method`], a target [`Uri`] and a request target
//!   - [`Response`]: adds a status code and a reason phrase
//!   - [`HttpMessage`]: the read operations and `with_*` derivations they share
//!
//! - **Bodies** ([`stream`]): [`Stream`] over a file or an in-memory buffer
//!
//! - **Uploads** ([`upload`]): [`UploadedFile`] and the [`UploadStore`] deciding
//!   what counts as a genuine upload
//!
//! - **Error Handling** ([`error`]):
//!   - [`MessageError`]: top-level error type
//!   - [`InvalidArgument`]: rejected input values
//!   - [`RuntimeFailure`]: operations the current state cannot complete
//!
//! Every `with_*` method takes `&self` and returns a new value. Cloning a
//! message is cheap for the body, which is shared through [`Body`].

mod error;
pub use error::InvalidArgument;
pub use error::MessageError;
pub use error::RuntimeFailure;

mod header;
pub use header::HeaderBag;
pub use header::IntoHeaderValues;

mod version;
pub use version::ProtocolVersion;

mod method;
pub use method::Method;

mod uri;
pub use uri::Uri;
pub use uri::UriParts;

mod message;
pub use message::Body;
pub use message::HttpMessage;
pub use message::Message;

mod request;
pub use request::Request;

mod response;
pub use response::Response;

mod stream;
pub use stream::AccessMode;
pub use stream::MetadataValue;
pub use stream::Resource;
pub use stream::Stream;
pub use stream::StreamMetadata;
pub use stream::Whence;

mod upload;
pub use upload::LocalUploadStore;
pub use upload::UploadDescriptor;
pub use upload::UploadEntry;
pub use upload::UploadError;
pub use upload::UploadStore;
pub use upload::UploadedFile;
