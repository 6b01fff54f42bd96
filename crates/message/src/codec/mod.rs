//! Text codecs used to build message value objects.
//!
//! This module turns strings handed over by callers or by the hosting
//! environment into structured components, and back again.
//!
//! # Architecture
//!
//! - URI handling:
//!   - [`decode_uri`]: grammar-driven decomposition into [`UriParts`](crate::protocol::UriParts)
//!   - [`encode_uri`]: canonical reconstruction of a [`Uri`](crate::protocol::Uri)
//!
//! - Header handling:
//!   - [`decode_header_lines`]: raw `Name: value` lines into ordered pairs
//!
//! # Example
//!
//! ```
//! use micro_message::codec::decode_uri;
//!
//! let parts = decode_uri("https://google.com?asdf=baz#fragment").unwrap();
//! assert_eq!(parts.host, "google.com");
//! assert_eq!(parts.path, "");
//! assert_eq!(parts.query, "asdf=baz");
//! ```

mod header_line_decoder;
mod uri_decoder;
mod uri_encoder;

pub use header_line_decoder::decode_header_lines;
pub use uri_decoder::decode_uri;
pub use uri_encoder::encode_authority;
pub use uri_encoder::encode_uri;

pub(crate) use uri_decoder::is_valid_scheme;
