//! Snapshot of the request state supplied by the hosting environment.
//!
//! Constructors such as [`Request::from_environment`](crate::protocol::Request::from_environment)
//! read everything from an [`Environment`] passed in by the caller; nothing is
//! read from process-wide state. A host can build the snapshot in code or
//! deserialize it:
//!
//! ```
//! use micro_message::environment::Environment;
//! use micro_message::protocol::{HttpMessage, Request};
//!
//! let env: Environment = serde_json::from_str(r#"{
//!     "server_protocol": "HTTP/1.1",
//!     "request_method": "POST",
//!     "request_uri": "/submit",
//!     "header_lines": ["Host: example.com"]
//! }"#).unwrap();
//!
//! let request = Request::from_environment(&env).unwrap();
//! assert_eq!(request.method(), "POST");
//! assert_eq!(request.header_line("host"), "example.com");
//! ```

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::codec::decode_header_lines;
use crate::protocol::{HeaderBag, InvalidArgument, MessageError, Method, ProtocolVersion, UploadEntry, Uri};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    /// e.g. `HTTP/1.1`, `1.1` when absent
    pub server_protocol: Option<String>,
    /// Raw `Name: value` lines
    pub header_lines: Vec<String>,
    /// `GET` when absent
    pub request_method: Option<String>,
    pub request_uri: Option<String>,
    /// Upload descriptors keyed by form field
    pub uploads: HashMap<String, UploadEntry>,
    /// Temporary paths the host vouches for as genuine uploads
    pub uploaded_paths: HashSet<PathBuf>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_server_protocol<S: Into<String>>(mut self, protocol: S) -> Self {
        self.server_protocol = Some(protocol.into());
        self
    }

    #[must_use]
    pub fn with_header_line<S: Into<String>>(mut self, line: S) -> Self {
        self.header_lines.push(line.into());
        self
    }

    #[must_use]
    pub fn with_request_method<S: Into<String>>(mut self, method: S) -> Self {
        self.request_method = Some(method.into());
        self
    }

    #[must_use]
    pub fn with_request_uri<S: Into<String>>(mut self, uri: S) -> Self {
        self.request_uri = Some(uri.into());
        self
    }

    /// Registers the descriptors of `field`. A successfully uploaded temporary
    /// file is also vouched for as a genuine upload.
    #[must_use]
    pub fn with_upload<F, E>(mut self, field: F, entry: E) -> Self
    where
        F: Into<String>,
        E: Into<UploadEntry>,
    {
        let entry = entry.into();
        let descriptors = match &entry {
            UploadEntry::Single(descriptor) => std::slice::from_ref(descriptor),
            UploadEntry::Multiple(descriptors) => descriptors.as_slice(),
        };
        self.uploaded_paths
            .extend(descriptors.iter().filter(|descriptor| descriptor.error.is_ok()).map(|descriptor| descriptor.tmp_name.clone()));
        self.uploads.insert(field.into(), entry);
        self
    }

    /// The protocol version, without the `HTTP/` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::ProtocolVersion`] if it is not numeric.
    pub fn protocol_version(&self) -> Result<ProtocolVersion, InvalidArgument> {
        self.server_protocol.as_deref().map_or_else(|| Ok(ProtocolVersion::default()), ProtocolVersion::parse)
    }

    /// The decoded header lines.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if a line is not a valid header field.
    pub fn headers(&self) -> Result<HeaderBag, InvalidArgument> {
        let pairs = decode_header_lines(&self.header_lines)?;
        trace!(count = pairs.len(), "decoded environment headers");
        HeaderBag::from_pairs(pairs)
    }

    /// # Errors
    ///
    /// Returns [`InvalidArgument::Method`] for a method outside the fixed verb set.
    pub fn request_method(&self) -> Result<Method, InvalidArgument> {
        self.request_method.as_deref().map_or_else(|| Ok(Method::default()), Method::parse)
    }

    /// The parsed request URI, `None` when the host supplied none.
    pub fn request_uri(&self) -> Option<Result<Uri, MessageError>> {
        self.request_uri.as_deref().map(Uri::parse)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use indoc::indoc;

    use super::*;
    use crate::protocol::{UploadDescriptor, UploadError};

    const SNAPSHOT: &str = indoc! {r#"
        {
            "server_protocol": "HTTP/2.0",
            "header_lines": [
                "Host: example.com",
                "Accept: text/html",
                "accept: application/json"
            ],
            "request_method": "put",
            "request_uri": "https://example.com/files?id=1",
            "uploads": {
                "avatar": {"name": "me.png", "type": "image/png", "tmp_name": "/tmp/php1", "size": 42, "error": 0},
                "docs": [
                    {"name": "a.pdf", "type": "application/pdf", "tmp_name": "/tmp/php2", "size": 1, "error": 0},
                    {"name": "b.pdf", "error": 4}
                ]
            },
            "uploaded_paths": ["/tmp/php1", "/tmp/php2"]
        }
    "#};

    #[test]
    fn test_deserialize_snapshot() {
        let env: Environment = serde_json::from_str(SNAPSHOT).unwrap();

        assert_eq!(env.protocol_version().unwrap(), "2.0");
        assert_eq!(env.request_method().unwrap(), "put");
        assert_eq!(env.request_uri().unwrap().unwrap().query(), "id=1");
        assert_eq!(env.headers().unwrap().get("ACCEPT"), ["text/html", "application/json"]);
        assert!(matches!(env.uploads["docs"], UploadEntry::Multiple(ref descriptors) if descriptors.len() == 2));
        assert!(env.uploaded_paths.contains(Path::new("/tmp/php1")));
    }

    #[test]
    fn test_defaults() {
        let env: Environment = serde_json::from_str("{}").unwrap();

        assert_eq!(env, Environment::new());
        assert_eq!(env.protocol_version().unwrap(), "1.1");
        assert_eq!(env.request_method().unwrap(), "GET");
        assert!(env.request_uri().is_none());
        assert!(env.headers().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_values() {
        assert!(Environment::new().with_server_protocol("HTTP/x").protocol_version().is_err());
        assert!(Environment::new().with_request_method("geet").request_method().is_err());
        assert!(Environment::new().with_header_line("no colon here").headers().is_err());
        assert!(Environment::new().with_request_uri("http://host:99999").request_uri().unwrap().is_err());
    }

    #[test]
    fn test_with_upload_vouches_for_successful_files() {
        let ok = UploadDescriptor { tmp_name: "/tmp/ok".into(), ..UploadDescriptor::default() };
        let failed = UploadDescriptor { tmp_name: "/tmp/failed".into(), error: UploadError::Partial, ..UploadDescriptor::default() };

        let env = Environment::new().with_upload("files", UploadEntry::Multiple(vec![ok, failed]));

        assert!(env.uploads.contains_key("files"));
        assert!(env.uploaded_paths.contains(Path::new("/tmp/ok")));
        assert!(!env.uploaded_paths.contains(Path::new("/tmp/failed")));
    }
}
