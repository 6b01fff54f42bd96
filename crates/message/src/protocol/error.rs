use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Top-level error returned by every fallible operation of this crate.
///
/// Failures fall into two classes: the caller handed over a value that can
/// never be accepted ([`InvalidArgument`]), or the object could not complete
/// the operation in its current state ([`RuntimeFailure`]).
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("invalid argument: {source}")]
    InvalidArgument {
        #[from]
        source: InvalidArgument,
    },

    #[error("runtime failure: {source}")]
    Runtime {
        #[from]
        source: RuntimeFailure,
    },
}

impl MessageError {
    /// Returns true if the error was caused by a rejected input value.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, MessageError::InvalidArgument { .. })
    }

    /// Returns true if the error was caused by the state of the object.
    pub fn is_runtime(&self) -> bool {
        matches!(self, MessageError::Runtime { .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidArgument {
    #[error("invalid uri scheme: {0:?}")]
    Scheme(String),

    #[error("invalid uri user info: {0:?}")]
    UserInfo(String),

    #[error("invalid uri host: {0:?}")]
    Host(String),

    #[error("invalid uri port: {0}, must be in 1..=65535")]
    Port(String),

    #[error("invalid uri path: {0:?}")]
    Path(String),

    #[error("invalid uri query: {0:?}")]
    Query(String),

    #[error("invalid uri: {reason}")]
    Uri { reason: String },

    #[error("invalid header name: {0:?}")]
    HeaderName(String),

    #[error("invalid value for header {name}: {value:?}")]
    HeaderValue { name: String, value: String },

    #[error("invalid header line: {reason}")]
    HeaderLine { reason: String },

    #[error("invalid protocol version: {0:?}")]
    ProtocolVersion(String),

    #[error("an invalid http method was specified: {0:?}")]
    Method(String),

    #[error("invalid request target: {0:?}")]
    RequestTarget(String),

    #[error("invalid status code: {0}, must be in 100..=599")]
    StatusCode(u16),

    #[error("invalid reason phrase: {0:?}")]
    ReasonPhrase(String),

    #[error("unknown upload error code: {0}")]
    UploadError(u8),

    #[error("the specified path is not a directory: {}", .0.display())]
    TargetDirectory(PathBuf),
}

impl InvalidArgument {
    pub fn scheme<S: ToString>(scheme: S) -> Self {
        Self::Scheme(scheme.to_string())
    }

    pub fn user_info<S: ToString>(user_info: S) -> Self {
        Self::UserInfo(user_info.to_string())
    }

    pub fn host<S: ToString>(host: S) -> Self {
        Self::Host(host.to_string())
    }

    pub fn port<S: ToString>(port: S) -> Self {
        Self::Port(port.to_string())
    }

    pub fn path<S: ToString>(path: S) -> Self {
        Self::Path(path.to_string())
    }

    pub fn query<S: ToString>(query: S) -> Self {
        Self::Query(query.to_string())
    }

    pub fn uri<S: ToString>(reason: S) -> Self {
        Self::Uri { reason: reason.to_string() }
    }

    pub fn header_name<S: ToString>(name: S) -> Self {
        Self::HeaderName(name.to_string())
    }

    pub fn header_value<N: ToString, V: ToString>(name: N, value: V) -> Self {
        Self::HeaderValue { name: name.to_string(), value: value.to_string() }
    }

    pub fn header_line<S: ToString>(reason: S) -> Self {
        Self::HeaderLine { reason: reason.to_string() }
    }

    pub fn protocol_version<S: ToString>(version: S) -> Self {
        Self::ProtocolVersion(version.to_string())
    }

    pub fn method<S: ToString>(method: S) -> Self {
        Self::Method(method.to_string())
    }

    pub fn request_target<S: ToString>(target: S) -> Self {
        Self::RequestTarget(target.to_string())
    }

    pub fn status_code(code: u16) -> Self {
        Self::StatusCode(code)
    }

    pub fn reason_phrase<S: ToString>(reason: S) -> Self {
        Self::ReasonPhrase(reason.to_string())
    }

    pub fn target_directory<P: Into<PathBuf>>(path: P) -> Self {
        Self::TargetDirectory(path.into())
    }
}

#[derive(Error, Debug)]
pub enum RuntimeFailure {
    #[error("the stream is not readable")]
    NotReadable,

    #[error("the stream is not writable")]
    NotWritable,

    #[error("you cannot seek this stream")]
    NotSeekable,

    #[error("the stream position could not be read")]
    Position,

    #[error("unable to rewind the stream, position is {position}")]
    Rewind { position: u64 },

    #[error("the stream has been detached or closed")]
    Detached,

    #[error("the stream lock was poisoned by a panicking reader")]
    Poisoned,

    #[error("there is no body for the message")]
    MissingBody,

    #[error("the file has already been moved and is no longer available")]
    AlreadyMoved,

    #[error("the file was not uploaded: {}", .0.display())]
    NotUploaded(PathBuf),

    #[error("no file was successfully uploaded")]
    NoUploadedFile,

    #[error("unable to get the uploaded file for field {field:?}")]
    UnknownUpload { field: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl RuntimeFailure {
    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    pub fn unknown_upload<S: ToString>(field: S) -> Self {
        Self::UnknownUpload { field: field.to_string() }
    }
}
