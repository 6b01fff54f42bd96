//! Request: a message with a method, an optional target URI and a request target.

use tracing::debug;

use crate::ensure;
use crate::environment::Environment;
use crate::protocol::message::Sealed;
use crate::protocol::{HeaderBag, HttpMessage, InvalidArgument, Message, MessageError, Method, Uri};
use crate::utils::is_blank_or_control;

/// An immutable HTTP request.
///
/// ```
/// use micro_message::protocol::{HttpMessage, Request, Uri};
///
/// let request = Request::new("get", Some(Uri::parse("http://example.com:8080/a?b=c").unwrap())).unwrap();
/// assert_eq!(request.method(), "get");
/// assert_eq!(request.header_line("host"), "example.com:8080");
/// assert_eq!(request.request_target(), "http://example.com:8080/a?b=c");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Request {
    message: Message,
    method: Method,
    uri: Option<Uri>,
    request_target: Option<String>,
}

impl Request {
    /// Builds a request, setting the `Host` header from the URI host.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::Method`] for a method outside the fixed verb set.
    pub fn new(method: &str, uri: Option<Uri>) -> Result<Self, MessageError> {
        Self::assemble(Message::new(), Method::parse(method)?, uri)
    }

    /// Builds a request from the protocol version, header lines, method and
    /// URI of `env`. A `Host` header supplied by the environment is kept.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if any of those values is malformed.
    pub fn from_environment(env: &Environment) -> Result<Self, MessageError> {
        let message = Message::from_environment(env)?;
        let method = env.request_method()?;
        let uri = env.request_uri().transpose()?;
        Self::assemble(message, method, uri)
    }

    fn assemble(mut message: Message, method: Method, uri: Option<Uri>) -> Result<Self, MessageError> {
        if let Some(uri) = &uri {
            sync_host(message.headers_mut(), uri, true)?;
        }
        Ok(Self { message, method, uri, request_target: None })
    }

    /// The explicit request target if one was set, else the string form of
    /// the URI, else `/`.
    pub fn request_target(&self) -> String {
        if let Some(target) = &self.request_target {
            return target.clone();
        }
        match self.uri.as_ref().map(Uri::to_string) {
            Some(target) if !target.is_empty() => target,
            _ => "/".to_owned(),
        }
    }

    /// Returns a request carrying `target` verbatim, e.g. `*` or an authority form.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::RequestTarget`] if the target is empty or contains whitespace.
    pub fn with_request_target(&self, target: &str) -> Result<Self, MessageError> {
        ensure!(!target.is_empty() && !target.bytes().any(is_blank_or_control), InvalidArgument::request_target(target));
        Ok(Self { request_target: Some(target.to_owned()), ..self.clone() })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// # Errors
    ///
    /// Returns [`InvalidArgument::Method`] for a method outside the fixed verb set.
    pub fn with_method(&self, method: &str) -> Result<Self, MessageError> {
        Ok(Self { method: Method::parse(method)?, ..self.clone() })
    }

    pub fn uri(&self) -> Option<&Uri> {
        self.uri.as_ref()
    }

    /// Returns a request targeting `uri`.
    ///
    /// The `Host` header is replaced by the host of `uri` if it has one. With
    /// `preserve_host` it is only set when the request has no `Host` value yet.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if the host cannot be used as a header value.
    pub fn with_uri(&self, uri: Uri, preserve_host: bool) -> Result<Self, MessageError> {
        let mut derived = self.clone();
        sync_host(derived.message.headers_mut(), &uri, preserve_host)?;
        derived.uri = Some(uri);
        Ok(derived)
    }
}

fn sync_host(headers: &mut HeaderBag, uri: &Uri, preserve_host: bool) -> Result<(), InvalidArgument> {
    if uri.host().is_empty() {
        return Ok(());
    }
    if preserve_host && !headers.get_line("host").is_empty() {
        return Ok(());
    }

    let host = match uri.port() {
        Some(port) => format!("{}:{port}", uri.host()),
        None => uri.host().to_owned(),
    };
    debug!(%host, preserve_host, "synchronizing host header");
    headers.set("Host", host)
}

impl AsRef<Message> for Request {
    fn as_ref(&self) -> &Message {
        &self.message
    }
}

impl Sealed for Request {
    fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }
}

impl HttpMessage for Request {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RuntimeFailure;

    fn uri(input: &str) -> Uri {
        Uri::parse(input).unwrap()
    }

    #[test]
    fn test_defaults() {
        let request = Request::default();

        assert_eq!(request.method(), "GET");
        assert_eq!(request.request_target(), "/");
        assert!(request.uri().is_none());
        assert!(request.headers().is_empty());
        assert!(matches!(request.body().unwrap_err(), MessageError::Runtime { source: RuntimeFailure::MissingBody }));
    }

    #[test]
    fn test_request_target() {
        let request = Request::new("GET", Some(uri("/foo/bar?a=b"))).unwrap();
        assert_eq!(request.request_target(), "/foo/bar?a=b");

        let empty = Request::new("GET", Some(Uri::default())).unwrap();
        assert_eq!(empty.request_target(), "/");

        let explicit = request.with_request_target("*").unwrap();
        assert_eq!(explicit.request_target(), "*");
        assert_eq!(request.request_target(), "/foo/bar?a=b");
    }

    #[test]
    fn test_invalid_request_target() {
        let request = Request::default();

        for target in ["", "/foo bar", "/foo\tbar", "/foo\r\n"] {
            let err = request.with_request_target(target).unwrap_err();
            assert!(matches!(err, MessageError::InvalidArgument { source: InvalidArgument::RequestTarget(_) }), "{target:?}");
        }
    }

    #[test]
    fn test_with_method() {
        let request = Request::default();

        let post = request.with_method("post").unwrap();
        assert_eq!(post.method(), "post");
        assert_eq!(request.method(), "GET");

        let err = request.with_method("geet").unwrap_err();
        assert!(matches!(err, MessageError::InvalidArgument { source: InvalidArgument::Method(_) }));
        assert!(Request::new("geet", None).is_err());
    }

    #[test]
    fn test_construction_sets_host() {
        let request = Request::new("GET", Some(uri("https://Example.com/a"))).unwrap();
        assert_eq!(request.header("host"), ["example.com"]);

        let with_port = Request::new("GET", Some(uri("http://example.com:8080"))).unwrap();
        assert_eq!(with_port.header_line("Host"), "example.com:8080");

        let relative = Request::new("GET", Some(uri("/a"))).unwrap();
        assert!(!relative.has_header("host"));
    }

    #[test]
    fn test_with_uri_replaces_host() {
        let request = Request::new("GET", Some(uri("http://foo.com/a"))).unwrap();
        let derived = request.with_uri(uri("http://bar.com:81/b"), false).unwrap();

        assert_eq!(derived.header("host"), ["bar.com:81"]);
        assert_eq!(derived.uri().unwrap().path(), "/b");
        assert_eq!(request.header("host"), ["foo.com"]);
        assert_eq!(request.uri().unwrap().path(), "/a");
    }

    #[test]
    fn test_with_uri_preserves_host() {
        let request = Request::new("GET", Some(uri("http://foo.com/a"))).unwrap();
        let preserved = request.with_uri(uri("http://bar.com/b"), true).unwrap();
        assert_eq!(preserved.header("host"), ["foo.com"]);

        let blank = Request::default().with_header("Host", "").unwrap();
        let filled = blank.with_uri(uri("http://bar.com/b"), true).unwrap();
        assert_eq!(filled.header("host"), ["bar.com"]);
    }

    #[test]
    fn test_with_uri_without_host_keeps_header() {
        let request = Request::new("GET", Some(uri("http://foo.com/a"))).unwrap();
        let derived = request.with_uri(uri("/b"), false).unwrap();

        assert_eq!(derived.header("host"), ["foo.com"]);
    }

    #[test]
    fn test_message_operations_keep_request_state() {
        let request = Request::new("PUT", Some(uri("http://foo.com/a"))).unwrap();
        let derived = request.with_header("x-foo", "bar").unwrap().with_protocol_version("2").unwrap();

        assert_eq!(derived.method(), "PUT");
        assert_eq!(derived.protocol_version(), "2");
        assert_eq!(derived.header("x-foo"), ["bar"]);
        assert!(!request.has_header("x-foo"));
    }

    #[test]
    fn test_from_environment() {
        let env = Environment::new()
            .with_server_protocol("HTTP/1.0")
            .with_request_method("post")
            .with_request_uri("http://example.com/submit?x=1")
            .with_header_line("Host: proxy.example.com")
            .with_header_line("Content-Type: text/plain");
        let request = Request::from_environment(&env).unwrap();

        assert_eq!(request.method(), "post");
        assert_eq!(request.protocol_version(), "1.0");
        assert_eq!(request.header("host"), ["proxy.example.com"]);
        assert_eq!(request.request_target(), "http://example.com/submit?x=1");

        let defaulted = Request::from_environment(&Environment::new()).unwrap();
        assert_eq!(defaulted.method(), "GET");
        assert_eq!(defaulted.request_target(), "/");
    }

    #[test]
    fn test_from_environment_rejects_method() {
        let env = Environment::new().with_request_method("geet");

        assert!(Request::from_environment(&env).unwrap_err().is_invalid_argument());
    }
}
