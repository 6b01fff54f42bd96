use std::fmt;
use std::str::FromStr;

use crate::ensure;
use crate::protocol::InvalidArgument;

const SUPPORTED: [http::Method; 8] = [
    http::Method::OPTIONS,
    http::Method::GET,
    http::Method::HEAD,
    http::Method::POST,
    http::Method::PUT,
    http::Method::DELETE,
    http::Method::TRACE,
    http::Method::CONNECT,
];

/// A request method from the fixed verb set, in the case the caller supplied.
///
/// `post` is accepted and reported back as `post`; comparisons with
/// [`http::Method`] go through [`Method::to_http`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Method(String);

impl Method {
    /// # Errors
    ///
    /// Returns [`InvalidArgument::Method`] if `method` is not one of
    /// `OPTIONS`, `GET`, `HEAD`, `POST`, `PUT`, `DELETE`, `TRACE`, `CONNECT`,
    /// compared case-insensitively.
    pub fn parse(method: &str) -> Result<Self, InvalidArgument> {
        let canonical = http::Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|_| InvalidArgument::method(method))?;
        ensure!(SUPPORTED.contains(&canonical), InvalidArgument::method(method));
        Ok(Self(method.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The uppercase `http::Method`.
    pub fn to_http(&self) -> http::Method {
        SUPPORTED.into_iter().find(|method| method.as_str().eq_ignore_ascii_case(&self.0)).unwrap_or_default()
    }
}

impl Default for Method {
    fn default() -> Self {
        Self(http::Method::GET.as_str().to_owned())
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Method {
    type Err = InvalidArgument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&http::Method> for Method {
    type Error = InvalidArgument;

    fn try_from(method: &http::Method) -> Result<Self, Self::Error> {
        Self::parse(method.as_str())
    }
}

impl PartialEq<str> for Method {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Method {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
