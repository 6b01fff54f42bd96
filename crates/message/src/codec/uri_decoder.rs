//! Grammar-driven decoder for URI references.
//!
//! The decoder consumes its input strictly left to right, one component at a
//! time, and decides which component comes next by looking at the single
//! delimiter that ends the current one:
//!
//! ```text
//! [scheme://][user[:password]@]host[:port][/path][?query][#fragment]
//! ```
//!
//! A scheme is only recognized in its `scheme://` form. Without it the
//! authority starts at the first byte of the input, so `google.com?q=1` has a
//! host and a query, while `/foo/bar` has an empty authority and a path.
//! Because every component is delimited by the first occurrence of its
//! terminator, a host directly followed by `?` or `#` never leaks into the
//! path, and the decoded components always survive a round trip through
//! [`encode_uri`](super::encode_uri).

use tracing::trace;
use DecodeState::*;

use crate::protocol::{InvalidArgument, UriParts};

/// Position of the decoder within the URI grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Look for a leading `scheme://`
    Scheme,
    /// Read up to the first `/`, `?` or `#`
    Authority,
    /// Read from `/` up to the first `?` or `#`
    Path,
    /// Read after `?` up to the first `#`
    Query,
    /// Everything after `#`
    Fragment,
    /// Input fully consumed
    Done,
}

/// Splits `input` into its raw components.
///
/// The returned parts are not normalized yet; [`Uri::from_parts`](crate::protocol::Uri::from_parts)
/// lowercases and validates them.
///
/// # Errors
///
/// Returns [`InvalidArgument`] if the port is not numeric or an IP literal
/// host is not terminated by `]`.
pub fn decode_uri(input: &str) -> Result<UriParts, InvalidArgument> {
    let mut parts = UriParts::default();
    let mut rest = input;
    let mut state = Scheme;

    loop {
        state = match state {
            Scheme => {
                if let Some((scheme, tail)) = split_scheme(rest) {
                    trace!(scheme, "decoded uri scheme");
                    parts.scheme = scheme.to_owned();
                    rest = tail;
                }
                Authority
            }
            Authority => {
                let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
                decode_authority(&rest[..end], &mut parts)?;
                rest = &rest[end..];
                lookahead(rest)
            }
            Path => {
                let end = rest.find(['?', '#']).unwrap_or(rest.len());
                parts.path = rest[..end].to_owned();
                rest = &rest[end..];
                lookahead(rest)
            }
            Query => {
                // skip the leading '?'
                let tail = &rest[1..];
                let end = tail.find('#').unwrap_or(tail.len());
                parts.query = tail[..end].to_owned();
                rest = &tail[end..];
                lookahead(rest)
            }
            Fragment => {
                // skip the leading '#', the fragment runs to the end of input
                parts.fragment = rest[1..].to_owned();
                Done
            }
            Done => break,
        };
    }

    trace!(input, ?parts, "decoded uri");
    Ok(parts)
}

/// Chooses the next state from the delimiter at the head of `rest`.
#[inline]
fn lookahead(rest: &str) -> DecodeState {
    match rest.as_bytes().first() {
        Some(b'/') => Path,
        Some(b'?') => Query,
        Some(b'#') => Fragment,
        // the previous component stops only at one of the delimiters above
        _ => Done,
    }
}

/// Returns the scheme and the remaining input if `input` starts with `scheme://`.
fn split_scheme(input: &str) -> Option<(&str, &str)> {
    let (scheme, tail) = input.split_once("://")?;
    is_valid_scheme(scheme).then_some((scheme, tail))
}

/// `scheme = ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`, see RFC 3986 section 3.1.
pub(crate) fn is_valid_scheme(scheme: &str) -> bool {
    match scheme.as_bytes() {
        [first, rest @ ..] => {
            first.is_ascii_alphabetic() && rest.iter().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'))
        }
        [] => false,
    }
}

/// Decodes `[user[:password]@]host[:port]` into `parts`.
fn decode_authority(authority: &str, parts: &mut UriParts) -> Result<(), InvalidArgument> {
    if authority.is_empty() {
        return Ok(());
    }

    // the host never contains '@', so the last one ends the user info
    let host_port = match authority.rsplit_once('@') {
        Some((user_info, host_port)) => {
            match user_info.split_once(':') {
                Some((user, password)) => {
                    parts.user = user.to_owned();
                    parts.password = password.to_owned();
                }
                None => parts.user = user_info.to_owned(),
            }
            host_port
        }
        None => authority,
    };

    let (host, port) = split_host_port(host_port)?;
    parts.host = host.to_owned();
    parts.port = decode_port(port)?;
    Ok(())
}

/// Splits `host[:port]`, keeping an IP literal such as `[::1]` intact.
fn split_host_port(host_port: &str) -> Result<(&str, &str), InvalidArgument> {
    if host_port.starts_with('[') {
        let end = host_port.find(']').ok_or_else(|| InvalidArgument::uri(format!("unterminated ip literal in {host_port:?}")))?;
        let (host, tail) = host_port.split_at(end + 1);
        return match tail.strip_prefix(':') {
            Some(port) => Ok((host, port)),
            None if tail.is_empty() => Ok((host, "")),
            None => Err(InvalidArgument::uri(format!("unexpected {tail:?} after ip literal"))),
        };
    }

    Ok(host_port.rsplit_once(':').unwrap_or((host_port, "")))
}

/// An empty port (`host:`) is the same as no port at all.
fn decode_port(port: &str) -> Result<Option<u32>, InvalidArgument> {
    if port.is_empty() {
        return Ok(None);
    }

    if !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InvalidArgument::port(port));
    }

    port.parse::<u32>().map(Some).map_err(|_| InvalidArgument::port(port))
}
