//! Reconstruction of the canonical string form of a [`Uri`].
//!
//! The output is always accepted by [`decode_uri`](super::decode_uri) and
//! decodes back into the same components:
//!
//! - a scheme is written as `scheme://`, even when the authority is empty,
//!   since the decoder only recognizes that form
//! - without a scheme the authority is written bare, the way it is read
//! - a rootless path following an authority is prefixed with `/`
//! - `?query` and `#fragment` are written only when non-empty

use std::fmt;

use crate::protocol::Uri;

/// Writes the string form of `uri` into `dst`.
pub fn encode_uri<W: fmt::Write>(uri: &Uri, dst: &mut W) -> fmt::Result {
    if !uri.scheme().is_empty() {
        dst.write_str(uri.scheme())?;
        dst.write_str("://")?;
    }

    let has_authority = encode_authority(uri, dst)?;

    let path = uri.path();
    if has_authority && !path.is_empty() && !path.starts_with('/') {
        dst.write_char('/')?;
    }
    dst.write_str(path)?;

    if !uri.query().is_empty() {
        dst.write_char('?')?;
        dst.write_str(uri.query())?;
    }

    if !uri.fragment().is_empty() {
        dst.write_char('#')?;
        dst.write_str(uri.fragment())?;
    }

    Ok(())
}

/// Writes `[user-info@]host[:port]`, returning whether anything was written.
pub fn encode_authority<W: fmt::Write>(uri: &Uri, dst: &mut W) -> Result<bool, fmt::Error> {
    let mut written = false;

    if !uri.user().is_empty() {
        dst.write_str(uri.user())?;
        if !uri.password().is_empty() {
            dst.write_char(':')?;
            dst.write_str(uri.password())?;
        }
        dst.write_char('@')?;
        written = true;
    }

    if !uri.host().is_empty() {
        dst.write_str(uri.host())?;
        written = true;
    }

    if let Some(port) = uri.port() {
        write!(dst, ":{port}")?;
        written = true;
    }

    Ok(written)
}
