//! Decoder for the raw `Name: value` header lines supplied by a hosting
//! environment.
//!
//! The lines are joined into a header block and handed to `httparse`, so the
//! same token and field-value rules apply as for headers read off the wire.

use httparse::{EMPTY_HEADER, Status};
use tracing::{trace, warn};

use crate::protocol::InvalidArgument;

/// Decodes header lines into `(name, value)` pairs, preserving their order.
///
/// Leading whitespace of the value is dropped; an empty value is kept.
///
/// # Errors
///
/// Returns [`InvalidArgument::HeaderLine`] if any line is not a valid header
/// field, or a line contains an embedded line break.
pub fn decode_header_lines<I, S>(lines: I) -> Result<Vec<(String, String)>, InvalidArgument>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut block = String::new();
    let mut count = 0;
    for line in lines {
        let line = line.as_ref();
        if line.contains(['\r', '\n']) {
            warn!(line, "rejected header line with embedded line break");
            return Err(InvalidArgument::header_line(format!("line break in {line:?}")));
        }
        block.push_str(line);
        block.push_str("\r\n");
        count += 1;
    }

    if count == 0 {
        return Ok(Vec::new());
    }
    block.push_str("\r\n");

    let mut headers = vec![EMPTY_HEADER; count];
    let parsed = httparse::parse_headers(block.as_bytes(), &mut headers).map_err(|e| {
        warn!(cause = %e, "rejected environment header lines");
        InvalidArgument::header_line(e)
    })?;

    let Status::Complete((_, headers)) = parsed else {
        // the block always ends with an empty line
        return Err(InvalidArgument::header_line("incomplete header block"));
    };

    let decoded = headers
        .iter()
        .map(|header| {
            let value = std::str::from_utf8(header.value)
                .map_err(|_| InvalidArgument::header_value(header.name, String::from_utf8_lossy(header.value)))?;
            Ok((header.name.to_owned(), value.to_owned()))
        })
        .collect::<Result<Vec<_>, InvalidArgument>>()?;

    trace!(count = decoded.len(), "decoded header lines");
    Ok(decoded)
}
