//! Internal helpers shared by the codec and protocol modules.

/// Returns early with `Err($error.into())` when `$predicate` does not hold.
///
/// Validation in this crate never panics: every rejected input is surfaced to
/// the caller as a [`MessageError`](crate::protocol::MessageError), and this
/// macro keeps those checks on a single line.
///
/// ```ignore
/// ensure!(code <= 599, InvalidArgument::status_code(code));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error.into());
        }
    };
}

pub(crate) use ensure;

/// ASCII whitespace or control character, forbidden in hosts and request targets.
#[inline]
pub(crate) fn is_blank_or_control(byte: u8) -> bool {
    byte.is_ascii_whitespace() || byte.is_ascii_control()
}
