//! IRC message prefix (source) handling.

/// Identity portion of a prefix: everything before the first `!`.
///
/// This is the single place that decides who a line came from; it is used for
/// self-detection on JOIN/PART/NICK and as the sender of PRIVMSG.
#[inline]
pub fn extract_identity(prefix: &str) -> &str {
    prefix.split('!').next().unwrap_or(prefix)
}
