//! Pure expiry check for the stored access token.

use chrono::{DateTime, Duration, Utc};

/// Safety buffer so an in-flight HTTP call never races token expiry.
pub fn expiry_buffer() -> Duration {
    Duration::minutes(5)
}

/// Whether a token with the given expiry is still usable at `now`.
///
/// Defined as `now + buffer < expires_at`. An absent expiry is treated as
/// already expired (fail-closed). Performs no I/O.
pub fn is_usable(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>, buffer: Duration) -> bool {
    match expires_at {
        Some(expires_at) => now + buffer < expires_at,
        None => false,
    }
}
