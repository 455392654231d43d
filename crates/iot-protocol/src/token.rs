//! Client tokens for request/response correlation.

use uuid::Uuid;

/// Generate a fresh client token.
///
/// UUIDv7 keeps tokens unique and time-sortable, which makes them easy to
/// follow in logs. AWS IoT caps tokens at 64 bytes; a hyphenated UUID is 36.
pub fn new_client_token() -> String {
    Uuid::now_v7().to_string()
}
