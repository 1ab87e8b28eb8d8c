//! Anonymous identity generation.

use uuid::Uuid;

/// Creates a fresh key for a user that did not bring one.
///
/// Keys are random v4 UUIDs, so two calls never return the same value in
/// practice. Nothing is stored: the key lives only as long as the
/// configuration that carries it.
pub fn create_anonymous_user_key() -> String {
    Uuid::new_v4().to_string()
}
