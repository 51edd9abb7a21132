//! Jornada — persistent session storage.
//!
//! A key/value table of JSON blobs, the server-side stand-in for browser
//! local storage.

pub mod schema;
pub mod sqlite_session_store;
