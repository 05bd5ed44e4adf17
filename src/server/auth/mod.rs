//! Staff authentication: password hashing, session tokens and the request extractor.

pub(crate) mod extractor;
pub(crate) mod password;
pub(crate) mod token;
