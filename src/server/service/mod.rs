//! Business rules shared by the HTTP handlers. Every function takes the store
//! as `&dyn Store` and the current time as an argument.

pub(crate) mod auth;
pub(crate) mod billing;
pub(crate) mod orders;
pub(crate) mod reports;
