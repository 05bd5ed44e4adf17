pub(crate) mod auth;
pub(crate) mod bills;
pub(crate) mod categories;
pub(crate) mod error;
pub(crate) mod items;
pub(crate) mod orders;
pub(crate) mod reports;
pub(crate) mod tables;
pub(crate) mod users;
