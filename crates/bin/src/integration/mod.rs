//! Process-level setup for the command-line binary: logging and the
//! default database location.

pub(crate) mod database;
pub(crate) mod logging;
