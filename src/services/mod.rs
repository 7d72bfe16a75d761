//! Application services: the operations the HTTP layer exposes, written
//! against the store traits so they run the same on Postgres and in memory.

pub mod portfolios;
pub mod templates;
