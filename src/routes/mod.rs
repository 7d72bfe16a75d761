/**
 * Routes Module
 * HTTP handlers; business rules live in `services`
 */

pub mod auth;
pub mod health;
pub mod portfolios;
pub mod public;
pub mod templates;
pub mod upload;
