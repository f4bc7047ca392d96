//! Configuration modules for the Slateboard API.
//!
//! Each submodule handles one aspect of configuration, loaded from
//! environment variables with development defaults.
//!
//! - [`cors`]: allowed CORS origins
//! - [`database`]: PostgreSQL connection pool initialization
//! - [`email`]: SMTP configuration for account-activation mail
//! - [`jwt`]: token signing secret, TTLs, issuer and bearer prefix

pub mod cors;
pub mod database;
pub mod email;
pub mod jwt;
