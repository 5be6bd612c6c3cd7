//! Domain models for the server.

pub mod user;

pub use user::{NewUser, User};
