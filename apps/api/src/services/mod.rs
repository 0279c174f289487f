//! Business logic services for musebot
//!
//! - `auth`: token issue, verification and revocation
//! - `authenticator`: username/password backends

pub mod auth;
pub mod authenticator;

pub use auth::{AuthConfig, AuthService};
pub use authenticator::{
    build_authenticator, hash_password, Authenticator, AuthenticatorFactory,
    ConfigFileAuthenticator, UserEntry, AUTHENTICATOR_FACTORIES,
};
