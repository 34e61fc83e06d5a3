//! Authentication system
//!
//! Credential parsing and the pluggable authentication gate.

pub mod credentials;
pub mod validator;

pub use credentials::Credentials;
pub use validator::{AllowAllAuthenticator, Authenticator, StaticAuthenticator, build_authenticator};
