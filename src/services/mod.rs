//! Business logic services.

pub mod account;
pub mod google;
pub mod token;

pub use account::{AccountProvisioner, AuthenticatedIdentity, OidcAssertion};
pub use google::{GoogleOAuthClient, IdTokenVerifier};
pub use token::TokenService;
