//! Router module index
//!
//! Routing is segregated by access level so the access-control layer for a
//! route is explicit at the module level rather than scattered per handler.

/// Routes open to anonymous clients: health, registration, login.
pub mod public;

/// Routes behind the `AuthUser` extractor middleware.
pub mod authenticated;

/// Routes restricted to the `admin` role.
pub mod admin;
