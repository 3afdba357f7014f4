//! Authentication and authorization.
//!
//! - [`JwtValidator`] turns `Authorization: Bearer <jwt>` tokens into subjects.
//! - [`PolicyAuthorizer`] decides what a subject may do with a request path.

mod jwt;
mod policy;

pub use jwt::*;
pub use policy::*;
