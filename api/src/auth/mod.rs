//! Authentication: password hashing, bearer tokens, and the request middleware

pub mod middleware;
pub mod password;
pub mod token;

pub use middleware::auth_middleware;
pub use password::{hash_password, verify_password};
pub use token::{create_token, decode_token, Claims};
