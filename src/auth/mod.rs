//! Authentication primitives: password hashing, token codec, bearer extraction

pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{Claims, TokenCodec};
pub use middleware::{auth_middleware, extract_token, Principal};
pub use password::PasswordHasher;
