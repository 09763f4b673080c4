mod password;
pub use password::{hash_password, verify_password};
mod jwt;
pub use jwt::{UserClaims, generate_token, process_token};
mod permissions;
pub use permissions::{Permission, UserRole};
mod error;
pub use error::{CryptError, CryptResult};
