//! Auth-domain identifiers, roles, secrets, password hashing, and the two persisted records.

pub mod account;
pub mod code;
pub mod id;
pub mod password;
pub mod role;
pub mod secret;

pub use account::*;
pub use code::*;
pub use id::*;
pub use password::*;
pub use role::*;
pub use secret::*;
