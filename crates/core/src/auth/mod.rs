//! Authorization backends.

mod basic;
mod users;

pub use basic::BasicAuthorizer;
pub use users::{GuestAccount, UserAccount, UserDirectory, hash_password};
