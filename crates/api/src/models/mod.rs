pub mod metadata;
pub mod security;
pub mod symbol;

pub use metadata::*;
pub use security::*;
pub use symbol::*;
