pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod memory;
pub mod resolver;
pub mod response;
pub mod router;
pub mod storage;

pub use config::ServerConfig;
pub use error::{Result, SymbolServerError};
pub use resolver::{MissReason, Resolution, ResolvedArtifact, SymbolResolver};
pub use response::{BufferedResponse, PlainResponse, ResponseSink};
pub use router::SymbolService;
