use std::sync::Arc;
use symserve_core::auth::{BasicAuthorizer, UserDirectory};
use symserve_core::storage::{FsBuildRegistry, JsonlMetadataIndex};
use symserve_core::{ServerConfig, SymbolResolver, SymbolService};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// Assembles the symbol service over the filesystem backends named by `config`.
///
/// A missing users file yields an empty directory with no guest, so every
/// download is denied until accounts are configured.
pub fn build_default_service(config: &ServerConfig) -> symserve_core::Result<Arc<SymbolService>> {
    config.validate()?;

    let users_file = config.users_file();
    let directory = if users_file.exists() {
        UserDirectory::load(&users_file)?
    } else {
        warn!(
            "Users file {} not found, all symbol downloads will be denied",
            users_file.display()
        );
        UserDirectory::default()
    };

    let resolver = build_default_resolver(config);
    let authorizer = BasicAuthorizer::new(directory, &config.realm);
    Ok(Arc::new(
        SymbolService::new(resolver, Arc::new(authorizer)).with_buffer_size(config.chunk_size),
    ))
}

/// Resolver over the configured index file and builds directory.
pub fn build_default_resolver(config: &ServerConfig) -> SymbolResolver {
    let index = JsonlMetadataIndex::new(config.index_file());
    let builds = FsBuildRegistry::new(config.builds_dir());
    info!(
        index = %index.path().display(),
        builds = %builds.root().display(),
        prefix = %config.app_prefix,
        "Symbol storage configured"
    );
    SymbolResolver::new(Arc::new(index), Arc::new(builds), config.app_prefix.as_str())
}

/// Initializes logging for a component under the configured log directory.
pub fn init_logging(config: &ServerConfig, component: &str, to_stderr: bool) -> WorkerGuard {
    symserve_core::logging::init_logging(&config.log_dir(), component, to_stderr)
}
