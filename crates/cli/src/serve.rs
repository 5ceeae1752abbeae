use anyhow::Context;
use symserve_core::ServerConfig;
use tracing::info;

pub fn run(config: ServerConfig) -> anyhow::Result<()> {
    let service = symserve_runtime::build_default_service(&config)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(config.listen.as_str())
            .await
            .with_context(|| format!("cannot listen on {}", config.listen))?;
        info!("Serving symbols from {}", config.data_dir.display());
        symserve_http::run_http_server(listener, service, symserve_http::shutdown_signal()).await?;
        Ok::<_, anyhow::Error>(())
    })
}
