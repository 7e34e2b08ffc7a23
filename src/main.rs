use rawhttp::config::Config;
use rawhttp::routes::Routes;
use rawhttp::server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;

    let server = Server::new(cfg.listen_addr.clone(), Routes::new(&cfg.sample_dir));
    server.serve().await?;

    tracing::info!("Server stopped");
    Ok(())
}
