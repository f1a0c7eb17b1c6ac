use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use chef::{OpenAiModel, PromptService};
use chef_server::routes::{router, AppState};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    /// The address and optionally port to bind to
    #[clap(long, default_value = "0.0.0.0:3000")]
    address: String,

    /// PEM certificate chain. Serves HTTPS when given together with --tls-key
    #[clap(long, requires = "tls_key")]
    tls_cert: Option<PathBuf>,

    /// PEM private key for --tls-cert
    #[clap(long, requires = "tls_cert")]
    tls_key: Option<PathBuf>,

    /// Where to write the rolling access log (defaults to the working directory)
    #[clap(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    // Parse command line arguments
    let args = Args::parse();

    // initialize tracing
    let log_dir = match args.log_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let file_appender = tracing_appender::rolling::daily(log_dir, "access.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .json()
        .with_writer(non_blocking)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // connect the model and load the prompt templates
    let model = OpenAiModel::from_env().context("Configuring the model client")?;
    let prompts = PromptService::new(Arc::new(model)).context("Loading prompt templates")?;

    let app = router(AppState {
        prompts: Arc::new(prompts),
    });

    match (args.tls_cert, args.tls_key) {
        (Some(cert_path), Some(key_path)) => {
            rustls::crypto::ring::default_provider()
                .install_default()
                .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;
            let tls_config =
                axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path)
                    .await
                    .context("Loading TLS certificate")?;

            let addr = args.address.parse()?;
            tracing::info!("Listening on {} (TLS)", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await
                .context("Starting TLS server")?;
        }
        _ => {
            let listener = tokio::net::TcpListener::bind(&args.address).await?;
            tracing::info!("Listening on {}", args.address);
            axum::serve(listener, app).await?;
        }
    }
    Ok(())
}
