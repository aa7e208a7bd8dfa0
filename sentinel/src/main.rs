use clap::Parser;
use sentinel::{Application, Config, telemetry};

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before anything else that might build a TLS client
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let args = sentinel::config::Args::parse();
    let config = Config::load(&args)?;

    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    telemetry::init_telemetry(config.enable_otel_export)?;
    tracing::debug!("{:?}", args);

    let app = Application::new(config).await;

    if args.once {
        let result = app.runner().run().await;
        telemetry::shutdown_telemetry();
        println!("{}", serde_json::to_string_pretty(&result?)?);
        return Ok(());
    }

    #[cfg(feature = "lambda")]
    {
        if std::env::var_os("AWS_LAMBDA_RUNTIME_API").is_some() {
            return app.run_lambda().await;
        }
    }

    app.serve(shutdown_signal()).await
}
