use betaoffice::{
    Application, Config,
    config::{Args, EmailTransportConfig, PaymentConfig},
    telemetry,
};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};

/// Resolves on Ctrl+C or SIGTERM, whichever comes first.
///
/// A handler that cannot be installed never fires, so the process still stops on the other one.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Ctrl+C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("SIGTERM handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
        _ = ctrl_c => "Ctrl+C",
        _ = terminate => "SIGTERM",
    };
    info!(signal = received, "Stopping onboarding service");
}

/// One-line-per-integration summary printed by `--validate`.
fn describe(config: &Config) -> String {
    let payments = match &config.payment {
        Some(PaymentConfig::Stripe(_)) => "stripe",
        Some(PaymentConfig::Dummy(_)) => "dummy (unsigned events)",
        None => "disabled",
    };
    let email = match &config.email.transport {
        EmailTransportConfig::Smtp { host, .. } => format!("smtp via {host}"),
        EmailTransportConfig::File { path } => format!("files in {path}"),
    };

    format!(
        "partner:  {}\npayments: {}\nemail:    {}\npublic:   {}",
        config.partner.base_url, payments, email, config.public_url
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Must run before the partner, Stripe or SMTP clients build a TLS config
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let args = Args::parse();
    let config = Config::load(&args)?;

    if args.validate {
        println!("Configuration is valid.\n{}", describe(&config));
        return Ok(());
    }

    telemetry::init_telemetry(config.enable_otel_export)?;
    info!(config = %args.config, "Loaded configuration");

    Application::new(config).await?.serve(shutdown_signal()).await
}
