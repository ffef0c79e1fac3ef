use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use opentelemetry::trace::TracerProvider as _;

use ab_bridge::cli::{AssistantCommand, Cli, Command, ConfigCommand, LogSetup, ThreadsCommand};
use ab_domain::config::{LogFormat, ObservabilityConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Relay commands set up tracing once their config is loaded.
    if cli.command.log_setup() == LogSetup::Inspect {
        init_cli_tracing();
    }

    match cli.command {
        Command::Ask { message, channel, json } => {
            let (config, _) = ab_bridge::cli::load_config()?;
            let tracer_provider = init_tracing(&config.observability, "warn");
            let replied = ab_bridge::cli::ask::ask(Arc::new(config), message, channel, json).await;
            shutdown_tracing(tracer_provider);
            if !replied? {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Chat { channel } => {
            let (config, _) = ab_bridge::cli::load_config()?;
            let tracer_provider = init_tracing(&config.observability, "warn");
            let result = ab_bridge::cli::chat::chat(Arc::new(config), channel).await;
            shutdown_tracing(tracer_provider);
            result
        }
        Command::Threads(ThreadsCommand::List { json }) => {
            let (config, _) = ab_bridge::cli::load_config()?;
            ab_bridge::cli::threads::list(&config, json)
        }
        Command::Assistant(AssistantCommand::Ensure) => {
            let (config, _) = ab_bridge::cli::load_config()?;
            ab_bridge::cli::assistant::ensure(&config).await
        }
        Command::Config(ConfigCommand::Validate) => {
            let (config, config_path) = ab_bridge::cli::load_config()?;
            if !ab_bridge::cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => {
            let (config, _) = ab_bridge::cli::load_config()?;
            ab_bridge::cli::config::show(&config)
        }
        Command::Doctor => {
            let (config, config_path) = ab_bridge::cli::load_config()?;
            if !ab_bridge::cli::doctor::run(&config, &config_path).await? {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Version => {
            println!("assistant-bridge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Tracing for commands that relay messages.
///
/// Logs go to stderr, compact or JSON per `observability.log_format`, at
/// `default_level` unless `RUST_LOG` says otherwise. When `otlp_endpoint`
/// is set, spans are also exported over OTLP/gRPC; the returned provider
/// must be shut down on exit to flush them.
fn init_tracing(
    obs: &ObservabilityConfig,
    default_level: &str,
) -> Option<opentelemetry_sdk::trace::SdkTracerProvider> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = match obs.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let Some(endpoint) = &obs.otlp_endpoint else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
        return None;
    };

    use opentelemetry_otlp::WithExportConfig as _;
    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
    {
        Ok(e) => e,
        Err(e) => {
            eprintln!(
                "WARNING: failed to create OTLP exporter for {endpoint}: {e}; \
                 continuing without OpenTelemetry"
            );
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .init();
            return None;
        }
    };

    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(obs.service_name.clone())
        .build();

    let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(opentelemetry_sdk::trace::Sampler::TraceIdRatioBased(
            obs.sample_rate,
        ))
        .with_resource(resource)
        .build();

    let otel_layer =
        tracing_opentelemetry::layer().with_tracer(tracer_provider.tracer("assistant-bridge"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    Some(tracer_provider)
}

fn shutdown_tracing(provider: Option<opentelemetry_sdk::trace::SdkTracerProvider>) {
    if let Some(provider) = provider {
        if let Err(e) = provider.shutdown() {
            eprintln!("WARNING: OpenTelemetry shutdown failed: {e}");
        }
    }
}

/// Compact stderr-only tracing for inspection commands.
///
/// Defaults to `warn` so diagnostic output does not pollute stdout.
fn init_cli_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
