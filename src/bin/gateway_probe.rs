//! gateway-probe: 向上游补全服务发送一次探测请求并打印统计与指标
//!
//! Usage:
//!   gateway-probe [--config <yaml>] [--image <path>] [--metrics] <query...>

use anyhow::{bail, Context};
use completion_gateway::client::encode_image;
use completion_gateway::{GatewayClientBuilder, GatewayConfig, Message};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

struct Args {
    config: Option<PathBuf>,
    image: Option<PathBuf>,
    metrics: bool,
    query: String,
}

fn print_usage() {
    println!(
        r#"gateway-probe: completion gateway probe

USAGE:
    gateway-probe [OPTIONS] <QUERY>...

OPTIONS:
    --config <path>     Load gateway settings from a YAML file (environment still applies)
    --image <path>      Send a vision request with this image
    --metrics           Print the Prometheus exposition after the call
    -h, --help          Show this help message

ENVIRONMENT:
    CEREBRAS_API_URL    Chat-completion endpoint
    CEREBRAS_API_KEY    Upstream credential
    RUST_LOG            Log filter (default: info)"#
    );
}

fn parse_args() -> anyhow::Result<Option<Args>> {
    let mut args = Args {
        config: None,
        image: None,
        metrics: false,
        query: String::new(),
    };
    let mut words = Vec::new();
    let mut iter = std::env::args().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                args.config = Some(iter.next().context("--config needs a path")?.into());
            }
            "--image" => {
                args.image = Some(iter.next().context("--image needs a path")?.into());
            }
            "--metrics" => args.metrics = true,
            "help" | "--help" | "-h" => return Ok(None),
            other if other.starts_with("--") => bail!("unknown option: {other}"),
            _ => words.push(arg),
        }
    }

    if words.is_empty() {
        bail!("missing query");
    }
    args.query = words.join(" ");
    Ok(Some(args))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(e) => {
            eprintln!("{e}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    let mut config = match &args.config {
        Some(path) => GatewayConfig::from_yaml_file(path)?,
        None => GatewayConfig::default(),
    };
    config.apply_env();

    let gateway = GatewayClientBuilder::from_config(config).build()?;
    let context = [Message::system(
        "Eres un asistente para gestión de proyectos de construcción. Responde en español.",
    )];

    let outcome = match &args.image {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("cannot read image {}", path.display()))?;
            let image = encode_image(&bytes)?;
            gateway.generate_vision(&args.query, &image, &context).await
        }
        None => gateway.generate_text(&args.query, None, &context).await,
    };

    match outcome {
        Ok(answer) => println!("{answer}"),
        Err(e) => eprintln!("error ({}): {e}", e.failure_kind()),
    }

    println!("{}", serde_json::to_string_pretty(&gateway.stats())?);
    println!("api_status: {}", gateway.api_status());

    if args.metrics {
        print!("{}", gateway.metrics().render()?);
    }
    Ok(())
}
