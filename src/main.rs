//! rest-gateway - perform one REST invocation from the command line.
//!
//! Loads a gateway config, builds an exchange from the arguments, invokes the
//! producer and prints the status headers and body of the out message.

use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;

use rest_gateway::config::loader::load_config;
use rest_gateway::headers::names;
use rest_gateway::observability::logging::init_logging;
use rest_gateway::{Body, Exchange, GatewayConfig, Message, ProducerError, RestProducer};

#[derive(Parser)]
#[command(name = "rest-gateway")]
#[command(about = "Invoke a REST service through the gateway producer", long_about = None)]
struct Cli {
    /// Gateway config file (TOML). Built-in defaults are used when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP method (HTTP mode).
    #[arg(short, long, conflicts_with = "operation")]
    method: Option<String>,

    /// Relative path appended to the address (HTTP mode).
    #[arg(short, long, requires = "method")]
    path: Option<String>,

    /// Operation name of the configured resource (proxy mode).
    #[arg(short, long)]
    operation: Option<String>,

    /// Message header as name=value; repeatable.
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Message body; parsed as JSON when possible, otherwise sent as text.
    #[arg(short, long)]
    body: Option<String>,

    /// Override the configured target address for this call.
    #[arg(short, long)]
    address: Option<String>,

    /// Deliver non-2xx responses instead of failing.
    #[arg(long)]
    no_throw: bool,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected name=value but was '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    init_logging(&config.observability);

    let producer = RestProducer::new(config)?;
    producer.start();

    let mut exchange = Exchange::new(build_message(&cli));
    let result = producer.invoke(&mut exchange).await;
    producer.stop();

    match result {
        Ok(()) => {
            if let Some(out) = exchange.out_message() {
                print_message(out);
            }
            Ok(())
        }
        Err(ProducerError::Operation(failure)) => {
            eprintln!("Error: {}", failure);
            if let Some(body) = failure.response_body() {
                eprintln!("{}", body);
            }
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn build_message(cli: &Cli) -> Message {
    let mut message = Message::new();
    for (name, value) in &cli.headers {
        message.headers.insert(name.clone(), value.clone());
    }

    match (&cli.operation, &cli.method) {
        (Some(operation), _) => {
            message.headers.insert(names::USING_HTTP_API, false);
            message.headers.insert(names::OPERATION_NAME, operation.clone());
        }
        (None, Some(method)) => {
            message.headers.insert(names::USING_HTTP_API, true);
            message.headers.insert(names::HTTP_METHOD, method.clone());
            if let Some(path) = &cli.path {
                message.headers.insert(names::HTTP_PATH, path.clone());
            }
        }
        (None, None) => {}
    }

    if let Some(address) = &cli.address {
        message.headers.insert(names::DESTINATION_OVERRIDE_URL, address.clone());
    }
    if cli.no_throw {
        message.headers.insert(names::THROW_EXCEPTION_ON_FAILURE, false);
    }

    if let Some(raw) = &cli.body {
        message.body = match serde_json::from_str::<Value>(raw) {
            Ok(json) => Body::Json(json),
            Err(_) => Body::Text(raw.clone()),
        };
    }
    message
}

fn print_message(message: &Message) {
    let status = message.headers.get_string(names::HTTP_RESPONSE_CODE).unwrap_or_default();
    let text = message.headers.get_string(names::HTTP_RESPONSE_TEXT).unwrap_or_default();
    println!("{} {}", status, text);

    match &message.body {
        Body::Empty => {}
        Body::Text(s) => println!("{}", s),
        Body::Json(v) => match serde_json::to_string_pretty(v) {
            Ok(pretty) => println!("{}", pretty),
            Err(_) => println!("{}", v),
        },
        Body::Bytes(b) => println!("{}", String::from_utf8_lossy(b)),
        Body::Response(envelope) => println!("{}", envelope.text_lossy()),
    }
}
