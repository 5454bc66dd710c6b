//! `cluster-transport` command-line tool.
//!
//! Sends one request through the transport and prints the response, which is
//! handy for checking timeouts and retry behavior against a live endpoint.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use cluster_transport::config::{load_config, validation::validate_config};
use cluster_transport::observability::logging::init_logging;
use cluster_transport::{
    HttpTransport, Request, Response, Transport, TransportConfig, TransportWithTracing,
};

#[derive(Parser)]
#[command(name = "cluster-transport")]
#[command(about = "Send one HTTP request through the resilient transport", long_about = None)]
struct Cli {
    /// Absolute http:// URL of the endpoint.
    url: String,

    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Extra request header, repeatable.
    #[arg(short = 'H', long = "header", value_name = "NAME:VALUE")]
    headers: Vec<String>,

    /// Request content.
    #[arg(short, long)]
    data: Option<String>,

    /// Overall timeout; defaults to `connection.default_timeout_ms`.
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Connection attempts; overrides `connection.connection_attempts`.
    #[arg(short, long)]
    attempts: Option<u32>,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print a JSON summary instead of the raw response.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Summary {
    code: u16,
    version: Option<String>,
    headers: BTreeMap<String, String>,
    content_type: Option<String>,
    content_length: usize,
    body: Option<String>,
}

impl From<&Response> for Summary {
    fn from(response: &Response) -> Self {
        Self {
            code: response.code().as_u16(),
            version: response.version().map(|v| format!("{:?}", v)),
            headers: response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect(),
            content_type: response.content().map(|c| c.content_type().to_string()),
            content_length: response.content_length(),
            body: response.content().map(|c| c.text()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => TransportConfig::default(),
    };
    if let Some(attempts) = cli.attempts {
        config.connection.connection_attempts = attempts;
    }
    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            eprintln!("invalid configuration: {}", error);
        }
        return Ok(ExitCode::FAILURE);
    }

    init_logging(&config.observability);

    let request = build_request(&cli)?;
    let timeout = cli
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.connection.default_timeout());

    tracing::info!(
        url = %request.url(),
        method = %request.method(),
        timeout_ms = timeout.as_millis() as u64,
        attempts = config.connection.connection_attempts,
        "Sending request"
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let transport = TransportWithTracing::new(HttpTransport::new(config));
    let response = transport.send(&request, timeout, &cancel).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&Summary::from(&response))?);
    } else {
        print_response(&response);
    }

    Ok(if response.code().is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn build_request(cli: &Cli) -> Result<Request, Box<dyn std::error::Error>> {
    let method = http::Method::from_bytes(cli.method.to_ascii_uppercase().as_bytes())?;
    let mut request = Request::parse(method, &cli.url)?;

    for header in &cli.headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| format!("header must be NAME:VALUE, got '{}'", header))?;
        request = request.with_header(name.trim(), value.trim())?;
    }
    if let Some(data) = &cli.data {
        request = request.with_content(data.clone().into_bytes());
    }
    Ok(request)
}

fn print_response(response: &Response) {
    println!("{}", response.code());
    for (name, value) in response.headers() {
        println!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
    }
    if let Some(content) = response.content() {
        println!();
        println!("{}", content.text());
    }
}
