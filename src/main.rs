//! http-client: fetch a URL over HTTP/1.1 or HTTP/2 and print the body.
//!
//! ```bash
//! http-client https://example.com/
//! http-client --http2 -v -H 'accept: text/html' https://example.com/
//! ```

use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgAction, Parser};
use net::{FetchOptions, NetError};
use tracing_subscriber::EnvFilter;
use url_parser::Url;

#[derive(Parser, Debug)]
#[command(name = "http-client", version, about = "Minimal HTTP/1.1 and HTTP/2 client")]
struct Cli {
    /// URL to fetch (http:// or https://)
    url: String,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Use HTTP/2 (https only; requires ALPN h2)
    #[arg(long)]
    http2: bool,

    /// Add a request header, e.g. -H 'accept: */*'
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Skip TLS certificate verification
    #[arg(short = 'k', long)]
    insecure: bool,

    /// Write TLS secrets to $SSLKEYLOGFILE
    #[arg(long)]
    keylog: bool,

    /// TCP connect timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = net::CONNECT_TIMEOUT_SECS)]
    connect_timeout: u64,

    /// Socket read timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = net::READ_TIMEOUT_SECS)]
    read_timeout: u64,
}

impl Cli {
    fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            http2: self.http2,
            verify_certificates: !self.insecure,
            keylog: self.keylog,
            connect_timeout: Duration::from_secs(self.connect_timeout),
            read_timeout: Duration::from_secs(self.read_timeout),
            ..FetchOptions::default()
        }
    }
}

/// Split `name: value` at the first colon.
fn parse_header(arg: &str) -> Result<(String, String), String> {
    let (name, value) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected 'NAME: VALUE', got '{arg}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{arg}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<(), NetError> {
    let url = Url::parse(&cli.url)?;
    tracing::debug!(%url, http2 = cli.http2, "fetching");

    let response = net::fetch(&url, &cli.headers, &cli.fetch_options())?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(&response.body)?;
    stdout.write_all(b"\n")?;
    stdout.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
