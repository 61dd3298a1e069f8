//! quote-gate-probe: fetch once from a running gateway and print a JSON report.
//!
//! Usage:
//!   quote-gate-probe [BASE_URL] [--health] [--ready-timeout-ms N] [--poll-ms N] [--timeout-secs N]
//!
//! `BASE_URL` defaults to `QUOTE_GATE_URL`, then `http://127.0.0.1:8010`.
//! Exits non-zero when the fetch did not succeed.

use anyhow::{bail, Context};
use quote_gate::client::QuotesClient;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8010";

#[derive(Debug, Default)]
struct Args {
    base_url: Option<String>,
    health: bool,
    ready_timeout_ms: Option<u64>,
    poll_ms: Option<u64>,
    timeout_secs: Option<u64>,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut args = Args::default();
    while let Some(arg) = raw.next() {
        let mut number = |flag: &str| -> anyhow::Result<u64> {
            let value = raw.next().with_context(|| format!("{flag} needs a value"))?;
            value
                .parse()
                .with_context(|| format!("{flag}: '{value}' is not a number"))
        };
        match arg.as_str() {
            "--health" => args.health = true,
            "--ready-timeout-ms" => args.ready_timeout_ms = Some(number("--ready-timeout-ms")?),
            "--poll-ms" => args.poll_ms = Some(number("--poll-ms")?),
            "--timeout-secs" => args.timeout_secs = Some(number("--timeout-secs")?),
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            other if other.starts_with("--") => bail!("unknown option {other}"),
            other => args.base_url = Some(other.to_string()),
        }
    }
    Ok(args)
}

fn print_usage() {
    println!(
        r#"quote-gate-probe: one-shot quotes gateway check

USAGE:
    quote-gate-probe [BASE_URL] [OPTIONS]

OPTIONS:
    --health                 Fetch /health instead of /quotes
    --ready-timeout-ms <N>   readyTimeoutMs passed to /quotes
    --poll-ms <N>            pollMs passed to /quotes
    --timeout-secs <N>       Client timeout (default 6)

ENVIRONMENT:
    QUOTE_GATE_URL           Gateway base URL"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    let base_url = args
        .base_url
        .or_else(|| std::env::var("QUOTE_GATE_URL").ok())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let timeout = args
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(QuotesClient::DEFAULT_TIMEOUT);

    let mut client = QuotesClient::with_timeout(&base_url, timeout)?;
    if let Some(ms) = args.ready_timeout_ms {
        client = client.ready_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = args.poll_ms {
        client = client.poll_interval(Duration::from_millis(ms));
    }

    if args.health {
        let health = client.health().await?;
        println!("{}", serde_json::to_string_pretty(&health)?);
        return Ok(());
    }

    let report = client.fetch_report().await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.ok {
        std::process::exit(1);
    }
    Ok(())
}
