use crate::cli::app_config::Cli;
use anyhow::Context;
use clap::Parser;
use https_timer::{request, Method, RequestOptions, TimedResponse};
use std::io::Write;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

pub async fn main_with_error() -> Result<TimedResponse, anyhow::Error> {
    let cli: Cli = Cli::parse();

    do_request(cli).await
}

fn init_logging(verbosity: u8) -> Result<(), anyhow::Error> {
    let log_level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy()
        .add_directive("hyper=off".parse()?)
        .add_directive("rustls=warn".parse()?);
    let subscriber = tracing_subscriber::fmt()
        .without_time()
        .with_level(false)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
    Ok(())
}

fn build_options(cli: &Cli) -> Result<RequestOptions, anyhow::Error> {
    let mut options =
        RequestOptions::new(cli.url.clone()).insecure(cli.skip_certificate_validate);
    for x in &cli.headers {
        let (name, value) = x
            .split_once(':')
            .ok_or_else(|| anyhow!("header error: '{}'", x))?;
        options = options.header(name, value.trim_start());
    }
    if let Some(body) = cli.body_option.as_ref() {
        options = options.body(body.clone());
    }
    if let Some(secs) = cli.max_time_option {
        ensure!(
            secs.is_finite() && secs > 0.0,
            "max-time must be a positive number of seconds"
        );
        options = options.timeout(Duration::from_secs_f64(secs));
    }
    if let Some(path) = cli.ca_file_option.as_ref() {
        options = options.ca_file(path.clone());
    }
    Ok(options)
}

async fn do_request(cli: Cli) -> Result<TimedResponse, anyhow::Error> {
    init_logging(cli.verbosity)?;

    let method = Method::from_str(&cli.method.to_uppercase())
        .with_context(|| format!("invalid method '{}'", cli.method))?;
    let options = build_options(&cli)?;
    let response = request(method, options)
        .await
        .with_context(|| format!("request to {} failed", cli.url))?;
    print_response(&cli, &response)?;

    Ok(response)
}

fn print_response(cli: &Cli, response: &TimedResponse) -> Result<(), anyhow::Error> {
    let mut stdout = std::io::stdout().lock();
    if cli.json {
        writeln!(
            stdout,
            "{}",
            serde_json::to_string_pretty(&response.to_json())?
        )?;
        return Ok(());
    }

    if cli.include_headers {
        writeln!(stdout, "HTTP {}", response.status_code)?;
        for (key, value) in response.headers.iter() {
            writeln!(stdout, "{}: {}", key, value.to_str().unwrap_or("<binary>"))?;
        }
        writeln!(stdout)?;
    }

    match response.body_text() {
        Some(text) => write!(stdout, "{text}")?,
        None => warn!(
            "[https-timer: warning] response body is not valid UTF-8 ({} bytes) and was not printed.",
            response.body.len()
        ),
    }
    writeln!(stdout, "\nStatus: {}", response.status_code)?;
    write!(stdout, "{}", response.timing.durations)?;
    stdout.flush()?;
    Ok(())
}
