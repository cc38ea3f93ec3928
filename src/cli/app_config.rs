use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about)]
pub struct Cli {
    /// The request url,like https://www.google.com
    pub url: String,
    ///  Specify request method to use
    #[arg(
        short = 'X',
        long = "request",
        value_name = "method",
        default_value = "GET"
    )]
    pub method: String,
    /// HTTP request body.
    #[arg(short = 'd', long = "data", value_name = "data")]
    pub body_option: Option<String>,
    /// The http headers.
    #[arg(short = 'H', long = "header", value_name = "name: value")]
    pub headers: Vec<String>,
    /// PEM bundle of trusted CA certificates.
    #[arg(long = "cacert", value_name = "file")]
    pub ca_file_option: Option<PathBuf>,
    /// Allow insecure server connections
    #[arg(short = 'k', long = "insecure")]
    pub skip_certificate_validate: bool,
    /// Maximum time allowed for the whole request, in seconds.
    #[arg(short = 'm', long = "max-time", value_name = "seconds")]
    pub max_time_option: Option<f64>,
    /// Include response headers in the output
    #[arg(short = 'i', long = "include")]
    pub include_headers: bool,
    /// Print the response and timing as JSON.
    #[arg(long = "json")]
    pub json: bool,
    ///  Make the operation more talkative
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_command() {
        let cli = Cli::try_parse_from([
            "https-timer",
            "-X",
            "POST",
            "-H",
            "Content-Type: application/json",
            "-d",
            "{}",
            "-k",
            "-m",
            "2.5",
            "-vv",
            "--json",
            "https://example.com/post",
        ])
        .unwrap();

        assert_eq!(cli.url, "https://example.com/post");
        assert_eq!(cli.method, "POST");
        assert_eq!(cli.headers, vec!["Content-Type: application/json"]);
        assert_eq!(cli.body_option.as_deref(), Some("{}"));
        assert!(cli.skip_certificate_validate);
        assert_eq!(cli.max_time_option, Some(2.5));
        assert_eq!(cli.verbosity, 2);
        assert!(cli.json);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["https-timer", "http://localhost"]).unwrap();
        assert_eq!(cli.method, "GET");
        assert_eq!(cli.verbosity, 0);
        assert!(!cli.include_headers);
    }
}
