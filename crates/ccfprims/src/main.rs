mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "ccfprims", version, about = "DOCSIS CCF segmentation toolkit")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simulate_with_globals_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ccfprims",
            "simulate",
            "--packets",
            "10",
            "--multiplier",
            "5",
            "--format",
            "pretty",
        ])
        .expect("simulate args should parse");

        assert_eq!(cli.format, Some(OutputFormat::Pretty));
        match cli.command {
            Command::Simulate(args) => {
                assert_eq!(args.packets, 10);
                assert_eq!(args.multiplier, Some(5));
                assert_eq!(args.grant_size, 256);
                assert!(!args.no_shuffle);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_decode_hex() {
        let cli = Cli::try_parse_from(["ccfprims", "decode", "8032005200000000"])
            .expect("decode args should parse");
        assert!(matches!(cli.command, Command::Decode(ref args) if args.hex == "8032005200000000"));
    }

    #[test]
    fn rejects_unknown_format() {
        let err = Cli::try_parse_from(["ccfprims", "--format", "xml", "version"])
            .expect_err("unknown format should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn decode_requires_input() {
        let err = Cli::try_parse_from(["ccfprims", "decode"]).expect_err("missing hex should fail");
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }
}
