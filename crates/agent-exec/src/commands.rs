use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
pub use clap_complete::Shell;

const LONG_ABOUT: &str = r#"agent-exec runs shell commands on behalf of AI agents.

A command that finishes within its timeout returns its output and exit code.
One that does not keeps running in the background under a session id, so an
agent can come back later to read more output, answer a prompt on stdin, or
stop it.

EXAMPLES:
    # One-shot command
    agent-exec run "cargo test"

    # Cap the output and give up after 30 seconds
    agent-exec run --timeout 30 --max-lines 200 "npm install"

    # Serve execute/resume/terminate over JSON-RPC on stdio
    agent-exec serve"#;

#[derive(Parser)]
#[command(name = "agent-exec")]
#[command(author, version)]
#[command(about = "Resumable shell command execution for AI agents")]
#[command(long_about = LONG_ABOUT)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn", env = "AGENT_EXEC_LOG_LEVEL")]
    pub log_level: String,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a command once and print its result
    #[command(long_about = r#"Run a command once and print its result.

The command runs through the system shell. If it is still running when the
timeout expires it is terminated before agent-exec exits. The exit status
mirrors the command's own when it ran to completion, and is 1 otherwise.

EXAMPLES:
    agent-exec run "ls -la"
    agent-exec run --cwd /tmp --timeout 5 "make build"
    agent-exec run --format json --max-bytes 65536 "git log""#)]
    Run(RunArgs),

    /// Serve JSON-RPC requests on stdin and stdout
    #[command(long_about = r#"Serve JSON-RPC requests on stdin and stdout.

One JSON-RPC 2.0 request per line. Methods: execute, resume, terminate,
peek, sessions. The server stops at end of input or on SIGINT/SIGTERM and
terminates every command it still owns."#)]
    Serve,

    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    /// Shell command to run
    pub command: String,

    /// Working directory for the command
    #[arg(short = 'd', long)]
    pub cwd: Option<PathBuf>,

    /// Seconds to wait before giving up (fractions allowed)
    #[arg(short, long, value_parser = parse_seconds)]
    pub timeout: Option<Duration>,

    /// Stop the command once its output reaches this many non-empty lines
    #[arg(long, value_parser = parse_cap)]
    pub max_lines: Option<usize>,

    /// Stop the command once its output reaches this many estimated tokens
    #[arg(long, value_parser = parse_cap)]
    pub max_tokens: Option<usize>,

    /// Stop the command once its output reaches this many bytes
    #[arg(long, value_parser = parse_cap)]
    pub max_bytes: Option<usize>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", value))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err("timeout must be a non-negative number of seconds".to_string());
    }
    Ok(Duration::from_secs_f64(secs))
}

fn parse_cap(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("'{}' is not a positive integer", value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_parses_all_options() {
        let cli = Cli::try_parse_from([
            "agent-exec",
            "run",
            "--cwd",
            "/tmp",
            "--timeout",
            "2.5",
            "--max-lines",
            "10",
            "--max-tokens",
            "100",
            "--max-bytes",
            "4096",
            "--format",
            "json",
            "echo hi",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.command, "echo hi");
        assert_eq!(args.cwd, Some(PathBuf::from("/tmp")));
        assert_eq!(args.timeout, Some(Duration::from_millis(2500)));
        assert_eq!(args.max_lines, Some(10));
        assert_eq!(args.max_tokens, Some(100));
        assert_eq!(args.max_bytes, Some(4096));
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_log_level_is_global() {
        let cli = Cli::try_parse_from(["agent-exec", "serve", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level, "debug");
        assert!(matches!(cli.command, Commands::Serve));
    }

    #[test]
    fn test_rejects_negative_timeout_and_zero_cap() {
        assert!(Cli::try_parse_from(["agent-exec", "run", "--timeout", "-1", "x"]).is_err());
        assert!(Cli::try_parse_from(["agent-exec", "run", "--max-lines", "0", "x"]).is_err());
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_seconds("0.25").unwrap(), Duration::from_millis(250));
        assert!(parse_seconds("soon").is_err());
        assert!(parse_seconds("inf").is_err());
    }
}
