use std::io::Write;

use clap::CommandFactory;
use clap::Parser;
use clap_complete::generate;

use agent_exec::commands::{Cli, Commands};
use agent_exec::run::{exit_status, render, run_once};
use agent_exec_common::ErrorCategory;
use agent_exec_common::init_tracing;
use agent_exec_engine::{EngineConfig, ExecError, run_stdio_server};

fn main() {
    let cli = Cli::parse();
    let guard = init_tracing(&cli.log_level);

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => report(e.as_ref()),
    };
    // Flush buffered log lines before exiting.
    drop(guard);
    std::process::exit(code);
}

fn report(e: &(dyn std::error::Error + 'static)) -> i32 {
    if let Some(exec_error) = e.downcast_ref::<ExecError>() {
        eprintln!("Error: {}", exec_error);
        eprintln!("Suggestion: {}", exec_error.suggestion());
        if exec_error.is_retryable() {
            eprintln!("(This error may be transient - retry may succeed)");
        }
        return exit_code_for_category(exec_error.category());
    }
    eprintln!("Error: {}", e);
    1
}

fn exit_code_for_category(category: ErrorCategory) -> i32 {
    match category {
        ErrorCategory::InvalidInput => 64, // EX_USAGE
        ErrorCategory::NotFound => 69,     // EX_UNAVAILABLE
        ErrorCategory::Busy => 73,         // EX_CANTCREAT
        ErrorCategory::External => 74,     // EX_IOERR
        ErrorCategory::Internal => 74,     // EX_IOERR
        ErrorCategory::Timeout => 75,      // EX_TEMPFAIL
    }
}

fn run(cli: Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let runtime = || {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
    };

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "agent-exec", &mut std::io::stdout());
            Ok(0)
        }
        Commands::Serve => {
            runtime()?.block_on(run_stdio_server(EngineConfig::from_env()))?;
            Ok(0)
        }
        Commands::Run(args) => {
            let output = runtime()?.block_on(run_once(EngineConfig::from_env(), &args))?;
            let (stdout, stderr) = render(&output, args.format);

            let mut out = std::io::stdout().lock();
            out.write_all(stdout.as_bytes())?;
            out.flush()?;
            if let Some(hint) = stderr {
                eprintln!("{}", hint);
            }
            Ok(exit_status(&output))
        }
    }
}
