//! Newline-delimited JSON-RPC over a pair of byte streams.

use std::io;
use std::sync::Arc;

use agent_exec_ipc::{RpcRequest, RpcResponse};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Notify;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::executor::CommandExecutor;
use crate::handlers;

/// Serve requests read from `input` until it ends or `shutdown` fires.
///
/// Each request runs in its own task and its response is written as soon
/// as it is ready, so a long `execute` does not hold up a `sessions` call
/// behind it. On end of input the in-flight requests finish first and the
/// sessions left running are terminated afterwards. On `shutdown` live
/// sessions are terminated first so in-flight requests return promptly.
pub async fn serve<R, W>(
    executor: Arc<CommandExecutor>,
    input: R,
    mut output: W,
    shutdown: Arc<Notify>,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut tasks: JoinSet<RpcResponse> = JoinSet::new();

    let signalled = loop {
        tokio::select! {
            _ = shutdown.notified() => break true,
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                write_joined(&mut output, joined).await?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break false;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<RpcRequest>(line) {
                    Ok(request) => {
                        let executor = Arc::clone(&executor);
                        tasks.spawn(async move { handlers::handle_request(&executor, request).await });
                    }
                    Err(e) => {
                        warn!(error = %e, "unparseable request");
                        let response = RpcResponse::parse_error(&format!("Parse error: {}", e));
                        write_response(&mut output, &response).await?;
                    }
                }
            }
        }
    };

    info!(in_flight = tasks.len(), signalled, "stopping server");
    let mut stopped = false;
    if signalled {
        executor.shutdown().await;
        stopped = true;
    }

    loop {
        tokio::select! {
            _ = shutdown.notified(), if !stopped => {
                executor.shutdown().await;
                stopped = true;
            }
            joined = tasks.join_next() => match joined {
                Some(joined) => write_joined(&mut output, joined).await?,
                None => break,
            },
        }
    }

    if !stopped {
        executor.shutdown().await;
    }
    output.flush().await
}

/// Serve on the process's stdin and stdout.
pub async fn run_stdio_server(config: EngineConfig) -> io::Result<()> {
    let executor = Arc::new(CommandExecutor::new(config));
    let shutdown = Arc::new(Notify::new());

    #[cfg(unix)]
    let _signals = crate::signal_handler::SignalHandler::setup(Arc::clone(&shutdown))?;

    info!(
        max_sessions = executor.config().max_sessions,
        "agent-exec server listening on stdio"
    );
    let input = BufReader::new(tokio::io::stdin());
    let output = tokio::io::stdout();
    serve(executor, input, output, shutdown).await
}

async fn write_joined<W>(output: &mut W, joined: Result<RpcResponse, JoinError>) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    match joined {
        Ok(response) => write_response(output, &response).await,
        Err(e) => {
            error!(error = %e, "request task failed");
            Ok(())
        }
    }
}

async fn write_response<W>(output: &mut W, response: &RpcResponse) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = match serde_json::to_string(response) {
        Ok(line) => line,
        Err(e) => {
            error!(id = response.id, error = %e, "failed to serialize response");
            return Ok(());
        }
    };
    line.push('\n');
    output.write_all(line.as_bytes()).await?;
    output.flush().await
}
