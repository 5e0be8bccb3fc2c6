//! Operator console: turns typed lines into control-plane commands.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use tether_core::{Backend, BackendId};

use crate::command::{Command, ControlHandle};
use crate::error::ParseCommandError;

/// Console usage text.
pub const HELP: &str = "commands:
  show                          -> print key->backend mapping for demo keys
  topology                      -> print the active strategy's view of the backends
  strat rr|simple|ch|static     -> change strategy (round-robin, simple hash, consistent hash, static)
  add <port>|<host:port>        -> add backend (a bare port means localhost:<port>)
  rm <port>|<host:port>         -> remove backend
  exit                          -> stop the load balancer
";

/// What a console line asks for.
#[derive(Debug)]
pub enum ConsoleAction {
    /// Forward a command to the control plane.
    Send(Command),
    /// Print [`HELP`].
    Help,
}

/// Parse one console line. Blank lines parse to `None`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleAction>, ParseCommandError> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };
    let arg = parts.next();

    let command = match verb.to_ascii_lowercase().as_str() {
        "show" => Command::ShowMapping,
        "topology" | "topo" => Command::ShowTopology,
        "strat" | "strategy" => {
            let name = arg.ok_or(ParseCommandError::Usage("strat rr|simple|ch|static"))?;
            Command::ChangeStrategy(name.to_ascii_lowercase())
        }
        "add" => {
            let id = parse_backend(arg.ok_or(ParseCommandError::Usage("add <port>|<host:port>"))?)?;
            Command::AddBackend(Backend::new(id))
        }
        "rm" | "remove" => {
            let id = parse_backend(arg.ok_or(ParseCommandError::Usage("rm <port>|<host:port>"))?)?;
            Command::RemoveBackend(id)
        }
        "exit" | "quit" => Command::Exit,
        "help" | "h" | "?" => return Ok(Some(ConsoleAction::Help)),
        other => return Err(ParseCommandError::Unknown(other.to_string())),
    };
    Ok(Some(ConsoleAction::Send(command)))
}

/// A bare port is shorthand for `localhost:<port>`.
fn parse_backend(arg: &str) -> Result<BackendId, ParseCommandError> {
    if let Ok(port) = arg.parse::<u16>() {
        return Ok(BackendId::localhost(port));
    }
    Ok(arg.parse::<BackendId>()?)
}

/// Read commands from `input` until it ends, `exit` is typed, or the control
/// plane goes away. Usage and parse errors are written to `output`.
pub async fn run<R, W>(input: R, mut output: W, handle: ControlHandle) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output.write_all(HELP.as_bytes()).await?;
    output.flush().await?;

    let mut lines = LinesStream::new(input.lines());
    while let Some(line) = lines.next().await {
        let line = line?;
        let command = match parse_line(&line) {
            Ok(Some(ConsoleAction::Send(command))) => command,
            Ok(Some(ConsoleAction::Help)) => {
                output.write_all(HELP.as_bytes()).await?;
                output.flush().await?;
                continue;
            }
            Ok(None) => continue,
            Err(err) => {
                output.write_all(format!("{err}\n").as_bytes()).await?;
                output.flush().await?;
                continue;
            }
        };

        let exit = matches!(command, Command::Exit);
        if let Err(err) = handle.send(command) {
            warn!(%err, "console stopping");
            return Ok(());
        }
        if exit {
            break;
        }
    }

    debug!("console closed");
    Ok(())
}
