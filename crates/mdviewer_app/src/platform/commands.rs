//! Line commands read from stdin.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;

use anyhow::{anyhow, bail, Result};
use mdviewer_engine::UserCommand;
use mdviewer_logging::{viewer_debug, viewer_warn};
use tokio::sync::mpsc;

pub const HELP: &str = "commands: open <path> | scroll <lines> | quit";

/// Parses one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<UserCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb {
        "open" | "o" => {
            if rest.is_empty() {
                bail!("open needs a path");
            }
            UserCommand::Open(PathBuf::from(rest))
        }
        "scroll" | "s" => {
            let offset = rest
                .parse()
                .map_err(|_| anyhow!("scroll needs a line number, got {rest:?}"))?;
            UserCommand::Scroll(offset)
        }
        "quit" | "q" | "exit" => UserCommand::Close,
        other => bail!("unknown command {other:?}; {HELP}"),
    };
    Ok(Some(command))
}

/// Forwards stdin commands until `quit`, end of input or the session going away.
pub fn spawn_stdin_reader(commands: mpsc::UnboundedSender<UserCommand>) -> io::Result<()> {
    thread::Builder::new()
        .name("mdviewer-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        viewer_warn!("stdin closed: {}", err);
                        break;
                    }
                };
                match parse(&line) {
                    Ok(Some(command)) => {
                        let close = command == UserCommand::Close;
                        if commands.send(command).is_err() || close {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(err) => eprintln!("{err}"),
                }
            }
            viewer_debug!("stdin reader finished");
        })?;
    Ok(())
}
