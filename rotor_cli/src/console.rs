//! Operator console: one command per stdin line.

use std::io::BufRead;

use crossbeam_channel::Sender;
use rotor_core::{Fixed, ParseFixedError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetPoint(Fixed),
    Stop,
    Reset,
    Quit,
}

/// Parse one console line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, ParseFixedError> {
    let line = line.trim();
    match line.to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "stop" => Ok(Some(Command::Stop)),
        "reset" => Ok(Some(Command::Reset)),
        "quit" | "exit" | "q" => Ok(Some(Command::Quit)),
        _ => line.parse().map(|v| Some(Command::SetPoint(v))),
    }
}

/// Read commands from `input` until EOF or until the receiver is gone.
pub fn pump(input: impl BufRead, tx: &Sender<Command>) {
    for line in input.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(error = %e, "operator console read failed");
                break;
            }
        };
        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(cmd)) => {
                if tx.send(cmd).is_err() {
                    return;
                }
            }
            Err(e) => tracing::warn!(input = %line.trim(), error = %e, "unrecognized console input"),
        }
    }
    tracing::debug!("operator console closed");
}

/// Spawn the stdin reader thread.
pub fn spawn_stdin(tx: Sender<Command>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || pump(std::io::stdin().lock(), &tx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("stop", Command::Stop)]
    #[case(" Reset \n", Command::Reset)]
    #[case("quit", Command::Quit)]
    #[case("q", Command::Quit)]
    #[case("-12", Command::SetPoint("-12".parse().unwrap()))]
    #[case("0.50000", Command::SetPoint("0.5".parse().unwrap()))]
    fn parses_commands(#[case] input: &str, #[case] expected: Command) {
        assert_eq!(parse_command(input).unwrap(), Some(expected));
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse_command("   ").unwrap(), None);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_command("faster").is_err());
    }

    #[test]
    fn pump_skips_bad_lines_and_stops_at_eof() {
        let (tx, rx) = crossbeam_channel::unbounded();
        pump("7\nbogus\n\nstop\n".as_bytes(), &tx);
        let got: Vec<Command> = rx.try_iter().collect();
        assert_eq!(
            got,
            vec![Command::SetPoint("7".parse().unwrap()), Command::Stop]
        );
    }
}
