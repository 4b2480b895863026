//! Terminal control console.
//!
//! Reads one command per line from standard input and turns it into a
//! control action on the [`Broadcaster`]:
//!
//! | Input | Action |
//! |-------|--------|
//! | `n`, `next`, `+` | advance the counter |
//! | `p`, `prev`, `previous`, `-` | retreat the counter |
//! | `s`, `show` | log the current value and viewer count |
//! | `q`, `quit` | request shutdown |
//!
//! End of input stops the console but leaves the server running, so the
//! binary can run detached from a terminal.

use std::sync::Arc;

use deli_counter_server::Broadcaster;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

/// A parsed console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Serve the next customer.
    Advance,
    /// Step back one customer.
    Retreat,
    /// Report the current value.
    Show,
    /// Stop the server.
    Quit,
}

impl ConsoleCommand {
    /// Parse one input line. Blank lines and unknown words yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "n" | "next" | "+" => Some(Self::Advance),
            "p" | "prev" | "previous" | "-" => Some(Self::Retreat),
            "s" | "show" => Some(Self::Show),
            "q" | "quit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// How the console loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    /// The operator asked to quit.
    Quit,
    /// Input reached end of file or could not be read.
    EndOfInput,
}

/// Run the console until `quit` or end of input.
pub async fn run_console<R>(reader: R, broadcaster: Arc<Broadcaster>) -> ConsoleExit
where
    R: AsyncBufRead + Unpin,
{
    info!("Console ready: n = next, p = previous, s = show, q = quit");

    let mut lines = reader.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return ConsoleExit::EndOfInput,
            Err(e) => {
                warn!(error = %e, "console input failed, console disabled");
                return ConsoleExit::EndOfInput;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match ConsoleCommand::parse(&line) {
            Some(ConsoleCommand::Advance) => {
                let delivery = broadcaster.advance().await;
                info!(value = delivery.value, delivered = delivery.delivered, "Now serving");
            }
            Some(ConsoleCommand::Retreat) => {
                let delivery = broadcaster.retreat().await;
                info!(value = delivery.value, delivered = delivery.delivered, "Now serving");
            }
            Some(ConsoleCommand::Show) => {
                info!(
                    value = broadcaster.current_value(),
                    viewers = broadcaster.viewer_count(),
                    "Now serving"
                );
            }
            Some(ConsoleCommand::Quit) => return ConsoleExit::Quit,
            None => warn!(input = line.trim(), "unknown console command"),
        }
    }
}

#[cfg(test)]
mod tests {
    use deli_counter_core::CounterStore;

    use super::*;

    fn make_broadcaster() -> Arc<Broadcaster> {
        Arc::new(Broadcaster::new(Arc::new(CounterStore::new())))
    }

    #[test]
    fn parses_commands() {
        assert_eq!(ConsoleCommand::parse("n"), Some(ConsoleCommand::Advance));
        assert_eq!(ConsoleCommand::parse(" NEXT "), Some(ConsoleCommand::Advance));
        assert_eq!(ConsoleCommand::parse("+"), Some(ConsoleCommand::Advance));
        assert_eq!(ConsoleCommand::parse("previous"), Some(ConsoleCommand::Retreat));
        assert_eq!(ConsoleCommand::parse("-"), Some(ConsoleCommand::Retreat));
        assert_eq!(ConsoleCommand::parse("show"), Some(ConsoleCommand::Show));
        assert_eq!(ConsoleCommand::parse("q"), Some(ConsoleCommand::Quit));
        assert_eq!(ConsoleCommand::parse("reset"), None);
        assert_eq!(ConsoleCommand::parse(""), None);
    }

    #[tokio::test]
    async fn applies_commands_until_end_of_input() {
        let broadcaster = make_broadcaster();
        let input: &[u8] = b"n\nn\n\nbogus\np\nn\ns\n";

        let exit = run_console(input, Arc::clone(&broadcaster)).await;

        assert_eq!(exit, ConsoleExit::EndOfInput);
        assert_eq!(broadcaster.current_value(), 2);
    }

    #[tokio::test]
    async fn quit_stops_reading() {
        let broadcaster = make_broadcaster();
        let input: &[u8] = b"p\nquit\nn\nn\n";

        let exit = run_console(input, Arc::clone(&broadcaster)).await;

        assert_eq!(exit, ConsoleExit::Quit);
        assert_eq!(broadcaster.current_value(), -1);
    }
}
