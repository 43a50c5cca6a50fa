use super::print::print_result;
use colored::Colorize;
use log::debug;
use pwdb::commands::{Console, Session};
use pwdb::error::Result;
use std::io::{self, BufRead, Write};

const PROMPT: &str = "pwdb> ";
const NOTE_END: &str = ".";

/// Line source for the command loop and for the questions commands ask.
pub(super) struct LineConsole<R> {
    input: R,
    interactive: bool,
}

impl<R: BufRead> LineConsole<R> {
    pub(super) fn new(input: R, interactive: bool) -> Self {
        Self { input, interactive }
    }

    fn prompt(&self, text: &str) -> io::Result<()> {
        if self.interactive {
            let mut stdout = io::stdout();
            write!(stdout, "{}", text)?;
            stdout.flush()?;
        }
        Ok(())
    }

    /// Next line without its terminator, or `None` at end of input.
    fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}

impl<R: BufRead> Console for LineConsole<R> {
    fn read_note(&mut self) -> Result<String> {
        if self.interactive {
            println!("{}", "Enter the note; finish with a line holding only '.'".dimmed());
        }
        let mut lines = Vec::new();
        loop {
            self.prompt("... ")?;
            match self.next_line()? {
                Some(line) if line == NOTE_END => break,
                Some(line) => lines.push(line),
                None => break,
            }
        }
        Ok(lines.join("\n"))
    }

    fn confirm(&mut self, question: &str) -> Result<bool> {
        println!("{} [y/N]", question);
        self.prompt("? ")?;
        let answer = self.next_line()?.unwrap_or_default();
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

/// Runs one line and prints its outcome. Returns true when the session ended.
pub(super) fn run_line(session: &mut Session, line: &str, console: &mut dyn Console) -> bool {
    match session.execute(line, console) {
        Ok(result) => {
            print_result(&result);
            result.quit
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            false
        }
    }
}

/// Reads commands until `quit` or end of input. End of input quits too.
pub(super) fn run_loop<R: BufRead>(session: &mut Session, console: &mut LineConsole<R>) -> Result<()> {
    loop {
        console.prompt(PROMPT)?;
        let line = match console.next_line()? {
            Some(line) => line,
            None => {
                if console.interactive {
                    println!();
                }
                debug!("event=repl_eof module=cli status=ok");
                run_line(session, "quit", console);
                return Ok(());
            }
        };
        if run_line(session, &line, console) {
            return Ok(());
        }
    }
}
