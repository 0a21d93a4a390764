//! Interactive read-eval-print loop

use abacus::{render, Calculator};
use std::io::{self, BufRead, Write};
use tracing::{info, warn};

pub const BANNER: &str =
    "Welcome to the Interactive Calculator. Type 'exit' to quit or 'menu' to see available commands.";
pub const PROMPT: &str = "Enter command (e.g., 'add 5 3'): ";
pub const USAGE: &str = "Invalid input format. Use: <operation> <num1> <num2>";

enum Reply {
    Lines(Vec<String>),
    Exit,
}

/// Read commands from `input` until `exit` or end of input.
pub fn run<R: BufRead, W: Write>(calc: &mut Calculator, input: R, out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", BANNER)?;
    writeln!(out, "{}", render::menu_line(&calc.operation_names()))?;

    let mut lines = input.lines();
    loop {
        write!(out, "{}", PROMPT)?;
        out.flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => {
                info!("end of input, leaving REPL");
                writeln!(out)?;
                writeln!(out, "Goodbye!")?;
                return Ok(());
            }
        };
        let line = line.trim();
        info!(input = %line, "user input received");

        match handle_line(calc, line) {
            Reply::Exit => {
                info!("exiting REPL");
                writeln!(out, "Goodbye!")?;
                return Ok(());
            }
            Reply::Lines(reply) => {
                for text in reply {
                    writeln!(out, "{}", text)?;
                }
            }
        }
    }
}

fn handle_line(calc: &mut Calculator, line: &str) -> Reply {
    if line.eq_ignore_ascii_case("exit") {
        return Reply::Exit;
    }
    if line.eq_ignore_ascii_case("menu") {
        return Reply::Lines(vec![render::menu_line(&calc.operation_names())]);
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    let reply = match tokens.as_slice() {
        ["help"] => {
            let mut lines = vec!["Available operations:".to_string()];
            lines.extend(render::help_lines(&calc.registry().describe()));
            lines.push("Other commands: menu, help, history [operation|json], last, clear, exit".to_string());
            lines
        }
        ["history"] => render::history_lines(&calc.history().all()),
        ["history", "json"] => match calc.history().to_json() {
            Ok(json) => vec![json],
            Err(e) => vec![format!("An error occurred: {}", e)],
        },
        ["history", operation] => render::history_lines(&calc.history().filter_by_operation(operation)),
        ["last"] => match calc.history().latest() {
            Some(record) => vec![record.to_string()],
            None => render::history_lines(&[]),
        },
        ["clear"] => {
            calc.history_mut().clear();
            vec!["History cleared.".to_string()]
        }
        [operation, value1, value2, ..] => vec![calc.perform_and_render(value1, value2, operation)],
        _ => {
            warn!(input = %line, "invalid input format, expected <operation> <num1> <num2>");
            vec![USAGE.to_string()]
        }
    };
    Reply::Lines(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn session(script: &str) -> String {
        let mut calc = Calculator::with_standard_library();
        let mut out = Vec::new();
        run(&mut calc, Cursor::new(script.as_bytes()), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_banner_and_menu_first() {
        let output = session("exit\n");
        let mut lines = output.lines();
        assert_eq!(lines.next(), Some(BANNER));
        assert_eq!(
            lines.next(),
            Some("Available commands: add, subtract, multiply, divide, mean")
        );
        assert!(output.ends_with("Goodbye!\n"));
    }

    #[test]
    fn test_calculations() {
        let output = session("add 5 3\ndivide 1 0\nfoo 1 2\nmultiply x 2\nexit\n");
        assert!(output.contains("The result of 5 add 3 is 8\n"));
        assert!(output.contains("Error: Cannot divide by zero.\n"));
        assert!(output.contains("Invalid operation type: foo\n"));
        assert!(output.contains("Invalid input: x or 2 is not a valid number.\n"));
    }

    #[test]
    fn test_extra_tokens_ignored() {
        let output = session("subtract 10 2 99\nEXIT\n");
        assert!(output.contains("The result of 10 subtract 2 is 8\n"));
        assert!(output.ends_with("Goodbye!\n"));
    }

    #[test]
    fn test_too_few_tokens() {
        let output = session("add 5\n\nexit\n");
        assert_eq!(output.matches(USAGE).count(), 2);
    }

    #[test]
    fn test_menu_is_case_insensitive() {
        let output = session("MeNu\nexit\n");
        assert_eq!(output.matches("Available commands:").count(), 2);
    }

    #[test]
    fn test_eof_ends_session() {
        let output = session("add 1 1");
        assert!(output.contains("The result of 1 add 1 is 2\n"));
        assert!(output.ends_with("Goodbye!\n"));
    }

    #[test]
    fn test_history_commands() {
        let output = session("history\nadd 1 2\nmultiply 3 4\nadd 5 5\nhistory add\nlast\nclear\nhistory\nexit\n");
        assert_eq!(output.matches("No calculations in history.").count(), 2);
        assert!(output.contains("1. 1 add 2 = 3\n2. 5 add 5 = 10\n"));
        assert!(output.contains(&format!("{PROMPT}5 add 5 = 10\n{PROMPT}History cleared.\n")));
        assert!(!output.contains("3 multiply 4 = 12"));
    }

    #[test]
    fn test_history_json() {
        let output = session("mean 5 3\nhistory json\nexit\n");
        assert!(output.contains("\"operation\": \"mean\""));
        assert!(output.contains("\"result\": \"4\""));
    }

    #[test]
    fn test_help_lists_operations() {
        let output = session("help\nexit\n");
        assert!(output.contains("Available operations:"));
        for name in ["add", "subtract", "multiply", "divide", "mean"] {
            assert!(output.contains(&format!("  {}", name)), "missing {}", name);
        }
    }
}
