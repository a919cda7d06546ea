// Interactive REPL on top of editline
//
// Each line is evaluated in the top context of one long-lived interpreter,
// so bindings carry over between lines. Errors are reported and the loop
// keeps going; Ctrl-D ends the session.

use editline::{LineEditor, terminals::StdioTerminal};
use std::io::Write;
use wyrd_core::{Interpreter, Value};

fn print_banner() {
    println!();
    println!("Wyrd v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Type `quit` or press Ctrl-D to exit");
    println!("Type `words? current` to see what this session has bound");
    println!("Type `doc\\of? ?<word>` to get help for a word");
    println!();
}

// Results are shown in loadable form where there is one, so what the REPL
// prints can be pasted back in.
fn show(interp: &Interpreter, value: &Value) -> Option<String> {
    match value {
        Value::Void => None,
        other => Some(
            other
                .mold(&interp.words)
                .unwrap_or_else(|| other.inspect(&interp.words)),
        ),
    }
}

pub fn run_repl(interp: &mut Interpreter, quiet: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !quiet {
        print_banner();
    }

    let mut editor = LineEditor::new(1024, 50);
    let mut terminal = StdioTerminal::new();

    loop {
        print!("\n> ");
        std::io::stdout().flush()?;

        match editor.read_line(&mut terminal) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed == "quit" {
                    break;
                }

                match interp.eval_str(trimmed) {
                    Ok(value) => {
                        if let Some(text) = show(interp, &value) {
                            println!("== {text}");
                        }
                    }
                    Err(e) => eprintln!("{e}"),
                }
            }
            Err(editline::Error::Eof) => {
                if !quiet {
                    println!("\nGoodbye!");
                }
                break;
            }
            Err(editline::Error::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        }
    }

    Ok(())
}
