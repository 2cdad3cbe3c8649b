//! A minimal line-oriented notebook host for the `%gpt` magic.

use std::io::{self, BufRead, Write};

use tracing::warn;

use crate::cli::Args;
use crate::config::Config;
use crate::errors::MagicError;
use crate::magic::{load_extension, MagicRegistry};
use crate::notebook::{CollectingSink, Notebook};
use crate::sink::{CellSink, NewCell};

/// Reads cells, runs magics, and remembers every cell for export.
pub struct Host<S: CellSink> {
    registry: MagicRegistry,
    sink: S,
    notebook: Notebook,
}

impl<S: CellSink> Host<S> {
    pub fn new(registry: MagicRegistry, sink: S) -> Self {
        Host {
            registry,
            sink,
            notebook: Notebook::new(),
        }
    }

    pub fn notebook(&self) -> &Notebook {
        &self.notebook
    }

    pub fn into_parts(self) -> (S, Notebook) {
        (self.sink, self.notebook)
    }

    /// Process input until EOF or `exit`/`quit`. Returns how many magic
    /// invocations failed; each failure is reported to `err` and the session
    /// continues.
    pub fn process<R: BufRead, E: Write>(
        &mut self,
        input: R,
        err: &mut E,
    ) -> Result<usize, MagicError> {
        let mut failures = 0;
        let mut lines = input.lines();

        while let Some(line) = lines.next() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if matches!(trimmed, "exit" | "quit") {
                break;
            }

            let result = if let Some(rest) = trimmed.strip_prefix("%%") {
                let mut body = Vec::new();
                for next in lines.by_ref() {
                    let next = next?;
                    if next.trim().is_empty() {
                        break;
                    }
                    body.push(next);
                }
                let body = body.join("\n");
                self.notebook
                    .push(NewCell::code(&format!("{}\n{}", trimmed, body)));
                let (name, args) = split_command(rest);
                self.run_magic(name, args, Some(&body))
            } else if let Some(rest) = trimmed.strip_prefix('%') {
                self.notebook.push(NewCell::code(trimmed));
                let (name, args) = split_command(rest);
                self.run_magic(name, args, None)
            } else {
                self.notebook.push(NewCell::code(&line));
                Ok(())
            };

            if let Err(e) = result {
                warn!(error = %e, "magic failed");
                writeln!(err, "{}", e)?;
                failures += 1;
            }
        }
        Ok(failures)
    }

    fn run_magic(&mut self, name: &str, args: &str, cell: Option<&str>) -> Result<(), MagicError> {
        let mut sink = CollectingSink::new(&mut self.sink, &mut self.notebook);
        self.registry.dispatch(name, args, cell, &mut sink)
    }
}

/// `"gpt -c query"` -> `("gpt", "-c query")`
fn split_command(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (text, ""),
    }
}

/// Run the host on stdin with the front-end picked on the command line
pub fn run_host(args: Args) -> Result<(), MagicError> {
    let mut config = Config::from_env()?;
    if let Some(model) = args.model {
        config = config.with_model(model);
    }

    let mut registry = MagicRegistry::new();
    load_extension(&mut registry, &config, !args.no_validate)?;

    let sink = args.frontend.sink(io::stdout());
    let mut host = Host::new(registry, sink);
    println!("(%gpt loaded for the {} front-end, type 'exit' or 'quit' to end)", args.frontend);

    let stdin = io::stdin();
    let failures = host.process(stdin.lock(), &mut io::stderr())?;
    if failures > 0 {
        warn!(failures, "session finished with failed invocations");
    }

    if let Some(path) = args.save {
        host.notebook().save(path)?;
    }
    Ok(())
}
