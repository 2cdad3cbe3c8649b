//! Delivery of generated cells and explanations to a notebook front-end.
//!
//! Two front-ends are supported. The classic notebook is driven by
//! `display_data` outputs, with a client-side script inserting the new cell.
//! The interactive shell receives a `set_next_input` payload instead. The
//! embedding host picks one explicitly with [`Frontend`].

use std::{
    fmt::{self, Display},
    io::Write,
    str::FromStr,
};

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::errors::MagicError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Code,
    Markdown,
}

impl Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellKind::Code => write!(f, "code"),
            CellKind::Markdown => write!(f, "markdown"),
        }
    }
}

/// A cell to be placed after the one currently executing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCell {
    pub kind: CellKind,
    pub source: String,
}

impl NewCell {
    pub fn code(source: &str) -> Self {
        NewCell {
            kind: CellKind::Code,
            source: source.to_string(),
        }
    }
}

/// What the `%gpt` handler needs from its host.
pub trait CellSink {
    /// Show formatted text below the invoking cell.
    fn display_markdown(&mut self, text: &str) -> Result<(), MagicError>;
    /// Add a cell after the invoking cell.
    fn insert_cell(&mut self, cell: &NewCell) -> Result<(), MagicError>;
}

impl<S: CellSink + ?Sized> CellSink for &mut S {
    fn display_markdown(&mut self, text: &str) -> Result<(), MagicError> {
        (**self).display_markdown(text)
    }

    fn insert_cell(&mut self, cell: &NewCell) -> Result<(), MagicError> {
        (**self).insert_cell(cell)
    }
}

impl<S: CellSink + ?Sized> CellSink for Box<S> {
    fn display_markdown(&mut self, text: &str) -> Result<(), MagicError> {
        (**self).display_markdown(text)
    }

    fn insert_cell(&mut self, cell: &NewCell) -> Result<(), MagicError> {
        (**self).insert_cell(cell)
    }
}

/// Host front-ends a sink can be built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frontend {
    Notebook,
    Shell,
}

impl Frontend {
    pub fn sink<W: Write + 'static>(self, out: W) -> Box<dyn CellSink> {
        match self {
            Frontend::Notebook => Box::new(NotebookSink::new(out)),
            Frontend::Shell => Box::new(ShellSink::new(out)),
        }
    }
}

impl FromStr for Frontend {
    type Err = MagicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "notebook" | "classic" => Ok(Frontend::Notebook),
            "shell" | "terminal" => Ok(Frontend::Shell),
            _ => Err(MagicError::UnsupportedEnvironment(s.to_string())),
        }
    }
}

impl Display for Frontend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frontend::Notebook => write!(f, "notebook"),
            Frontend::Shell => write!(f, "shell"),
        }
    }
}

/// Classic notebook front-end. Each call writes one `display_data` output as a
/// JSON line; cell insertion is an `application/javascript` output.
pub struct NotebookSink<W: Write> {
    out: W,
}

impl<W: Write> NotebookSink<W> {
    pub fn new(out: W) -> Self {
        NotebookSink { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn display(&mut self, mime: &str, body: &str) -> Result<(), MagicError> {
        let output = json!({
            "output_type": "display_data",
            "data": { mime: body },
            "metadata": {},
        });
        serde_json::to_writer(&mut self.out, &output)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Script that inserts `cell` below the selected cell in the classic notebook.
pub fn insert_cell_script(cell: &NewCell) -> Result<String, MagicError> {
    Ok(format!(
        "var cell = IPython.notebook.insert_cell_below('{}');\ncell.set_text({});",
        cell.kind,
        serde_json::to_string(&cell.source)?
    ))
}

impl<W: Write> CellSink for NotebookSink<W> {
    fn display_markdown(&mut self, text: &str) -> Result<(), MagicError> {
        self.display("text/markdown", text)
    }

    fn insert_cell(&mut self, cell: &NewCell) -> Result<(), MagicError> {
        debug!(kind = %cell.kind, "inserting cell via script");
        let script = insert_cell_script(cell)?;
        self.display("application/javascript", &script)
    }
}

/// A `set_next_input` payload as sent in an `execute_reply`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextInputPayload {
    pub source: &'static str,
    pub text: String,
    pub replace: bool,
}

/// Interactive shell front-end. Markdown is written as plain text; cells are
/// queued as `set_next_input` payloads and echoed as JSON lines.
pub struct ShellSink<W: Write> {
    out: W,
    payloads: Vec<NextInputPayload>,
}

impl<W: Write> ShellSink<W> {
    pub fn new(out: W) -> Self {
        ShellSink {
            out,
            payloads: Vec::new(),
        }
    }

    /// Drain the payloads queued since the last call.
    pub fn take_payloads(&mut self) -> Vec<NextInputPayload> {
        std::mem::take(&mut self.payloads)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> CellSink for ShellSink<W> {
    fn display_markdown(&mut self, text: &str) -> Result<(), MagicError> {
        writeln!(self.out, "{}", text)?;
        self.out.flush()?;
        Ok(())
    }

    fn insert_cell(&mut self, cell: &NewCell) -> Result<(), MagicError> {
        debug!(kind = %cell.kind, "queueing set_next_input payload");
        let payload = NextInputPayload {
            source: "set_next_input",
            text: cell.source.clone(),
            replace: false,
        };
        serde_json::to_writer(&mut self.out, &payload)?;
        writeln!(self.out)?;
        self.out.flush()?;
        self.payloads.push(payload);
        Ok(())
    }
}
