//! In-memory notebook kept by the host, exportable as nbformat 4 JSON.

use std::{fs, path::Path};

use serde_json::{json, Value};
use tracing::info;

use crate::errors::MagicError;
use crate::sink::{CellKind, CellSink, NewCell};

#[derive(Debug, Default)]
pub struct Notebook {
    cells: Vec<NewCell>,
}

impl Notebook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cell: NewCell) {
        self.cells.push(cell);
    }

    pub fn cells(&self) -> &[NewCell] {
        &self.cells
    }

    pub fn to_ipynb(&self) -> Value {
        let cells: Vec<Value> = self.cells.iter().map(cell_json).collect();
        json!({
            "cells": cells,
            "metadata": {
                "kernelspec": {
                    "display_name": "Python 3",
                    "language": "python",
                    "name": "python3"
                },
                "language_info": { "name": "python" }
            },
            "nbformat": 4,
            "nbformat_minor": 5
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), MagicError> {
        let text = serde_json::to_string_pretty(&self.to_ipynb())?;
        fs::write(path.as_ref(), text)?;
        info!(path = %path.as_ref().display(), cells = self.cells.len(), "notebook saved");
        Ok(())
    }
}

/// nbformat stores source as a list of lines, each keeping its newline.
fn source_lines(source: &str) -> Vec<&str> {
    source.split_inclusive('\n').collect()
}

fn cell_json(cell: &NewCell) -> Value {
    match cell.kind {
        CellKind::Code => json!({
            "cell_type": "code",
            "execution_count": null,
            "metadata": {},
            "outputs": [],
            "source": source_lines(&cell.source),
        }),
        CellKind::Markdown => json!({
            "cell_type": "markdown",
            "metadata": {},
            "source": source_lines(&cell.source),
        }),
    }
}

/// Forwards to another sink and records every inserted cell in a notebook.
pub struct CollectingSink<'a, S: CellSink + ?Sized> {
    inner: &'a mut S,
    notebook: &'a mut Notebook,
}

impl<'a, S: CellSink + ?Sized> CollectingSink<'a, S> {
    pub fn new(inner: &'a mut S, notebook: &'a mut Notebook) -> Self {
        CollectingSink { inner, notebook }
    }
}

impl<S: CellSink + ?Sized> CellSink for CollectingSink<'_, S> {
    fn display_markdown(&mut self, text: &str) -> Result<(), MagicError> {
        self.inner.display_markdown(text)
    }

    fn insert_cell(&mut self, cell: &NewCell) -> Result<(), MagicError> {
        self.inner.insert_cell(cell)?;
        self.notebook.push(cell.clone());
        Ok(())
    }
}
