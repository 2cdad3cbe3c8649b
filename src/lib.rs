//! # gpt-magic
//! Ask a chat model for code from inside a notebook.
//!
//! `%gpt <query>` sends the query, behind a fixed system prompt, to the OpenAI
//! chat completions endpoint. The reply is split into prose and fenced code
//! blocks: the first explanation is displayed and the first code block is
//! inserted as a new cell after the one that ran the magic.
//!
//! ## Usage
//! ```text
//! %gpt [-c] [-t <0..1>] <query>
//! %%gpt [-c] [-t <0..1>] [query]
//! <cell body appended to the query>
//! ```
//! - `-c`, `--chat`: continue the previous conversation instead of starting a new one.
//! - `-t`, `--temperature`: sampling temperature, between 0 and 1 (default 0).
//! - `--`: ends the flags, for a query starting with `-` (`%gpt -- -5 plus 3`).
//!
//! The library exposes the handler ([`magic::GptMagic`]) and the
//! [`sink::CellSink`] capability a host implements to receive cells. The
//! `gpt-magic` binary is a small line-oriented host built on top of it; see
//! ```shell
//! $ gpt-magic --help
//! ```
//!
//! ## Environment Variables:
//! - `OPENAI_API_KEY`: Required. The key used for every completion.
//! - `OPENAI_MODEL`: Optional. The model to use (default: gpt-3.5-turbo, also valid: gpt-4, gpt-4o, gpt-4o-mini).
//! - `OPENAI_API_BASE`: Optional. Base URL of an OpenAI compatible API (default: https://api.openai.com).
//! - `GPT_MAGIC_MAX_TURNS`: Optional. Caps how many exchanges a `-c` conversation keeps.
//!
//! ## Notes:
//! - A conversation is only extended once the API has answered, so a failed
//!   call can be retried without leaving a dangling question behind.
//! - A code block the model never closes is still delivered as code.
//!
pub mod cli;
pub mod config;
pub mod errors;
pub mod host;
pub mod magic;
pub mod notebook;
pub mod openai;
pub mod segment;
pub mod sink;
pub mod transcript;
