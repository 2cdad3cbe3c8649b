//! The `%gpt` magic command and the command table it is registered in.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::cli::{parse_invocation, Model, MAGIC_NAME};
use crate::config::Config;
use crate::errors::MagicError;
use crate::openai::{ChatMessage, ChatRequest, OpenAiClient};
use crate::segment::{first_code, first_markdown, segment, Segment};
use crate::sink::{CellSink, NewCell};
use crate::transcript::Transcript;

/// A command the host can dispatch `%name` / `%%name` cells to.
pub trait Magic {
    /// `line` is the text after the command name; `cell` is the body of the
    /// `%%` form.
    fn call(
        &mut self,
        line: &str,
        cell: Option<&str>,
        sink: &mut dyn CellSink,
    ) -> Result<(), MagicError>;
}

/// Command table owned by the host.
#[derive(Default)]
pub struct MagicRegistry {
    magics: HashMap<String, Box<dyn Magic>>,
}

impl MagicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `magic` as `name`, replacing any previous handler.
    pub fn register(&mut self, name: &str, magic: Box<dyn Magic>) {
        if self.magics.insert(name.to_string(), magic).is_some() {
            info!(name, "replaced existing magic");
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.magics.contains_key(name)
    }

    pub fn dispatch(
        &mut self,
        name: &str,
        line: &str,
        cell: Option<&str>,
        sink: &mut dyn CellSink,
    ) -> Result<(), MagicError> {
        let magic = self
            .magics
            .get_mut(name)
            .ok_or_else(|| MagicError::UnknownMagic(name.to_string()))?;
        magic.call(line, cell, sink)
    }
}

/// Load the extension: optionally check the credential, then register `%gpt`.
pub fn load_extension(
    registry: &mut MagicRegistry,
    config: &Config,
    validate: bool,
) -> Result<(), MagicError> {
    let magic = GptMagic::new(config);
    if validate {
        magic.client.check_api_key()?;
    }
    registry.register(MAGIC_NAME, Box::new(magic));
    info!(model = %config.model, "loaded %{} magic", MAGIC_NAME);
    Ok(())
}

/// What one invocation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub reply: ChatMessage,
    pub segments: Vec<Segment>,
}

/// Handler for `%gpt`.
pub struct GptMagic {
    client: OpenAiClient,
    model: Model,
    transcript: Transcript,
}

impl GptMagic {
    pub fn new(config: &Config) -> Self {
        GptMagic {
            client: OpenAiClient::new(config),
            model: config.model,
            transcript: Transcript::bounded(config.max_turns),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Run one invocation. The transcript only changes once a reply arrived;
    /// without `-c` it is then replaced by the new two-message exchange.
    pub fn run(
        &mut self,
        line: &str,
        cell: Option<&str>,
        sink: &mut dyn CellSink,
    ) -> Result<Outcome, MagicError> {
        let invocation = parse_invocation(line, cell)?;
        let messages = if invocation.retain {
            self.transcript.extended(&invocation.query)
        } else {
            Transcript::new().extended(&invocation.query)
        };
        let request = ChatRequest {
            model: self.model.to_string(),
            temperature: invocation.temperature,
            messages: &messages,
        };
        let completion = self.client.complete(&request)?;
        let reply = completion.message;
        self.transcript.commit(messages, reply.clone());

        let segments = segment(&reply.content);
        if segments.is_empty() {
            warn!("completion reply was empty");
        }
        deliver(&segments, sink)?;

        Ok(Outcome { reply, segments })
    }
}

/// Hand the first prose span and the first code block to the host.
fn deliver(segments: &[Segment], sink: &mut dyn CellSink) -> Result<(), MagicError> {
    if let Some(text) = first_markdown(segments) {
        sink.display_markdown(text)?;
    }
    if let Some(code) = first_code(segments) {
        sink.insert_cell(&NewCell::code(code.content()))?;
    }
    Ok(())
}

impl Magic for GptMagic {
    fn call(
        &mut self,
        line: &str,
        cell: Option<&str>,
        sink: &mut dyn CellSink,
    ) -> Result<(), MagicError> {
        self.run(line, cell, sink).map(|_| ())
    }
}
