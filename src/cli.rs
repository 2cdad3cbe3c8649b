use std::{
    fmt::{self, Display},
    path::PathBuf,
    str::FromStr,
};

use clap::{command, Parser};

use crate::errors::MagicError;
use crate::sink::Frontend;

/// The default model to use for completions.
pub const DEFAULT_LLM: Model = Model::Gpt35Turbo;
/// The default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.0;
/// The system prompt that always opens a transcript.
pub const SYSTEM_PROMPT: &str = "Ignore previous directions. Imagine you are one of the foremost experts on python development. Only respond with a brief explanation and python code block.";
/// Prepended to the first user query of a transcript.
pub const USER_PREFIX: &str = "Now please ";
/// The name the handler is registered under.
pub const MAGIC_NAME: &str = "gpt";

/// Various models supported by gpt-magic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    Gpt35Turbo,
    Gpt4,
    Gpt4o,
    Gpt4oMini,
}

impl Model {
    pub fn all_models() -> Vec<String> {
        [Model::Gpt35Turbo, Model::Gpt4, Model::Gpt4o, Model::Gpt4oMini]
            .iter()
            .map(|m| m.to_string())
            .collect()
    }
}

impl FromStr for Model {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gpt-3.5-turbo" => Ok(Model::Gpt35Turbo),
            "gpt3.5-turbo" => Ok(Model::Gpt35Turbo),
            "gpt-4" => Ok(Model::Gpt4),
            "gpt4" => Ok(Model::Gpt4),
            "gpt-4o" => Ok(Model::Gpt4o),
            "gpt4o" => Ok(Model::Gpt4o),
            "gpt-4o-mini" => Ok(Model::Gpt4oMini),
            "gpt4o-mini" => Ok(Model::Gpt4oMini),
            _ => Err(format!(
                "Invalid model: {}. Choose from: {}.",
                s,
                Model::all_models().join(", ")
            )),
        }
    }
}

impl Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Gpt35Turbo => write!(f, "gpt-3.5-turbo"),
            Model::Gpt4 => write!(f, "gpt-4"),
            Model::Gpt4o => write!(f, "gpt-4o"),
            Model::Gpt4oMini => write!(f, "gpt-4o-mini"),
        }
    }
}

/// CLI for the `gpt-magic` notebook host
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Front-end the generated cells are delivered to (notebook or shell).
    #[arg(short, long, default_value = "shell")]
    pub frontend: Frontend,
    /// Skip the credential check when loading the extension.
    #[arg(long)]
    pub no_validate: bool,
    /// Write the session's cells to this `.ipynb` file on exit.
    #[arg(short, long)]
    pub save: Option<PathBuf>,
    /// Overrides `OPENAI_MODEL`.
    #[arg(short, long)]
    pub model: Option<Model>,
}

/// Flags accepted by `%gpt` / `%%gpt`.
#[derive(Debug, Parser)]
#[command(
    name = "%gpt",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true
)]
struct MagicArgs {
    /// Keep the transcript from previous invocations.
    #[arg(short, long)]
    chat: bool,
    #[arg(short, long, default_value_t = DEFAULT_TEMPERATURE, allow_negative_numbers = true)]
    temperature: f32,
    #[arg(trailing_var_arg = true)]
    query: Vec<String>,
}

/// A parsed `%gpt` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub retain: bool,
    pub temperature: f32,
    pub query: String,
}

/// Parse the text following `%gpt`, plus the cell body for the `%%gpt` form.
pub fn parse_invocation(line: &str, cell: Option<&str>) -> Result<Invocation, MagicError> {
    let args = MagicArgs::try_parse_from(line.split_whitespace())
        .map_err(|e| MagicError::InvalidFlags(e.render().to_string().trim().to_string()))?;

    // NaN fails `contains` as well
    if !(0.0..=1.0).contains(&args.temperature) {
        return Err(MagicError::TemperatureOutOfRange(args.temperature));
    }

    let mut query = args.query.join(" ");
    if let Some(body) = cell.map(str::trim).filter(|b| !b.is_empty()) {
        if !query.is_empty() {
            query.push('\n');
        }
        query.push_str(body);
    }
    if query.is_empty() {
        return Err(MagicError::EmptyQuery);
    }

    Ok(Invocation {
        retain: args.chat,
        temperature: args.temperature,
        query,
    })
}
