use thiserror::Error;

/// gpt-magic errors
#[derive(Debug, Error)]
pub enum MagicError {
    #[error("Please set the OPENAI_API_KEY environment variable.")]
    MissingApiKey,
    #[error("The OpenAI API rejected the configured key (status {status}).")]
    InvalidApiKey { status: u16 },
    #[error("{0}")]
    UnsupportedModel(String),
    #[error("Invalid value for {var}: {value}")]
    InvalidSetting { var: &'static str, value: String },
    #[error("Invalid %gpt arguments: {0}\nA query starting with '-' goes after `--`, e.g. %gpt -c -- -5 plus 3")]
    InvalidFlags(String),
    #[error("Temperature must be between 0 and 1, got {0}.")]
    TemperatureOutOfRange(f32),
    #[error("No query given. Usage: %gpt [-c] [-t <0..1>] [--] <query>")]
    EmptyQuery,
    #[error("Error: {status}, {body}")]
    Api { status: u16, body: String },
    #[error("Failed to decode completion response: {0}")]
    MalformedResponse(String),
    #[error("Completion response contained no choices.")]
    NoChoices,
    #[error("Unsupported environment: {0}. Choose from: notebook, shell.")]
    UnsupportedEnvironment(String),
    #[error("Unknown magic command: %{0}")]
    UnknownMagic(String),
    #[error("Request error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    StdioError(#[from] std::io::Error),
}

impl MagicError {
    /// Whether the error was raised before anything was sent over the network.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            MagicError::InvalidFlags(_) | MagicError::TemperatureOutOfRange(_) | MagicError::EmptyQuery
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_message_carries_status() {
        let err = MagicError::Api {
            status: 401,
            body: "{\"error\":\"bad key\"}".to_string(),
        };
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("bad key"));
        assert!(!err.is_input_error());
    }

    #[test]
    fn flag_errors_are_input_errors() {
        assert!(MagicError::TemperatureOutOfRange(1.5).is_input_error());
        assert!(MagicError::EmptyQuery.is_input_error());
    }
}
