//! Splits a model reply into prose and fenced code blocks.

const FENCE: &str = "```";

/// One span of a reply, in the order it appeared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Markdown(String),
    Code {
        /// Tag after the opening fence, e.g. `python`. Not validated.
        language: Option<String>,
        code: String,
    },
}

impl Segment {
    pub fn kind(&self) -> &'static str {
        match self {
            Segment::Markdown(_) => "markdown",
            Segment::Code { .. } => "code",
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Segment::Markdown(text) => text,
            Segment::Code { code, .. } => code,
        }
    }
}

/// Scan `text` for pairs of triple-backtick delimiters. The word right after
/// an opening fence on its own line is the language tag; a block opened and
/// closed on one line takes its first word as the tag only when more text
/// follows it. A block left open at the end of the text is still returned as
/// code.
pub fn segment(text: &str) -> Vec<Segment> {
    let mut scanner = Scanner::default();
    for line in text.lines() {
        scanner.feed(line);
    }
    scanner.finish()
}

struct OpenBlock<'a> {
    language: Option<String>,
    lines: Vec<&'a str>,
}

impl OpenBlock<'_> {
    fn into_segment(self) -> Segment {
        let code = self.lines.join("\n");
        Segment::Code {
            language: self.language,
            code: code.trim_start_matches('\n').trim_end().to_string(),
        }
    }
}

#[derive(Default)]
struct Scanner<'a> {
    segments: Vec<Segment>,
    prose: String,
    block: Option<OpenBlock<'a>>,
}

impl<'a> Scanner<'a> {
    fn feed(&mut self, line: &'a str) {
        let mut rest = line;
        loop {
            match self.block.take() {
                None => {
                    let Some(at) = rest.find(FENCE) else {
                        self.prose.push_str(rest);
                        self.prose.push('\n');
                        return;
                    };
                    self.prose.push_str(&rest[..at]);
                    self.flush_prose();

                    let after = &rest[at + FENCE.len()..];
                    match after.find(FENCE) {
                        Some(close) => {
                            self.segments.push(inline_block(&after[..close]));
                            rest = &after[close + FENCE.len()..];
                        }
                        None => {
                            let tag = after.trim();
                            self.block = Some(OpenBlock {
                                language: (!tag.is_empty()).then(|| tag.to_string()),
                                lines: Vec::new(),
                            });
                            return;
                        }
                    }
                }
                Some(mut block) => {
                    let Some(at) = rest.find(FENCE) else {
                        block.lines.push(rest);
                        self.block = Some(block);
                        return;
                    };
                    let before = &rest[..at];
                    if !before.trim().is_empty() {
                        block.lines.push(before);
                    }
                    self.segments.push(block.into_segment());
                    rest = &rest[at + FENCE.len()..];
                }
            }
            if rest.trim().is_empty() {
                return;
            }
        }
    }

    fn flush_prose(&mut self) {
        let trimmed = self.prose.trim();
        if !trimmed.is_empty() {
            self.segments.push(Segment::Markdown(trimmed.to_string()));
        }
        self.prose.clear();
    }

    fn finish(mut self) -> Vec<Segment> {
        if let Some(block) = self.block.take() {
            self.segments.push(block.into_segment());
        }
        self.flush_prose();
        self.segments
    }
}

/// `python print(1)` -> tagged `print(1)`; a lone word is code.
fn inline_block(inner: &str) -> Segment {
    let inner = inner.trim();
    match inner.split_once(char::is_whitespace) {
        Some((tag, code)) if is_language_tag(tag) => Segment::Code {
            language: Some(tag.to_string()),
            code: code.trim().to_string(),
        },
        _ => Segment::Code {
            language: None,
            code: inner.to_string(),
        },
    }
}

fn is_language_tag(word: &str) -> bool {
    word.starts_with(|c: char| c.is_ascii_alphabetic())
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '#' | '-' | '_' | '.'))
}

/// First prose span, if any.
pub fn first_markdown(segments: &[Segment]) -> Option<&str> {
    segments.iter().find_map(|s| match s {
        Segment::Markdown(text) => Some(text.as_str()),
        _ => None,
    })
}

/// First code block with something in it. Empty fenced blocks are kept by
/// [`segment`] but never become cells.
pub fn first_code(segments: &[Segment]) -> Option<&Segment> {
    segments
        .iter()
        .find(|s| matches!(s, Segment::Code { code, .. } if !code.trim().is_empty()))
}
