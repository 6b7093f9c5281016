//! Tokenization of raw lines and heterogeneous messages.
//!
//! Splitting respects single and double quotes (a quoted run is one token)
//! and backslash escapes; CR/LF always act as boundaries. A heterogeneous
//! message is flattened into a unit list where text segments become words and
//! non-text segments stay opaque elements.

/// One segment of a heterogeneous message.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Plain text, split into words by the active separators.
    Text(String),
    /// Non-text payload (mention, image, ...), carried opaquely.
    Element {
        /// Kind tag (e.g. `"at"`, `"image"`).
        kind: String,
        /// Opaque payload value.
        value: String,
    },
}

/// One matching unit after flattening.
#[derive(Debug, Clone, PartialEq)]
pub enum Unit {
    /// A word token.
    Word(String),
    /// An opaque element.
    Element {
        /// Kind tag.
        kind: String,
        /// Opaque payload value.
        value: String,
    },
}

impl Unit {
    /// The word payload, if this unit is a word.
    pub fn as_word(&self) -> Option<&str> {
        match self {
            Unit::Word(w) => Some(w),
            Unit::Element { .. } => None,
        }
    }

    /// Display form used in diagnostics.
    pub fn display(&self) -> String {
        match self {
            Unit::Word(w) => w.clone(),
            Unit::Element { kind, .. } => format!("<{kind}>"),
        }
    }
}

/// A tokenized parse input.
///
/// # Examples
///
/// ```
/// use command_grammar_engine::MessageInput;
///
/// let input = MessageInput::from_line("deploy \"eu west\" --fast", " ");
/// assert_eq!(input.units.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MessageInput {
    /// Flattened matching units.
    pub units: Vec<Unit>,
    /// Original line form, used for caching and diagnostics.
    pub origin: String,
}

impl MessageInput {
    /// Tokenizes a raw line.
    pub fn from_line(line: &str, separators: &str) -> Self {
        let units = split(line, separators).into_iter().map(Unit::Word).collect();
        Self {
            units,
            origin: line.to_string(),
        }
    }

    /// Flattens a heterogeneous message.
    pub fn from_segments(segments: &[Segment], separators: &str) -> Self {
        let mut units = Vec::new();
        let mut origin = String::new();
        for segment in segments {
            match segment {
                Segment::Text(text) => {
                    units.extend(split(text, separators).into_iter().map(Unit::Word));
                    if !origin.is_empty() {
                        origin.push(' ');
                    }
                    origin.push_str(text);
                }
                Segment::Element { kind, value } => {
                    units.push(Unit::Element {
                        kind: kind.clone(),
                        value: value.clone(),
                    });
                    if !origin.is_empty() {
                        origin.push(' ');
                    }
                    origin.push_str(&format!("<{kind}:{value}>"));
                }
            }
        }
        Self { units, origin }
    }

    /// `true` when no units were produced.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Splits `text` on any separator character, respecting quotes and escapes.
///
/// # Examples
///
/// ```
/// use command_grammar_engine::token::split;
///
/// assert_eq!(split("a b  c", " "), vec!["a", "b", "c"]);
/// assert_eq!(split("say \"hello world\"", " "), vec!["say", "hello world"]);
/// assert_eq!(split("say \\\"hi", " "), vec!["say", "\"hi"]);
/// ```
pub fn split(text: &str, separators: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for ch in text.chars() {
        if escaped {
            buf.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '\'' | '"' => match quote {
                None => quote = Some(ch),
                Some(q) if q == ch => quote = None,
                Some(_) => buf.push(ch),
            },
            '\n' | '\r' => flush(&mut out, &mut buf),
            c if quote.is_none() && separators.contains(c) => flush(&mut out, &mut buf),
            c => buf.push(c),
        }
    }
    flush(&mut out, &mut buf);
    out
}

/// Splits off the first token, returning `(token, rest)`.
///
/// The rest keeps its original text form (quotes and escapes untouched).
pub fn split_once<'a>(text: &'a str, separators: &str) -> (String, &'a str) {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut token = String::new();
    for (idx, ch) in text.char_indices() {
        if escaped {
            token.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '\'' | '"' => match quote {
                None => quote = Some(ch),
                Some(q) if q == ch => quote = None,
                Some(_) => token.push(ch),
            },
            c if (quote.is_none() && separators.contains(c)) || c == '\n' || c == '\r' => {
                return (token, text[idx + c.len_utf8()..].trim_start());
            }
            c => token.push(c),
        }
    }
    (token, "")
}

fn flush(out: &mut Vec<String>, buf: &mut String) {
    if !buf.is_empty() {
        out.push(std::mem::take(buf));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_collapses_repeated_separators() {
        assert_eq!(split("a  b   c", " "), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_respects_quotes() {
        assert_eq!(
            split("send 'a b' \"c d\"", " "),
            vec!["send", "a b", "c d"]
        );
    }

    #[test]
    fn test_split_crlf_always_separates() {
        assert_eq!(split("a\nb\rc", " "), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_escaped_quote_is_literal() {
        assert_eq!(split(r#"say \"hi"#, " "), vec!["say", "\"hi"]);
    }

    #[test]
    fn test_split_once_returns_rest_verbatim() {
        let (head, rest) = split_once("cmd a 'b c'", " ");
        assert_eq!(head, "cmd");
        assert_eq!(rest, "a 'b c'");
    }

    #[test]
    fn test_from_segments_mixes_words_and_elements() {
        let input = MessageInput::from_segments(
            &[
                Segment::Element {
                    kind: "at".to_string(),
                    value: "12345".to_string(),
                },
                Segment::Text("weather london".to_string()),
            ],
            " ",
        );
        assert_eq!(input.units.len(), 3);
        assert!(matches!(input.units[0], Unit::Element { .. }));
        assert_eq!(input.units[1], Unit::Word("weather".to_string()));
    }
}
