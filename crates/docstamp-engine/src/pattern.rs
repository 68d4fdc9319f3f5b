//! Directive recognition in flattened document text.
//!
//! Directives are written between double braces:
//!
//! | Text           | Type                  |
//! |----------------|-----------------------|
//! | `{{path}}`     | variable              |
//! | `{{#path}}`    | collection start      |
//! | `{{:s:}}`      | collection separator  |
//! | `{{/path}}`    | collection end        |
//! | `{{?expr}}`    | condition start       |
//! | `{{:}}`        | condition else        |
//! | `{{/}}`        | condition end         |
//! | `{{:keyword}}` | inline keyword        |
//! | `{{--}}`       | ignore start          |
//! | `{{/--}}`      | ignore end            |
//!
//! Variables and collection starts accept a formatter after a colon, e.g.
//! `{{Name:toupper}}` or `{{Tags:join(", ")}}`.

use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

static DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]*)\}\}").expect("invalid directive regex"));

/// Kind of a recognised directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternType {
    Variable,
    ConditionStart,
    ConditionElse,
    ConditionEnd,
    CollectionStart,
    CollectionSeparator,
    CollectionEnd,
    InlineKeyword,
    IgnoreStart,
    IgnoreEnd,
    /// Synthetic content container inside a block; never produced by matching.
    None,
}

impl PatternType {
    const ALL: [Self; 11] = [
        Self::Variable,
        Self::ConditionStart,
        Self::ConditionElse,
        Self::ConditionEnd,
        Self::CollectionStart,
        Self::CollectionSeparator,
        Self::CollectionEnd,
        Self::InlineKeyword,
        Self::IgnoreStart,
        Self::IgnoreEnd,
        Self::None,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Variable => "Variable",
            Self::ConditionStart => "ConditionStart",
            Self::ConditionElse => "ConditionElse",
            Self::ConditionEnd => "ConditionEnd",
            Self::CollectionStart => "CollectionStart",
            Self::CollectionSeparator => "CollectionSeparator",
            Self::CollectionEnd => "CollectionEnd",
            Self::InlineKeyword => "InlineKeyword",
            Self::IgnoreStart => "IgnoreStart",
            Self::IgnoreEnd => "IgnoreEnd",
            Self::None => "None",
        }
    }

    /// Parse the name written by [`PatternType::as_str`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Whether the directive opens a block.
    pub fn is_block_start(self) -> bool {
        matches!(
            self,
            Self::ConditionStart | Self::CollectionStart | Self::IgnoreStart | Self::InlineKeyword
        )
    }

    /// Whether the directive closes a block.
    pub fn is_block_end(self) -> bool {
        matches!(self, Self::ConditionEnd | Self::CollectionEnd | Self::IgnoreEnd)
    }

    /// Whether the directive splits a block into sections.
    pub fn is_separator(self) -> bool {
        matches!(self, Self::ConditionElse | Self::CollectionSeparator)
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directive found in text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub pattern_type: PatternType,
    /// Character offset of the opening braces.
    pub index: usize,
    /// Length in characters, braces included.
    pub length: usize,
    /// The directive text, braces included.
    pub text: String,
    /// Path, condition expression or keyword.
    pub expression: String,
    pub formatter: Option<String>,
    pub arguments: Vec<String>,
}

impl PatternMatch {
    /// Character range covered by the directive.
    pub fn span(&self) -> Range<usize> {
        self.index..self.index + self.length
    }
}

/// Find all directives in `text`, in order.
///
/// Offsets are counted in characters. Directives inside an ignore region are
/// dropped; the region's own start and end directives are kept.
pub fn find_patterns(text: &str) -> Vec<PatternMatch> {
    let mut matches = Vec::new();
    let mut ignoring = false;
    let mut byte_pos = 0;
    let mut char_pos = 0;

    for caps in DIRECTIVE_RE.captures_iter(text) {
        let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        char_pos += text[byte_pos..whole.start()].chars().count();
        byte_pos = whole.start();

        let Some(mut found) = classify(body.as_str()) else {
            continue;
        };
        match found.pattern_type {
            PatternType::IgnoreStart if ignoring => continue,
            PatternType::IgnoreStart => ignoring = true,
            PatternType::IgnoreEnd if ignoring => ignoring = false,
            _ if ignoring => continue,
            _ => {}
        }

        found.index = char_pos;
        found.length = whole.as_str().chars().count();
        found.text = whole.as_str().to_owned();
        matches.push(found);
    }

    tracing::debug!(count = matches.len(), "Found directives");
    matches
}

/// Parse a single directive such as `{{Name:toupper}}`.
///
/// Returns `None` when the text is not exactly one directive.
pub fn parse_directive(text: &str) -> Option<PatternMatch> {
    let body = text.strip_prefix("{{")?.strip_suffix("}}")?;
    if body.contains(['{', '}']) {
        return None;
    }
    let mut found = classify(body)?;
    found.length = text.chars().count();
    text.clone_into(&mut found.text);
    Some(found)
}

/// Determine the directive type from the text between the braces.
fn classify(body: &str) -> Option<PatternMatch> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let (pattern_type, rest) = match body {
        "--" => (PatternType::IgnoreStart, ""),
        "/--" => (PatternType::IgnoreEnd, ""),
        "/" => (PatternType::ConditionEnd, ""),
        ":" => (PatternType::ConditionElse, ""),
        ":s:" => (PatternType::CollectionSeparator, ""),
        _ => {
            if let Some(path) = body.strip_prefix('/') {
                (PatternType::CollectionEnd, path)
            } else if let Some(keyword) = body.strip_prefix(':') {
                (PatternType::InlineKeyword, keyword)
            } else if let Some(path) = body.strip_prefix('#') {
                (PatternType::CollectionStart, path)
            } else if let Some(expr) = body.strip_prefix('?') {
                (PatternType::ConditionStart, expr)
            } else {
                (PatternType::Variable, body)
            }
        }
    };

    let (expression, formatter, arguments) = match pattern_type {
        PatternType::Variable | PatternType::CollectionStart => split_formatter(rest),
        _ => (rest.trim().to_owned(), None, Vec::new()),
    };

    Some(PatternMatch {
        pattern_type,
        index: 0,
        length: 0,
        text: String::new(),
        expression,
        formatter,
        arguments,
    })
}

/// Split `path:formatter(arg, ...)` into its parts.
fn split_formatter(text: &str) -> (String, Option<String>, Vec<String>) {
    let Some((path, call)) = text.split_once(':') else {
        return (text.trim().to_owned(), None, Vec::new());
    };
    let call = call.trim();
    let (name, arguments) = match call.split_once('(') {
        Some((name, args)) => {
            let args = args.strip_suffix(')').unwrap_or(args);
            (name.trim(), split_arguments(args))
        }
        None => (call, Vec::new()),
    };
    let formatter = (!name.is_empty()).then(|| name.to_owned());
    (path.trim().to_owned(), formatter, arguments)
}

/// Split a comma separated argument list, honouring single and double quotes.
fn split_arguments(text: &str) -> Vec<String> {
    let mut arguments = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut quoted = false;

    for ch in text.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(ch);
                quoted = true;
            }
            (None, ',') => {
                arguments.push(finish_argument(&current, quoted));
                current.clear();
                quoted = false;
            }
            (None, c) => current.push(c),
        }
    }
    if quoted || !current.trim().is_empty() {
        arguments.push(finish_argument(&current, quoted));
    }
    arguments
}

fn finish_argument(text: &str, quoted: bool) -> String {
    if quoted {
        text.to_owned()
    } else {
        text.trim().to_owned()
    }
}
