//! Character scanner shared by the parser and the evaluator.
//!
//! A quote (`'` or `"`) opens a quoted span only at the start of a token:
//! at the beginning of the text or right after `(` or `,` (whitespace
//! ignored). The next quote of the same kind must then end the token, that
//! is be followed by `,`, `)` or the end of the text. Otherwise the quote is
//! a literal character. Inside a quoted span parentheses, braces and commas
//! are plain text. Apostrophes in values such as `O'Brien` or `'Twas` stay
//! literal.

/// Returns true for the two quote characters of the expression syntax.
pub fn is_quote(c: char) -> bool {
    c == '\'' || c == '"'
}

/// Incremental quote tracker.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuoteState {
    open: Option<char>,
    last_significant: Option<char>,
}

impl QuoteState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker positioned right after an opening parenthesis.
    pub fn after_open_paren() -> Self {
        Self {
            open: None,
            last_significant: Some('('),
        }
    }

    pub fn in_quotes(&self) -> bool {
        self.open.is_some()
    }

    /// Feed one character along with the text that follows it. Returns true
    /// when the character belongs to a quoted span, delimiters included.
    pub fn step(&mut self, c: char, rest: &str) -> bool {
        if let Some(quote) = self.open {
            if c == quote {
                self.open = None;
                self.last_significant = Some(c);
            }
            return true;
        }
        if is_quote(c)
            && matches!(self.last_significant, None | Some('(') | Some(','))
            && closes_token(c, rest)
        {
            self.open = Some(c);
            return true;
        }
        if !c.is_whitespace() {
            self.last_significant = Some(c);
        }
        false
    }
}

fn closes_token(quote: char, rest: &str) -> bool {
    let Some(close) = rest.find(quote) else {
        return false;
    };
    matches!(
        rest[close + quote.len_utf8()..].trim_start().chars().next(),
        None | Some(',') | Some(')')
    )
}

/// Strip one pair of matching surrounding quotes.
pub fn strip_quotes(value: &str) -> &str {
    let mut chars = value.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) if first == last && is_quote(first) => {
            &value[first.len_utf8()..value.len() - last.len_utf8()]
        }
        _ => value,
    }
}

/// Returns true when the whole value is wrapped in matching quotes.
pub fn is_quoted(value: &str) -> bool {
    strip_quotes(value).len() != value.len()
}

/// Split a parameter list on top-level commas, trimming each parameter.
///
/// Quotes are kept; commas inside quoted spans or nested parentheses do not
/// split. An empty or blank list yields no parameters.
pub fn split_arguments(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut params = Vec::new();
    let mut current = String::new();
    let mut quotes = QuoteState::after_open_paren();
    let mut depth = 0usize;

    for (index, c) in text.char_indices() {
        if quotes.step(c, &text[index + c.len_utf8()..]) {
            current.push(c);
            continue;
        }
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                params.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        params.push(current.trim().to_string());
    }
    params
}

/// A `${...}` field reference located in a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSpan {
    /// Byte offset of `$`.
    pub start: usize,
    /// Byte offset one past the closing `}`.
    pub end: usize,
    /// Text between the braces, untrimmed.
    pub body: String,
}

/// Find the top-level `${...}` references of a text.
///
/// Braces nest, so `${uppercase(${name})}` is one reference whose body holds
/// another. `${}` is not a reference; an unterminated `${` is plain text and
/// the scan resumes right after it.
pub fn find_references(text: &str) -> Vec<ReferenceSpan> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut index = 0;

    while index + 1 < bytes.len() {
        if bytes[index] != b'$' || bytes[index + 1] != b'{' {
            index += 1;
            continue;
        }

        let body_start = index + 2;
        let mut depth = 1usize;
        let mut cursor = body_start;
        let mut close = None;
        while cursor < bytes.len() {
            match bytes[cursor] {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(cursor);
                        break;
                    }
                }
                _ => {}
            }
            cursor += 1;
        }

        let Some(close) = close else {
            index = body_start;
            continue;
        };
        if close > body_start {
            spans.push(ReferenceSpan {
                start: index,
                end: close + 1,
                body: text[body_start..close].to_string(),
            });
        }
        index = close + 1;
    }

    spans
}

/// A named function call located in a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSpan {
    /// Byte offset of the first character of the name.
    pub start: usize,
    /// Byte offset one past the closing parenthesis.
    pub end: usize,
    pub name: String,
    /// Raw text between the parentheses.
    pub args: String,
    /// Parenthesis depth of the call, starting at 1.
    pub depth: usize,
    /// True when the arguments contain no parentheses.
    pub innermost: bool,
}

struct Frame {
    name: Option<(usize, String)>,
    open: usize,
    nested: bool,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn name_before(text: &str, open: usize) -> Option<(usize, String)> {
    let prefix = &text[..open];
    let start = prefix
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_word_char(*c))
        .last()
        .map(|(index, _)| index)?;
    Some((start, prefix[start..].to_string()))
}

/// Find every closed, named call (`name(args)`) in a text.
///
/// Parentheses at the top level that are not preceded by a name are plain
/// text. Quotes are only significant inside a call's parentheses.
pub fn find_calls(text: &str) -> Vec<CallSpan> {
    let mut calls = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut quotes = QuoteState::new();

    for (index, c) in text.char_indices() {
        if !stack.is_empty() && quotes.step(c, &text[index + c.len_utf8()..]) {
            continue;
        }
        match c {
            '(' => {
                if let Some(parent) = stack.last_mut() {
                    parent.nested = true;
                    stack.push(Frame {
                        name: name_before(text, index),
                        open: index,
                        nested: false,
                    });
                } else if let Some(name) = name_before(text, index) {
                    quotes = QuoteState::after_open_paren();
                    stack.push(Frame {
                        name: Some(name),
                        open: index,
                        nested: false,
                    });
                }
            }
            ')' => {
                let depth = stack.len();
                if let Some(frame) = stack.pop() {
                    if let Some((start, name)) = frame.name {
                        calls.push(CallSpan {
                            start,
                            end: index + 1,
                            name,
                            args: text[frame.open + 1..index].to_string(),
                            depth,
                            innermost: !frame.nested,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    calls.sort_by_key(|call| call.start);
    calls
}

/// Innermost calls only: calls whose arguments hold no parentheses.
pub fn find_innermost_calls(text: &str) -> Vec<CallSpan> {
    find_calls(text)
        .into_iter()
        .filter(|call| call.innermost)
        .collect()
}

/// Parse a whole text as a single call, returning its name and argument text.
pub fn as_call(text: &str) -> Option<(String, String)> {
    let trimmed = text.trim();
    let call = find_calls(trimmed)
        .into_iter()
        .find(|call| call.depth == 1)?;
    if call.start == 0 && call.end == trimmed.len() {
        Some((call.name, call.args))
    } else {
        None
    }
}

/// Returns true when `open`/`close` are balanced outside quoted spans.
pub fn is_balanced(text: &str, open: char, close: char) -> bool {
    let mut quotes = QuoteState::new();
    let mut count = 0i64;
    for (index, c) in text.char_indices() {
        if quotes.step(c, &text[index + c.len_utf8()..]) {
            continue;
        }
        if c == open {
            count += 1;
        } else if c == close {
            count -= 1;
            if count < 0 {
                return false;
            }
        }
    }
    count == 0
}

/// Maximum parenthesis depth outside quoted spans.
pub fn max_nesting(text: &str) -> usize {
    let mut quotes = QuoteState::new();
    let mut depth = 0usize;
    let mut max = 0usize;
    for (index, c) in text.char_indices() {
        if quotes.step(c, &text[index + c.len_utf8()..]) {
            continue;
        }
        match c {
            '(' => {
                depth += 1;
                max = max.max(depth);
            }
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max
}

/// Collapse whitespace runs outside quoted spans to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    let mut quotes = QuoteState::new();
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for (index, c) in text.char_indices() {
        if quotes.step(c, &text[index + c.len_utf8()..]) {
            out.push(c);
            last_was_space = false;
        } else if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

/// Returns true for identifier-like text (`[A-Za-z_][A-Za-z0-9_]*`).
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => chars.all(is_word_char),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_respects_quotes_and_nesting() {
        let params = split_arguments("'a, b', substring(x, 0, 1) , \"c\"");
        assert_eq!(params, vec!["'a, b'", "substring(x, 0, 1)", "\"c\""]);
        assert!(split_arguments("   ").is_empty());
    }

    #[test]
    fn apostrophes_inside_words_are_literal() {
        assert_eq!(split_arguments("O'Brien, x"), vec!["O'Brien", "x"]);
        assert!(is_balanced("uppercase(O'Brien)", '(', ')'));
    }

    #[test]
    fn strip_quotes_requires_matching_pair() {
        assert_eq!(strip_quotes("'abc'"), "abc");
        assert_eq!(strip_quotes("\"abc\""), "abc");
        assert_eq!(strip_quotes("'abc\""), "'abc\"");
        assert_eq!(strip_quotes("'"), "'");
        assert_eq!(strip_quotes("''"), "");
    }

    #[test]
    fn references_nest_and_skip_empty() {
        let spans = find_references("a ${x} ${} ${uppercase(${name})} ${open");
        let bodies: Vec<_> = spans.iter().map(|span| span.body.as_str()).collect();
        assert_eq!(bodies, vec!["x", "uppercase(${name})"]);
    }

    #[test]
    fn unterminated_reference_does_not_hide_later_ones() {
        let spans = find_references("${open ${a} and ${b}");
        let bodies: Vec<_> = spans.iter().map(|span| span.body.as_str()).collect();
        assert_eq!(bodies, vec!["a", "b"]);
        assert_eq!(spans[0].start, 7);
    }

    #[test]
    fn unmatched_leading_quote_is_literal() {
        let calls = find_calls("uppercase('Twas)");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args, "'Twas");

        let calls = find_calls("concat(x, '-', '90s)");
        assert_eq!(calls.len(), 1);
        assert_eq!(split_arguments(&calls[0].args), vec!["x", "'-'", "'90s"]);
        assert!(is_balanced("concat(x, '-', '90s)", '(', ')'));
    }

    #[test]
    fn innermost_calls_skip_outer_calls() {
        let calls = find_innermost_calls("uppercase(substring(bob, 0, 1)) and length(x)");
        let names: Vec<_> = calls.iter().map(|call| call.name.as_str()).collect();
        assert_eq!(names, vec!["substring", "length"]);
        assert_eq!(calls[0].args, "bob, 0, 1");
    }

    #[test]
    fn quoted_parentheses_do_not_form_calls() {
        let calls = find_calls("concat('x(y)', b)");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "concat");
        assert!(calls[0].innermost);
    }

    #[test]
    fn plain_parentheses_are_text() {
        assert!(find_calls("Hello (world)").is_empty());
        assert_eq!(
            as_call(" padLeft(x, 3) "),
            Some(("padLeft".to_string(), "x, 3".to_string()))
        );
        assert_eq!(as_call("padLeft(x, 3) tail"), None);
    }

    #[test]
    fn nesting_and_whitespace() {
        assert_eq!(max_nesting("a(b(c('(((')))"), 3);
        assert_eq!(collapse_whitespace("  a   b\t( ' x  y ' ) "), "a b ( ' x  y ' )");
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("first_name"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier("a-b"));
    }
}
