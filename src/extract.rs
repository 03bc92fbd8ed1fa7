//! Recovers the learner-authored part of a submission.
//!
//! Learners either type only the method body or paste the whole scaffold
//! back with their code inside it. Extraction tells the two apart with a
//! prioritized list of signature rules: the first rule that matches wins,
//! the body of the matched method is cut out by brace matching, and one
//! level of nesting is unwrapped if the body turns out to be another full
//! program. Extraction never fails; on doubt it returns more text, not less.

use lazy_static::lazy_static;
use regex::Regex;

use crate::template::{PLACEHOLDER, Scaffold};

lazy_static! {
    static ref TYPE_DECLARATION: Regex =
        Regex::new(r"\b(?:class|interface|enum|record)\s+[A-Za-z_]\w*").unwrap();
    static ref IMPORT_DIRECTIVE: Regex =
        Regex::new(r"(?m)^\s*(?:import|package)\s+[\w.*]+\s*;").unwrap();
    /// `) throws IOException {`, `) throws A, b.C {`
    static ref THROWS_CLAUSE: Regex =
        Regex::new(r"\)\s*throws\s+[\w.]+(?:\s*,\s*[\w.]+)*\s*\{").unwrap();
    /// `public [modifiers] Type name(params) [throws ...] {`, group 1 is the name
    static ref GENERIC_MEMBER: Regex = Regex::new(
        r"\bpublic\s+(?:(?:static|final|synchronized|abstract)\s+)*[\w<>\[\],.?\s]*?\b(\w+)\s*\([^()]*\)\s*(?:throws\s+[\w.,\s]+)?\{"
    )
    .unwrap();
    static ref RETURN_STATEMENT: Regex = Regex::new(r"(?m)^\s*(return\b[^;]*;)").unwrap();
    static ref TEMPLATE_COMMENT: Regex = Regex::new(
        r"(?im)^[ \t]*(?://|/\*+|\*)[ \t]*(?:todo|your code here|write your code|implement (?:this|here)|student code)\b.*(?:\r?\n|$)"
    )
    .unwrap();
}

const ENTRY_POINT: &str = "main";

/// Where a signature rule matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureMatch {
    /// Offset of the first character of the signature
    pub start: usize,
    /// Offset just past the opening brace of the method body
    pub body_start: usize,
}

/// Signature patterns, tried in declaration order from most to least specific
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureRule<'a> {
    /// The exact signature line the template store declared for the question
    ExpectedSignature(&'a str),
    /// Closing parenthesis, a declared-exception clause, then `{`
    ThrowsClausePattern,
    /// Any public member other than the entry point
    GenericMemberPattern,
}

impl<'a> SignatureRule<'a> {
    /// Rules applicable to `scaffold`, in priority order
    pub fn for_scaffold(scaffold: &'a Scaffold) -> Vec<SignatureRule<'a>> {
        let mut rules = Vec::with_capacity(3);
        if let Some(signature) = scaffold.signature().filter(|s| !s.trim().is_empty()) {
            rules.push(SignatureRule::ExpectedSignature(signature));
        }
        rules.push(SignatureRule::ThrowsClausePattern);
        rules.push(SignatureRule::GenericMemberPattern);
        rules
    }

    /// First match in scan order, ignoring comments and literals
    pub fn find(&self, text: &str) -> Option<SignatureMatch> {
        self.find_in_code(&code_only(text))
    }

    fn find_in_code(&self, code: &str) -> Option<SignatureMatch> {
        let to_match = |m: regex::Match<'_>| SignatureMatch {
            start: m.start(),
            body_start: m.end(),
        };

        match self {
            SignatureRule::ExpectedSignature(signature) => {
                signature_regex(signature).and_then(|re| re.find(code).map(to_match))
            }
            SignatureRule::ThrowsClausePattern => THROWS_CLAUSE.find(code).map(to_match),
            SignatureRule::GenericMemberPattern => GENERIC_MEMBER
                .captures_iter(code)
                .filter(|caps| caps.get(1).is_some_and(|name| name.as_str() != ENTRY_POINT))
                .find_map(|caps| caps.get(0))
                .map(to_match),
        }
    }
}

/// Builds a whitespace-tolerant pattern from a declared signature line.
fn signature_regex(signature: &str) -> Option<Regex> {
    let mut pattern = signature
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    if !signature.trim_end().ends_with('{') {
        pattern.push_str(r"[^{;]*\{");
    }

    Regex::new(&pattern)
        .map_err(|e| log::debug!("Ignoring unusable signature {signature:?}: {e}"))
        .ok()
}

/// Isolates the learner-authored fragment of `raw_submission`.
///
/// Only a submission shaped like a program (declarations at the top level
/// and no top-level statements) is taken apart; anything else is already a
/// bare fragment and is returned unchanged. When no rule matches, the
/// submission is returned unchanged as well.
pub fn extract_fragment(raw_submission: &str, scaffold: &Scaffold) -> String {
    let rules = SignatureRule::for_scaffold(scaffold);
    let code = code_only(raw_submission);

    if !is_program(&code, &rules) {
        return raw_submission.to_string();
    }

    let Some((rule, signature)) = rules
        .iter()
        .find_map(|rule| rule.find_in_code(&code).map(|m| (rule, m)))
    else {
        log::debug!("No signature rule matched, keeping submission verbatim");
        return raw_submission.to_string();
    };
    log::debug!("Extracting fragment with {rule:?} at offset {}", signature.start);

    let body = method_body(raw_submission, &code, signature.body_start);
    dedent(&unwrap_nested(body, rule))
}

/// One level of recursion into a body that is itself a whole program
/// containing the target method again. Any other body is kept as is.
fn unwrap_nested(body: &str, rule: &SignatureRule<'_>) -> String {
    let code = code_only(body);
    let nested = is_program(&code, &[*rule])
        .then(|| rule.find_in_code(&code))
        .flatten();
    let Some(inner) = nested else {
        return strip_template_markers(body);
    };

    let inner_body = strip_template_markers(method_body(body, &code, inner.body_start));
    if !inner_body.trim().is_empty() {
        return inner_body;
    }

    match RETURN_STATEMENT.captures(&code).and_then(|caps| caps.get(1)) {
        Some(statement) => body[statement.range()].to_string(),
        None => strip_template_markers(body),
    }
}

/// Whether `code` reads as a program or a pasted method rather than a
/// statement list: a type declaration, import directive or signature
/// rule matches at the top level, and no statement sits there.
fn is_program(code: &str, rules: &[SignatureRule<'_>]) -> bool {
    let outline = top_level(code);
    let declares = TYPE_DECLARATION.is_match(&outline)
        || IMPORT_DIRECTIVE.is_match(&outline)
        || rules.iter().any(|rule| rule.find_in_code(&outline).is_some());

    declares && !IMPORT_DIRECTIVE.replace_all(&outline, "").contains(';')
}

/// `text` with comments and the contents of string/char literals blanked
/// out. Byte offsets and line breaks are kept.
pub(crate) fn code_only(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut code = bytes.to_vec();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                let close = skip_literal(bytes, i);
                blank(&mut code, i + 1, close);
                i = close + 1;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let end = skip_until(bytes, i + 2, b"\n");
                blank(&mut code, i, end);
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = (skip_until(bytes, i + 2, b"*/") + 1).min(bytes.len());
                blank(&mut code, i, end);
                i = end;
            }
            _ => i += 1,
        }
    }

    String::from_utf8(code).unwrap_or_else(|_| text.to_string())
}

fn blank(code: &mut [u8], from: usize, to: usize) {
    let to = to.min(code.len());
    for b in code.iter_mut().take(to).skip(from) {
        if *b != b'\n' {
            *b = b' ';
        }
    }
}

/// `code` with everything nested inside braces blanked. The outermost
/// braces themselves are kept.
fn top_level(code: &str) -> String {
    let mut depth = 0usize;
    let outline: Vec<u8> = code
        .bytes()
        .map(|b| {
            let keep = match b {
                b'{' => {
                    depth += 1;
                    depth == 1
                }
                b'}' => {
                    depth = depth.saturating_sub(1);
                    depth == 0
                }
                _ => depth == 0,
            };
            if keep || b == b'\n' { b } else { b' ' }
        })
        .collect();

    String::from_utf8(outline).unwrap_or_default()
}

/// Text between `body_start` and its matching closing brace, or to the end
/// of `text` when the braces never balance. `code` is `text` as returned by
/// [`code_only`].
fn method_body<'t>(text: &'t str, code: &str, body_start: usize) -> &'t str {
    match matching_brace(code, body_start) {
        Some(end) => &text[body_start..end],
        None => &text[body_start..],
    }
}

/// Offset of the `}` closing a block whose `{` ends just before `body_start`.
fn matching_brace(code: &str, body_start: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (i, b) in code.bytes().enumerate().skip(body_start) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Index of the closing quote (or line end) of the literal opened at `start`.
fn skip_literal(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut j = start + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'\n' => return j,
            c if c == quote => return j,
            _ => j += 1,
        }
    }
    bytes.len()
}

/// Index of the last byte of `terminator`, searching from `from`.
fn skip_until(bytes: &[u8], from: usize, terminator: &[u8]) -> usize {
    bytes
        .get(from..)
        .and_then(|rest| rest.windows(terminator.len()).position(|w| w == terminator))
        .map(|pos| from + pos + terminator.len() - 1)
        .unwrap_or(bytes.len())
}

fn strip_template_markers(body: &str) -> String {
    TEMPLATE_COMMENT
        .replace_all(&body.replace(PLACEHOLDER, ""), "")
        .into_owned()
}

/// Drops surrounding blank lines, trailing whitespace, and the block's
/// shared indentation level.
fn dedent(body: &str) -> String {
    let lines: Vec<&str> = body.lines().map(str::trim_end).collect();
    let first = lines.iter().position(|l| !l.is_empty());
    let last = lines.iter().rposition(|l| !l.is_empty());
    let (Some(first), Some(last)) = (first, last) else {
        return String::new();
    };
    let lines = &lines[first..=last];

    let level = lines
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|l| l.get(level..).unwrap_or_else(|| l.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}
