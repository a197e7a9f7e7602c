//! Source minification.
//!
//! The minifier is one-directional: `decode` returns its input unchanged.
//! It is meant as a pre-pass in front of a reversible codec, and only removes
//! or rewrites what a JavaScript engine would treat as equivalent. As a codec
//! it receives escaped bytes, so it unescapes, minifies and escapes again.
//!
//! The scanner understands string, template and comment syntax well enough to
//! leave literals alone. Regular expression literals are not recognised, so a
//! `//` inside a regex is treated as a comment.

use regex::{Captures, Regex};
use tracing::warn;

use super::{CodecError, TokenCodec, MINIFY_INDEX};
use crate::escape::{escape, unescape};
use crate::options::MinifyOptions;

/// Largest integer a JavaScript number represents exactly.
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentKind {
    Code,
    Literal,
    LineComment,
    BlockComment,
}

#[derive(Debug, Clone, Copy)]
struct Segment<'a> {
    kind: SegmentKind,
    text: &'a str,
}

/// Position of a code segment within the source.
#[derive(Debug, Clone, Copy, Default)]
struct Context {
    first: bool,
    last: bool,
    after_line_comment: bool,
}

/// Compiled matchers for every minification pass.
///
/// Built once, together with the registry, and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct Minifier {
    entity: Regex,
    line_break: Regex,
    any_space: Regex,
    radix_literal: Regex,
    boolean: Regex,
    constant: Regex,
}

impl Minifier {
    /// Compile the matchers.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            entity: Regex::new(r"&(?:(lt|gt|amp|quot|apos)|#([0-9]{1,7})|#[xX]([0-9a-fA-F]{1,6}));")?,
            line_break: Regex::new(r"[^\S\n]*\n\s*")?,
            any_space: Regex::new(r"\s+")?,
            radix_literal: Regex::new(r"\b0(?:[xX]([0-9a-fA-F]+)|[oO]([0-7]+)|[bB]([01]+))\b")?,
            boolean: Regex::new(r"\b(?:true|false)\b")?,
            constant: Regex::new(r"\(\s*([0-9]+)\s*([-+*])\s*([0-9]+)\s*\)")?,
        })
    }

    /// Apply every pass enabled in `options`.
    pub fn minify(&self, text: &str, options: &MinifyOptions) -> String {
        let mut out = text.to_string();
        if options.decode_entities() {
            out = self.decode_entities(&out);
        }
        if options.comments() {
            out = strip_comments(&out);
        }
        if options.whitespace() {
            out = self.trim_lines(&out);
        }
        if options.unsafe_whitespace() {
            out = self.collapse_whitespace(&out);
        }
        if options.fold_literals() {
            out = map_code(&out, |code, _| self.fold_literals(code));
        }
        if options.compact_booleans() {
            out = map_code(&out, |code, _| self.compact_booleans(code));
        }
        if options.eval_constants() {
            out = map_code(&out, |code, _| self.eval_constants(code));
        }
        out
    }

    fn decode_entities(&self, text: &str) -> String {
        self.entity
            .replace_all(text, |caps: &Captures| {
                let decoded = if let Some(name) = caps.get(1) {
                    match name.as_str() {
                        "lt" => Some('<'),
                        "gt" => Some('>'),
                        "amp" => Some('&'),
                        "quot" => Some('"'),
                        _ => Some('\''),
                    }
                } else if let Some(dec) = caps.get(2) {
                    dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
                } else {
                    caps.get(3)
                        .and_then(|hex| u32::from_str_radix(hex.as_str(), 16).ok())
                        .and_then(char::from_u32)
                };
                match decoded {
                    Some(c) => c.to_string(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    fn trim_lines(&self, text: &str) -> String {
        map_code(text, |code, ctx| {
            let mut out = self.line_break.replace_all(code, "\n").into_owned();
            if ctx.first {
                out = out.trim_start().to_string();
            }
            if ctx.last {
                out = out.trim_end().to_string();
            }
            out
        })
    }

    fn collapse_whitespace(&self, text: &str) -> String {
        map_code(text, |code, ctx| {
            // A line comment still needs its terminating newline.
            let keep_break = ctx.after_line_comment
                && code
                    .chars()
                    .take_while(|c| c.is_whitespace())
                    .any(|c| c == '\n');
            let mut out = self.any_space.replace_all(code, " ").into_owned();
            if ctx.first {
                out = out.trim_start().to_string();
            }
            if ctx.last {
                out = out.trim_end().to_string();
            }
            if keep_break {
                out = format!("\n{}", out.trim_start());
            }
            out
        })
    }

    fn fold_literals(&self, code: &str) -> String {
        replace_checked(code, &self.radix_literal, |caps, _, after| {
            // `255.toString()` would parse as a decimal point.
            if after.starts_with('.') {
                return None;
            }
            let (digits, radix) = if let Some(m) = caps.get(1) {
                (m.as_str(), 16)
            } else if let Some(m) = caps.get(2) {
                (m.as_str(), 8)
            } else {
                (caps.get(3)?.as_str(), 2)
            };
            let value = u64::from_str_radix(digits, radix).ok()?;
            if value > MAX_SAFE_INTEGER {
                return None;
            }
            let decimal = value.to_string();
            (decimal.len() <= caps[0].len()).then_some(decimal)
        })
    }

    fn compact_booleans(&self, code: &str) -> String {
        replace_checked(code, &self.boolean, |caps, before, after| {
            if before.ends_with(['.', '$']) || after.starts_with(['.', '$']) {
                return None;
            }
            // Object keys and ternary branches are left alone.
            if after.trim_start().starts_with(':') {
                return None;
            }
            Some(if &caps[0] == "true" { "!0" } else { "!1" }.to_string())
        })
    }

    fn eval_constants(&self, code: &str) -> String {
        let mut current = code.to_string();
        loop {
            let next = replace_checked(&current, &self.constant, |caps, before, after| {
                let prev = before.trim_end().chars().last();
                if prev.is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | ')' | ']'))
                {
                    return None;
                }
                if after.starts_with('.') {
                    return None;
                }
                let lhs = parse_operand(&caps[1])?;
                let rhs = parse_operand(&caps[3])?;
                let value = match &caps[2] {
                    "+" => lhs.checked_add(rhs),
                    "-" => lhs.checked_sub(rhs),
                    _ => lhs.checked_mul(rhs),
                }?;
                (value <= MAX_SAFE_INTEGER).then(|| value.to_string())
            });
            if next == current {
                return next;
            }
            current = next;
        }
    }
}

fn parse_operand(digits: &str) -> Option<u64> {
    // Leading zeros would be legacy octal.
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    digits.parse::<u64>().ok().filter(|&v| v <= MAX_SAFE_INTEGER)
}

/// Replace matches of `re` where `f` returns a replacement.
///
/// `f` receives the captures plus the text before and after the match.
fn replace_checked(
    code: &str,
    re: &Regex,
    mut f: impl FnMut(&Captures, &str, &str) -> Option<String>,
) -> String {
    let mut out = String::with_capacity(code.len());
    let mut last = 0;
    for caps in re.captures_iter(code) {
        let Some(m) = caps.get(0) else { continue };
        if let Some(replacement) = f(&caps, &code[..m.start()], &code[m.end()..]) {
            out.push_str(&code[last..m.start()]);
            out.push_str(&replacement);
            last = m.end();
        }
    }
    out.push_str(&code[last..]);
    out
}

fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for segment in segments(text) {
        match segment.kind {
            SegmentKind::LineComment => {}
            SegmentKind::BlockComment => out.push(' '),
            SegmentKind::Code | SegmentKind::Literal => out.push_str(segment.text),
        }
    }
    out
}

/// Rewrite code segments with `f`, copying literals and comments verbatim.
fn map_code(text: &str, mut f: impl FnMut(&str, Context) -> String) -> String {
    let parts = segments(text);
    let count = parts.len();
    let mut out = String::with_capacity(text.len());
    for (i, segment) in parts.iter().enumerate() {
        if segment.kind != SegmentKind::Code {
            out.push_str(segment.text);
            continue;
        }
        let ctx = Context {
            first: i == 0,
            last: i + 1 == count,
            after_line_comment: i > 0 && parts[i - 1].kind == SegmentKind::LineComment,
        };
        out.push_str(&f(segment.text, ctx));
    }
    out
}

/// Split source into code, literal and comment segments.
fn segments(text: &str) -> Vec<Segment<'_>> {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < len {
        let (kind, end) = match (bytes[i], bytes.get(i + 1)) {
            (b'/', Some(b'/')) => (
                SegmentKind::LineComment,
                find(bytes, i + 2, b"\n").unwrap_or(len),
            ),
            (b'/', Some(b'*')) => (
                SegmentKind::BlockComment,
                find(bytes, i + 2, b"*/").map_or(len, |p| p + 2),
            ),
            (b'"' | b'\'' | b'`', _) => (SegmentKind::Literal, literal_end(bytes, i)),
            _ => {
                i += 1;
                continue;
            }
        };
        if start < i {
            out.push(Segment {
                kind: SegmentKind::Code,
                text: &text[start..i],
            });
        }
        out.push(Segment {
            kind,
            text: &text[i..end],
        });
        i = end;
        start = end;
    }

    if start < len {
        out.push(Segment {
            kind: SegmentKind::Code,
            text: &text[start..],
        });
    }
    out
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// End of the literal opened at `open` (exclusive). Unterminated quotes end at
/// the line break; template literals run to the end of input.
fn literal_end(bytes: &[u8], open: usize) -> usize {
    let quote = bytes[open];
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            c if c == quote => return i + 1,
            b'\n' if quote != b'`' => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// The `minify` codec.
#[derive(Debug, Clone)]
pub struct MinifyCodec {
    minifier: Minifier,
}

impl MinifyCodec {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            minifier: Minifier::new()?,
        })
    }

    pub fn minifier(&self) -> &Minifier {
        &self.minifier
    }
}

impl TokenCodec for MinifyCodec {
    fn name(&self) -> &'static str {
        "minify"
    }

    fn index(&self) -> u8 {
        MINIFY_INDEX
    }

    fn version(&self) -> u8 {
        1
    }

    fn encode(&self, stream: &[u8], options: &MinifyOptions) -> Vec<u8> {
        if options.is_noop() {
            return stream.to_vec();
        }
        let units = match unescape(stream) {
            Ok(units) => units,
            Err(e) => {
                warn!(error = %e, "stream is not escaped text; skipping minification");
                return stream.to_vec();
            }
        };
        match String::from_utf16(&units) {
            Ok(text) => {
                let minified = self.minifier.minify(&text, options);
                escape(&minified.encode_utf16().collect::<Vec<u16>>())
            }
            Err(_) => {
                warn!("payload contains unpaired surrogates; skipping minification");
                stream.to_vec()
            }
        }
    }

    fn decode(&self, stream: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(stream.to_vec())
    }
}
