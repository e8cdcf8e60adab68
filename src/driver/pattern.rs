//! Key pattern matching for the in-process driver.
//!
//! Accepts the `KEYS` wildcard syntax of the remote stores and compiles it to
//! a glob: `*` matches any run of characters (colons included), `?` matches
//! one, `[abc]`, `[a-z]` and `[^a]` are character classes, and `\` escapes
//! the next character. Classes that glob cannot express faithfully are
//! rejected, so a scan never matches more than the remote store would.

use glob::{MatchOptions, Pattern};

use crate::error::{CacheError, Result};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Characters with a position-dependent meaning inside a glob set.
const SET_SPECIALS: [char; 3] = [']', '-', '!'];

/// Compiled key pattern.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    inner: Pattern,
}

impl KeyPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let glob = translate(pattern)?;
        Pattern::new(&glob)
            .map(|inner| Self { inner })
            .map_err(|e| invalid(pattern, e.msg))
    }

    pub fn matches(&self, key: &str) -> bool {
        self.inner.matches_with(key, MATCH_OPTIONS)
    }
}

fn invalid(pattern: &str, reason: &str) -> CacheError {
    CacheError::InvalidPattern(format!("{}: {}", pattern, reason))
}

#[derive(Debug, Default)]
struct CharClass {
    negated: bool,
    chars: Vec<char>,
    ranges: Vec<(char, char)>,
}

fn translate(pattern: &str) -> Result<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            // Runs of stars mean the same thing; glob reserves `**` for paths.
            '*' if out.ends_with('*') => {}
            '*' | '?' => out.push(chars[i]),
            '\\' if i + 1 < chars.len() => {
                i += 1;
                push_literal(&mut out, chars[i]);
            }
            '[' => {
                let (class, end) = parse_class(&chars, i + 1)
                    .ok_or_else(|| invalid(pattern, "unterminated character class"))?;
                push_class(&mut out, &class).map_err(|reason| invalid(pattern, reason))?;
                i = end;
            }
            c => push_literal(&mut out, c),
        }
        i += 1;
    }

    Ok(out)
}

/// Parses a class body starting after `[`. Returns it with the index of `]`.
fn parse_class(chars: &[char], mut i: usize) -> Option<(CharClass, usize)> {
    let mut class = CharClass::default();
    if chars.get(i) == Some(&'^') {
        class.negated = true;
        i += 1;
    }

    loop {
        match *chars.get(i)? {
            ']' => return Some((class, i)),
            '\\' => {
                i += 1;
                class.chars.push(*chars.get(i)?);
            }
            lo if chars.get(i + 1) == Some(&'-') && i + 2 < chars.len() => {
                let hi = chars[i + 2];
                class.ranges.push(if lo <= hi { (lo, hi) } else { (hi, lo) });
                i += 2;
            }
            c => class.chars.push(c),
        }
        i += 1;
    }
}

fn push_literal(out: &mut String, c: char) {
    match c {
        '*' | '?' | '[' => {
            out.push('[');
            out.push(c);
            out.push(']');
        }
        ']' => out.push_str("[]]"),
        c => out.push(c),
    }
}

fn push_class(out: &mut String, class: &CharClass) -> std::result::Result<(), &'static str> {
    if class.chars.is_empty() && class.ranges.is_empty() {
        return Err("empty character class");
    }
    let special_bound =
        |(lo, hi): &(char, char)| SET_SPECIALS.contains(lo) || SET_SPECIALS.contains(hi);
    if class.ranges.iter().any(special_bound) {
        return Err("range bound cannot be expressed");
    }

    let has = |c: char| class.chars.contains(&c);

    // `]` only reads as a member right after the opening bracket, `-` only
    // at either end, and a leading `!` would negate the set.
    let mut body = String::new();
    if has(']') {
        body.push(']');
    }
    for (lo, hi) in &class.ranges {
        body.push(*lo);
        body.push('-');
        body.push(*hi);
    }
    body.extend(class.chars.iter().filter(|c| !SET_SPECIALS.contains(c)));

    match (body.is_empty() && !class.negated, has('!'), has('-')) {
        (true, true, true) => body.push_str("-!"),
        (true, true, false) => {
            out.push('!');
            return Ok(());
        }
        (_, bang, dash) => {
            if bang {
                body.push('!');
            }
            if dash {
                body.push('-');
            }
        }
    }

    out.push('[');
    if class.negated {
        out.push('!');
    }
    out.push_str(&body);
    out.push(']');
    Ok(())
}
