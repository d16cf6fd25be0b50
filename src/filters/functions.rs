//! Helper functions available inside filter expressions.
//!
//! Every function takes already stringified arguments (see
//! [`crate::values::to_string_safe`]); the rhai glue in [`super::engine`]
//! performs that conversion.

use regex::RegexBuilder;

use crate::values::search_form;

/// A number produced by the `float` / `int` helpers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedNumber {
    Float(f64),
    Int(i64),
}

/// Selects which parser `isNaN` consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    Float,
    Int,
}

impl From<bool> for NumberKind {
    fn from(use_float: bool) -> Self {
        if use_float {
            NumberKind::Float
        } else {
            NumberKind::Int
        }
    }
}

/// The two numeric parsers, held side by side so that `isNaN` can pick one
/// without looking it up by name.
#[derive(Debug, Clone, Copy)]
pub struct NumberParsers {
    pub float: fn(&str) -> Option<ParsedNumber>,
    pub int: fn(&str) -> Option<ParsedNumber>,
}

impl Default for NumberParsers {
    fn default() -> Self {
        Self { float, int }
    }
}

impl NumberParsers {
    pub fn select(&self, kind: NumberKind) -> fn(&str) -> Option<ParsedNumber> {
        match kind {
            NumberKind::Float => self.float,
            NumberKind::Int => self.int,
        }
    }

    pub fn is_nan(&self, value: &str, kind: NumberKind) -> bool {
        self.select(kind)(value).is_none()
    }
}

pub fn all(value: &str, needles: &[String]) -> bool {
    let haystack = search_form(value);
    needles
        .iter()
        .all(|needle| haystack.contains(&search_form(needle)))
}

pub fn any(value: &str, needles: &[String]) -> bool {
    let haystack = search_form(value);
    needles
        .iter()
        .any(|needle| haystack.contains(&search_form(needle)))
}

pub fn ends_with(value: &str, suffix: &str) -> bool {
    value.ends_with(suffix)
}

pub fn starts_with(value: &str, prefix: &str) -> bool {
    value.starts_with(prefix)
}

/// Character position of `needle` in `value`, `-1` if absent.
pub fn index_of(value: &str, needle: &str) -> i64 {
    match value.find(needle) {
        Some(byte_index) => value[..byte_index].chars().count() as i64,
        None => -1,
    }
}

/// Parses the leading decimal number of the search-form of `value`.
pub fn float(value: &str) -> Option<ParsedNumber> {
    let text = search_form(value);
    let prefix = decimal_prefix(&text)?;
    prefix.parse::<f64>().ok().map(ParsedNumber::Float)
}

/// Parses the leading integer of the search-form of `value`, honouring a
/// `0x` prefix.
pub fn int(value: &str) -> Option<ParsedNumber> {
    let text = search_form(value);
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text.as_str()),
    };
    let (radix, rest) = match rest.strip_prefix("0x") {
        Some(hex) => (16, hex),
        None => (10, rest),
    };

    let digits: String = rest.chars().take_while(|c| c.is_digit(radix)).collect();
    if digits.is_empty() {
        return None;
    }

    // out of range values saturate
    let magnitude = i64::from_str_radix(&digits, radix).unwrap_or(i64::MAX);
    let number = if negative { -magnitude } else { magnitude };
    Some(ParsedNumber::Int(number))
}

pub fn is_nan(value: &str, kind: NumberKind) -> bool {
    NumberParsers::default().is_nan(value, kind)
}

pub fn join(separator: &str, values: &[String]) -> String {
    values.join(separator)
}

pub fn lower(value: &str) -> String {
    value.to_lowercase()
}

pub fn upper(value: &str) -> String {
    value.to_uppercase()
}

pub fn trim(value: &str) -> String {
    value.trim().to_string()
}

pub fn trim_start(value: &str) -> String {
    value.trim_start().to_string()
}

pub fn trim_end(value: &str) -> String {
    value.trim_end().to_string()
}

/// Search-form with runs of spaces collapsed.
pub fn norm(value: &str) -> String {
    let mut text = search_form(value);
    while text.contains("  ") {
        text = text.replace("  ", " ");
    }
    text.trim().to_string()
}

/// Tests `value` against `pattern`. Invalid patterns or flags never match.
pub fn regex(value: &str, pattern: &str, flags: &str) -> bool {
    let mut builder_flags = RegexFlags::default();
    for flag in flags.chars() {
        if !builder_flags.apply(flag) {
            return false;
        }
    }

    let pattern = if builder_flags.sticky {
        format!(r"\A(?:{pattern})")
    } else {
        pattern.to_string()
    };

    RegexBuilder::new(&pattern)
        .case_insensitive(builder_flags.case_insensitive)
        .multi_line(builder_flags.multi_line)
        .dot_matches_new_line(builder_flags.dot_all)
        .ignore_whitespace(builder_flags.extended)
        .build()
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}

#[derive(Default)]
struct RegexFlags {
    seen: Vec<char>,
    case_insensitive: bool,
    multi_line: bool,
    dot_all: bool,
    extended: bool,
    sticky: bool,
}

impl RegexFlags {
    fn apply(&mut self, flag: char) -> bool {
        if self.seen.contains(&flag) {
            return false;
        }
        self.seen.push(flag);

        match flag {
            'i' => self.case_insensitive = true,
            'm' => self.multi_line = true,
            's' => self.dot_all = true,
            'x' => self.extended = true,
            'y' => self.sticky = true,
            'g' | 'd' | 'u' => {}
            _ => return false,
        }
        true
    }
}

// Longest prefix forming a decimal literal: sign, digits, fraction, exponent.
fn decimal_prefix(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    Some(&text[..end])
}
