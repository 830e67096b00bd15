//! Field selectors for stats functions
//!
//! Parses the argument list of calls such as `min(duration, "req size")` or
//! `max(*)`. The result is either an ordered list of field names or the
//! wildcard, which selects every column of each block as it arrives.
//!
//! # Grammar
//!
//! ```text
//! args  := '(' [ field { ',' field } ] ')'
//! field := '*' | bare | quoted
//! bare  := one or more chars except whitespace , ( ) " '
//! quoted:= '"' .. '"' | '\'' .. '\''   (backslash escapes the next char)
//! ```
//!
//! An empty list and any list containing `*` both select all fields.

use std::fmt;

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, multispace0, one_of},
    combinator::map,
    error::{Error as NomError, ErrorKind},
    multi::separated_list0,
    sequence::delimited,
    IResult, Parser,
};

use crate::error::ParseError;

/// Token selecting every field of a block
pub const WILDCARD: &str = "*";

/// Fields a stats function reads
///
/// Immutable once parsed; processors created from the same function share it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelector {
    fields: Vec<String>,
    contains_star: bool,
}

impl FieldSelector {
    /// Selector for every field of each block
    pub fn wildcard() -> Self {
        Self {
            fields: Vec::new(),
            contains_star: true,
        }
    }

    /// Selector for an explicit list of fields
    ///
    /// A `*` entry, or an empty list, turns the selector into the wildcard.
    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if fields.is_empty() || fields.iter().any(|f| f == WILDCARD) {
            return Self::wildcard();
        }
        Self {
            fields,
            contains_star: false,
        }
    }

    /// True when every column of a block is selected
    #[inline]
    pub fn is_wildcard(&self) -> bool {
        self.contains_star
    }

    /// Explicit field names, empty for the wildcard
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Field names the scan layer must materialise
    pub fn needed_fields(&self) -> Vec<String> {
        if self.contains_star {
            vec![WILDCARD.to_string()]
        } else {
            self.fields.clone()
        }
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.contains_star {
            return f.write_str(WILDCARD);
        }
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_field_name(f, field)?;
        }
        Ok(())
    }
}

fn write_field_name(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if !name.is_empty() && name.chars().all(is_bare_char) {
        return f.write_str(name);
    }
    f.write_str("\"")?;
    for c in name.chars() {
        if c == '"' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{}", c)?;
    }
    f.write_str("\"")
}

// ============================================================================
// Parser
// ============================================================================

/// Parse the parenthesised argument list of stats function `func_name`
///
/// The whole input must be consumed, apart from surrounding whitespace.
///
/// # Example
///
/// ```rust
/// use kuba_logstats::stats::fields::parse_field_names_for_stats_func;
///
/// let selector = parse_field_names_for_stats_func("(duration, \"req size\")", "min").unwrap();
/// assert_eq!(selector.fields(), &["duration".to_string(), "req size".to_string()]);
///
/// assert!(parse_field_names_for_stats_func("(*)", "min").unwrap().is_wildcard());
/// assert!(parse_field_names_for_stats_func("(a,", "min").is_err());
/// ```
pub fn parse_field_names_for_stats_func(
    input: &str,
    func_name: &str,
) -> Result<FieldSelector, ParseError> {
    match delimited(multispace0, field_list, multispace0).parse(input) {
        Ok(("", fields)) => Ok(FieldSelector::from_fields(fields)),
        Ok((rest, _)) => Err(ParseError::new(func_name, "unexpected trailing input", rest)),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(ParseError::new(
            func_name,
            describe(e.code),
            e.input,
        )),
        Err(nom::Err::Incomplete(_)) => {
            Err(ParseError::new(func_name, "incomplete field list", input))
        },
    }
}

/// `( field, ... )`
pub(crate) fn field_list(input: &str) -> IResult<&str, Vec<String>> {
    delimited(
        (char('('), multispace0),
        separated_list0(
            (multispace0, char(','), multispace0),
            field_name,
        ),
        (multispace0, char(')')),
    )
    .parse(input)
}

fn field_name(input: &str) -> IResult<&str, String> {
    alt((quoted, map(take_while1(is_bare_char), str::to_string))).parse(input)
}

fn quoted(input: &str) -> IResult<&str, String> {
    let (body, quote) = one_of("\"'").parse(input)?;
    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, escaped)) => out.push(escaped),
                None => break,
            },
            c if c == quote => return Ok((&body[i + c.len_utf8()..], out)),
            c => out.push(c),
        }
    }
    Err(nom::Err::Failure(NomError::new(input, ErrorKind::Char)))
}

fn is_bare_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, ',' | '(' | ')' | '"' | '\'')
}

fn describe(code: ErrorKind) -> &'static str {
    match code {
        ErrorKind::Char => "expected '(', ')' or ',' or a closing quote",
        ErrorKind::TakeWhile1 => "expected field name",
        _ => "malformed field list",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<FieldSelector, ParseError> {
        parse_field_names_for_stats_func(input, "min")
    }

    #[test]
    fn test_explicit_fields() {
        let selector = parse("(a, b,c)").unwrap();
        assert!(!selector.is_wildcard());
        assert_eq!(selector.fields(), &["a", "b", "c"]);
        assert_eq!(selector.to_string(), "a, b, c");
    }

    #[test]
    fn test_wildcard_forms() {
        assert!(parse("(*)").unwrap().is_wildcard());
        assert!(parse("( )").unwrap().is_wildcard());
        assert!(parse("(a, *)").unwrap().is_wildcard());
        assert_eq!(parse("(a, *)").unwrap().to_string(), "*");
        assert_eq!(parse("(*)").unwrap().needed_fields(), vec!["*".to_string()]);
    }

    #[test]
    fn test_quoted_fields() {
        let selector = parse(r#"("req size", 'x,y', "a\"b")"#).unwrap();
        assert_eq!(selector.fields(), &["req size", "x,y", "a\"b"]);
        assert_eq!(selector.to_string(), r#""req size", "x,y", "a\"b""#);
    }

    #[test]
    fn test_display_roundtrips_through_parser() {
        let selector = FieldSelector::from_fields(["plain", "with space", ""]);
        let reparsed = parse(&format!("({})", selector)).unwrap();
        assert_eq!(reparsed, selector);
    }

    #[test]
    fn test_duplicates_preserved() {
        let selector = parse("(a, a)").unwrap();
        assert_eq!(selector.fields(), &["a", "a"]);
    }

    #[test]
    fn test_malformed_lists() {
        for input in ["", "a, b", "(a,", "(a,,b)", "(a b)", "(\"open)", "(a))"] {
            let err = parse(input).unwrap_err();
            assert_eq!(err.func, "min", "input {:?}", input);
        }
    }
}
