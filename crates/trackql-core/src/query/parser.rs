//! Nom parser for query documents.
//!
//! Covers the executable subset the gateway serves: anonymous and named
//! operations, variable definitions, aliases, arguments and nested
//! selection sets. Fragments and directives are rejected as syntax errors.

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_while_m_n},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace1, not_line_ending, satisfy},
    combinator::{all_consuming, map, map_res, not, opt, recognize, value, verify},
    multi::{many0, many1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use trackql_common::GatewayError;

use super::ast::{Document, Field, OperationDefinition, OperationType, Value, VariableDefinition};

// =============================================================================
// ENTRY POINT
// =============================================================================

/// Deepest allowed nesting of `{`, `[` and `(` groups.
pub const MAX_DEPTH: usize = 32;

pub fn parse_document(source: &str) -> Result<Document, GatewayError> {
    check_depth(source)?;
    match all_consuming(terminated(many1(operation_definition), ignored))(source) {
        Ok((_, operations)) => Ok(Document { operations }),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(syntax_error(source, e.input)),
        Err(nom::Err::Incomplete(_)) => Err(syntax_error(source, "")),
    }
}

fn error_at(source: &str, offset: usize, message: String) -> GatewayError {
    let consumed = &source[..offset];
    let line = consumed.matches('\n').count() + 1;
    let column = consumed.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    GatewayError::Parse { line, column, message }
}

fn syntax_error(source: &str, remaining: &str) -> GatewayError {
    let remaining = remaining.trim_start();
    let message = match remaining.chars().next() {
        Some(c) => format!("unexpected `{}`", c),
        None => "unexpected end of document".to_string(),
    };
    error_at(source, source.len() - remaining.len(), message)
}

/// Rejects documents nested deeper than [`MAX_DEPTH`] before the recursive
/// descent runs. Brackets inside strings and comments are skipped.
fn check_depth(source: &str) -> Result<(), GatewayError> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut in_comment = false;
    let mut escaped = false;
    for (offset, c) in source.char_indices() {
        if in_comment {
            in_comment = c != '\n';
            continue;
        }
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' || c == '\n' {
                in_string = false;
            }
            continue;
        }
        match c {
            '#' => in_comment = true,
            '"' => in_string = true,
            '{' | '[' | '(' => {
                depth += 1;
                if depth > MAX_DEPTH {
                    return Err(error_at(source, offset, format!("nesting deeper than {} levels", MAX_DEPTH)));
                }
            }
            '}' | ']' | ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

// =============================================================================
// LEXICAL HELPERS
// =============================================================================

/// Whitespace, commas and `#` comments are insignificant between tokens.
fn ignored(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), char(',')),
            value((), pair(char('#'), not_line_ending)),
        ))),
    )(input)
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    preceded(ignored, inner)
}

fn name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

/// A reserved word that is not the prefix of a longer name.
fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(kw), not(satisfy(|c: char| c.is_alphanumeric() || c == '_')))
}

fn hex4(input: &str) -> IResult<&str, u32> {
    map_res(take_while_m_n(4, 4, |c: char| c.is_ascii_hexdigit()), |h| u32::from_str_radix(h, 16))(input)
}

/// `\uXXXX`, with a following low surrogate escape when XXXX is a high one.
fn unicode_escape(input: &str) -> IResult<&str, char> {
    let (rest, high) = preceded(char('u'), hex4)(input)?;
    let (rest, code) = if (0xD800..0xDC00).contains(&high) {
        let (rest, low) = preceded(tag("\\u"), verify(hex4, |l: &u32| (0xDC00..0xE000).contains(l)))(rest)?;
        (rest, 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00))
    } else {
        (rest, high)
    };
    match char::from_u32(code) {
        Some(c) => Ok((rest, c)),
        None => Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Char))),
    }
}

fn string_literal(input: &str) -> IResult<&str, String> {
    let body = escaped_transform(
        is_not("\"\\\n"),
        '\\',
        alt((
            value('\\', char('\\')),
            value('"', char('"')),
            value('/', char('/')),
            value('\u{8}', char('b')),
            value('\u{c}', char('f')),
            value('\n', char('n')),
            value('\r', char('r')),
            value('\t', char('t')),
            unicode_escape,
        )),
    );
    map(delimited(char('"'), opt(body), char('"')), |s: Option<String>| s.unwrap_or_default())(input)
}

fn int_literal(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), str::parse::<i64>)(input)
}

fn literal(input: &str) -> IResult<&str, Value> {
    alt((
        map(preceded(char('$'), name), |n: &str| Value::Variable(n.to_string())),
        map(int_literal, Value::Int),
        map(string_literal, Value::String),
        value(Value::Boolean(true), keyword("true")),
        value(Value::Boolean(false), keyword("false")),
        value(Value::Null, keyword("null")),
    ))(input)
}

// =============================================================================
// SELECTIONS
// =============================================================================

fn arguments(input: &str) -> IResult<&str, Vec<(String, Value)>> {
    delimited(
        char('('),
        many0(map(
            tuple((ws(name), ws(char(':')), ws(literal))),
            |(n, _, v)| (n.to_string(), v),
        )),
        ws(char(')')),
    )(input)
}

/// `alias: name(args) { ... }`, every part but the name optional.
fn field(input: &str) -> IResult<&str, Field> {
    let (input, first) = ws(name)(input)?;
    let (input, second) = opt(preceded(ws(char(':')), ws(name)))(input)?;
    let (input, arguments) = opt(ws(arguments))(input)?;
    let (input, selection_set) = opt(selection_set)(input)?;

    let (alias, name) = match second {
        Some(n) => (Some(first.to_string()), n.to_string()),
        None => (None, first.to_string()),
    };
    Ok((
        input,
        Field {
            alias,
            name,
            arguments: arguments.unwrap_or_default(),
            selection_set: selection_set.unwrap_or_default(),
        },
    ))
}

fn selection_set(input: &str) -> IResult<&str, Vec<Field>> {
    delimited(ws(char('{')), many1(field), ws(char('}')))(input)
}

// =============================================================================
// OPERATIONS
// =============================================================================

fn type_ref(input: &str) -> IResult<&str, String> {
    let (input, base) = alt((
        map(name, str::to_string),
        map(delimited(char('['), ws(type_ref), ws(char(']'))), |inner| format!("[{}]", inner)),
    ))(input)?;
    let (input, non_null) = opt(ws(char('!')))(input)?;
    Ok((input, if non_null.is_some() { format!("{}!", base) } else { base }))
}

fn variable_definitions(input: &str) -> IResult<&str, Vec<VariableDefinition>> {
    delimited(
        char('('),
        many0(map(
            tuple((
                ws(preceded(char('$'), name)),
                ws(char(':')),
                ws(type_ref),
                opt(preceded(ws(char('=')), ws(literal))),
            )),
            |(name, _, type_ref, default)| VariableDefinition {
                name: name.to_string(),
                type_ref,
                default,
            },
        )),
        ws(char(')')),
    )(input)
}

fn operation_type(input: &str) -> IResult<&str, OperationType> {
    alt((
        value(OperationType::Query, keyword("query")),
        value(OperationType::Mutation, keyword("mutation")),
        value(OperationType::Subscription, keyword("subscription")),
    ))(input)
}

fn operation_definition(input: &str) -> IResult<&str, OperationDefinition> {
    alt((
        map(selection_set, |selection_set| OperationDefinition {
            operation_type: OperationType::Query,
            name: None,
            variables: Vec::new(),
            selection_set,
        }),
        map(
            tuple((
                ws(operation_type),
                opt(ws(name)),
                opt(ws(variable_definitions)),
                selection_set,
            )),
            |(operation_type, name, variables, selection_set)| OperationDefinition {
                operation_type,
                name: name.map(str::to_string),
                variables: variables.unwrap_or_default(),
                selection_set,
            },
        ),
    ))(input)
}
