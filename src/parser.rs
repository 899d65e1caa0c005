// https://github.com/Geal/nom/blob/master/doc/choosing_a_combinator.md

use std::error::Error;
use std::ffi::{CString, NulError};
use std::fmt;

use nom::{
    bytes::complete::{take_till, take_while, take_while1},
    character::complete::char,
    combinator::{opt, rest},
    multi::many0,
    sequence::{preceded, terminated},
    IResult,
};

use crate::config::Limits;

const PIPE: char = '|';
const SPACE: char = ' ';

#[derive(Debug, PartialEq)]
pub enum ParseError {
    LineTooLong { limit: usize },
    TooManyArguments { limit: usize },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::LineTooLong { limit } => {
                write!(f, "line exceeds {} characters", limit)
            }
            ParseError::TooManyArguments { limit } => {
                write!(f, "more than {} arguments", limit)
            }
        }
    }
}

impl Error for ParseError {}

/// The one or two stages of a line, split at the first pipe character.
#[derive(Debug, PartialEq, Clone, Copy)]
pub(crate) enum PipelineStages<'a> {
    Single(&'a str),
    Piped(&'a str, &'a str),
}

impl<'a> PipelineStages<'a> {
    pub(crate) fn is_piped(&self) -> bool {
        matches!(self, PipelineStages::Piped(..))
    }
}

/// Program name followed by its arguments.
#[derive(Debug, PartialEq, Clone, Default)]
pub(crate) struct ArgumentVector(Vec<String>);

impl ArgumentVector {
    pub(crate) fn new<S: Into<String>>(tokens: Vec<S>) -> Self {
        ArgumentVector(tokens.into_iter().map(Into::into).collect())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn program(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub(crate) fn arg(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub(crate) fn to_cstrings(&self) -> Result<Vec<CString>, NulError> {
        self.0.iter().map(|token| CString::new(token.as_str())).collect()
    }
}

impl fmt::Display for ArgumentVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

fn stages(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    let (i, left) = take_till(|c: char| c == PIPE)(input)?;
    let (i, right) = opt(preceded(char(PIPE), rest))(i)?;

    Ok((i, (left, right)))
}

fn spaces(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c == SPACE)(input)
}

fn word(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c != SPACE)(input)
}

fn words(input: &str) -> IResult<&str, Vec<&str>> {
    preceded(spaces, many0(terminated(word, spaces)))(input)
}

/// Splits `line` at its first pipe character. Any further pipe character
/// stays part of the second stage.
pub(crate) fn split_pipe(line: &str) -> PipelineStages<'_> {
    match stages(line) {
        Ok((_, (left, Some(right)))) => PipelineStages::Piped(left, right),
        _ => PipelineStages::Single(line),
    }
}

/// Splits a stage on runs of spaces. Only the space character separates
/// tokens, so tabs and other whitespace end up inside tokens.
pub(crate) fn split_whitespace(stage: &str, max_args: usize) -> Result<ArgumentVector, ParseError> {
    let tokens = match words(stage) {
        Ok((_, tokens)) => tokens,
        Err(_) => Vec::new(),
    };

    if tokens.len() > max_args {
        return Err(ParseError::TooManyArguments { limit: max_args });
    }

    Ok(ArgumentVector::new(tokens))
}

pub(crate) fn check_line(line: &str, limits: &Limits) -> Result<(), ParseError> {
    if line.chars().count() > limits.max_line_len {
        Err(ParseError::LineTooLong {
            limit: limits.max_line_len,
        })
    } else {
        Ok(())
    }
}
