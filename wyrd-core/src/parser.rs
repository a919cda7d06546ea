// This module converts tokens (from the tokenizer) into Values
//
// WYRD LOADING MODEL:
// - Numbers and strings become literal values
// - { } [ ] ( ) become Blocks tagged with their bracket mode
// - A word's punctuation selects its variant: x: is a setword, ?x a getword,
//   .x an opword, 'x a tagword, a/b a context path, and so on
// - Bare operator spellings (+ - * / // % = != < > <= >=) become opwords
//   interned with a leading underscore, so `+` is the opword `_+`

use crate::tokenizer::{SourcePos, Token, TokenKind, tokenize};
use crate::value::{Block, BlockMode, Value, is_operator_char};
use crate::words::WordTable;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unterminated string starting at {pos}")]
    UnterminatedString { pos: SourcePos },

    #[error("invalid number {text:?} at {pos}")]
    InvalidNumber { text: String, pos: SourcePos },

    #[error("invalid word {text:?} at {pos}")]
    InvalidWord { text: String, pos: SourcePos },

    #[error("unexpected '{found}' at {pos}")]
    UnexpectedCloser { found: char, pos: SourcePos },

    #[error("'{open}' opened at {pos} is closed by '{found}'")]
    MismatchedBrackets {
        open: char,
        found: char,
        pos: SourcePos,
    },

    #[error("'{open}' opened at {pos} is never closed")]
    Unclosed { open: char, pos: SourcePos },
}

/// Loads source text into a top-level block, interning every word.
pub fn load_source(input: &str, words: &mut WordTable) -> Result<Block, ParseError> {
    let tokens = tokenize(input)?;
    let mut index = 0;
    let items = parse_items(&tokens, &mut index, None, words)?;
    Ok(Block::new(items))
}

// Parses values until the matching closer (or end of input at top level)
fn parse_items(
    tokens: &[Token],
    index: &mut usize,
    open: Option<(char, SourcePos)>,
    words: &mut WordTable,
) -> Result<Vec<Value>, ParseError> {
    let mut items = Vec::new();

    while let Some(token) = tokens.get(*index) {
        *index += 1;
        let value = match &token.kind {
            TokenKind::Integer(i) => Value::Integer(*i),
            TokenKind::Decimal(d) => Value::Decimal(*d),
            TokenKind::String(s) => Value::String(s.as_str().into()),
            TokenKind::Comma => Value::Comma,
            TokenKind::Word(text) => parse_word(text, token.pos, words)?,
            TokenKind::Open(ch) => {
                let inner = parse_items(tokens, index, Some((*ch, token.pos)), words)?;
                let mode = match ch {
                    '[' => BlockMode::Square,
                    '(' => BlockMode::Paren,
                    _ => BlockMode::Curly,
                };
                Value::Block(Block::with_mode(inner, mode))
            }
            TokenKind::Close(found) => {
                return match open {
                    None => Err(ParseError::UnexpectedCloser {
                        found: *found,
                        pos: token.pos,
                    }),
                    Some((open, pos)) if closer_for(open) != *found => {
                        Err(ParseError::MismatchedBrackets {
                            open,
                            found: *found,
                            pos,
                        })
                    }
                    Some(_) => Ok(items),
                };
            }
        };
        items.push(value);
    }

    match open {
        Some((open, pos)) => Err(ParseError::Unclosed { open, pos }),
        None => Ok(items),
    }
}

fn closer_for(open: char) -> char {
    match open {
        '[' => ']',
        '(' => ')',
        _ => '}',
    }
}

fn is_operator(text: &str) -> bool {
    !text.is_empty() && text.chars().all(is_operator_char)
}

// `.+` and `|+` name the same operator word as bare `+`
fn callable_name(text: &str) -> String {
    if is_operator(text) {
        format!("_{text}")
    } else {
        text.to_string()
    }
}

fn parse_word(text: &str, pos: SourcePos, words: &mut WordTable) -> Result<Value, ParseError> {
    let invalid = || ParseError::InvalidWord {
        text: text.to_string(),
        pos,
    };
    let mut intern = |name: &str| {
        if name.is_empty() {
            Err(invalid())
        } else {
            Ok(words.intern(name))
        }
    };

    if text == "_" {
        return Ok(Value::Void);
    }
    if text == "true" {
        return Ok(Value::Boolean(true));
    }
    if text == "false" {
        return Ok(Value::Boolean(false));
    }
    if is_operator(text) {
        return Ok(Value::Opword(intern(&format!("_{text}"))?));
    }

    if let Some(rest) = text.strip_prefix("::") {
        return Ok(Value::LModword(intern(rest)?));
    }
    if let Some(rest) = text.strip_suffix("::") {
        return Ok(Value::Modword(intern(rest)?));
    }
    if let Some(rest) = text.strip_prefix(':') {
        return Ok(Value::LSetword(intern(rest)?));
    }
    if let Some(rest) = text.strip_suffix(':') {
        return Ok(Value::Setword(intern(rest)?));
    }
    if let Some(rest) = text.strip_prefix('?') {
        return Ok(Value::Getword(intern(rest)?));
    }
    if let Some(rest) = text.strip_prefix('.') {
        return Ok(Value::Opword(intern(&callable_name(rest))?));
    }
    if let Some(rest) = text.strip_prefix('|') {
        return Ok(Value::Pipeword(intern(&callable_name(rest))?));
    }
    if let Some(rest) = text.strip_prefix('\'') {
        return Ok(Value::Tagword(intern(rest)?));
    }
    if text.len() > 2
        && let Some(inner) = text.strip_prefix('<').and_then(|t| t.strip_suffix('>'))
    {
        return Ok(Value::Xword(intern(inner)?));
    }

    // a/b/c is a context path; kind//name stays one word
    if text.contains('/') && !text.contains("//") {
        let parts = text
            .split('/')
            .map(&mut intern)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Value::CPath(parts.into()));
    }

    Ok(Value::Word(intern(text)?))
}
