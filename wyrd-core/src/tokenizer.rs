// Tokenizer with source positions for parse error messages

use crate::parser::ParseError;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

// RUST CONCEPT: Source position for rich error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePos {
    pub line: usize,
    pub column: usize,
    pub offset: usize, // Byte offset from start of input
}

impl SourcePos {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: SourcePos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Integer(i64),
    Decimal(f64),
    String(String),
    Word(String), // Any word form; the parser decides setword, opword, path...
    Open(char),   // { [ (
    Close(char),  // } ] )
    Comma,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Integer(i) => write!(f, "{i}"),
            TokenKind::Decimal(d) => write!(f, "{d:?}"),
            TokenKind::String(s) => write!(f, "\"{s}\""),
            TokenKind::Word(w) => f.write_str(w),
            TokenKind::Open(c) | TokenKind::Close(c) => write!(f, "{c}"),
            TokenKind::Comma => f.write_str(","),
        }
    }
}

// Characters that end a word run
fn is_delimiter(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '{' | '}' | '[' | ']' | '(' | ')' | '"' | ',')
}

// RUST CONCEPT: Position-tracking cursor
// Wrapping Peekable<Chars> keeps line/column bookkeeping in one place
struct Cursor<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
            offset: 0,
        }
    }

    fn pos(&self) -> SourcePos {
        SourcePos::new(self.line, self.column, self.offset)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.offset += ch.len_utf8();
        Some(ch)
    }
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut cursor = Cursor::new(input);

    while let Some(ch) = cursor.peek() {
        let start = cursor.pos();

        match ch {
            c if c.is_whitespace() => {
                cursor.bump();
            }

            ';' => {
                // Skip comments - consume everything until newline
                while let Some(c) = cursor.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            }

            '{' | '[' | '(' => {
                cursor.bump();
                tokens.push(Token {
                    kind: TokenKind::Open(ch),
                    pos: start,
                });
            }

            '}' | ']' | ')' => {
                cursor.bump();
                tokens.push(Token {
                    kind: TokenKind::Close(ch),
                    pos: start,
                });
            }

            ',' => {
                cursor.bump();
                tokens.push(Token {
                    kind: TokenKind::Comma,
                    pos: start,
                });
            }

            '"' => {
                cursor.bump();
                let text = read_string(&mut cursor, start)?;
                tokens.push(Token {
                    kind: TokenKind::String(text),
                    pos: start,
                });
            }

            _ => {
                let mut run = String::new();
                while let Some(c) = cursor.peek() {
                    if is_delimiter(c) {
                        break;
                    }
                    run.push(c);
                    cursor.bump();
                }
                tokens.push(Token {
                    kind: classify_run(run, start)?,
                    pos: start,
                });
            }
        }
    }

    Ok(tokens)
}

fn read_string(cursor: &mut Cursor<'_>, start: SourcePos) -> Result<String, ParseError> {
    let mut text = String::new();
    let mut escaped = false;
    loop {
        let Some(ch) = cursor.bump() else {
            return Err(ParseError::UnterminatedString { pos: start });
        };
        if escaped {
            match ch {
                'n' => text.push('\n'),
                't' => text.push('\t'),
                '\\' => text.push('\\'),
                '"' => text.push('"'),
                other => {
                    text.push('\\');
                    text.push(other);
                }
            }
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == '"' {
            return Ok(text);
        } else {
            text.push(ch);
        }
    }
}

fn looks_numeric(run: &str) -> bool {
    let mut chars = run.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('+' | '-') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}

fn classify_run(run: String, pos: SourcePos) -> Result<TokenKind, ParseError> {
    if !looks_numeric(&run) {
        return Ok(TokenKind::Word(run));
    }
    let is_decimal = run.contains(|c: char| matches!(c, '.' | 'e' | 'E'));
    let digits = run.strip_prefix('+').unwrap_or(&run);
    let parsed = if is_decimal {
        digits.parse::<f64>().ok().map(TokenKind::Decimal)
    } else {
        digits.parse::<i64>().ok().map(TokenKind::Integer)
    };
    parsed.ok_or(ParseError::InvalidNumber { text: run, pos })
}
