use std::{fmt::Display, num::ParseIntError};

use serde::Serialize;

use crate::error::{IntoSpanned, SpannedError};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Keyword {
    Seq,
    Par,
    If,
    Else,
    While,
    Print,
    Input,
    Fun,
    Return,
    True,
    False,
    Comp,
    Int,
    Bool,
    String,
    CChannel,
}

impl Keyword {
    fn from_word(word: &str) -> Option<Self> {
        Some(match word {
            "SEQ" | "seq" => Self::Seq,
            "PAR" | "par" => Self::Par,
            "if" => Self::If,
            "else" => Self::Else,
            "while" => Self::While,
            "print" => Self::Print,
            "input" => Self::Input,
            "fun" => Self::Fun,
            "return" => Self::Return,
            "true" => Self::True,
            "false" => Self::False,
            "COMP" | "comp" => Self::Comp,
            "int" => Self::Int,
            "bool" => Self::Bool,
            "string" => Self::String,
            "c_channel" => Self::CChannel,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seq => "SEQ",
            Self::Par => "PAR",
            Self::If => "if",
            Self::Else => "else",
            Self::While => "while",
            Self::Print => "print",
            Self::Input => "input",
            Self::Fun => "fun",
            Self::Return => "return",
            Self::True => "true",
            Self::False => "false",
            Self::Comp => "comp",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::String => "string",
            Self::CChannel => "c_channel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    Keyword(Keyword),
    Ident,
    Int,
    Float,
    Str,
    Punct(&'static str),
    Eof,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keyword(keyword) => write!(f, "{}", keyword.as_str()),
            Self::Ident => write!(f, "identifier"),
            Self::Int => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Str => write!(f, "string"),
            Self::Punct(punct) => write!(f, "{punct}"),
            Self::Eof => write!(f, "EOF"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "EOF"),
            TokenKind::Str => write!(f, "\"{}\"", self.text),
            _ => write!(f, "{}", self.text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    #[error("failed to parse int: {0}")]
    ParseInt(#[from] ParseIntError),
    #[error("invalid escape sequence: \\{0}")]
    InvalidEscapeSequence(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid input: {0}")]
    InvalidInput(char),
}

pub type TokenError = SpannedError<ErrorKind>;

fn is_term(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

pub struct Lexer<'a> {
    offset: usize,
    line: u32,
    column: u32,
    source: &'a [char],
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a [char]) -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
            source,
        }
    }

    fn cur(&self) -> Option<char> {
        self.source.get(self.offset).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.offset + 1).copied()
    }

    fn advance(&mut self) {
        if let Some(c) = self.cur() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }

            self.offset += 1;
        }
    }

    fn next(&mut self) -> Option<char> {
        let c = self.cur();
        self.advance();
        c
    }

    fn span(&self) -> Span {
        Span::new(self.line, self.column)
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.next() {
            if c == '\n' {
                break;
            }
        }
    }

    fn term(&mut self) -> Token {
        let span = self.span();
        let mut term = String::new();

        while let Some(c) = self.cur() {
            if !is_term(c) {
                break;
            }

            self.advance();
            term.push(c);
        }

        match Keyword::from_word(&term) {
            Some(keyword) => Token::new(TokenKind::Keyword(keyword), term, span),
            None => Token::new(TokenKind::Ident, term, span),
        }
    }

    fn number(&mut self) -> Result<Token, TokenError> {
        let span = self.span();
        let mut dot = false;
        let mut num = String::new();

        while let Some(c) = self.cur() {
            match c {
                '.' if !dot && matches!(self.peek(), Some(c) if c.is_ascii_digit()) => {
                    dot = true;
                    num.push('.');
                }
                c if c.is_ascii_digit() => num.push(c),
                _ => break,
            }

            self.advance();
        }

        if dot {
            return Ok(Token::new(TokenKind::Float, num, span));
        }

        num.parse::<i64>()
            .map_err(|e| ErrorKind::ParseInt(e).at(span))?;

        Ok(Token::new(TokenKind::Int, num, span))
    }

    fn string(&mut self) -> Result<Token, TokenError> {
        let span = self.span();
        let mut s = String::new();

        // opening quote
        self.advance();

        loop {
            match self.next() {
                Some('"') => break,
                Some('\\') => match self.next() {
                    Some('n') => s.push('\n'),
                    Some('r') => s.push('\r'),
                    Some('t') => s.push('\t'),
                    Some('"') => s.push('"'),
                    Some('\\') => s.push('\\'),
                    Some(c) => return Err(ErrorKind::InvalidEscapeSequence(c).at(self.span())),
                    None => return Err(ErrorKind::UnterminatedString.at(span)),
                },
                Some(c) => s.push(c),
                None => return Err(ErrorKind::UnterminatedString.at(span)),
            }
        }

        Ok(Token::new(TokenKind::Str, s, span))
    }

    fn punct(&mut self, cur: char) -> Result<Token, TokenError> {
        let span = self.span();
        let next = self.peek();

        let double = match (cur, next) {
            ('&', Some('&')) => Some("&&"),
            ('|', Some('|')) => Some("||"),
            ('!', Some('=')) => Some("!="),
            ('=', Some('=')) => Some("=="),
            ('<', Some('=')) => Some("<="),
            ('>', Some('=')) => Some(">="),
            _ => None,
        };

        if let Some(punct) = double {
            self.advance();
            self.advance();
            return Ok(Token::new(TokenKind::Punct(punct), punct, span));
        }

        let punct = match cur {
            '+' => "+",
            '-' => "-",
            '*' => "*",
            '/' => "/",
            '=' => "=",
            '<' => "<",
            '>' => ">",
            '!' => "!",
            '(' => "(",
            ')' => ")",
            '{' => "{",
            '}' => "}",
            '[' => "[",
            ']' => "]",
            ';' => ";",
            ',' => ",",
            '.' => ".",
            c => return Err(ErrorKind::InvalidInput(c).at(span)),
        };

        self.advance();
        Ok(Token::new(TokenKind::Punct(punct), punct, span))
    }

    pub fn lex(&mut self) -> Result<Vec<Token>, TokenError> {
        let mut tokens = vec![];

        while let Some(cur) = self.cur() {
            if cur.is_whitespace() {
                self.advance();
            } else if cur == '#' || (cur == '/' && self.peek() == Some('/')) {
                self.skip_line();
            } else if cur == '_' || cur.is_ascii_alphabetic() {
                tokens.push(self.term());
            } else if cur.is_ascii_digit() {
                tokens.push(self.number()?);
            } else if cur == '"' {
                tokens.push(self.string()?);
            } else {
                tokens.push(self.punct(cur)?);
            }
        }

        tokens.push(Token::new(TokenKind::Eof, "", self.span()));

        Ok(tokens)
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, TokenError> {
    let chars = source.chars().collect::<Vec<_>>();
    Lexer::new(&chars).lex()
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn keywords_and_idents() {
        assert_eq!(
            kinds("SEQ par comp c_channel value"),
            vec![
                TokenKind::Keyword(Keyword::Seq),
                TokenKind::Keyword(Keyword::Par),
                TokenKind::Keyword(Keyword::Comp),
                TokenKind::Keyword(Keyword::CChannel),
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test_case("12", vec![TokenKind::Int]; "integer")]
    #[test_case("2.5", vec![TokenKind::Float]; "float")]
    #[test_case("1.", vec![TokenKind::Int, TokenKind::Punct(".")]; "trailing dot")]
    #[test_case(".5", vec![TokenKind::Punct("."), TokenKind::Int]; "leading dot")]
    #[test_case("-3", vec![TokenKind::Punct("-"), TokenKind::Int]; "minus is separate")]
    fn numbers(source: &str, mut expected: Vec<TokenKind>) {
        expected.push(TokenKind::Eof);
        assert_eq!(kinds(source), expected);
    }

    #[test]
    fn compound_operators() {
        assert_eq!(
            kinds("<= >= == != && || ! ="),
            vec![
                TokenKind::Punct("<="),
                TokenKind::Punct(">="),
                TokenKind::Punct("=="),
                TokenKind::Punct("!="),
                TokenKind::Punct("&&"),
                TokenKind::Punct("||"),
                TokenKind::Punct("!"),
                TokenKind::Punct("="),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn positions() {
        let tokens = tokenize("x = 1\n  print x # trailing comment\n").unwrap();

        assert_eq!(tokens[0].span, Span::new(1, 1));
        assert_eq!(tokens[2].span, Span::new(1, 5));
        assert_eq!(tokens[3].span, Span::new(2, 3));
        assert_eq!(tokens[3].kind, TokenKind::Keyword(Keyword::Print));
        assert_eq!(tokens.len(), 6);
    }

    #[test]
    fn string_escapes() {
        let tokens = tokenize(r#""a\tb\"c""#).unwrap();

        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].text, "a\tb\"c");
    }

    #[test_case("\"open", ErrorKind::UnterminatedString; "unterminated string")]
    #[test_case("a & b", ErrorKind::InvalidInput('&'); "single ampersand")]
    #[test_case("x = @", ErrorKind::InvalidInput('@'); "unknown character")]
    fn errors(source: &str, expected: ErrorKind) {
        assert_eq!(tokenize(source).map_err(|e| e.kind), Err(expected));
    }
}
