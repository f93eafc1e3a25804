use tracing::trace;

use crate::error::{CompileError, CompileResult, LexicalErrorKind};

use super::{
    token::{KEYWORDS, ONE_SYMBOL_TOKENS},
    Token, TokenKind,
};

/// Produces tokens one at a time with a single character of lookahead.
/// Nothing is buffered: the parser holds the only current token.
#[derive(Debug)]
pub struct Lexer {
    chars: Vec<char>,
    index: usize,
    line: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            index: 0,
            line: 1,
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }

    fn error(&self, kind: LexicalErrorKind) -> CompileError {
        CompileError::Lexical {
            line: self.line,
            kind,
        }
    }

    fn new_token(&mut self, kind: TokenKind, len: usize) -> Token {
        self.index += len;
        Token {
            kind,
            line: self.line,
        }
    }

    fn parse_number(&mut self) -> CompileResult<Token> {
        let s: String = self.chars[self.index..]
            .iter()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        let value = s
            .parse()
            .map_err(|_| self.error(LexicalErrorKind::IntegerOutOfRange(s.clone())))?;
        Ok(self.new_token(TokenKind::Num(value), s.len()))
    }

    fn parse_identifier(&mut self) -> Token {
        let s: String = self.chars[self.index..]
            .iter()
            .take_while(|&&c| c.is_ascii_alphanumeric() || c == '_')
            .collect();
        let len = s.len();

        if let Some(kind) = KEYWORDS.get(s.as_str()) {
            self.new_token(kind.clone(), len)
        } else {
            self.new_token(TokenKind::Ident(s), len)
        }
    }

    fn parse_string(&mut self) -> CompileResult<Token> {
        let start_line = self.line;
        let body: String = self.chars[self.index + 1..]
            .iter()
            .take_while(|&&c| c != '"')
            .collect();
        let body_len = body.chars().count();

        if self.peek(body_len + 1) != Some('"') {
            return Err(self.error(LexicalErrorKind::UnterminatedString));
        }

        self.index += body_len + 2;
        self.line += body.matches('\n').count();
        Ok(Token {
            kind: TokenKind::Str(body),
            line: start_line,
        })
    }

    fn scan(&mut self) -> CompileResult<Token> {
        while matches!(self.peek(0), Some(' ' | '\t' | '\r')) {
            self.index += 1;
        }

        let Some(c) = self.peek(0) else {
            return Ok(Token {
                kind: TokenKind::Eof,
                line: self.line,
            });
        };

        if c == '\n' {
            let token = self.new_token(TokenKind::NewLine, 1);
            self.line += 1;
            Ok(token)
        } else if c.is_ascii_digit() {
            self.parse_number()
        } else if c.is_ascii_alphabetic() || c == '_' {
            Ok(self.parse_identifier())
        } else if c == '"' {
            self.parse_string()
        } else if c == '=' {
            if self.peek(1) == Some('=') {
                Ok(self.new_token(TokenKind::DoubleEqual, 2))
            } else {
                Ok(self.new_token(TokenKind::Equal, 1))
            }
        } else if c == '.' {
            match self.peek(1) {
                Some('.') => Ok(self.new_token(TokenKind::DoubleDot, 2)),
                next => Err(self.error(LexicalErrorKind::InvalidOperator(next))),
            }
        } else if let Some(kind) = ONE_SYMBOL_TOKENS.get(&c) {
            Ok(self.new_token(kind.clone(), 1))
        } else {
            Err(self.error(LexicalErrorKind::InvalidCharacter(c)))
        }
    }

    /// Scans the next token. Once the input is exhausted this keeps
    /// returning `Eof`.
    pub fn next_token(&mut self) -> CompileResult<Token> {
        let token = self.scan()?;
        trace!(line = token.line, kind = ?token.kind, "token");
        Ok(token)
    }

    /// Drains the whole input, `Eof` included.
    pub fn tokenize(source: &str) -> CompileResult<Vec<Token>> {
        let mut lexer = Lexer::new(source);
        let mut tokens = vec![];

        loop {
            let token = lexer.next_token()?;
            let eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if eof {
                return Ok(tokens);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn double_equal_is_maximal_munch() {
        assert_eq!(
            kinds("a == b = c"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::DoubleEqual,
                TokenKind::Ident("b".to_string()),
                TokenKind::Equal,
                TokenKind::Ident("c".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn newline_is_a_token_and_tabs_are_not() {
        assert_eq!(
            kinds("\tx\n"),
            vec![
                TokenKind::Ident("x".to_string()),
                TokenKind::NewLine,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn lines_are_tracked() {
        let tokens = Lexer::tokenize("a\n\nb").unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[3].line, 3);
    }

    #[test]
    fn lone_dot_is_rejected() {
        let err = Lexer::tokenize("a .b").unwrap_err();
        assert_eq!(
            err,
            CompileError::Lexical {
                line: 1,
                kind: LexicalErrorKind::InvalidOperator(Some('b')),
            }
        );
    }

    #[test]
    fn number_overflow_is_rejected() {
        assert!(matches!(
            Lexer::tokenize("99999999999"),
            Err(CompileError::Lexical {
                kind: LexicalErrorKind::IntegerOutOfRange(_),
                ..
            })
        ));
    }
}
