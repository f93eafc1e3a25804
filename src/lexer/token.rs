use std::fmt;

use phf::phf_map;

pub(super) static KEYWORDS: phf::Map<&str, TokenKind> = phf_map! {
    "print" => TokenKind::Print,
    "and" => TokenKind::And,
    "or" => TokenKind::Or,
    "not" => TokenKind::Not,
    "read" => TokenKind::Read,
    "if" => TokenKind::If,
    "then" => TokenKind::Then,
    "else" => TokenKind::Else,
    "while" => TokenKind::While,
    "do" => TokenKind::Do,
    "end" => TokenKind::End,
    "local" => TokenKind::Local,
    "function" => TokenKind::Function,
    "return" => TokenKind::Return,
};

pub(super) static ONE_SYMBOL_TOKENS: phf::Map<char, TokenKind> = phf_map! {
    '(' => TokenKind::OpenParen,
    ')' => TokenKind::CloseParen,
    '>' => TokenKind::GreaterThan,
    '<' => TokenKind::LessThan,
    '+' => TokenKind::Plus,
    '-' => TokenKind::Minus,
    '*' => TokenKind::Star,
    '/' => TokenKind::Slash,
    ',' => TokenKind::Comma,
};

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Plus,
    Minus,
    Star,
    Slash,
    Num(i32),
    Str(String),
    OpenParen,
    CloseParen,
    Comma,

    LessThan,
    GreaterThan,
    DoubleEqual,
    DoubleDot,

    Ident(String),
    Equal,
    NewLine,
    Eof,

    Print,
    Read,
    And,
    Or,
    Not,
    If,
    Then,
    Else,
    While,
    Do,
    End,
    Local,
    Function,
    Return,
}

impl TokenKind {
    /// Name of the lexical category, ignoring any payload.
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Plus => "PLUS",
            TokenKind::Minus => "MINUS",
            TokenKind::Star => "MULT",
            TokenKind::Slash => "DIV",
            TokenKind::Num(_) => "INT",
            TokenKind::Str(_) => "STRING",
            TokenKind::OpenParen => "OPEN_PAR",
            TokenKind::CloseParen => "CLOSE_PAR",
            TokenKind::Comma => "COMMA",
            TokenKind::LessThan => "LOWER",
            TokenKind::GreaterThan => "BIGGER",
            TokenKind::DoubleEqual => "EQUAL",
            TokenKind::DoubleDot => "CONCAT",
            TokenKind::Ident(_) => "IDENTIFIER",
            TokenKind::Equal => "ASSIGN",
            TokenKind::NewLine => "NEWLINE",
            TokenKind::Eof => "EOF",
            TokenKind::Print => "PRINT",
            TokenKind::Read => "READ",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Not => "NOT",
            TokenKind::If => "IF",
            TokenKind::Then => "THEN",
            TokenKind::Else => "ELSE",
            TokenKind::While => "WHILE",
            TokenKind::Do => "DO",
            TokenKind::End => "END",
            TokenKind::Local => "LOCAL",
            TokenKind::Function => "FUNCTION",
            TokenKind::Return => "RETURN",
        }
    }

    /// Same lexical category, payloads not compared.
    pub fn same_kind(&self, other: &TokenKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}
