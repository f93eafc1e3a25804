use tracing::debug;

use crate::{
    error::{CompileError, CompileResult},
    lexer::{strip_comments, Lexer, Token, TokenKind},
};

use super::{BinOpKind, Block, FuncDec, IdGenerator, Node, NodeKind, UnOpKind};

const IDENT: TokenKind = TokenKind::Ident(String::new());

const STATEMENT_START: [TokenKind; 8] = [
    IDENT,
    TokenKind::Local,
    TokenKind::Function,
    TokenKind::Return,
    TokenKind::Print,
    TokenKind::While,
    TokenKind::If,
    TokenKind::NewLine,
];

/// Outside a function body `return` is not a statement.
const TOP_LEVEL_STATEMENT_START: [TokenKind; 7] = [
    IDENT,
    TokenKind::Local,
    TokenKind::Function,
    TokenKind::Print,
    TokenKind::While,
    TokenKind::If,
    TokenKind::NewLine,
];

const FACTOR_START: [TokenKind; 8] = [
    IDENT,
    TokenKind::Num(0),
    TokenKind::Str(String::new()),
    TokenKind::Plus,
    TokenKind::Minus,
    TokenKind::Not,
    TokenKind::OpenParen,
    TokenKind::Read,
];

const BOOL_EXPR_OPS: [(TokenKind, BinOpKind); 1] = [(TokenKind::Or, BinOpKind::Or)];
const BOOL_TERM_OPS: [(TokenKind, BinOpKind); 1] = [(TokenKind::And, BinOpKind::And)];
const RELATIONAL_OPS: [(TokenKind, BinOpKind); 3] = [
    (TokenKind::GreaterThan, BinOpKind::GreaterThan),
    (TokenKind::LessThan, BinOpKind::LessThan),
    (TokenKind::DoubleEqual, BinOpKind::Equal),
];
const EXPR_OPS: [(TokenKind, BinOpKind); 3] = [
    (TokenKind::Plus, BinOpKind::Add),
    (TokenKind::Minus, BinOpKind::Sub),
    (TokenKind::DoubleDot, BinOpKind::Concat),
];
const TERM_OPS: [(TokenKind, BinOpKind); 2] = [
    (TokenKind::Star, BinOpKind::Mul),
    (TokenKind::Slash, BinOpKind::Div),
];

#[derive(Debug)]
pub struct Parser<'a> {
    lexer: Lexer,
    current: Token,
    ids: &'a mut IdGenerator,
    /// Number of enclosing `function` bodies.
    function_depth: usize,
}

impl<'a> Parser<'a> {
    /// Filters comments out of `source` and primes the first token.
    pub fn new(source: &str, ids: &'a mut IdGenerator) -> CompileResult<Self> {
        let mut lexer = Lexer::new(&strip_comments(source));
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            ids,
            function_depth: 0,
        })
    }

    /// Parses the whole input into a top-level block node.
    pub fn parse(&mut self) -> CompileResult<Node> {
        let program = self.parse_program()?;
        debug!(statements = program.0.len(), "parsed program");
        Ok(self.node(NodeKind::Block(program)))
    }

    fn node(&mut self, kind: NodeKind) -> Node {
        Node {
            id: self.ids.next_id(),
            kind,
        }
    }

    fn advance(&mut self) -> CompileResult<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn unexpected(&self, expected: &[TokenKind]) -> CompileError {
        CompileError::Syntax {
            line: self.current.line,
            expected: expected.iter().map(TokenKind::name).collect(),
            actual: self.current.kind.name(),
        }
    }

    fn at(&self, kinds: &[TokenKind]) -> bool {
        kinds.iter().any(|k| k.same_kind(&self.current.kind))
    }

    fn consume(&mut self, kind: &TokenKind) -> CompileResult<bool> {
        if !kind.same_kind(&self.current.kind) {
            return Ok(false);
        }
        self.advance()?;
        Ok(true)
    }

    fn expect(&mut self, kind: &TokenKind) -> CompileResult<()> {
        if self.consume(kind)? {
            Ok(())
        } else {
            Err(self.unexpected(std::slice::from_ref(kind)))
        }
    }

    fn expect_ident(&mut self) -> CompileResult<String> {
        let TokenKind::Ident(name) = &mut self.current.kind else {
            return Err(self.unexpected(&[IDENT]));
        };
        let name = std::mem::take(name);
        self.advance()?;
        Ok(name)
    }

    /// A statement ends at a newline (consumed) or at end of input.
    fn expect_end_of_statement(&mut self) -> CompileResult<()> {
        if self.consume(&TokenKind::NewLine)? || self.current.kind == TokenKind::Eof {
            Ok(())
        } else {
            Err(self.unexpected(&[TokenKind::NewLine, TokenKind::Eof]))
        }
    }

    /// program = stmt* EOF
    fn parse_program(&mut self) -> CompileResult<Block> {
        let mut stmts = vec![];
        while self.current.kind != TokenKind::Eof {
            stmts.push(self.parse_stmt()?);
        }
        Ok(Block(stmts))
    }

    /// block = stmt* (up to, not including, one of `terminators`)
    fn parse_block(&mut self, terminators: &[TokenKind]) -> CompileResult<Block> {
        let mut stmts = vec![];
        while !self.at(terminators) {
            if self.current.kind == TokenKind::Eof {
                return Err(self.unexpected(terminators));
            }
            stmts.push(self.parse_stmt()?);
        }
        Ok(Block(stmts))
    }

    /// stmt = ident "=" bool_expr
    ///      | ident "(" args ")"
    ///      | "local" ident ("=" bool_expr)?
    ///      | "function" ident "(" params ")" NEWLINE block "end"
    ///      | "return" bool_expr
    ///      | "print" "(" bool_expr ")"
    ///      | "while" bool_expr "do" NEWLINE block "end"
    ///      | "if" bool_expr "then" NEWLINE block ("else" NEWLINE block)? "end"
    ///      | (empty)
    /// each followed by NEWLINE or EOF
    fn parse_stmt(&mut self) -> CompileResult<Node> {
        let node = match self.current.kind {
            TokenKind::Ident(_) => self.parse_ident_stmt()?,
            TokenKind::Local => self.parse_var_dec()?,
            TokenKind::Function => self.parse_func_dec()?,
            TokenKind::Return if self.function_depth == 0 => {
                return Err(self.unexpected(&TOP_LEVEL_STATEMENT_START));
            }
            TokenKind::Return => {
                self.advance()?;
                let expr = self.parse_bool_expr()?;
                self.node(NodeKind::Return(Box::new(expr)))
            }
            TokenKind::Print => {
                self.advance()?;
                self.expect(&TokenKind::OpenParen)?;
                let expr = self.parse_bool_expr()?;
                self.expect(&TokenKind::CloseParen)?;
                self.node(NodeKind::Print(Box::new(expr)))
            }
            TokenKind::While => self.parse_while()?,
            TokenKind::If => self.parse_if()?,
            TokenKind::NewLine => self.node(NodeKind::NoOp),
            _ => return Err(self.unexpected(&STATEMENT_START)),
        };

        self.expect_end_of_statement()?;
        Ok(node)
    }

    fn parse_ident_stmt(&mut self) -> CompileResult<Node> {
        let name = self.expect_ident()?;

        if self.consume(&TokenKind::Equal)? {
            let expr = self.parse_bool_expr()?;
            Ok(self.node(NodeKind::Assign(name, Box::new(expr))))
        } else if self.current.kind == TokenKind::OpenParen {
            let args = self.parse_args()?;
            Ok(self.node(NodeKind::FuncCall(name, args)))
        } else {
            Err(self.unexpected(&[TokenKind::Equal, TokenKind::OpenParen]))
        }
    }

    fn parse_var_dec(&mut self) -> CompileResult<Node> {
        self.expect(&TokenKind::Local)?;
        let name = self.expect_ident()?;
        let init = if self.consume(&TokenKind::Equal)? {
            Some(Box::new(self.parse_bool_expr()?))
        } else {
            None
        };
        Ok(self.node(NodeKind::VarDec(name, init)))
    }

    /// params = (ident ("," ident)*)?
    fn parse_func_dec(&mut self) -> CompileResult<Node> {
        self.expect(&TokenKind::Function)?;
        let name = self.expect_ident()?;

        let mut params = vec![];
        self.expect(&TokenKind::OpenParen)?;
        if !self.consume(&TokenKind::CloseParen)? {
            params.push(self.expect_ident()?);
            while self.consume(&TokenKind::Comma)? {
                params.push(self.expect_ident()?);
            }
            self.expect(&TokenKind::CloseParen)?;
        }
        self.expect(&TokenKind::NewLine)?;

        self.function_depth += 1;
        let body = self.parse_block(&[TokenKind::End]);
        self.function_depth -= 1;
        let body = body?;
        self.expect(&TokenKind::End)?;

        Ok(self.node(NodeKind::FuncDec(FuncDec { name, params, body })))
    }

    fn parse_while(&mut self) -> CompileResult<Node> {
        self.expect(&TokenKind::While)?;
        let cond = self.parse_bool_expr()?;
        self.expect(&TokenKind::Do)?;
        self.expect(&TokenKind::NewLine)?;

        let body = self.parse_block(&[TokenKind::End])?;
        self.expect(&TokenKind::End)?;

        Ok(self.node(NodeKind::While(Box::new(cond), body)))
    }

    /// The else block is empty, not absent, when there is no `else`.
    fn parse_if(&mut self) -> CompileResult<Node> {
        self.expect(&TokenKind::If)?;
        let cond = self.parse_bool_expr()?;
        self.expect(&TokenKind::Then)?;
        self.expect(&TokenKind::NewLine)?;

        let then_block = self.parse_block(&[TokenKind::End, TokenKind::Else])?;
        let else_block = if self.consume(&TokenKind::Else)? {
            self.expect(&TokenKind::NewLine)?;
            self.parse_block(&[TokenKind::End])?
        } else {
            Block(vec![])
        };
        self.expect(&TokenKind::End)?;

        Ok(self.node(NodeKind::If(Box::new(cond), then_block, else_block)))
    }

    /// args = "(" (bool_expr ("," bool_expr)*)? ")"
    fn parse_args(&mut self) -> CompileResult<Vec<Node>> {
        let mut args = vec![];
        self.expect(&TokenKind::OpenParen)?;

        if !self.consume(&TokenKind::CloseParen)? {
            args.push(self.parse_bool_expr()?);
            while self.consume(&TokenKind::Comma)? {
                args.push(self.parse_bool_expr()?);
            }
            self.expect(&TokenKind::CloseParen)?;
        }

        Ok(args)
    }

    /// Left-associative fold of `next` over the operators in `ops`.
    fn parse_binary(
        &mut self,
        ops: &[(TokenKind, BinOpKind)],
        next: fn(&mut Self) -> CompileResult<Node>,
    ) -> CompileResult<Node> {
        let mut node = next(self)?;

        while let Some(&(_, kind)) = ops.iter().find(|(t, _)| *t == self.current.kind) {
            self.advance()?;
            let rhs = next(self)?;
            node = self.node(NodeKind::BinOp(kind, Box::new(node), Box::new(rhs)));
        }

        Ok(node)
    }

    /// bool_expr = bool_term ("or" bool_term)*
    fn parse_bool_expr(&mut self) -> CompileResult<Node> {
        self.parse_binary(&BOOL_EXPR_OPS, Self::parse_bool_term)
    }

    /// bool_term = relational ("and" relational)*
    fn parse_bool_term(&mut self) -> CompileResult<Node> {
        self.parse_binary(&BOOL_TERM_OPS, Self::parse_relational)
    }

    /// relational = expr ((">" | "<" | "==") expr)*
    fn parse_relational(&mut self) -> CompileResult<Node> {
        self.parse_binary(&RELATIONAL_OPS, Self::parse_expr)
    }

    /// expr = term (("+" | "-" | "..") term)*
    fn parse_expr(&mut self) -> CompileResult<Node> {
        self.parse_binary(&EXPR_OPS, Self::parse_term)
    }

    /// term = factor (("*" | "/") factor)*
    fn parse_term(&mut self) -> CompileResult<Node> {
        self.parse_binary(&TERM_OPS, Self::parse_factor)
    }

    /// factor = ident ("(" args ")")?
    ///        | num
    ///        | string
    ///        | ("+" | "-" | "not") factor
    ///        | "(" bool_expr ")"
    ///        | "read" "(" ")"
    fn parse_factor(&mut self) -> CompileResult<Node> {
        match &mut self.current.kind {
            TokenKind::Ident(_) => {
                let name = self.expect_ident()?;
                if self.current.kind == TokenKind::OpenParen {
                    let args = self.parse_args()?;
                    Ok(self.node(NodeKind::FuncCall(name, args)))
                } else {
                    Ok(self.node(NodeKind::Identifier(name)))
                }
            }
            TokenKind::Num(num) => {
                let num = *num;
                self.advance()?;
                Ok(self.node(NodeKind::IntVal(num)))
            }
            TokenKind::Str(s) => {
                let s = std::mem::take(s);
                self.advance()?;
                Ok(self.node(NodeKind::StrVal(s)))
            }
            TokenKind::Plus | TokenKind::Minus | TokenKind::Not => {
                let op = match self.current.kind {
                    TokenKind::Plus => UnOpKind::Plus,
                    TokenKind::Minus => UnOpKind::Neg,
                    _ => UnOpKind::Not,
                };
                self.advance()?;
                let operand = self.parse_factor()?;
                Ok(self.node(NodeKind::UnOp(op, Box::new(operand))))
            }
            TokenKind::OpenParen => {
                self.advance()?;
                let expr = self.parse_bool_expr()?;
                self.expect(&TokenKind::CloseParen)?;
                Ok(expr)
            }
            TokenKind::Read => {
                self.advance()?;
                self.expect(&TokenKind::OpenParen)?;
                self.expect(&TokenKind::CloseParen)?;
                Ok(self.node(NodeKind::Read))
            }
            _ => Err(self.unexpected(&FACTOR_START)),
        }
    }
}
