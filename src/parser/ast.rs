use std::fmt;

/// Unique per node; control-flow labels are derived from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Hands out node ids. Owned by whoever drives the compilation, never global.
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: usize,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block(pub Vec<Node>);

#[derive(Clone, Debug, PartialEq)]
pub struct FuncDec {
    pub name: String,
    /// Parameter names, in declaration order. They only reserve names in the
    /// callee's scope; no code is generated for them.
    pub params: Vec<String>,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Identifier(String),
    IntVal(i32),
    StrVal(String),
    BinOp(BinOpKind, Box<Node>, Box<Node>),
    UnOp(UnOpKind, Box<Node>),

    Assign(String, Box<Node>),
    VarDec(String, Option<Box<Node>>),
    Block(Block),
    If(Box<Node>, Block, Block),
    While(Box<Node>, Block),
    Read,
    Print(Box<Node>),
    FuncDec(FuncDec),
    FuncCall(String, Vec<Node>),
    Return(Box<Node>),
    NoOp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
    GreaterThan,
    LessThan,
    Equal,
    And,
    Or,
    Concat,
}

impl BinOpKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mul => "*",
            BinOpKind::Div => "/",
            BinOpKind::GreaterThan => ">",
            BinOpKind::LessThan => "<",
            BinOpKind::Equal => "==",
            BinOpKind::And => "and",
            BinOpKind::Or => "or",
            BinOpKind::Concat => "..",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOpKind {
    Plus,
    Neg,
    Not,
}

impl UnOpKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnOpKind::Plus => "+",
            UnOpKind::Neg => "-",
            UnOpKind::Not => "not",
        }
    }
}
