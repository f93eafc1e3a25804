use std::fmt;

/// Compile-time type tag carried by every evaluated expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ty {
    Int,
    String,
    /// Result of a statement; never an operand.
    Void,
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Int => f.write_str("INT"),
            Ty::String => f.write_str("STRING"),
            Ty::Void => f.write_str("VOID"),
        }
    }
}

/// Compile-time placeholder produced by evaluating a node. It exists to carry
/// a type through literal folding; the runtime value lives in EAX.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i32),
    Str(String),
    Void,
}

impl Value {
    /// Stand-in for values only known at runtime (`read()`, variables, calls).
    pub fn unknown(ty: Ty) -> Self {
        match ty {
            Ty::Int => Value::Int(0),
            Ty::String => Value::Str(String::new()),
            Ty::Void => Value::Void,
        }
    }

    pub fn ty(&self) -> Ty {
        match self {
            Value::Int(_) => Ty::Int,
            Value::Str(_) => Ty::String,
            Value::Void => Ty::Void,
        }
    }

    pub fn as_int(&self) -> i32 {
        match self {
            Value::Int(v) => *v,
            _ => 0,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => v.fmt(f),
            Value::Str(s) => f.write_str(s),
            Value::Void => Ok(()),
        }
    }
}
