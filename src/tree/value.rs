use std::cmp::Ordering;
use std::fmt;

/// A scalar leaf value. Covers the type descriptor base types spec §3
/// requires the binder to validate against (numeric, string, enum,
/// bits, identity, leafref resolve to one of these once dereferenced).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    String(String),
    Int(i64),
    UInt(u64),
    Bool(bool),
    /// Enum or identity value, stored by its declared name.
    Symbol(String),
    /// Bits type: set of declared bit names that are on.
    Bits(Vec<String>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) | Value::Symbol(s) => write!(f, "{s}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(u) => write!(f, "{u}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Bits(bits) => write!(f, "{}", bits.join(" ")),
        }
    }
}

/// Values need a total order only to drive canonical list-key sorting;
/// mixed-type comparisons fall back to a stable discriminant order
/// rather than panicking, since keys within one list are always the
/// same declared type in practice but the comparator must stay total.
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        match (self, other) {
            (String(a), String(b)) => a.cmp(b),
            (Symbol(a), Symbol(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (UInt(a), UInt(b)) => a.cmp(b),
            (Bool(a), Bool(b)) => a.cmp(b),
            (Bits(a), Bits(b)) => a.cmp(b),
            _ => discriminant_rank(self).cmp(&discriminant_rank(other)),
        }
    }
}

fn discriminant_rank(v: &Value) -> u8 {
    match v {
        Value::String(_) => 0,
        Value::Int(_) => 1,
        Value::UInt(_) => 2,
        Value::Bool(_) => 3,
        Value::Symbol(_) => 4,
        Value::Bits(_) => 5,
    }
}
