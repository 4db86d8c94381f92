use std::fmt::Display;

/// A numeric operand. Arithmetic promotes to `Float` when either side is one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    /// Parses a numeric literal, preferring an integer reading.
    pub fn parse(text: &str) -> Option<Self> {
        if let Ok(n) = text.parse::<i64>() {
            return Some(Self::Int(n));
        }

        // keeps names like `inf` or `nan` from reading as floats
        let numeric_start = text
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '.');

        if numeric_start {
            if let Ok(f) = text.parse::<f64>() {
                return Some(Self::Float(f));
            }
        }

        None
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Int(n) => n as f64,
            Self::Float(f) => f,
        }
    }

    pub fn as_i64(&self) -> i64 {
        match *self {
            Self::Int(n) => n,
            Self::Float(f) => f as i64,
        }
    }

    pub fn truthy(&self) -> bool {
        match *self {
            Self::Int(n) => n != 0,
            Self::Float(f) => f != 0.0,
        }
    }
}

impl Display for Num {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    /// Elements are held by value, nested arrays included.
    Array(Vec<Value>),
}

impl Value {
    /// Numeric view used by arithmetic. Strings and arrays read as zero.
    pub fn as_num(&self) -> Num {
        match self {
            Self::Int(n) => Num::Int(*n),
            Self::Float(f) => Num::Float(*f),
            Self::Str(_) | Self::Array(_) => Num::Int(0),
        }
    }
}

impl From<Num> for Value {
    fn from(num: Num) -> Self {
        match num {
            Num::Int(n) => Self::Int(n),
            Num::Float(f) => Self::Float(f),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Array(items) => {
                write!(f, "[")?;

                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }

                    write!(f, "{item}")?;
                }

                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("12", Some(Num::Int(12)); "integer")]
    #[test_case("-4", Some(Num::Int(-4)); "negative integer")]
    #[test_case("2.5", Some(Num::Float(2.5)); "float")]
    #[test_case("2.0", Some(Num::Float(2.0)); "float with zero fraction")]
    #[test_case("inf", None; "name that parses as float")]
    #[test_case("t0", None; "temp name")]
    #[test_case("", None; "empty")]
    fn parse_literal(text: &str, expected: Option<Num>) {
        assert_eq!(Num::parse(text), expected);
    }

    #[test_case(Value::Int(7), "7"; "int")]
    #[test_case(Value::Float(3.5), "3.5"; "float")]
    #[test_case(Value::Float(3.0), "3"; "whole float")]
    #[test_case(Value::Str("hi there".to_string()), "hi there"; "string")]
    #[test_case(
        Value::Array(vec![Value::Array(vec![Value::Int(1), Value::Int(2)]), Value::Str("x".to_string())]),
        "[[1, 2], x]";
        "nested array"
    )]
    fn display(value: Value, expected: &str) {
        assert_eq!(value.to_string(), expected);
    }
}
