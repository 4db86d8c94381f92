use std::fmt::Display;

use serde::Serialize;

use crate::frontend::ast::BinaryOp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    Not,
    Label,
    IfFalse,
    Goto,
    Print,
    PrintLast,
    Param,
    Call,
    Return,
    Send,
    SendArg,
    Receive,
    RecvArg,
    ArrayInit,
    ArraySet,
    ArrayGet,
    ArrayConcat,
    Input,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::And => "&&",
            Self::Or => "||",
            Self::Not => "!",
            Self::Label => "label",
            Self::IfFalse => "if_false",
            Self::Goto => "goto",
            Self::Print => "print",
            Self::PrintLast => "print_last",
            Self::Param => "param",
            Self::Call => "call",
            Self::Return => "return",
            Self::Send => "send",
            Self::SendArg => "send_arg",
            Self::Receive => "receive",
            Self::RecvArg => "recv_arg",
            Self::ArrayInit => "array_init",
            Self::ArraySet => "array_set",
            Self::ArrayGet => "array_get",
            Self::ArrayConcat => "array_concat",
            Self::Input => "input",
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            Self::Add
                | Self::Sub
                | Self::Mul
                | Self::Div
                | Self::Eq
                | Self::Ne
                | Self::Lt
                | Self::Lte
                | Self::Gt
                | Self::Gte
                | Self::And
                | Self::Or
        )
    }
}

impl From<BinaryOp> for Op {
    fn from(op: BinaryOp) -> Self {
        match op {
            BinaryOp::Add => Self::Add,
            BinaryOp::Sub => Self::Sub,
            BinaryOp::Mul => Self::Mul,
            BinaryOp::Div => Self::Div,
            BinaryOp::Eq => Self::Eq,
            BinaryOp::Ne => Self::Ne,
            BinaryOp::Lt => Self::Lt,
            BinaryOp::Lte => Self::Lte,
            BinaryOp::Gt => Self::Gt,
            BinaryOp::Gte => Self::Gte,
            BinaryOp::And => Self::And,
            BinaryOp::Or => Self::Or,
        }
    }
}

/// A four-address instruction. Which of `result`, `arg1` and `arg2` are
/// meaningful depends on `op`; unused fields are empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    pub result: String,
    pub op: Op,
    pub arg1: String,
    pub arg2: String,
}

impl Instruction {
    pub fn new(
        result: impl Into<String>,
        op: Op,
        arg1: impl Into<String>,
        arg2: impl Into<String>,
    ) -> Self {
        Self {
            result: result.into(),
            op,
            arg1: arg1.into(),
            arg2: arg2.into(),
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            result,
            op,
            arg1,
            arg2,
        } = self;

        match op {
            Op::Assign => write!(f, "{result} = {arg1}"),
            Op::Not => write!(f, "{result} = ! {arg1}"),
            Op::Label => write!(f, "{result}:"),
            Op::IfFalse => write!(f, "if_false {arg1} goto {arg2}"),
            Op::Goto => write!(f, "goto {arg1}"),
            Op::Print | Op::PrintLast | Op::Return => write!(f, "{} {arg1}", op.as_str()),
            Op::Param => write!(f, "param {result} = {arg1}"),
            Op::Call => write!(f, "{result} = call {arg1}, {arg2}"),
            Op::Send | Op::Receive => write!(f, "{} {arg1} count={arg2}", op.as_str()),
            Op::SendArg => write!(f, "{result}[{arg2}] <= {arg1}"),
            Op::RecvArg => write!(f, "{result} = recv {arg1}[{arg2}]"),
            Op::ArrayInit => write!(f, "{result} = array_init {arg1}"),
            Op::ArraySet => write!(f, "array_set {result}, {arg1}, {arg2}"),
            Op::ArrayGet | Op::ArrayConcat => {
                write!(f, "{result} = {} {arg1}, {arg2}", op.as_str())
            }
            Op::Input => write!(f, "input {result}"),
            _ => write!(f, "{result} = {arg1} {} {arg2}", op.as_str()),
        }
    }
}

/// Renders one instruction per line.
pub fn listing(instructions: &[Instruction]) -> String {
    instructions
        .iter()
        .map(|instr| format!("{instr}\n"))
        .collect()
}
