use std::collections::HashMap;

use crate::{
    backend::tac::{Instruction, Op},
    frontend::ast::{BinaryOp, Expr, ExprKind, Program, Stmt, StmtKind, TypeName, UnaryOp},
};

/// Slot holding the value of the most recent `return`.
pub const RETVAL: &str = "retval";

/// Operand used where an expression could not be lowered.
pub const ERROR_OPERAND: &str = "error";

pub fn arg_slot(index: usize) -> String {
    format!("arg{index}")
}

pub fn return_label(function: &str) -> String {
    format!("L_return_{function}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Scalar,
    Array,
}

/// Lowering state that depends on where a statement appears.
#[derive(Debug, Clone, Copy, Default)]
struct Context<'a> {
    function: Option<&'a str>,
}

#[derive(Debug, Default)]
pub struct Generator {
    instructions: Vec<Instruction>,
    temps: usize,
    labels: usize,
    kinds: HashMap<String, Kind>,
}

impl Generator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&mut self, program: &Program) -> Vec<Instruction> {
        self.instructions.clear();
        self.kinds.clear();
        self.temps = 0;
        self.labels = 0;

        for stmt in program.body.iter() {
            self.stmt(Context::default(), stmt);
        }

        tracing::debug!(
            instructions = self.instructions.len(),
            temps = self.temps,
            labels = self.labels,
            "generated three-address code"
        );

        std::mem::take(&mut self.instructions)
    }

    fn temp(&mut self) -> String {
        let temp = format!("t{}", self.temps);
        self.temps += 1;
        temp
    }

    fn label(&mut self) -> String {
        let label = format!("L{}", self.labels);
        self.labels += 1;
        label
    }

    fn push(
        &mut self,
        result: impl Into<String>,
        op: Op,
        arg1: impl Into<String>,
        arg2: impl Into<String>,
    ) {
        self.instructions
            .push(Instruction::new(result, op, arg1, arg2));
    }

    fn kind_of(&self, operand: &str) -> Kind {
        self.kinds.get(operand).copied().unwrap_or(Kind::Scalar)
    }

    fn set_kind(&mut self, name: &str, kind: Kind) {
        self.kinds.insert(name.to_string(), kind);
    }

    fn literal(&mut self, value: String) -> String {
        let temp = self.temp();
        self.push(temp.clone(), Op::Assign, value, "");
        temp
    }

    fn call(&mut self, name: &str, args: &[Expr]) -> String {
        let values = args.iter().map(|arg| self.expr(arg)).collect::<Vec<_>>();

        for (i, value) in values.into_iter().enumerate() {
            self.push(arg_slot(i), Op::Assign, value, "");
        }

        let temp = self.temp();
        self.push(temp.clone(), Op::Call, name, args.len().to_string());
        temp
    }

    fn array_literal(&mut self, items: &[Expr]) -> String {
        let base = self.temp();
        self.push(base.clone(), Op::ArrayInit, items.len().to_string(), "");
        self.set_kind(&base, Kind::Array);

        for (i, item) in items.iter().enumerate() {
            let value = self.expr(item);
            self.push(base.clone(), Op::ArraySet, value, i.to_string());
        }

        base
    }

    fn binary(&mut self, lhs: &Expr, op: BinaryOp, rhs: &Expr) -> String {
        let lhs = self.expr(lhs);
        let rhs = self.expr(rhs);
        let temp = self.temp();

        if op == BinaryOp::Add
            && self.kind_of(&lhs) == Kind::Array
            && self.kind_of(&rhs) == Kind::Array
        {
            self.push(temp.clone(), Op::ArrayConcat, lhs, rhs);
            self.set_kind(&temp, Kind::Array);
        } else {
            self.push(temp.clone(), op.into(), lhs, rhs);
        }

        temp
    }

    fn expr(&mut self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Number(n) => self.literal(n.to_string()),
            // debug formatting keeps the fraction so `2.0` stays a float
            ExprKind::Float(f) => self.literal(format!("{f:?}")),
            ExprKind::Str(s) => self.literal(format!("\"{s}\"")),
            ExprKind::Bool(b) => self.literal(if *b { "1" } else { "0" }.to_string()),
            ExprKind::Identifier(name) => name.clone(),
            ExprKind::ArrayLiteral(items) => self.array_literal(items),
            ExprKind::ArrayAccess(base, index) => {
                let base = self.expr(base);
                let index = self.expr(index);
                let temp = self.temp();
                self.push(temp.clone(), Op::ArrayGet, base, index);
                temp
            }
            ExprKind::Call(name, args) => {
                self.call(name, args);
                let temp = self.temp();
                self.push(temp.clone(), Op::Assign, RETVAL, "");
                temp
            }
            ExprKind::Unary(UnaryOp::Neg, operand) => {
                let operand = self.expr(operand);
                let temp = self.temp();
                self.push(temp.clone(), Op::Sub, "0", operand);
                temp
            }
            ExprKind::Unary(UnaryOp::Not, operand) => {
                let operand = self.expr(operand);
                let temp = self.temp();
                self.push(temp.clone(), Op::Not, operand, "");
                temp
            }
            ExprKind::Binary(lhs, op, rhs) => self.binary(lhs, *op, rhs),
            ExprKind::Error => ERROR_OPERAND.to_string(),
        }
    }

    fn assign(&mut self, name: &str, value: &Expr) {
        if let ExprKind::Call(function, args) = &value.kind {
            self.call(function, args);
            self.push(name, Op::Assign, RETVAL, "");
            self.set_kind(name, Kind::Scalar);
            return;
        }

        let value = self.expr(value);
        let kind = self.kind_of(&value);
        self.push(name, Op::Assign, value, "");
        self.set_kind(name, kind);
    }

    fn print(&mut self, args: &[Expr]) {
        if args.is_empty() {
            self.push("", Op::PrintLast, "", "");
            return;
        }

        let last = args.len() - 1;

        for (i, arg) in args.iter().enumerate() {
            let value = self.expr(arg);
            let op = if i == last { Op::PrintLast } else { Op::Print };
            self.push("", op, value, "");
        }
    }

    fn ret(&mut self, ctx: Context<'_>, value: Option<&Expr>) {
        let value = value.map(|value| self.expr(value));

        match ctx.function {
            Some(function) => {
                self.push(RETVAL, Op::Assign, value.unwrap_or_else(|| "0".to_string()), "");
                self.push("", Op::Goto, return_label(function), "");
            }
            None => self.push("", Op::Return, value.unwrap_or_default(), ""),
        }
    }

    fn stmt(&mut self, ctx: Context<'_>, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Seq(body) | StmtKind::Par(body) => {
                for stmt in body.iter() {
                    self.stmt(ctx, stmt);
                }
            }
            StmtKind::VarDecl {
                name,
                init: Some(init),
                ..
            } => self.assign(name, init),
            StmtKind::VarDecl { ty, name, init: None } => {
                let zero = match ty {
                    TypeName::Int | TypeName::Bool => "0",
                    TypeName::String => "\"\"",
                };

                self.push(name.clone(), Op::Assign, zero, "");
                self.set_kind(name, Kind::Scalar);
            }
            StmtKind::ChannelDecl { .. } => {}
            StmtKind::Assignment(name, value) => self.assign(name, value),
            StmtKind::ArrayAssignment {
                array,
                index,
                value,
            } => {
                let array = self.expr(array);
                let index = self.expr(index);
                let value = self.expr(value);
                self.push(array, Op::ArraySet, value, index);
            }
            StmtKind::Print(args) => self.print(args),
            StmtKind::Input(name) => {
                self.push(name.clone(), Op::Input, "", "");
                self.set_kind(name, Kind::Scalar);
            }
            StmtKind::Send(op, args) => {
                let values = args.iter().map(|arg| self.expr(arg)).collect::<Vec<_>>();
                self.push("", Op::Send, op.channel.clone(), values.len().to_string());

                for (i, value) in values.into_iter().enumerate() {
                    self.push(op.channel.clone(), Op::SendArg, value, i.to_string());
                }
            }
            StmtKind::Receive(op, vars) => {
                self.push("", Op::Receive, op.channel.clone(), vars.len().to_string());

                for (i, var) in vars.iter().enumerate() {
                    self.push(var.clone(), Op::RecvArg, op.channel.clone(), i.to_string());
                    self.set_kind(var, Kind::Scalar);
                }
            }
            StmtKind::FunctionDecl(decl) => {
                let skip = self.label();
                self.push("", Op::Goto, skip.clone(), "");
                self.push(decl.name.clone(), Op::Label, "", "");

                for (i, param) in decl.params.iter().enumerate() {
                    self.push(param.clone(), Op::Param, arg_slot(i), "");
                }

                let inner = Context {
                    function: Some(decl.name.as_str()),
                };

                self.stmt(inner, &decl.body);
                self.push(return_label(&decl.name), Op::Label, "", "");
                self.push("", Op::Return, RETVAL, "");
                self.push(skip, Op::Label, "", "");
            }
            StmtKind::Call(name, args) => {
                self.call(name, args);
            }
            StmtKind::Return(value) => self.ret(ctx, value.as_ref()),
            StmtKind::If { cond, then, alt } => {
                let cond = self.expr(cond);
                let else_label = self.label();
                let end_label = self.label();

                self.push("", Op::IfFalse, cond, else_label.clone());
                self.stmt(ctx, then);
                self.push("", Op::Goto, end_label.clone(), "");
                self.push(else_label, Op::Label, "", "");

                if let Some(alt) = alt {
                    self.stmt(ctx, alt);
                }

                self.push(end_label, Op::Label, "", "");
            }
            StmtKind::While { cond, body } => {
                let start_label = self.label();
                let end_label = self.label();

                self.push(start_label.clone(), Op::Label, "", "");
                let cond = self.expr(cond);
                self.push("", Op::IfFalse, cond, end_label.clone());
                self.stmt(ctx, body);
                self.push("", Op::Goto, start_label, "");
                self.push(end_label, Op::Label, "", "");
            }
        }
    }
}

pub fn generate(program: &Program) -> Vec<Instruction> {
    Generator::new().generate(program)
}
