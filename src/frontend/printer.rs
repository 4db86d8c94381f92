use crate::frontend::ast::{Expr, ExprKind, Program, Stmt, StmtKind};

struct Printer {
    indent: usize,
    output: String,
}

impl Printer {
    fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.indent {
            self.output.push_str("  ");
        }

        self.output.push_str(text.as_ref());
        self.output.push('\n');
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self)) {
        self.indent += 1;
        f(self);
        self.indent -= 1;
    }

    fn labeled_expr(&mut self, label: &str, expr: &Expr) {
        self.line(label);
        self.nested(|p| p.expr(expr));
    }

    fn labeled_stmt(&mut self, label: &str, stmt: &Stmt) {
        self.line(label);
        self.nested(|p| p.stmt(stmt));
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        self.nested(|p| stmts.iter().for_each(|stmt| p.stmt(stmt)));
    }

    fn exprs(&mut self, exprs: &[Expr]) {
        self.nested(|p| exprs.iter().for_each(|expr| p.expr(expr)));
    }

    fn from_component(component: &str) -> String {
        if component.is_empty() {
            return String::new();
        }

        format!(" from={component}")
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Seq(body) => {
                self.line("SEQ:");
                self.stmts(body);
            }
            StmtKind::Par(body) => {
                self.line("PAR:");
                self.stmts(body);
            }
            StmtKind::VarDecl { ty, name, init } => {
                self.line(format!("VarDecl: {} {name}", ty.as_str()));

                if let Some(init) = init {
                    self.nested(|p| p.expr(init));
                }
            }
            StmtKind::ChannelDecl { name, comp1, comp2 } => {
                self.line(format!("Channel: {name} ({comp1} <-> {comp2})"));
            }
            StmtKind::Assignment(name, value) => {
                self.line(format!("Assignment: {name} ="));
                self.nested(|p| p.expr(value));
            }
            StmtKind::ArrayAssignment {
                array,
                index,
                value,
            } => {
                self.line("ArrayAssignment:");
                self.nested(|p| {
                    p.labeled_expr("Array:", array);
                    p.labeled_expr("Index:", index);
                    p.labeled_expr("Value:", value);
                });
            }
            StmtKind::Print(args) => {
                self.line("Print:");
                self.exprs(args);
            }
            StmtKind::Input(name) => self.line(format!("Input: {name}")),
            StmtKind::Send(op, args) => {
                self.line(format!(
                    "Send: {}{}",
                    op.channel,
                    Self::from_component(&op.component)
                ));
                self.exprs(args);
            }
            StmtKind::Receive(op, vars) => {
                self.line(format!(
                    "Receive: {}{}",
                    op.channel,
                    Self::from_component(&op.component)
                ));

                for var in vars {
                    self.line(format!("  -> {var}"));
                }
            }
            StmtKind::FunctionDecl(decl) => {
                self.line(format!(
                    "FunctionDecl: {}({})",
                    decl.name,
                    decl.params.join(", ")
                ));
                self.nested(|p| p.stmt(&decl.body));
            }
            StmtKind::Call(name, args) => {
                self.line(format!("Call: {name}"));
                self.exprs(args);
            }
            StmtKind::Return(value) => {
                self.line("Return:");

                if let Some(value) = value {
                    self.nested(|p| p.expr(value));
                }
            }
            StmtKind::If { cond, then, alt } => {
                self.line("If:");
                self.nested(|p| {
                    p.labeled_expr("Condition:", cond);
                    p.labeled_stmt("Then:", then);

                    if let Some(alt) = alt {
                        p.labeled_stmt("Else:", alt);
                    }
                });
            }
            StmtKind::While { cond, body } => {
                self.line("While:");
                self.nested(|p| {
                    p.labeled_expr("Condition:", cond);
                    p.labeled_stmt("Body:", body);
                });
            }
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Number(n) => self.line(format!("Number: {n}")),
            ExprKind::Float(f) => self.line(format!("Float: {f}")),
            ExprKind::Str(s) => self.line(format!("String: \"{s}\"")),
            ExprKind::Bool(b) => self.line(format!("Boolean: {b}")),
            ExprKind::Identifier(name) => self.line(format!("Identifier: {name}")),
            ExprKind::ArrayLiteral(items) => {
                self.line(format!("ArrayLiteral: {} elements", items.len()));
                self.exprs(items);
            }
            ExprKind::ArrayAccess(base, index) => {
                self.line("ArrayAccess:");
                self.nested(|p| {
                    p.labeled_expr("Array:", base);
                    p.labeled_expr("Index:", index);
                });
            }
            ExprKind::Call(name, args) => {
                self.line(format!("Call: {name}"));
                self.exprs(args);
            }
            ExprKind::Unary(op, operand) => {
                self.line(format!("UnaryOp: {}", op.as_str()));
                self.nested(|p| p.expr(operand));
            }
            ExprKind::Binary(lhs, op, rhs) => {
                self.line(format!("BinaryOp: {}", op.as_str()));
                self.nested(|p| {
                    p.labeled_expr("Left:", lhs);
                    p.labeled_expr("Right:", rhs);
                });
            }
            ExprKind::Error => self.line("Error"),
        }
    }
}

/// Renders the program as an indented tree, two spaces per level.
pub fn print_tree(program: &Program) -> String {
    let mut printer = Printer {
        indent: 0,
        output: String::new(),
    };

    printer.line("Program:");
    printer.stmts(&program.body);

    printer.output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parse;

    #[test]
    fn indented_listing() {
        let program = parse("SEQ { x = 1 + 2; print x; }").unwrap();

        assert_eq!(
            print_tree(&program),
            "Program:
  SEQ:
    Assignment: x =
      BinaryOp: +
        Left:
          Number: 1
        Right:
          Number: 2
    Print:
      Identifier: x
"
        );
    }

    #[test]
    fn channel_ops_show_component() {
        let program = parse("comp a c.send(1) c.receive(v)").unwrap();
        let tree = print_tree(&program);

        assert!(tree.contains("Send: c from=a"));
        assert!(tree.contains("Receive: c from=a\n    -> v"));
    }
}
