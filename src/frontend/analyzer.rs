use std::{collections::BTreeMap, fmt::Display};

use serde::Serialize;

use crate::frontend::ast::{Expr, ExprKind, Program, Stmt, StmtKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SymbolKind {
    Variable,
    Function,
    Channel,
    Parameter,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Variable => "VAR",
            Self::Function => "FUN",
            Self::Channel => "CHAN",
            Self::Parameter => "PARAM",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub data_type: &'static str,
}

fn infer_type(expr: &Expr) -> &'static str {
    match expr.kind {
        ExprKind::Str(_) => "string",
        ExprKind::Float(_) => "float",
        ExprKind::ArrayLiteral(_) => "array",
        _ => "int",
    }
}

/// Names seen in a program, ordered by name. The first registration of a
/// name wins, later uses never change its kind or type.
#[derive(Debug, Default, Serialize)]
pub struct SymbolTable {
    symbols: BTreeMap<String, Symbol>,
}

impl SymbolTable {
    pub fn build(program: &Program) -> Self {
        let mut table = Self::default();

        for stmt in program.body.iter() {
            table.stmt(stmt);
        }

        table
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    fn add(&mut self, name: &str, kind: SymbolKind, data_type: &'static str) {
        if self.symbols.contains_key(name) {
            return;
        }

        self.symbols.insert(
            name.to_string(),
            Symbol {
                name: name.to_string(),
                kind,
                data_type,
            },
        );
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Seq(body) | StmtKind::Par(body) => body.iter().for_each(|s| self.stmt(s)),
            StmtKind::VarDecl { ty, name, init } => {
                self.add(name, SymbolKind::Variable, ty.as_str());

                if let Some(init) = init {
                    self.expr(init);
                }
            }
            StmtKind::ChannelDecl { name, .. } => self.add(name, SymbolKind::Channel, "channel"),
            StmtKind::Assignment(name, value) => {
                self.add(name, SymbolKind::Variable, infer_type(value));
                self.expr(value);
            }
            StmtKind::ArrayAssignment {
                array,
                index,
                value,
            } => {
                self.expr(array);
                self.expr(index);
                self.expr(value);
            }
            StmtKind::Print(args) | StmtKind::Call(_, args) => {
                args.iter().for_each(|arg| self.expr(arg))
            }
            StmtKind::Input(name) => self.add(name, SymbolKind::Variable, "int"),
            StmtKind::Send(op, args) => {
                self.add(&op.channel, SymbolKind::Channel, "channel");
                args.iter().for_each(|arg| self.expr(arg));
            }
            StmtKind::Receive(op, vars) => {
                self.add(&op.channel, SymbolKind::Channel, "channel");

                for var in vars {
                    self.add(var, SymbolKind::Variable, "int");
                }
            }
            StmtKind::FunctionDecl(decl) => {
                self.add(&decl.name, SymbolKind::Function, "function");

                for param in decl.params.iter() {
                    self.add(param, SymbolKind::Parameter, "int");
                }

                self.stmt(&decl.body);
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.expr(value);
                }
            }
            StmtKind::If { cond, then, alt } => {
                self.expr(cond);
                self.stmt(then);

                if let Some(alt) = alt {
                    self.stmt(alt);
                }
            }
            StmtKind::While { cond, body } => {
                self.expr(cond);
                self.stmt(body);
            }
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Identifier(name) => self.add(name, SymbolKind::Variable, "int"),
            ExprKind::ArrayLiteral(items) | ExprKind::Call(_, items) => {
                items.iter().for_each(|item| self.expr(item))
            }
            ExprKind::ArrayAccess(base, index) => {
                self.expr(base);
                self.expr(index);
            }
            ExprKind::Unary(_, operand) => self.expr(operand),
            ExprKind::Binary(lhs, _, rhs) => {
                self.expr(lhs);
                self.expr(rhs);
            }
            ExprKind::Number(_)
            | ExprKind::Float(_)
            | ExprKind::Str(_)
            | ExprKind::Bool(_)
            | ExprKind::Error => {}
        }
    }
}

impl Display for SymbolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return writeln!(f, "<empty>");
        }

        writeln!(f, "name | kind | type")?;

        for symbol in self.iter() {
            writeln!(
                f,
                "{} | {} | {}",
                symbol.name,
                symbol.kind.as_str(),
                symbol.data_type
            )?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    Ok(usize),
    /// Only one side of the channel is ever used.
    Incomplete,
    /// One side uses more than one arity.
    Inconsistent,
    Mismatch { send: usize, recv: usize },
}

impl Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok(arity) => write!(f, "OK (arity={arity})"),
            Self::Incomplete => write!(f, "INCOMPLETE (missing send or receive)"),
            Self::Inconsistent => write!(f, "INCONSISTENT (arity varies)"),
            Self::Mismatch { send, recv } => write!(f, "MISMATCH (send={send} recv={recv})"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelReport {
    pub name: String,
    pub send_arities: Vec<usize>,
    pub recv_arities: Vec<usize>,
    pub send_components: Vec<String>,
    pub recv_components: Vec<String>,
}

fn all_equal(arities: &[usize]) -> bool {
    arities.windows(2).all(|w| w[0] == w[1])
}

impl ChannelReport {
    pub fn verdict(&self) -> Verdict {
        match (self.send_arities.first(), self.recv_arities.first()) {
            (Some(&send), Some(&recv)) => {
                if !all_equal(&self.send_arities) || !all_equal(&self.recv_arities) {
                    Verdict::Inconsistent
                } else if send == recv {
                    Verdict::Ok(send)
                } else {
                    Verdict::Mismatch { send, recv }
                }
            }
            _ => Verdict::Incomplete,
        }
    }
}

fn join<T: Display>(items: &[T]) -> String {
    if items.is_empty() {
        return "-".to_string();
    }

    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl Display for ChannelReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "channel '{}': sends={} receives={} comps_send={} comps_recv={} => {}",
            self.name,
            join(&self.send_arities),
            join(&self.recv_arities),
            join(&self.send_components),
            join(&self.recv_components),
            self.verdict()
        )
    }
}

#[derive(Default)]
struct ChannelWalker {
    channels: BTreeMap<String, ChannelReport>,
}

impl ChannelWalker {
    fn entry(&mut self, name: &str) -> &mut ChannelReport {
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| ChannelReport {
                name: name.to_string(),
                ..ChannelReport::default()
            })
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Seq(body) | StmtKind::Par(body) => body.iter().for_each(|s| self.stmt(s)),
            StmtKind::ChannelDecl { name, .. } => {
                self.entry(name);
            }
            StmtKind::Send(op, args) => {
                let report = self.entry(&op.channel);
                report.send_arities.push(args.len());
                report.send_components.push(op.component.clone());
            }
            StmtKind::Receive(op, vars) => {
                let report = self.entry(&op.channel);
                report.recv_arities.push(vars.len());
                report.recv_components.push(op.component.clone());
            }
            StmtKind::FunctionDecl(decl) => self.stmt(&decl.body),
            StmtKind::If { then, alt, .. } => {
                self.stmt(then);

                if let Some(alt) = alt {
                    self.stmt(alt);
                }
            }
            StmtKind::While { body, .. } => self.stmt(body),
            _ => {}
        }
    }
}

/// Collects the send and receive arities of every channel, sorted by name.
pub fn check_channels(program: &Program) -> Vec<ChannelReport> {
    let mut walker = ChannelWalker::default();

    for stmt in program.body.iter() {
        walker.stmt(stmt);
    }

    walker.channels.into_values().collect()
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::frontend::parse;

    #[test]
    fn symbols_are_registered_once() {
        let program = parse(
            "c_channel calc a b
             string name = \"x\"
             name = 3
             ratio = 2.5
             m = [1, 2]
             fun add(a, b) { return a + b; }
             r = add(n, 1)",
        )
        .unwrap();
        let table = SymbolTable::build(&program);

        let kind_and_type = |name: &str| table.get(name).map(|s| (s.kind, s.data_type));

        assert_eq!(kind_and_type("calc"), Some((SymbolKind::Channel, "channel")));
        assert_eq!(kind_and_type("name"), Some((SymbolKind::Variable, "string")));
        assert_eq!(kind_and_type("ratio"), Some((SymbolKind::Variable, "float")));
        assert_eq!(kind_and_type("m"), Some((SymbolKind::Variable, "array")));
        assert_eq!(kind_and_type("add"), Some((SymbolKind::Function, "function")));
        assert_eq!(kind_and_type("n"), Some((SymbolKind::Variable, "int")));
        assert_eq!(kind_and_type("a"), Some((SymbolKind::Parameter, "int")));
        assert_eq!(
            table.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            vec!["a", "add", "b", "calc", "m", "n", "name", "r", "ratio"]
        );
    }

    #[test_case("c.send(1, 2) c.receive(x, y)", Verdict::Ok(2); "matching arity")]
    #[test_case("c.send(1, 2) c.receive(x)", Verdict::Mismatch { send: 2, recv: 1 }; "mismatch")]
    #[test_case("c.send(1) c.send(1, 2) c.receive(x)", Verdict::Inconsistent; "inconsistent sends")]
    #[test_case("c.send(1)", Verdict::Incomplete; "send only")]
    #[test_case("c_channel c p q", Verdict::Incomplete; "declared but unused")]
    fn channel_verdicts(source: &str, expected: Verdict) {
        let reports = check_channels(&parse(source).unwrap());

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].verdict(), expected);
    }

    #[test]
    fn reports_are_sorted_and_track_components() {
        let program = parse(
            "comp client
             SEQ { zeta.send(1); alpha.send(1); }
             comp server
             SEQ { alpha.receive(v); }",
        )
        .unwrap();
        let reports = check_channels(&program);

        assert_eq!(reports[0].name, "alpha");
        assert_eq!(reports[1].name, "zeta");
        assert_eq!(
            reports[0].to_string(),
            "channel 'alpha': sends=1 receives=1 comps_send=client comps_recv=server => OK (arity=1)"
        );
    }
}
