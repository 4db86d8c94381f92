use std::{borrow::Cow, collections::HashMap};

use lazy_static::lazy_static;

use crate::{
    error::{IntoSpanned, SpannedError},
    frontend::{
        ast::{
            BinaryOp, ChannelOp, Expr, ExprKind, FunctionDecl, Program, Stmt, StmtKind, TypeName,
            UnaryOp,
        },
        lexer::{Keyword, Span, Token, TokenKind},
    },
};

lazy_static! {
    static ref BINARY_OPS: HashMap<&'static str, (BinaryOp, Prec)> = {
        [
            ("&&", (BinaryOp::And, Prec::Logical)),
            ("||", (BinaryOp::Or, Prec::Logical)),
            ("==", (BinaryOp::Eq, Prec::Comparison)),
            ("!=", (BinaryOp::Ne, Prec::Comparison)),
            ("<", (BinaryOp::Lt, Prec::Comparison)),
            ("<=", (BinaryOp::Lte, Prec::Comparison)),
            (">", (BinaryOp::Gt, Prec::Comparison)),
            (">=", (BinaryOp::Gte, Prec::Comparison)),
            ("+", (BinaryOp::Add, Prec::Term)),
            ("-", (BinaryOp::Sub, Prec::Term)),
            ("*", (BinaryOp::Mul, Prec::Factor)),
            ("/", (BinaryOp::Div, Prec::Factor)),
        ]
        .iter()
        .cloned()
        .collect()
    };
}

#[derive(Debug, PartialEq, PartialOrd, Clone, Copy)]
enum Prec {
    Logical,
    Comparison,
    Term,
    Factor,
}

impl Prec {
    fn higher(self) -> Option<Self> {
        match self {
            Self::Logical => Some(Self::Comparison),
            Self::Comparison => Some(Self::Term),
            Self::Term => Some(Self::Factor),
            Self::Factor => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    #[error("unexpected token '{actual}', expected: '{expected}'")]
    UnexpectedToken {
        expected: Cow<'static, str>,
        actual: String,
    },
    #[error("invalid expr '{0}'")]
    InvalidExpr(String),
    #[error("unknown channel operation '{0}'")]
    UnknownChannelOp(String),
    #[error("skipped unrecognized token '{0}'")]
    Skipped(String),
}

pub type ParseError = SpannedError<ErrorKind>;

/// Best-effort recursive-descent parser. It never fails: tokens it can not
/// place are skipped and reported as diagnostics.
pub struct Parser {
    offset: usize,
    tokens: Vec<Token>,
    component: String,
    diagnostics: Vec<ParseError>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last(), Some(token) if token.kind == TokenKind::Eof) {
            let span = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", span));
        }

        Self {
            offset: 0,
            tokens,
            component: String::new(),
            diagnostics: vec![],
        }
    }

    fn cur(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.offset.min(last)]
    }

    fn peek(&self) -> TokenKind {
        self.cur().kind
    }

    fn peek2(&self) -> TokenKind {
        let last = self.tokens.len() - 1;
        self.tokens[(self.offset + 1).min(last)].kind
    }

    fn span(&self) -> Span {
        self.cur().span
    }

    fn at_eof(&self) -> bool {
        self.peek() == TokenKind::Eof
    }

    fn advance(&mut self) {
        if !self.at_eof() {
            self.offset += 1;
        }
    }

    fn next(&mut self) -> Token {
        let token = self.cur().clone();
        self.advance();
        token
    }

    fn test_punct(&self, punct: &str) -> bool {
        matches!(self.peek(), TokenKind::Punct(p) if p == punct)
    }

    fn accept_punct(&mut self, punct: &str) -> bool {
        if self.test_punct(punct) {
            self.advance();
            return true;
        }

        false
    }

    fn test_keyword(&self, keyword: Keyword) -> bool {
        self.peek() == TokenKind::Keyword(keyword)
    }

    fn accept_keyword(&mut self, keyword: Keyword) -> bool {
        if self.test_keyword(keyword) {
            self.advance();
            return true;
        }

        false
    }

    fn report(&mut self, kind: ErrorKind, span: Span) {
        tracing::debug!(%span, "{kind}");
        self.diagnostics.push(kind.at(span));
    }

    fn expect_punct(&mut self, punct: &'static str) {
        if !self.accept_punct(punct) {
            let actual = self.cur().to_string();
            self.report(
                ErrorKind::UnexpectedToken {
                    expected: Cow::Borrowed(punct),
                    actual,
                },
                self.span(),
            );
        }
    }

    fn ident(&mut self) -> Option<String> {
        if self.peek() == TokenKind::Ident {
            return Some(self.next().text);
        }

        let actual = self.cur().to_string();
        self.report(
            ErrorKind::UnexpectedToken {
                expected: Cow::Borrowed("identifier"),
                actual,
            },
            self.span(),
        );

        None
    }

    fn skip(&mut self) {
        let token = self.next();

        // stray statement terminators are harmless
        if token.kind != TokenKind::Punct(";") && token.kind != TokenKind::Eof {
            self.report(ErrorKind::Skipped(token.to_string()), token.span);
        }
    }

    fn semi(&mut self) {
        self.accept_punct(";");
    }

    fn is_list_end(&self, end: &str) -> bool {
        self.test_punct(end) || self.at_eof()
    }

    fn expr_list(&mut self, end: &'static str) -> Vec<Expr> {
        let mut exprs = vec![];

        while !self.is_list_end(end) {
            exprs.push(self.expr());

            if !self.accept_punct(",") {
                break;
            }
        }

        self.expect_punct(end);
        exprs
    }

    fn ident_list(&mut self, end: &'static str) -> Vec<String> {
        let mut names = vec![];

        while !self.is_list_end(end) {
            match self.ident() {
                Some(name) => names.push(name),
                None => break,
            }

            if !self.accept_punct(",") {
                break;
            }
        }

        self.expect_punct(end);
        names
    }

    fn postfix(&mut self, mut base: Expr) -> Expr {
        while self.accept_punct("[") {
            let span = base.span;
            let index = self.expr();
            self.expect_punct("]");
            base = ExprKind::ArrayAccess(Box::new(base), Box::new(index)).at(span);
        }

        base
    }

    fn primary(&mut self) -> Expr {
        let token = self.cur().clone();
        let span = token.span;

        match token.kind {
            TokenKind::Punct("-") => {
                self.advance();
                let operand = self.primary();
                ExprKind::Unary(UnaryOp::Neg, Box::new(operand)).at(span)
            }
            TokenKind::Punct("!") => {
                self.advance();
                let operand = self.primary();
                ExprKind::Unary(UnaryOp::Not, Box::new(operand)).at(span)
            }
            TokenKind::Int => {
                self.advance();
                match token.text.parse() {
                    Ok(n) => ExprKind::Number(n).at(span),
                    Err(_) => self.invalid_expr(&token),
                }
            }
            TokenKind::Float => {
                self.advance();
                match token.text.parse() {
                    Ok(f) => ExprKind::Float(f).at(span),
                    Err(_) => self.invalid_expr(&token),
                }
            }
            TokenKind::Str => {
                self.advance();
                ExprKind::Str(token.text).at(span)
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                ExprKind::Bool(true).at(span)
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                ExprKind::Bool(false).at(span)
            }
            TokenKind::Ident => {
                self.advance();

                let base = if self.accept_punct("(") {
                    let args = self.expr_list(")");
                    ExprKind::Call(token.text, args).at(span)
                } else {
                    ExprKind::Identifier(token.text).at(span)
                };

                self.postfix(base)
            }
            TokenKind::Punct("(") => {
                self.advance();
                let inner = self.expr();
                self.expect_punct(")");
                self.postfix(inner)
            }
            TokenKind::Punct("[") => {
                self.advance();
                let elements = self.expr_list("]");
                self.postfix(ExprKind::ArrayLiteral(elements).at(span))
            }
            // closing delimiters belong to the enclosing construct
            TokenKind::Eof | TokenKind::Punct(")" | "]" | "}" | ";" | ",") => {
                self.invalid_expr(&token)
            }
            _ => {
                self.advance();
                self.invalid_expr(&token)
            }
        }
    }

    fn invalid_expr(&mut self, token: &Token) -> Expr {
        self.report(ErrorKind::InvalidExpr(token.to_string()), token.span);
        ExprKind::Error.at(token.span)
    }

    fn peek_binary(&self, prec: Prec) -> Option<BinaryOp> {
        match self.peek() {
            TokenKind::Punct(punct) => match BINARY_OPS.get(punct) {
                Some((op, op_prec)) if *op_prec == prec => Some(*op),
                _ => None,
            },
            _ => None,
        }
    }

    fn operand(&mut self, prec: Prec) -> Expr {
        match prec.higher() {
            Some(higher) => self.binary(higher),
            None => self.primary(),
        }
    }

    fn binary(&mut self, prec: Prec) -> Expr {
        let mut lhs = self.operand(prec);

        while let Some(op) = self.peek_binary(prec) {
            self.advance();
            let span = lhs.span;
            let rhs = self.operand(prec);
            lhs = ExprKind::Binary(Box::new(lhs), op, Box::new(rhs)).at(span);
        }

        lhs
    }

    pub fn expr(&mut self) -> Expr {
        self.binary(Prec::Logical)
    }

    fn stmt_list(&mut self, end: &'static str) -> Vec<Stmt> {
        let mut stmts = vec![];

        while !self.is_list_end(end) {
            match self.stmt() {
                Some(stmt) => stmts.push(stmt),
                None => self.skip(),
            }
        }

        stmts
    }

    fn brace_block(&mut self) -> Stmt {
        let span = self.span();
        self.advance();
        let body = self.stmt_list("}");
        self.expect_punct("}");

        StmtKind::Seq(body).at(span)
    }

    fn ends_unbraced_seq(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Eof
                | TokenKind::Punct("}")
                | TokenKind::Keyword(
                    Keyword::Seq | Keyword::Par | Keyword::Else | Keyword::Comp | Keyword::CChannel
                )
        )
    }

    fn seq_block(&mut self) -> Stmt {
        let span = self.span();
        self.advance();

        if self.test_punct("{") {
            let mut block = self.brace_block();
            block.span = span;
            return block;
        }

        let mut body = vec![];

        while !self.ends_unbraced_seq() {
            match self.stmt() {
                Some(stmt) => body.push(stmt),
                None => self.skip(),
            }
        }

        StmtKind::Seq(body).at(span)
    }

    fn par_block(&mut self) -> Stmt {
        let span = self.span();
        self.advance();
        let braced = self.accept_punct("{");
        let mut branches = vec![];

        loop {
            if self.test_keyword(Keyword::Seq) {
                branches.push(self.seq_block());
            } else if braced && !self.is_list_end("}") {
                match self.stmt() {
                    Some(stmt) => branches.push(stmt),
                    None => self.skip(),
                }
            } else {
                break;
            }
        }

        if braced {
            self.expect_punct("}");
        }

        StmtKind::Par(branches).at(span)
    }

    fn body(&mut self) -> Stmt {
        let span = self.span();

        if self.test_keyword(Keyword::Seq) {
            return self.seq_block();
        }

        if self.test_punct("{") {
            return self.brace_block();
        }

        self.stmt()
            .unwrap_or_else(|| StmtKind::Seq(vec![]).at(span))
    }

    fn channel_op(&mut self) -> Option<Stmt> {
        let span = self.span();
        let channel = self.next().text;
        // '.'
        self.advance();

        let op = self.ident()?;
        let target = ChannelOp {
            channel,
            component: self.component.clone(),
        };

        let kind = match op.as_str() {
            "send" => {
                let args = if self.accept_punct("(") {
                    self.expr_list(")")
                } else {
                    vec![]
                };

                StmtKind::Send(target, args)
            }
            "receive" => {
                let vars = if self.accept_punct("(") {
                    self.ident_list(")")
                } else {
                    vec![]
                };

                StmtKind::Receive(target, vars)
            }
            _ => {
                self.report(ErrorKind::UnknownChannelOp(op), span);
                return None;
            }
        };

        self.semi();
        Some(kind.at(span))
    }

    fn array_assign(&mut self) -> Option<Stmt> {
        let save = (self.offset, self.diagnostics.len());
        let span = self.span();
        let name = self.next().text;
        // '['
        self.advance();
        let index = self.expr();

        if self.accept_punct("]") && self.accept_punct("=") {
            let value = self.expr();
            self.semi();

            return Some(
                StmtKind::ArrayAssignment {
                    array: ExprKind::Identifier(name).at(span),
                    index,
                    value,
                }
                .at(span),
            );
        }

        // not an element assignment after all
        self.offset = save.0;
        self.diagnostics.truncate(save.1);
        None
    }

    fn ident_stmt(&mut self) -> Option<Stmt> {
        let span = self.span();

        match self.peek2() {
            TokenKind::Punct(".") => self.channel_op(),
            TokenKind::Punct("[") => self.array_assign(),
            TokenKind::Punct("=") => {
                let name = self.next().text;
                self.advance();
                let value = self.expr();
                self.semi();

                Some(StmtKind::Assignment(name, value).at(span))
            }
            TokenKind::Punct("(") => {
                let name = self.next().text;
                self.advance();
                let args = self.expr_list(")");
                self.semi();

                Some(StmtKind::Call(name, args).at(span))
            }
            _ => None,
        }
    }

    fn print_stmt(&mut self) -> Stmt {
        let span = self.span();
        self.advance();
        let mut exprs = vec![];

        if !self.is_list_end(";") && !self.test_punct("}") {
            exprs.push(self.expr());

            while self.accept_punct(",") {
                exprs.push(self.expr());
            }
        }

        self.semi();
        StmtKind::Print(exprs).at(span)
    }

    fn return_stmt(&mut self) -> Stmt {
        let span = self.span();
        self.advance();

        let value = if self.is_list_end(";") || self.test_punct("}") {
            None
        } else {
            Some(self.expr())
        };

        self.semi();
        StmtKind::Return(value).at(span)
    }

    fn input_stmt(&mut self) -> Option<Stmt> {
        let span = self.span();
        self.advance();
        let name = self.ident()?;
        self.semi();

        Some(StmtKind::Input(name).at(span))
    }

    fn while_stmt(&mut self) -> Stmt {
        let span = self.span();
        self.advance();
        let cond = self.expr();
        let body = Box::new(self.body());

        StmtKind::While { cond, body }.at(span)
    }

    fn if_stmt(&mut self) -> Stmt {
        let span = self.span();
        self.advance();
        let cond = self.expr();
        let then = Box::new(self.body());

        let alt = if self.accept_keyword(Keyword::Else) {
            Some(Box::new(self.body()))
        } else {
            None
        };

        StmtKind::If { cond, then, alt }.at(span)
    }

    fn var_decl(&mut self, ty: TypeName) -> Option<Stmt> {
        let span = self.span();
        self.advance();
        let name = self.ident()?;

        let init = if self.accept_punct("=") {
            Some(self.expr())
        } else {
            None
        };

        self.semi();
        Some(StmtKind::VarDecl { ty, name, init }.at(span))
    }

    fn fn_decl(&mut self) -> Option<Stmt> {
        let span = self.span();
        self.advance();
        let name = self.ident()?;

        let params = if self.accept_punct("(") {
            self.ident_list(")")
        } else {
            vec![]
        };

        let body = if self.test_punct("{") {
            let body_span = self.span();
            self.advance();
            let mut body = vec![];

            while !self.is_list_end("}") {
                // SEQ blocks inside a function body are flattened into it
                if self.test_keyword(Keyword::Seq) {
                    if let StmtKind::Seq(inner) = self.seq_block().kind {
                        body.extend(inner);
                    }
                    continue;
                }

                match self.stmt() {
                    Some(stmt) => body.push(stmt),
                    None => self.skip(),
                }
            }

            self.expect_punct("}");
            StmtKind::Seq(body).at(body_span)
        } else {
            self.body()
        };

        Some(
            StmtKind::FunctionDecl(FunctionDecl {
                name,
                params,
                body: Box::new(body),
            })
            .at(span),
        )
    }

    /// Parses one statement. Returns `None` when the current token does
    /// not start a statement; the caller decides how to recover.
    fn stmt(&mut self) -> Option<Stmt> {
        match self.peek() {
            TokenKind::Ident => self.ident_stmt(),
            TokenKind::Keyword(Keyword::Print) => Some(self.print_stmt()),
            TokenKind::Keyword(Keyword::Return) => Some(self.return_stmt()),
            TokenKind::Keyword(Keyword::Input) => self.input_stmt(),
            TokenKind::Keyword(Keyword::While) => Some(self.while_stmt()),
            TokenKind::Keyword(Keyword::If) => Some(self.if_stmt()),
            TokenKind::Keyword(Keyword::Fun) => self.fn_decl(),
            TokenKind::Keyword(Keyword::Seq) => Some(self.seq_block()),
            TokenKind::Keyword(Keyword::Par) => Some(self.par_block()),
            TokenKind::Keyword(Keyword::Int) => self.var_decl(TypeName::Int),
            TokenKind::Keyword(Keyword::Bool) => self.var_decl(TypeName::Bool),
            TokenKind::Keyword(Keyword::String) => self.var_decl(TypeName::String),
            TokenKind::Punct("{") => Some(self.brace_block()),
            _ => None,
        }
    }

    fn comp_decl(&mut self) {
        self.advance();

        if let Some(name) = self.ident() {
            self.component = name;
        }

        self.semi();
    }

    fn channel_decl(&mut self) -> Option<Stmt> {
        let span = self.span();
        self.advance();
        let name = self.ident()?;

        let mut comps = [String::new(), String::new()];

        for comp in comps.iter_mut() {
            if self.peek() == TokenKind::Ident {
                *comp = self.next().text;
            }
        }

        self.semi();

        let [comp1, comp2] = comps;
        Some(StmtKind::ChannelDecl { name, comp1, comp2 }.at(span))
    }

    pub fn parse_with_diagnostics(mut self) -> (Program, Vec<ParseError>) {
        let mut program = Program::default();

        while !self.at_eof() {
            let stmt = match self.peek() {
                TokenKind::Keyword(Keyword::Comp) => {
                    self.comp_decl();
                    continue;
                }
                TokenKind::Keyword(Keyword::CChannel) => self.channel_decl(),
                _ => match self.stmt() {
                    Some(stmt) => Some(stmt),
                    None => {
                        self.skip();
                        None
                    }
                },
            };

            if let Some(stmt) = stmt {
                program.body.push(stmt);
            }
        }

        (program, self.diagnostics)
    }

    pub fn parse(self) -> Program {
        self.parse_with_diagnostics().0
    }
}
