//! Recursive-descent statement parser with a Pratt expression parser.

use step_trace_core::ParseError;

use crate::ast::{BinOp, BoolOp, CmpOp, Expr, ExprKind, FStringSegment, Module, Span, Stmt, StmtKind, UnaryOp};
use crate::token::{FStringPart, Lexer, Pos, Spanned, Token};

pub fn parse(src: &str) -> Result<Module, ParseError> {
    let tokens = Lexer::new(src).tokenize().map_err(|message| ParseError { message, line: 0, col: 0 })?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_module()
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

type PResult<T> = Result<T, ParseError>;

impl Parser {
    fn cur(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn cur_start(&self) -> Pos {
        self.tokens[self.pos].start
    }

    fn prev_end(&self) -> Pos {
        self.tokens[self.pos.saturating_sub(1)].end
    }

    fn err(&self, message: impl Into<String>) -> ParseError {
        let pos = self.cur_start();
        ParseError { message: message.into(), line: pos.line, col: pos.col }
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].token.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn check(&self, t: &Token) -> bool {
        self.cur() == t
    }

    fn eat(&mut self, t: &Token) -> bool {
        if self.check(t) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, t: &Token) -> PResult<()> {
        if self.eat(t) {
            Ok(())
        } else {
            Err(self.err(format!("expected {t:?}, found {:?}", self.cur())))
        }
    }

    fn skip_newlines(&mut self) {
        while self.check(&Token::Newline) {
            self.advance();
        }
    }

    fn span_from(&self, start: Pos) -> Span {
        let end = self.prev_end();
        Span { start_line: start.line, start_col: start.col, end_line: end.line, end_col: end.col }
    }

    fn parse_module(&mut self) -> PResult<Module> {
        let mut body = Vec::new();
        self.skip_newlines();
        while !self.check(&Token::Eof) {
            body.push(self.parse_stmt()?);
            self.skip_newlines();
        }
        Ok(Module { body })
    }

    fn parse_block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect(&Token::Colon)?;
        self.skip_newlines();
        self.expect(&Token::Indent)?;
        let mut body = Vec::new();
        self.skip_newlines();
        while !self.check(&Token::Dedent) && !self.check(&Token::Eof) {
            body.push(self.parse_stmt()?);
            self.skip_newlines();
        }
        self.expect(&Token::Dedent)?;
        Ok(body)
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        let start = self.cur_start();
        let kind = match self.cur().clone() {
            Token::If => self.parse_if()?,
            Token::While => {
                self.advance();
                let test = Box::new(self.parse_expr()?);
                let body = self.parse_block()?;
                StmtKind::While { test, body }
            }
            Token::For => {
                self.advance();
                let target = Box::new(self.parse_target_list()?);
                self.expect(&Token::In)?;
                let iter = Box::new(self.parse_expr()?);
                let body = self.parse_block()?;
                StmtKind::For { target, iter, body }
            }
            Token::Def => self.parse_function_def()?,
            Token::Class => self.parse_class_def()?,
            Token::Return => {
                self.advance();
                let value = if matches!(self.cur(), Token::Newline | Token::Eof) {
                    None
                } else {
                    Some(Box::new(self.parse_expr()?))
                };
                self.finish_simple_stmt()?;
                StmtKind::Return(value)
            }
            Token::Pass => {
                self.advance();
                self.finish_simple_stmt()?;
                StmtKind::Pass
            }
            Token::Break => {
                self.advance();
                self.finish_simple_stmt()?;
                StmtKind::Break
            }
            Token::Continue => {
                self.advance();
                self.finish_simple_stmt()?;
                StmtKind::Continue
            }
            _ => self.parse_expr_or_assign_stmt()?,
        };
        Ok(Stmt::new(self.span_from(start), kind))
    }

    fn finish_simple_stmt(&mut self) -> PResult<()> {
        if !matches!(self.cur(), Token::Newline | Token::Eof | Token::Dedent) {
            return Err(self.err("expected end of statement"));
        }
        Ok(())
    }

    fn parse_if(&mut self) -> PResult<StmtKind> {
        self.expect(&Token::If)?;
        let test = Box::new(self.parse_expr()?);
        let body = self.parse_block()?;
        let orelse = if self.check(&Token::Elif) {
            vec![{
                let start = self.cur_start();
                let kind = self.parse_if()?;
                Stmt::new(self.span_from(start), kind)
            }]
        } else if self.eat(&Token::Else) {
            self.parse_block()?
        } else {
            Vec::new()
        };
        Ok(StmtKind::If { test, body, orelse })
    }

    fn parse_function_def(&mut self) -> PResult<StmtKind> {
        self.expect(&Token::Def)?;
        let name = self.expect_name()?;
        self.expect(&Token::LParen)?;
        let mut params = Vec::new();
        while !self.check(&Token::RParen) {
            params.push(self.expect_name()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen)?;
        if self.eat(&Token::Arrow) {
            self.parse_atom()?;
        }
        let body = self.parse_block()?;
        Ok(StmtKind::FunctionDef { name, params, body })
    }

    fn parse_class_def(&mut self) -> PResult<StmtKind> {
        self.expect(&Token::Class)?;
        let name = self.expect_name()?;
        let mut bases = Vec::new();
        if self.eat(&Token::LParen) {
            while !self.check(&Token::RParen) {
                bases.push(self.parse_expr()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RParen)?;
        }
        let body = self.parse_block()?;
        Ok(StmtKind::ClassDef { name, bases, body })
    }

    fn expect_name(&mut self) -> PResult<String> {
        match self.advance() {
            Token::Name(n) => Ok(n),
            other => Err(self.err(format!("expected identifier, found {other:?}"))),
        }
    }

    /// A leading-expression statement: either a bare expression, a
    /// (possibly chained/tuple-unpacking) assignment, or an augmented
    /// assignment.
    fn parse_expr_or_assign_stmt(&mut self) -> PResult<StmtKind> {
        let first = self.parse_target_list()?;
        if let Some(op) = self.match_aug_assign() {
            let value = Box::new(self.parse_expr()?);
            self.finish_simple_stmt()?;
            return Ok(StmtKind::AugAssign { target: Box::new(first), op, value });
        }
        if self.eat(&Token::Eq) {
            let mut targets = vec![first];
            let mut value = self.parse_target_list()?;
            while self.eat(&Token::Eq) {
                targets.push(value);
                value = self.parse_target_list()?;
            }
            self.finish_simple_stmt()?;
            return Ok(StmtKind::Assign { targets, value: Box::new(value) });
        }
        self.finish_simple_stmt()?;
        Ok(StmtKind::ExprStmt(Box::new(first)))
    }

    fn match_aug_assign(&mut self) -> Option<BinOp> {
        let op = match self.cur() {
            Token::PlusEq => BinOp::Add,
            Token::MinusEq => BinOp::Sub,
            Token::StarEq => BinOp::Mul,
            Token::SlashEq => BinOp::Div,
            Token::PercentEq => BinOp::Mod,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    /// Parses a single expression, or a bare comma-separated tuple (used
    /// both as an assignment target list and an assignment value), without
    /// requiring parentheses, matching tuple-unpacking targets like
    /// `a, b = b, a`.
    fn parse_target_list(&mut self) -> PResult<Expr> {
        let start = self.cur_start();
        let first = self.parse_expr()?;
        if self.check(&Token::Comma) {
            let mut items = vec![first];
            while self.eat(&Token::Comma) {
                if matches!(self.cur(), Token::Eq | Token::Newline | Token::Eof | Token::Colon) {
                    break;
                }
                items.push(self.parse_expr()?);
            }
            return Ok(Expr::new(self.span_from(start), ExprKind::Tuple(items)));
        }
        Ok(first)
    }

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> PResult<Expr> {
        let start = self.cur_start();
        let body = self.parse_or()?;
        if self.eat(&Token::If) {
            let test = Box::new(self.parse_or()?);
            self.expect(&Token::Else)?;
            let orelse = Box::new(self.parse_ternary()?);
            return Ok(Expr::new(self.span_from(start), ExprKind::IfExp { test, body: Box::new(body), orelse }));
        }
        Ok(body)
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let start = self.cur_start();
        let mut values = vec![self.parse_and()?];
        let mut is_or = false;
        while self.eat(&Token::Or) {
            is_or = true;
            values.push(self.parse_and()?);
        }
        if is_or {
            return Ok(Expr::new(self.span_from(start), ExprKind::BoolOp { op: BoolOp::Or, values }));
        }
        Ok(values.pop().unwrap())
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let start = self.cur_start();
        let mut values = vec![self.parse_not()?];
        let mut is_and = false;
        while self.eat(&Token::And) {
            is_and = true;
            values.push(self.parse_not()?);
        }
        if is_and {
            return Ok(Expr::new(self.span_from(start), ExprKind::BoolOp { op: BoolOp::And, values }));
        }
        Ok(values.pop().unwrap())
    }

    fn parse_not(&mut self) -> PResult<Expr> {
        let start = self.cur_start();
        if self.eat(&Token::Not) {
            let operand = Box::new(self.parse_not()?);
            return Ok(Expr::new(self.span_from(start), ExprKind::Unary { op: UnaryOp::Not, operand }));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let start = self.cur_start();
        let left = self.parse_additive()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        loop {
            let op = match self.cur() {
                Token::EqEq => CmpOp::Eq,
                Token::NotEq => CmpOp::NotEq,
                Token::Lt => CmpOp::Lt,
                Token::LtEq => CmpOp::LtEq,
                Token::Gt => CmpOp::Gt,
                Token::GtEq => CmpOp::GtEq,
                Token::Is => {
                    self.advance();
                    if self.eat(&Token::Not) {
                        ops.push(CmpOp::IsNot);
                    } else {
                        ops.push(CmpOp::Is);
                    }
                    comparators.push(self.parse_additive()?);
                    continue;
                }
                Token::In => CmpOp::In,
                Token::Not if matches!(self.tokens.get(self.pos + 1).map(|s| &s.token), Some(Token::In)) => {
                    self.advance();
                    self.advance();
                    ops.push(CmpOp::NotIn);
                    comparators.push(self.parse_additive()?);
                    continue;
                }
                _ => break,
            };
            self.advance();
            ops.push(op);
            comparators.push(self.parse_additive()?);
        }
        if ops.is_empty() {
            return Ok(left);
        }
        Ok(Expr::new(self.span_from(start), ExprKind::Compare { left: Box::new(left), ops, comparators }))
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let start = self.cur_start();
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.cur() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::new(self.span_from(start), ExprKind::BinOp { left: Box::new(left), op, right: Box::new(right) });
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let start = self.cur_start();
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.cur() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::DoubleSlash => BinOp::FloorDiv,
                Token::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::new(self.span_from(start), ExprKind::BinOp { left: Box::new(left), op, right: Box::new(right) });
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let start = self.cur_start();
        if self.eat(&Token::Minus) {
            let operand = Box::new(self.parse_unary()?);
            return Ok(Expr::new(self.span_from(start), ExprKind::Unary { op: UnaryOp::Neg, operand }));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> PResult<Expr> {
        let start = self.cur_start();
        let base = self.parse_postfix()?;
        if self.eat(&Token::DoubleStar) {
            let exp = Box::new(self.parse_unary()?);
            return Ok(Expr::new(self.span_from(start), ExprKind::BinOp { left: Box::new(base), op: BinOp::Pow, right: exp }));
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let start = self.cur_start();
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat(&Token::Dot) {
                let attr = self.expect_name()?;
                expr = Expr::new(self.span_from(start), ExprKind::Attribute { value: Box::new(expr), attr });
            } else if self.eat(&Token::LBracket) {
                let index = self.parse_expr()?;
                self.expect(&Token::RBracket)?;
                expr = Expr::new(self.span_from(start), ExprKind::Subscript { value: Box::new(expr), index: Box::new(index) });
            } else if self.eat(&Token::LParen) {
                let (args, kwargs) = self.parse_call_args()?;
                self.expect(&Token::RParen)?;
                expr = Expr::new(self.span_from(start), ExprKind::Call { func: Box::new(expr), args, kwargs });
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> PResult<(Vec<Expr>, Vec<(String, Expr)>)> {
        let mut args = Vec::new();
        let mut kwargs = Vec::new();
        while !self.check(&Token::RParen) {
            if let Token::Name(n) = self.cur().clone() {
                if matches!(self.tokens.get(self.pos + 1).map(|s| &s.token), Some(Token::Eq)) {
                    self.advance();
                    self.advance();
                    kwargs.push((n, self.parse_expr()?));
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                    continue;
                }
            }
            args.push(self.parse_expr()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok((args, kwargs))
    }

    fn parse_atom(&mut self) -> PResult<Expr> {
        let start = self.cur_start();
        let kind = match self.advance() {
            Token::Name(n) => ExprKind::Name(n),
            Token::Int(i) => ExprKind::IntLit(i),
            Token::Float(f) => ExprKind::FloatLit(f),
            Token::Str(s) => ExprKind::StrLit(s),
            Token::True => ExprKind::BoolLit(true),
            Token::False => ExprKind::BoolLit(false),
            Token::None_ => ExprKind::NoneLit,
            Token::FString(parts) => ExprKind::JoinedStr(self.lower_fstring_parts(parts)?),
            Token::LParen => {
                if self.eat(&Token::RParen) {
                    ExprKind::Tuple(Vec::new())
                } else {
                    let first = self.parse_expr()?;
                    if self.eat(&Token::Comma) {
                        let mut items = vec![first];
                        while !self.check(&Token::RParen) {
                            items.push(self.parse_expr()?);
                            if !self.eat(&Token::Comma) {
                                break;
                            }
                        }
                        self.expect(&Token::RParen)?;
                        ExprKind::Tuple(items)
                    } else {
                        self.expect(&Token::RParen)?;
                        return Ok(first);
                    }
                }
            }
            Token::LBracket => {
                let mut items = Vec::new();
                while !self.check(&Token::RBracket) {
                    items.push(self.parse_expr()?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(&Token::RBracket)?;
                ExprKind::List(items)
            }
            Token::LBrace => self.parse_dict_or_set_body()?,
            other => return Err(self.err(format!("unexpected token {other:?}"))),
        };
        Ok(Expr::new(self.span_from(start), kind))
    }

    fn parse_dict_or_set_body(&mut self) -> PResult<ExprKind> {
        if self.eat(&Token::RBrace) {
            return Ok(ExprKind::Dict(Vec::new()));
        }
        let first_key = self.parse_expr()?;
        if self.eat(&Token::Colon) {
            let first_val = self.parse_expr()?;
            let mut entries = vec![(first_key, first_val)];
            while self.eat(&Token::Comma) {
                if self.check(&Token::RBrace) {
                    break;
                }
                let k = self.parse_expr()?;
                self.expect(&Token::Colon)?;
                let v = self.parse_expr()?;
                entries.push((k, v));
            }
            self.expect(&Token::RBrace)?;
            Ok(ExprKind::Dict(entries))
        } else {
            let mut items = vec![first_key];
            while self.eat(&Token::Comma) {
                if self.check(&Token::RBrace) {
                    break;
                }
                items.push(self.parse_expr()?);
            }
            self.expect(&Token::RBrace)?;
            Ok(ExprKind::Set(items))
        }
    }

    fn lower_fstring_parts(&self, parts: Vec<FStringPart>) -> PResult<Vec<FStringSegment>> {
        let mut segments = Vec::new();
        for part in parts {
            match part {
                FStringPart::Literal(s) => segments.push(FStringSegment::Literal(s)),
                FStringPart::Expr(src) => {
                    let module = parse(&src).map_err(|e| self.err(format!("invalid f-string expression: {e}")))?;
                    let stmt = module.body.into_iter().next().ok_or_else(|| self.err("empty f-string expression"))?;
                    let StmtKind::ExprStmt(expr) = stmt.kind else {
                        return Err(self.err("f-string placeholder must be an expression"));
                    };
                    segments.push(FStringSegment::Expr(expr));
                }
            }
        }
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt_kinds(src: &str) -> Vec<String> {
        parse(src).unwrap().body.iter().map(|s| format!("{:?}", s.kind)).collect()
    }

    #[test]
    fn parses_simple_assignment() {
        let module = parse("x = 1\n").unwrap();
        assert_eq!(module.body.len(), 1);
        assert!(matches!(module.body[0].kind, StmtKind::Assign { .. }));
    }

    #[test]
    fn parses_tuple_unpacking() {
        let module = parse("a, b = b, a\n").unwrap();
        let StmtKind::Assign { targets, value } = &module.body[0].kind else { panic!("expected assign") };
        assert_eq!(targets.len(), 1);
        assert!(matches!(targets[0].kind, ExprKind::Tuple(_)));
        assert!(matches!(value.kind, ExprKind::Tuple(_)));
    }

    #[test]
    fn parses_if_elif_else_block() {
        let src = "if x:\n    a = 1\nelif y:\n    a = 2\nelse:\n    a = 3\n";
        let module = parse(src).unwrap();
        let StmtKind::If { orelse, .. } = &module.body[0].kind else { panic!("expected if") };
        assert_eq!(orelse.len(), 1);
        assert!(matches!(orelse[0].kind, StmtKind::If { .. }));
    }

    #[test]
    fn parses_for_loop_with_call_iter() {
        let src = "for i, v in enumerate(arr):\n    pass\n";
        let module = parse(src).unwrap();
        assert!(matches!(module.body[0].kind, StmtKind::For { .. }));
    }

    #[test]
    fn parses_function_def_with_params() {
        let src = "def add(a, b):\n    return a + b\n";
        let module = parse(src).unwrap();
        let StmtKind::FunctionDef { name, params, body } = &module.body[0].kind else { panic!("expected def") };
        assert_eq!(name, "add");
        assert_eq!(params, &["a".to_string(), "b".to_string()]);
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn parses_fstring_with_embedded_expression() {
        let module = parse("x = f\"hi {name}!\"\n").unwrap();
        let StmtKind::Assign { value, .. } = &module.body[0].kind else { panic!("expected assign") };
        let ExprKind::JoinedStr(parts) = &value.kind else { panic!("expected joined str") };
        assert_eq!(parts.len(), 3);
    }

    #[test]
    fn operator_precedence_binds_mul_tighter_than_add() {
        let module = parse("x = 1 + 2 * 3\n").unwrap();
        let StmtKind::Assign { value, .. } = &module.body[0].kind else { panic!("expected assign") };
        let ExprKind::BinOp { op, right, .. } = &value.kind else { panic!("expected binop") };
        assert_eq!(*op, BinOp::Add);
        assert!(matches!(right.kind, ExprKind::BinOp { op: BinOp::Mul, .. }));
    }

    #[test]
    fn rejects_inconsistent_indentation() {
        let src = "if x:\n  a = 1\n   b = 2\n";
        assert!(parse(src).is_err());
    }

    #[test]
    fn dedent_closes_nested_blocks() {
        let kinds = stmt_kinds("if x:\n    if y:\n        a = 1\nb = 2\n");
        assert_eq!(kinds.len(), 2);
    }
}
