//! Hand-rolled, indentation-sensitive tokenizer.
//!
//! The supported grammar subset (§4.B) is Python-shaped and indentation
//! delimits blocks, which doesn't fit a regex-driven lexer generator well;
//! this follows the same hand-rolled, `Iterator`-free, buffer-and-index
//! style used elsewhere in this workspace for small custom formats.

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),
    /// An f-string literal, split into its literal and `{expr}` pieces at
    /// the lexer level so the parser never has to re-lex.
    FString(Vec<FStringPart>),
    True,
    False,
    None_,
    And,
    Or,
    Not,
    In,
    Is,
    If,
    Elif,
    Else,
    While,
    For,
    Def,
    Class,
    Return,
    Pass,
    Break,
    Continue,
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Arrow,
    Newline,
    Indent,
    Dedent,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FStringPart {
    Literal(String),
    Expr(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub start: Pos,
    pub end: Pos,
}

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
    indents: Vec<u32>,
    paren_depth: u32,
    at_line_start: bool,
    pending: Vec<Spanned>,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
            line: 1,
            col: 0,
            indents: vec![0],
            paren_depth: 0,
            at_line_start: true,
            pending: Vec::new(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn here(&self) -> Pos {
        Pos { line: self.line, col: self.col }
    }

    /// Tokenizes the entire input. Errors surface as a `LexError` string
    /// rather than `step_trace_core::ParseError` directly: the parser wraps
    /// lexer failures with source-position context it already has in hand.
    pub fn tokenize(mut self) -> Result<Vec<Spanned>, String> {
        let mut out = Vec::new();
        loop {
            if !self.pending.is_empty() {
                out.push(self.pending.remove(0));
                continue;
            }
            if self.at_line_start && self.paren_depth == 0 {
                self.handle_indentation(&mut out)?;
            }
            self.skip_blank_and_comment();
            let start = self.here();
            let Some(c) = self.peek() else {
                if self.paren_depth == 0 {
                    while self.indents.len() > 1 {
                        self.indents.pop();
                        out.push(Spanned { token: Token::Dedent, start, end: start });
                    }
                }
                out.push(Spanned { token: Token::Eof, start, end: start });
                break;
            };
            if c == b'\n' {
                self.bump();
                if self.paren_depth == 0 {
                    out.push(Spanned { token: Token::Newline, start, end: self.here() });
                    self.at_line_start = true;
                }
                continue;
            }
            let tok = self.lex_one()?;
            let end = self.here();
            out.push(Spanned { token: tok, start, end });
        }
        Ok(out)
    }

    fn skip_blank_and_comment(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r') => {
                    self.bump();
                }
                Some(b'#') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn handle_indentation(&mut self, out: &mut Vec<Spanned>) -> Result<(), String> {
        self.at_line_start = false;
        let mut width = 0u32;
        loop {
            match self.peek() {
                Some(b' ') => {
                    width += 1;
                    self.bump();
                }
                Some(b'\t') => {
                    width += 8 - (width % 8);
                    self.bump();
                }
                _ => break,
            }
        }
        // A fully blank or comment-only line contributes no indentation
        // token; fall through and let the newline/comment handling retry.
        match self.peek() {
            None | Some(b'\n' | b'#') => return Ok(()),
            _ => {}
        }
        let here = self.here();
        let current = *self.indents.last().unwrap();
        if width > current {
            self.indents.push(width);
            out.push(Spanned { token: Token::Indent, start: here, end: here });
        } else {
            while width < *self.indents.last().unwrap() {
                self.indents.pop();
                out.push(Spanned { token: Token::Dedent, start: here, end: here });
            }
            if width != *self.indents.last().unwrap() {
                return Err(format!("line {}: inconsistent indentation", here.line));
            }
        }
        Ok(())
    }

    fn lex_one(&mut self) -> Result<Token, String> {
        let c = self.peek().unwrap();
        if c.is_ascii_digit() {
            return Ok(self.lex_number());
        }
        if c == b'_' || c.is_ascii_alphabetic() {
            return Ok(self.lex_name_or_keyword());
        }
        if c == b'"' || c == b'\'' {
            return self.lex_string(false);
        }
        if c == b'f' && matches!(self.peek_at(1), Some(b'"' | b'\'')) {
            self.bump();
            return self.lex_string(true);
        }
        self.bump();
        match c {
            b'(' => {
                self.paren_depth += 1;
                Ok(Token::LParen)
            }
            b')' => {
                self.paren_depth = self.paren_depth.saturating_sub(1);
                Ok(Token::RParen)
            }
            b'[' => {
                self.paren_depth += 1;
                Ok(Token::LBracket)
            }
            b']' => {
                self.paren_depth = self.paren_depth.saturating_sub(1);
                Ok(Token::RBracket)
            }
            b'{' => {
                self.paren_depth += 1;
                Ok(Token::LBrace)
            }
            b'}' => {
                self.paren_depth = self.paren_depth.saturating_sub(1);
                Ok(Token::RBrace)
            }
            b',' => Ok(Token::Comma),
            b':' => Ok(Token::Colon),
            b'.' => Ok(Token::Dot),
            b'+' => Ok(self.eq_variant(Token::PlusEq, Token::Plus)),
            b'-' => {
                if self.peek() == Some(b'>') {
                    self.bump();
                    Ok(Token::Arrow)
                } else {
                    Ok(self.eq_variant(Token::MinusEq, Token::Minus))
                }
            }
            b'*' => {
                if self.peek() == Some(b'*') {
                    self.bump();
                    Ok(Token::DoubleStar)
                } else {
                    Ok(self.eq_variant(Token::StarEq, Token::Star))
                }
            }
            b'/' => {
                if self.peek() == Some(b'/') {
                    self.bump();
                    Ok(Token::DoubleSlash)
                } else {
                    Ok(self.eq_variant(Token::SlashEq, Token::Slash))
                }
            }
            b'%' => Ok(self.eq_variant(Token::PercentEq, Token::Percent)),
            b'=' => Ok(self.eq_variant(Token::EqEq, Token::Eq)),
            b'!' => {
                if self.peek() == Some(b'=') {
                    self.bump();
                    Ok(Token::NotEq)
                } else {
                    Err(format!("line {}: unexpected '!'", self.line))
                }
            }
            b'<' => Ok(self.eq_variant(Token::LtEq, Token::Lt)),
            b'>' => Ok(self.eq_variant(Token::GtEq, Token::Gt)),
            other => Err(format!("line {}: unexpected character {:?}", self.line, other as char)),
        }
    }

    fn eq_variant(&mut self, with_eq: Token, without: Token) -> Token {
        if self.peek() == Some(b'=') {
            self.bump();
            with_eq
        } else {
            without
        }
    }

    fn lex_number(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        let mut is_float = false;
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            is_float = true;
            self.bump();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        if is_float {
            Token::Float(text.parse().unwrap_or(0.0))
        } else {
            Token::Int(text.parse().unwrap_or(0))
        }
    }

    fn lex_name_or_keyword(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c == b'_' || c.is_ascii_alphanumeric()) {
            self.bump();
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        match text {
            "True" => Token::True,
            "False" => Token::False,
            "None" => Token::None_,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "in" => Token::In,
            "is" => Token::Is,
            "if" => Token::If,
            "elif" => Token::Elif,
            "else" => Token::Else,
            "while" => Token::While,
            "for" => Token::For,
            "def" => Token::Def,
            "class" => Token::Class,
            "return" => Token::Return,
            "pass" => Token::Pass,
            "break" => Token::Break,
            "continue" => Token::Continue,
            _ => Token::Name(text.to_string()),
        }
    }

    fn lex_string(&mut self, is_fstring: bool) -> Result<Token, String> {
        let quote = self.bump().unwrap();
        let mut literal = String::new();
        let mut parts = Vec::new();
        loop {
            match self.peek() {
                None => return Err(format!("line {}: unterminated string literal", self.line)),
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some(b'\\') => {
                    self.bump();
                    let escaped = self.bump().ok_or_else(|| "unterminated escape".to_string())?;
                    literal.push(match escaped {
                        b'n' => '\n',
                        b't' => '\t',
                        b'\\' => '\\',
                        b'\'' => '\'',
                        b'"' => '"',
                        other => other as char,
                    });
                }
                Some(b'{') if is_fstring => {
                    self.bump();
                    if self.peek() == Some(b'{') {
                        self.bump();
                        literal.push('{');
                        continue;
                    }
                    if !literal.is_empty() {
                        parts.push(FStringPart::Literal(std::mem::take(&mut literal)));
                    }
                    let mut expr_src = String::new();
                    let mut depth = 1;
                    loop {
                        match self.peek() {
                            None => return Err("unterminated f-string expression".to_string()),
                            Some(b'{') => {
                                depth += 1;
                                expr_src.push('{');
                                self.bump();
                            }
                            Some(b'}') => {
                                depth -= 1;
                                self.bump();
                                if depth == 0 {
                                    break;
                                }
                                expr_src.push('}');
                            }
                            Some(c) => {
                                expr_src.push(c as char);
                                self.bump();
                            }
                        }
                    }
                    parts.push(FStringPart::Expr(expr_src));
                }
                Some(c) => {
                    literal.push(c as char);
                    self.bump();
                }
            }
        }
        if is_fstring {
            if !literal.is_empty() || parts.is_empty() {
                parts.push(FStringPart::Literal(literal));
            }
            Ok(Token::FString(parts))
        } else {
            Ok(Token::Str(literal))
        }
    }
}
