//! Concrete-node parser.
//!
//! Parses a token stream into the generic pre-classification tree. Concrete
//! nodes know nothing about objects or properties yet; they only capture the
//! statement shape: a head, trailing values, an optional `:` base list, and an
//! optional brace block. Classification happens in the compiler.

use super::error::CompileError;
use super::token::{Token, TokenKind};

/// A raw parse-tree node.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcreteNode {
    /// The node's own text: the word itself, quote contents, a variable name,
    /// or an import target.
    pub token: String,
    pub kind: ConcreteNodeKind,
    pub line: usize,
    pub children: Vec<ConcreteNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcreteNodeKind {
    Word,
    Quote,
    Variable,
    /// `$name = value`; the single child is the value.
    VariableAssign,
    /// `:` base list; children are the base-name words.
    Colon,
    /// `{ ... }` block; children are the inner statements.
    Block,
    /// `import target as alias`; the single child is the alias word.
    Import,
}

impl ConcreteNode {
    fn new(token: impl Into<String>, kind: ConcreteNodeKind, line: usize) -> Self {
        Self {
            token: token.into(),
            kind,
            line,
            children: Vec::new(),
        }
    }
}

pub struct Parser<'a> {
    file: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(file: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            file,
            tokens,
            pos: 0,
        }
    }

    pub fn parse(&mut self) -> Result<Vec<ConcreteNode>, CompileError> {
        let mut nodes = Vec::new();
        self.skip_ends();
        while !self.is_at_end() {
            nodes.push(self.parse_statement()?);
            self.skip_ends();
        }
        Ok(nodes)
    }

    fn parse_statement(&mut self) -> Result<ConcreteNode, CompileError> {
        let t = self.peek();
        match &t.kind {
            TokenKind::Word(w) if w == "import" => self.parse_import(),
            TokenKind::Variable(_) if self.next_is_assign() => self.parse_assignment(),
            TokenKind::Word(_) | TokenKind::Quote(_) | TokenKind::Variable(_) => self.parse_node(),
            other => Err(CompileError::parse(
                format!("unexpected {}", describe(other)),
                self.file,
                t.line,
            )),
        }
    }

    /// `head value* [: base+] [{ ... }]`
    fn parse_node(&mut self) -> Result<ConcreteNode, CompileError> {
        let head = self.advance().clone();
        let mut node = match leaf(&head) {
            Some(n) => n,
            None => {
                return Err(CompileError::parse(
                    format!("unexpected {}", describe(&head.kind)),
                    self.file,
                    head.line,
                ))
            }
        };

        while let Some(value) = leaf(self.peek()) {
            node.children.push(value);
            self.advance();
        }

        let has_bases = self.check(&TokenKind::Colon);
        if has_bases {
            let colon_line = self.peek().line;
            self.advance();
            let mut colon = ConcreteNode::new(":", ConcreteNodeKind::Colon, colon_line);
            while let TokenKind::Word(w) = &self.peek().kind {
                colon
                    .children
                    .push(ConcreteNode::new(w.clone(), ConcreteNodeKind::Word, self.peek().line));
                self.advance();
            }
            if colon.children.is_empty() {
                return Err(CompileError::parse(
                    "expected base name after ':'",
                    self.file,
                    colon_line,
                ));
            }
            node.children.push(colon);
        }

        if self.check_skip_ends(&TokenKind::LBrace) {
            node.children.push(self.parse_block()?);
        } else if has_bases {
            return Err(CompileError::parse(
                "expected '{' after base list",
                self.file,
                node.line,
            ));
        }

        self.expect_statement_end(node.line)?;
        Ok(node)
    }

    fn parse_block(&mut self) -> Result<ConcreteNode, CompileError> {
        let brace_line = self.peek().line;
        self.advance(); // consume '{'
        let mut block = ConcreteNode::new("{", ConcreteNodeKind::Block, brace_line);
        self.skip_ends();
        while !self.check(&TokenKind::RBrace) {
            if self.is_at_end() {
                return Err(CompileError::parse("unclosed block", self.file, brace_line));
            }
            block.children.push(self.parse_statement()?);
            self.skip_ends();
        }
        self.advance(); // consume '}'
        Ok(block)
    }

    /// `import <quote|word> as <word>`
    fn parse_import(&mut self) -> Result<ConcreteNode, CompileError> {
        let kw_line = self.peek().line;
        self.advance(); // consume 'import'

        let target = match &self.peek().kind {
            TokenKind::Quote(s) | TokenKind::Word(s) => {
                let t = s.clone();
                self.advance();
                t
            }
            _ => {
                return Err(CompileError::parse(
                    "expected file name after 'import'",
                    self.file,
                    kw_line,
                ))
            }
        };

        match &self.peek().kind {
            TokenKind::Word(w) if w == "as" => {
                self.advance();
            }
            _ => {
                return Err(CompileError::parse(
                    "expected 'as' after import target",
                    self.file,
                    kw_line,
                ))
            }
        }

        let alias = match &self.peek().kind {
            TokenKind::Word(w) => {
                let a = w.clone();
                self.advance();
                a
            }
            _ => {
                return Err(CompileError::parse(
                    "expected alias name after 'as'",
                    self.file,
                    kw_line,
                ))
            }
        };

        let mut node = ConcreteNode::new(target, ConcreteNodeKind::Import, kw_line);
        node.children
            .push(ConcreteNode::new(alias, ConcreteNodeKind::Word, kw_line));
        self.expect_statement_end(kw_line)?;
        Ok(node)
    }

    /// `$name = <word|quote>`
    fn parse_assignment(&mut self) -> Result<ConcreteNode, CompileError> {
        let var = self.advance().clone();
        let name = match &var.kind {
            TokenKind::Variable(n) => n.clone(),
            _ => unreachable!("caller checked for a variable token"),
        };
        self.advance(); // consume '='

        let value = match leaf(self.peek()) {
            Some(v) if v.kind != ConcreteNodeKind::Variable => {
                self.advance();
                v
            }
            _ => {
                return Err(CompileError::parse(
                    format!("expected literal value after '${name} ='"),
                    self.file,
                    var.line,
                ))
            }
        };

        let mut node = ConcreteNode::new(name, ConcreteNodeKind::VariableAssign, var.line);
        node.children.push(value);
        self.expect_statement_end(var.line)?;
        Ok(node)
    }

    // --- Utility methods ---

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    fn advance(&mut self) -> &Token {
        let t = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len() || self.peek().kind == TokenKind::Eof
    }

    fn check(&self, kind: &TokenKind) -> bool {
        !self.is_at_end()
            && std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn check_skip_ends(&mut self, kind: &TokenKind) -> bool {
        let saved = self.pos;
        self.skip_ends();
        if self.check(kind) {
            true
        } else {
            self.pos = saved;
            false
        }
    }

    fn next_is_assign(&self) -> bool {
        matches!(self.peek_next().map(|t| &t.kind), Some(TokenKind::Assign))
    }

    fn skip_ends(&mut self) {
        while !self.is_at_end() && self.peek().kind == TokenKind::End {
            self.pos += 1;
        }
    }

    /// A statement ends at an `End`, `}`, or end of input. Anything else is
    /// trailing junk.
    fn expect_statement_end(&mut self, line: usize) -> Result<(), CompileError> {
        match &self.peek().kind {
            TokenKind::End | TokenKind::RBrace | TokenKind::Eof => Ok(()),
            other => Err(CompileError::parse(
                format!("unexpected {} at end of statement", describe(other)),
                self.file,
                line,
            )),
        }
    }
}

/// Convert a value-position token into a leaf node, if it is one.
fn leaf(token: &Token) -> Option<ConcreteNode> {
    let kind = match &token.kind {
        TokenKind::Word(_) => ConcreteNodeKind::Word,
        TokenKind::Quote(_) => ConcreteNodeKind::Quote,
        TokenKind::Variable(_) => ConcreteNodeKind::Variable,
        _ => return None,
    };
    let text = match &token.kind {
        TokenKind::Word(s) | TokenKind::Quote(s) | TokenKind::Variable(s) => s.clone(),
        _ => unreachable!(),
    };
    Some(ConcreteNode::new(text, kind, token.line))
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Word(w) => format!("word '{w}'"),
        TokenKind::Quote(q) => format!("string \"{q}\""),
        TokenKind::Variable(v) => format!("variable '${v}'"),
        TokenKind::LBrace => "'{'".to_string(),
        TokenKind::RBrace => "'}'".to_string(),
        TokenKind::Colon => "':'".to_string(),
        TokenKind::Assign => "'='".to_string(),
        TokenKind::End => "end of statement".to_string(),
        TokenKind::Eof => "end of file".to_string(),
    }
}
