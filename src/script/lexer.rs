//! Lexer for particle scripts.
//!
//! Converts source text into a stream of [`Token`]s. The lexer is generic on
//! purpose: it knows about structure (braces, colons, assignment, statement
//! ends) and leaves all vocabulary to later passes.

use super::error::CompileError;
use super::token::{Token, TokenKind};

pub struct Lexer<'a> {
    file: &'a str,
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(file: &'a str, source: &str) -> Self {
        Self {
            file,
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, CompileError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_trivia()?;

            if self.is_at_end() {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    line: self.line,
                    col: self.col,
                });
                break;
            }

            let ch = self.peek();

            if ch == '\n' {
                tokens.push(Token {
                    kind: TokenKind::End,
                    line: self.line,
                    col: self.col,
                });
                self.advance();
                self.line += 1;
                self.col = 1;
                continue;
            }

            let token = match ch {
                '{' => self.single_char(TokenKind::LBrace),
                '}' => self.single_char(TokenKind::RBrace),
                ':' => self.single_char(TokenKind::Colon),
                '=' => self.single_char(TokenKind::Assign),
                ';' => self.single_char(TokenKind::End),
                '"' => self.lex_quote()?,
                '$' => self.lex_variable()?,
                _ => self.lex_word(),
            };

            tokens.push(token);
        }

        Ok(tokens)
    }

    fn peek(&self) -> char {
        self.chars[self.pos]
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.pos];
        self.pos += 1;
        if ch != '\n' {
            self.col += 1;
        }
        ch
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    /// Skip whitespace (not newlines) and both comment forms.
    fn skip_trivia(&mut self) -> Result<(), CompileError> {
        loop {
            while !self.is_at_end() {
                let ch = self.peek();
                if ch == ' ' || ch == '\t' || ch == '\r' {
                    self.advance();
                } else {
                    break;
                }
            }
            if !self.is_at_end() && self.peek() == '/' && self.peek_next() == Some('/') {
                while !self.is_at_end() && self.peek() != '\n' {
                    self.advance();
                }
                continue;
            }
            if !self.is_at_end() && self.peek() == '/' && self.peek_next() == Some('*') {
                self.skip_block_comment()?;
                continue;
            }
            return Ok(());
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), CompileError> {
        let start_line = self.line;
        self.advance(); // consume '/'
        self.advance(); // consume '*'
        while !self.is_at_end() {
            if self.peek() == '*' && self.peek_next() == Some('/') {
                self.advance();
                self.advance();
                return Ok(());
            }
            if self.peek() == '\n' {
                self.line += 1;
                self.col = 1;
            }
            self.advance();
        }
        Err(CompileError::lex(
            "unclosed block comment",
            self.file,
            start_line,
        ))
    }

    fn single_char(&mut self, kind: TokenKind) -> Token {
        let line = self.line;
        let col = self.col;
        self.advance();
        Token { kind, line, col }
    }

    fn lex_quote(&mut self) -> Result<Token, CompileError> {
        let line = self.line;
        let col = self.col;
        self.advance(); // consume opening '"'
        let mut s = String::new();
        while !self.is_at_end() && self.peek() != '"' {
            if self.peek() == '\n' {
                return Err(CompileError::lex("unclosed string literal", self.file, line));
            }
            s.push(self.advance());
        }
        if self.is_at_end() {
            return Err(CompileError::lex("unclosed string literal", self.file, line));
        }
        self.advance(); // consume closing '"'
        Ok(Token {
            kind: TokenKind::Quote(s),
            line,
            col,
        })
    }

    fn lex_variable(&mut self) -> Result<Token, CompileError> {
        let line = self.line;
        let col = self.col;
        self.advance(); // consume '$'
        let mut s = String::new();
        while !self.is_at_end() {
            let ch = self.peek();
            if ch.is_ascii_alphanumeric() || ch == '_' {
                s.push(self.advance());
            } else {
                break;
            }
        }
        if s.is_empty() {
            return Err(CompileError::lex(
                "expected variable name after '$'",
                self.file,
                line,
            ));
        }
        Ok(Token {
            kind: TokenKind::Variable(s),
            line,
            col,
        })
    }

    fn lex_word(&mut self) -> Token {
        let line = self.line;
        let col = self.col;
        let mut s = String::new();
        while !self.is_at_end() {
            let ch = self.peek();
            if TokenKind::is_word_boundary(ch) {
                break;
            }
            // A comment can butt directly against a word.
            if ch == '/' && matches!(self.peek_next(), Some('/') | Some('*')) {
                break;
            }
            s.push(self.advance());
        }
        Token {
            kind: TokenKind::Word(s),
            line,
            col,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new("test.pu", source);
        lexer
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lex_object_header() {
        let kinds = kinds("system fire {");
        assert_eq!(kinds[0], TokenKind::Word("system".to_string()));
        assert_eq!(kinds[1], TokenKind::Word("fire".to_string()));
        assert_eq!(kinds[2], TokenKind::LBrace);
        assert_eq!(kinds[3], TokenKind::Eof);
    }

    #[test]
    fn lex_statement_ends() {
        let kinds = kinds("rate 120;\nangle 30");
        assert_eq!(kinds[2], TokenKind::End); // ';'
        assert_eq!(kinds[3], TokenKind::End); // newline
        assert_eq!(kinds[6], TokenKind::Eof);
    }

    #[test]
    fn lex_variable_assignment() {
        let kinds = kinds("$glow = soft_white");
        assert_eq!(kinds[0], TokenKind::Variable("glow".to_string()));
        assert_eq!(kinds[1], TokenKind::Assign);
        assert_eq!(kinds[2], TokenKind::Word("soft_white".to_string()));
    }

    #[test]
    fn lex_quote() {
        let kinds = kinds(r#"import "lib/common.pu" as common"#);
        assert_eq!(kinds[0], TokenKind::Word("import".to_string()));
        assert_eq!(kinds[1], TokenKind::Quote("lib/common.pu".to_string()));
        assert_eq!(kinds[2], TokenKind::Word("as".to_string()));
        assert_eq!(kinds[3], TokenKind::Word("common".to_string()));
    }

    #[test]
    fn lex_colon_base_list() {
        let kinds = kinds("system fire : base_a base_b {");
        assert_eq!(kinds[2], TokenKind::Colon);
        assert_eq!(kinds[3], TokenKind::Word("base_a".to_string()));
        assert_eq!(kinds[4], TokenKind::Word("base_b".to_string()));
        assert_eq!(kinds[5], TokenKind::LBrace);
    }

    #[test]
    fn lex_path_like_word() {
        let kinds = kinds("mesh_name models/crystal.mesh");
        assert_eq!(kinds[1], TokenKind::Word("models/crystal.mesh".to_string()));
    }

    #[test]
    fn lex_numeric_words_stay_words() {
        let kinds = kinds("scale -3.5 1e3 +2");
        assert_eq!(kinds[1], TokenKind::Word("-3.5".to_string()));
        assert_eq!(kinds[2], TokenKind::Word("1e3".to_string()));
        assert_eq!(kinds[3], TokenKind::Word("+2".to_string()));
    }

    #[test]
    fn lex_line_comment() {
        let kinds = kinds("rate 120 // emitted per second\nangle 30");
        assert_eq!(kinds[0], TokenKind::Word("rate".to_string()));
        assert_eq!(kinds[2], TokenKind::End);
        assert_eq!(kinds[3], TokenKind::Word("angle".to_string()));
    }

    #[test]
    fn lex_block_comment_tracks_lines() {
        let mut lexer = Lexer::new("test.pu", "/* one\ntwo */ rate");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Word("rate".to_string()));
        assert_eq!(tokens[0].line, 2);
    }

    #[test]
    fn lex_comment_against_word() {
        let kinds = kinds("rate 120//tail");
        assert_eq!(kinds[1], TokenKind::Word("120".to_string()));
        assert_eq!(kinds[2], TokenKind::Eof);
    }

    #[test]
    fn lex_line_tracking() {
        let mut lexer = Lexer::new("test.pu", "rate 120\nangle 30");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[3].line, 2);
    }

    #[test]
    fn lex_unclosed_quote_is_error() {
        let mut lexer = Lexer::new("test.pu", "mesh_name \"crystal");
        let err = lexer.tokenize().unwrap_err();
        assert_eq!(err.kind, super::super::error::ErrorKind::Lex);
        assert_eq!(err.file, "test.pu");
    }

    #[test]
    fn lex_quote_may_not_span_lines() {
        let mut lexer = Lexer::new("test.pu", "mesh_name \"cry\nstal\"");
        assert!(lexer.tokenize().is_err());
    }

    #[test]
    fn lex_bare_dollar_is_error() {
        let mut lexer = Lexer::new("test.pu", "$ = 5");
        assert!(lexer.tokenize().is_err());
    }

    #[test]
    fn lex_unclosed_block_comment_is_error() {
        let mut lexer = Lexer::new("test.pu", "rate /* never closed");
        assert!(lexer.tokenize().is_err());
    }

    #[test]
    fn lex_empty_input() {
        let kinds = kinds("");
        assert_eq!(kinds, vec![TokenKind::Eof]);
    }
}
