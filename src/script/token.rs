//! Token types for the script lexer.

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub col: usize,
}

/// The kind of token.
///
/// The script language is deliberately generic: almost everything is a bare
/// word. Keywords such as `import` or `abstract` are recognized by the parser,
/// not the lexer, so scripts may still use those words as property values.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A bare word: class tags, names, property values, numbers.
    Word(String),
    /// A double-quoted string, quotes stripped.
    Quote(String),
    /// A `$name` variable reference or assignment target, `$` stripped.
    Variable(String),

    LBrace,
    RBrace,
    Colon,
    Assign, // =

    /// End of a statement: a newline or an explicit `;`.
    End,
    Eof,
}

impl TokenKind {
    /// The characters that terminate a bare word.
    pub(crate) fn is_word_boundary(ch: char) -> bool {
        matches!(
            ch,
            ' ' | '\t' | '\r' | '\n' | '{' | '}' | ':' | ';' | '"' | '$' | '='
        )
    }
}
