//! Lexer (tokenizer) for vector expressions
//!
//! Converts an expression string into a flat [`Token`] stream consumed by
//! the evaluator. Substitution forms (`$var`, `[script]`, `"quoted"`,
//! `{braced}`) are captured as raw text here; resolving them is the
//! evaluator's job, since `$` and `[` need the caller-supplied
//! [`Substitutor`](crate::expr::Substitutor).
//!
//! Every token carries its character offset so that errors can point back
//! into the expression.

use std::fmt;

/// All token variants produced by the expression lexer.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    // Operands
    Number(f64, usize),
    Ident(String, usize),
    Variable(String, usize), // $name
    Script(String, usize),   // [ ... ]
    Quoted(String, usize),   // " ... "
    Braced(String, usize),   // { ... }

    // Arithmetic
    Plus(usize),
    Minus(usize),
    Star(usize),
    Slash(usize),
    Percent(usize),
    Caret(usize),

    // Comparison
    EqEq(usize),
    NotEq(usize),
    Lt(usize),
    Le(usize),
    Gt(usize),
    Ge(usize),

    // Logical / shifts
    Bang(usize),
    AndAnd(usize),
    OrOr(usize),
    LtLt(usize),
    GtGt(usize),

    // Structure
    LParen(usize),
    RParen(usize),
    Comma(usize),
    End(usize),
}

impl Token {
    pub(crate) fn pos(&self) -> usize {
        match self {
            Token::Number(_, pos)
            | Token::Ident(_, pos)
            | Token::Variable(_, pos)
            | Token::Script(_, pos)
            | Token::Quoted(_, pos)
            | Token::Braced(_, pos)
            | Token::Plus(pos)
            | Token::Minus(pos)
            | Token::Star(pos)
            | Token::Slash(pos)
            | Token::Percent(pos)
            | Token::Caret(pos)
            | Token::EqEq(pos)
            | Token::NotEq(pos)
            | Token::Lt(pos)
            | Token::Le(pos)
            | Token::Gt(pos)
            | Token::Ge(pos)
            | Token::Bang(pos)
            | Token::AndAnd(pos)
            | Token::OrOr(pos)
            | Token::LtLt(pos)
            | Token::GtGt(pos)
            | Token::LParen(pos)
            | Token::RParen(pos)
            | Token::Comma(pos)
            | Token::End(pos) => *pos,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n, _) => write!(f, "number {}", n),
            Token::Ident(s, _) => write!(f, "identifier '{}'", s),
            Token::Variable(s, _) => write!(f, "variable '${}'", s),
            Token::Script(_, _) => write!(f, "nested script"),
            Token::Quoted(_, _) => write!(f, "quoted string"),
            Token::Braced(_, _) => write!(f, "braced string"),
            Token::Plus(_) => write!(f, "'+'"),
            Token::Minus(_) => write!(f, "'-'"),
            Token::Star(_) => write!(f, "'*'"),
            Token::Slash(_) => write!(f, "'/'"),
            Token::Percent(_) => write!(f, "'%'"),
            Token::Caret(_) => write!(f, "'^'"),
            Token::EqEq(_) => write!(f, "'=='"),
            Token::NotEq(_) => write!(f, "'!='"),
            Token::Lt(_) => write!(f, "'<'"),
            Token::Le(_) => write!(f, "'<='"),
            Token::Gt(_) => write!(f, "'>'"),
            Token::Ge(_) => write!(f, "'>='"),
            Token::Bang(_) => write!(f, "'!'"),
            Token::AndAnd(_) => write!(f, "'&&'"),
            Token::OrOr(_) => write!(f, "'||'"),
            Token::LtLt(_) => write!(f, "'<<'"),
            Token::GtGt(_) => write!(f, "'>>'"),
            Token::LParen(_) => write!(f, "'('"),
            Token::RParen(_) => write!(f, "')'"),
            Token::Comma(_) => write!(f, "','"),
            Token::End(_) => write!(f, "end of expression"),
        }
    }
}

/// Lexer error type
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LexError {
    pub message: String,
    pub pos: usize,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lex error at offset {}: {}", self.pos, self.message)
    }
}

/// Lexer for vector expressions
pub(crate) struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub(crate) fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Tokenize the entire input
    pub(crate) fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            if self.is_at_end() {
                tokens.push(Token::End(self.position));
                break;
            }
            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let pos = self.position;
        let ch = self.advance().ok_or_else(|| LexError {
            message: "unexpected end of expression".to_string(),
            pos,
        })?;

        match ch {
            '0'..='9' => self.number(pos),
            '.' => {
                if matches!(self.peek(), Some('0'..='9')) {
                    self.number(pos)
                } else {
                    Err(LexError {
                        message: "unexpected character: '.'".to_string(),
                        pos,
                    })
                }
            }
            'a'..='z' | 'A'..='Z' | '_' => Ok(self.identifier(pos)),
            ':' => {
                // Only meaningful as the leading `::` of a qualified name
                if self.peek() == Some(':') {
                    self.advance();
                    Ok(self.identifier(pos))
                } else {
                    Err(LexError {
                        message: "unexpected character: ':'".to_string(),
                        pos,
                    })
                }
            }
            '$' => self.variable(pos),
            '[' => self.script(pos),
            '"' => self.quoted(pos),
            '{' => self.braced(pos),

            '+' => Ok(Token::Plus(pos)),
            '-' => Ok(Token::Minus(pos)),
            '*' => Ok(Token::Star(pos)),
            '/' => Ok(Token::Slash(pos)),
            '%' => Ok(Token::Percent(pos)),
            '^' => Ok(Token::Caret(pos)),
            '(' => Ok(Token::LParen(pos)),
            ')' => Ok(Token::RParen(pos)),
            ',' => Ok(Token::Comma(pos)),
            '=' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(Token::EqEq(pos))
                } else {
                    Err(LexError {
                        message: "unexpected character: '='".to_string(),
                        pos,
                    })
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(Token::NotEq(pos))
                } else {
                    Ok(Token::Bang(pos))
                }
            }
            '<' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(Token::Le(pos))
                } else if self.peek() == Some('<') {
                    self.advance();
                    Ok(Token::LtLt(pos))
                } else {
                    Ok(Token::Lt(pos))
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(Token::Ge(pos))
                } else if self.peek() == Some('>') {
                    self.advance();
                    Ok(Token::GtGt(pos))
                } else {
                    Ok(Token::Gt(pos))
                }
            }
            '&' => {
                if self.peek() == Some('&') {
                    self.advance();
                    Ok(Token::AndAnd(pos))
                } else {
                    Err(LexError {
                        message: "unexpected character: '&'".to_string(),
                        pos,
                    })
                }
            }
            '|' => {
                if self.peek() == Some('|') {
                    self.advance();
                    Ok(Token::OrOr(pos))
                } else {
                    Err(LexError {
                        message: "unexpected character: '|'".to_string(),
                        pos,
                    })
                }
            }

            _ => Err(LexError {
                message: format!("unexpected character: '{}'", ch),
                pos,
            }),
        }
    }

    /// Parse a numeric literal (integer, decimal, or exponent form)
    fn number(&mut self, start: usize) -> Result<Token, LexError> {
        while matches!(self.peek(), Some('0'..='9')) {
            self.advance();
        }
        if self.peek() == Some('.') && matches!(self.peek_ahead(1), Some('0'..='9')) {
            self.advance();
            while matches!(self.peek(), Some('0'..='9')) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let mut lookahead = 1;
            if matches!(self.peek_ahead(1), Some('+' | '-')) {
                lookahead = 2;
            }
            if matches!(self.peek_ahead(lookahead), Some('0'..='9')) {
                for _ in 0..=lookahead {
                    self.advance();
                }
                while matches!(self.peek(), Some('0'..='9')) {
                    self.advance();
                }
            }
        }

        let text: String = self.input[start..self.position].iter().collect();
        let value = text.parse::<f64>().map_err(|_| LexError {
            message: format!("bad number \"{}\"", text),
            pos: start,
        })?;
        Ok(Token::Number(value, start))
    }

    /// Parse an identifier, allowing `::` namespace qualifiers inside
    fn identifier(&mut self, start: usize) -> Token {
        loop {
            match self.peek() {
                Some('a'..='z' | 'A'..='Z' | '0'..='9' | '_') => {
                    self.advance();
                }
                Some(':') if self.peek_ahead(1) == Some(':') => {
                    self.advance();
                    self.advance();
                }
                _ => break,
            }
        }
        let text: String = self.input[start..self.position].iter().collect();
        Token::Ident(text, start)
    }

    /// Parse `$name` variable substitution
    fn variable(&mut self, start: usize) -> Result<Token, LexError> {
        let name_start = self.position;
        while matches!(self.peek(), Some('a'..='z' | 'A'..='Z' | '0'..='9' | '_')) {
            self.advance();
        }
        if self.position == name_start {
            return Err(LexError {
                message: "'$' must be followed by a variable name".to_string(),
                pos: start,
            });
        }
        let name: String = self.input[name_start..self.position].iter().collect();
        Ok(Token::Variable(name, start))
    }

    /// Parse `[ ... ]` nested-script substitution, honoring nesting
    fn script(&mut self, start: usize) -> Result<Token, LexError> {
        let body_start = self.position;
        let mut depth = 1usize;
        while let Some(ch) = self.advance() {
            match ch {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        let body: String =
                            self.input[body_start..self.position - 1].iter().collect();
                        return Ok(Token::Script(body, start));
                    }
                }
                _ => {}
            }
        }
        Err(LexError {
            message: "unterminated nested script".to_string(),
            pos: start,
        })
    }

    /// Parse a double-quoted string with backslash escapes
    fn quoted(&mut self, start: usize) -> Result<Token, LexError> {
        let mut text = String::new();
        while let Some(ch) = self.advance() {
            match ch {
                '"' => return Ok(Token::Quoted(text, start)),
                '\\' => {
                    let escaped = self.advance().ok_or_else(|| LexError {
                        message: "unexpected end of expression in quoted string".to_string(),
                        pos: self.position,
                    })?;
                    match escaped {
                        'n' => text.push('\n'),
                        't' => text.push('\t'),
                        '\\' => text.push('\\'),
                        '"' => text.push('"'),
                        other => text.push(other),
                    }
                }
                _ => text.push(ch),
            }
        }
        Err(LexError {
            message: "unterminated quoted string".to_string(),
            pos: start,
        })
    }

    /// Parse `{ ... }` braced text, honoring nesting
    fn braced(&mut self, start: usize) -> Result<Token, LexError> {
        let body_start = self.position;
        let mut depth = 1usize;
        while let Some(ch) = self.advance() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let body: String =
                            self.input[body_start..self.position - 1].iter().collect();
                        return Ok(Token::Braced(body, start));
                    }
                }
                _ => {}
            }
        }
        Err(LexError {
            message: "unterminated braced string".to_string(),
            pos: start,
        })
    }

    // ===== Cursor helpers =====

    fn advance(&mut self) -> Option<char> {
        let ch = self.input.get(self.position).copied();
        if ch.is_some() {
            self.position += 1;
        }
        ch
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(ch) if ch.is_whitespace()) {
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers() {
        let mut lexer = Lexer::new("1 2.5 .75 3e2 1.5e-3");
        let tokens = lexer.tokenize().unwrap();

        assert!(matches!(tokens[0], Token::Number(n, _) if n == 1.0));
        assert!(matches!(tokens[1], Token::Number(n, _) if n == 2.5));
        assert!(matches!(tokens[2], Token::Number(n, _) if n == 0.75));
        assert!(matches!(tokens[3], Token::Number(n, _) if n == 300.0));
        assert!(matches!(tokens[4], Token::Number(n, _) if n == 0.0015));
        assert!(matches!(tokens[5], Token::End(_)));
    }

    #[test]
    fn test_operators() {
        let mut lexer = Lexer::new("== != <= >= << >> && || ^ %");
        let tokens = lexer.tokenize().unwrap();

        assert!(matches!(tokens[0], Token::EqEq(_)));
        assert!(matches!(tokens[1], Token::NotEq(_)));
        assert!(matches!(tokens[2], Token::Le(_)));
        assert!(matches!(tokens[3], Token::Ge(_)));
        assert!(matches!(tokens[4], Token::LtLt(_)));
        assert!(matches!(tokens[5], Token::GtGt(_)));
        assert!(matches!(tokens[6], Token::AndAnd(_)));
        assert!(matches!(tokens[7], Token::OrOr(_)));
        assert!(matches!(tokens[8], Token::Caret(_)));
        assert!(matches!(tokens[9], Token::Percent(_)));
    }

    #[test]
    fn test_qualified_identifier() {
        let mut lexer = Lexer::new("ns::temps + x1");
        let tokens = lexer.tokenize().unwrap();

        assert!(matches!(tokens[0], Token::Ident(ref s, _) if s == "ns::temps"));
        assert!(matches!(tokens[1], Token::Plus(_)));
        assert!(matches!(tokens[2], Token::Ident(ref s, _) if s == "x1"));
    }

    #[test]
    fn test_substitution_forms() {
        let mut lexer = Lexer::new("$count [lindex $l 0] \"3.5\" {v}");
        let tokens = lexer.tokenize().unwrap();

        assert!(matches!(tokens[0], Token::Variable(ref s, _) if s == "count"));
        assert!(matches!(tokens[1], Token::Script(ref s, _) if s == "lindex $l 0"));
        assert!(matches!(tokens[2], Token::Quoted(ref s, _) if s == "3.5"));
        assert!(matches!(tokens[3], Token::Braced(ref s, _) if s == "v"));
    }

    #[test]
    fn test_nested_script_and_braces() {
        let mut lexer = Lexer::new("[a [b c]] {x {y} z}");
        let tokens = lexer.tokenize().unwrap();

        assert!(matches!(tokens[0], Token::Script(ref s, _) if s == "a [b c]"));
        assert!(matches!(tokens[1], Token::Braced(ref s, _) if s == "x {y} z"));
    }

    #[test]
    fn test_bad_characters() {
        assert!(Lexer::new("a & b").tokenize().is_err());
        assert!(Lexer::new("a = b").tokenize().is_err());
        assert!(Lexer::new("[unterminated").tokenize().is_err());
        assert!(Lexer::new("\"unterminated").tokenize().is_err());
    }
}
