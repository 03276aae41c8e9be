//! 过滤字符串的词法分析器

use crate::token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    /// 输入字符串中的当前位置（字节索引）
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// 返回当前位置的字符，不推进位置
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// 返回下一个位置的字符，不推进位置
    fn peek_next(&self) -> Option<char> {
        self.input[self.position..].chars().nth(1)
    }

    /// 推进位置一个字符并返回该字符
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    /// 跳过空白字符
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn token(&self, kind: TokenKind<'a>, start: usize) -> Token<'a> {
        Token { kind, span: Span::new(start, self.position) }
    }

    /// 读取数字字面量，支持负号和小数部分
    /// 注意：负号（如果有）已经被调用者消费
    fn read_number(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.bump();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.bump(); // 消费 '.'
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        let value_str = &self.input[start..self.position];
        match value_str.parse::<f64>() {
            Ok(value) => self.token(TokenKind::Number(value), start),
            Err(_) => self.token(TokenKind::Illegal, start),
        }
    }

    /// 读取单引号或双引号包围的字符串字面量，反斜杠转义下一个字符
    /// 注意：开始的引号已经被调用者消费
    fn read_string(&mut self, start: usize, quote: char) -> Token<'a> {
        let mut content = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some(escaped) => content.push(escaped),
                    None => return self.token(TokenKind::Illegal, start),
                },
                Some(c) if c == quote => return self.token(TokenKind::String(content), start),
                Some(c) => content.push(c),
                // 未闭合的字符串
                None => return self.token(TokenKind::Illegal, start),
            }
        }
    }

    /// 读取标识符或关键字
    /// 标识符可以包含字母、数字、下划线，以及用于字段路径的 `.`
    fn read_identifier(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                self.bump();
            } else {
                break;
            }
        }
        let literal = &self.input[start..self.position];
        self.token(match_keyword(literal), start)
    }
}

fn match_keyword(s: &str) -> TokenKind {
    match s.to_ascii_lowercase().as_str() {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "null" => TokenKind::Null,
        "eq" => TokenKind::Eq,
        "ne" => TokenKind::NotEq,
        "match" => TokenKind::Match,
        "nomatch" => TokenKind::NotMatch,
        "gt" => TokenKind::Gt,
        "ge" => TokenKind::Gte,
        "lt" => TokenKind::Lt,
        "le" => TokenKind::Lte,
        _ => TokenKind::Identifier(s),
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        let start = self.position;

        let Some(c) = self.bump() else {
            return None; // 到达输入末尾
        };

        let token = match c {
            '(' => self.token(TokenKind::LParen, start),
            ')' => self.token(TokenKind::RParen, start),
            '~' => self.token(TokenKind::Match, start),
            '=' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.token(TokenKind::Eq, start)
                } else {
                    self.token(TokenKind::Illegal, start)
                }
            }
            '!' => match self.peek() {
                Some('=') => {
                    self.bump();
                    self.token(TokenKind::NotEq, start)
                }
                Some('~') => {
                    self.bump();
                    self.token(TokenKind::NotMatch, start)
                }
                _ => self.token(TokenKind::Illegal, start),
            },
            '<' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.token(TokenKind::Lte, start)
                } else {
                    self.token(TokenKind::Lt, start)
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.token(TokenKind::Gte, start)
                } else {
                    self.token(TokenKind::Gt, start)
                }
            }
            '-' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.read_number(start),
            '"' | '\'' => self.read_string(start, c),
            c if c.is_ascii_digit() => self.read_number(start),
            c if c.is_alphabetic() || c == '_' => self.read_identifier(start),
            _ => self.token(TokenKind::Illegal, start),
        };
        Some(token)
    }
}
