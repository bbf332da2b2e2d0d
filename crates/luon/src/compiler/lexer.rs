// On-demand lexer with single-token lookahead. Produces one token per call
// and tracks line numbers for diagnostics.

use smol_str::SmolStr;

use super::token::{Token, TokenKind};
use crate::lua_vm::{LuaError, LuaResult};

pub struct Lexer<'a> {
    chunk: &'a [u8],
    pos: usize,
    line: u32,
    peeked: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(chunk: &'a str) -> Lexer<'a> {
        Lexer {
            chunk: chunk.as_bytes(),
            pos: 0,
            line: 1,
            peeked: None,
        }
    }

    /// Line of the next token to be produced.
    pub fn line(&mut self) -> LuaResult<u32> {
        Ok(self.peek()?.line)
    }

    pub fn peek(&mut self) -> LuaResult<&Token> {
        if self.peeked.is_none() {
            let tok = self.scan_token()?;
            self.peeked = Some(tok);
        }
        Ok(self.peeked.as_ref().unwrap())
    }

    pub fn peek_kind(&mut self) -> LuaResult<TokenKind> {
        Ok(self.peek()?.kind)
    }

    pub fn next_token(&mut self) -> LuaResult<Token> {
        match self.peeked.take() {
            Some(tok) => Ok(tok),
            None => self.scan_token(),
        }
    }

    /// Consume the next token, which must have the given kind.
    pub fn expect(&mut self, kind: TokenKind) -> LuaResult<Token> {
        let tok = self.next_token()?;
        if tok.kind != kind {
            return Err(LuaError::Parse {
                line: tok.line,
                message: format!("{} expected near '{}'", kind.describe(), tok.text),
            });
        }
        Ok(tok)
    }

    fn error(&self, message: String) -> LuaError {
        LuaError::Lex {
            line: self.line,
            message,
        }
    }

    // ---- low-level cursor ----

    fn cur(&self) -> u8 {
        if self.pos < self.chunk.len() { self.chunk[self.pos] } else { 0 }
    }

    fn at(&self, offset: usize) -> u8 {
        let i = self.pos + offset;
        if i < self.chunk.len() { self.chunk[i] } else { 0 }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.chunk.len()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    // \n, \r, \r\n and \n\r each count as one line break.
    fn skip_newline(&mut self) {
        let first = self.cur();
        self.bump();
        let second = self.cur();
        if (second == b'\n' || second == b'\r') && second != first {
            self.bump();
        }
        self.line += 1;
    }

    fn skip_whitespace_and_comments(&mut self) -> LuaResult<()> {
        loop {
            match self.cur() {
                b' ' | b'\t' | b'\x0B' | b'\x0C' => self.bump(),
                b'\n' | b'\r' => self.skip_newline(),
                b'-' if self.at(1) == b'-' => {
                    self.pos += 2;
                    if self.cur() == b'[' {
                        if let Some(level) = self.long_bracket_level() {
                            self.read_long_string(level)?;
                            continue;
                        }
                    }
                    while !self.is_eof() && self.cur() != b'\n' && self.cur() != b'\r' {
                        self.bump();
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    // ---- token scanning ----

    fn scan_token(&mut self) -> LuaResult<Token> {
        self.skip_whitespace_and_comments()?;
        let line = self.line;
        if self.is_eof() {
            return Ok(self.simple(TokenKind::Eof, line, ""));
        }

        let c = self.cur();
        match c {
            b';' => self.take1(TokenKind::SepSemi, line, ";"),
            b',' => self.take1(TokenKind::SepComma, line, ","),
            b'(' => self.take1(TokenKind::SepLparen, line, "("),
            b')' => self.take1(TokenKind::SepRparen, line, ")"),
            b']' => self.take1(TokenKind::SepRbrack, line, "]"),
            b'{' => self.take1(TokenKind::SepLcurly, line, "{"),
            b'}' => self.take1(TokenKind::SepRcurly, line, "}"),
            b'+' => self.take1(TokenKind::OpAdd, line, "+"),
            b'-' => self.take1(TokenKind::OpMinus, line, "-"),
            b'*' => self.take1(TokenKind::OpMul, line, "*"),
            b'^' => self.take1(TokenKind::OpPow, line, "^"),
            b'%' => self.take1(TokenKind::OpMod, line, "%"),
            b'&' => self.take1(TokenKind::OpBAnd, line, "&"),
            b'|' => self.take1(TokenKind::OpBOr, line, "|"),
            b'#' => self.take1(TokenKind::OpLen, line, "#"),
            b':' => {
                if self.at(1) == b':' {
                    self.pos += 2;
                    Ok(self.simple(TokenKind::SepLabel, line, "::"))
                } else {
                    self.take1(TokenKind::SepColon, line, ":")
                }
            }
            b'/' => {
                if self.at(1) == b'/' {
                    self.pos += 2;
                    Ok(self.simple(TokenKind::OpIDiv, line, "//"))
                } else {
                    self.take1(TokenKind::OpDiv, line, "/")
                }
            }
            b'~' => {
                if self.at(1) == b'=' {
                    self.pos += 2;
                    Ok(self.simple(TokenKind::OpNe, line, "~="))
                } else {
                    self.take1(TokenKind::OpWave, line, "~")
                }
            }
            b'=' => {
                if self.at(1) == b'=' {
                    self.pos += 2;
                    Ok(self.simple(TokenKind::OpEq, line, "=="))
                } else {
                    self.take1(TokenKind::OpAssign, line, "=")
                }
            }
            b'<' => match self.at(1) {
                b'=' => {
                    self.pos += 2;
                    Ok(self.simple(TokenKind::OpLe, line, "<="))
                }
                b'<' => {
                    self.pos += 2;
                    Ok(self.simple(TokenKind::OpShl, line, "<<"))
                }
                _ => self.take1(TokenKind::OpLt, line, "<"),
            },
            b'>' => match self.at(1) {
                b'=' => {
                    self.pos += 2;
                    Ok(self.simple(TokenKind::OpGe, line, ">="))
                }
                b'>' => {
                    self.pos += 2;
                    Ok(self.simple(TokenKind::OpShr, line, ">>"))
                }
                _ => self.take1(TokenKind::OpGt, line, ">"),
            },
            b'.' => {
                if self.at(1) == b'.' {
                    if self.at(2) == b'.' {
                        self.pos += 3;
                        Ok(self.simple(TokenKind::Vararg, line, "..."))
                    } else {
                        self.pos += 2;
                        Ok(self.simple(TokenKind::OpConcat, line, ".."))
                    }
                } else if self.at(1).is_ascii_digit() {
                    self.read_numeral(line)
                } else {
                    self.take1(TokenKind::SepDot, line, ".")
                }
            }
            b'[' => match self.long_bracket_level() {
                Some(level) => {
                    let s = self.read_long_string(level)?;
                    Ok(Token {
                        kind: TokenKind::Str,
                        line,
                        text: SmolStr::new(&s),
                    })
                }
                None => self.take1(TokenKind::SepLbrack, line, "["),
            },
            b'\'' | b'"' => {
                let s = self.read_short_string()?;
                Ok(Token {
                    kind: TokenKind::Str,
                    line,
                    text: SmolStr::new(&s),
                })
            }
            b'0'..=b'9' => self.read_numeral(line),
            b'_' | b'a'..=b'z' | b'A'..=b'Z' => {
                let start = self.pos;
                while matches!(self.cur(), b'_' | b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9') {
                    self.bump();
                }
                let name = std::str::from_utf8(&self.chunk[start..self.pos]).unwrap_or("");
                let kind = TokenKind::keyword(name).unwrap_or(TokenKind::Identifier);
                Ok(Token {
                    kind,
                    line,
                    text: SmolStr::new(name),
                })
            }
            other => Err(self.error(format!("unexpected symbol near '{}'", other as char))),
        }
    }

    fn simple(&self, kind: TokenKind, line: u32, text: &str) -> Token {
        Token {
            kind,
            line,
            text: SmolStr::new(text),
        }
    }

    fn take1(&mut self, kind: TokenKind, line: u32, text: &str) -> LuaResult<Token> {
        self.bump();
        Ok(self.simple(kind, line, text))
    }

    // ---- numerals ----

    // The lexical form decides integer vs. float: a fraction, exponent, or
    // hex-float marker forces float.
    fn read_numeral(&mut self, line: u32) -> LuaResult<Token> {
        let start = self.pos;
        let mut is_float = false;

        if self.cur() == b'0' && matches!(self.at(1), b'x' | b'X') {
            self.pos += 2;
            let mut hex_digits = 0;
            while self.cur().is_ascii_hexdigit() {
                self.bump();
                hex_digits += 1;
            }
            if self.cur() == b'.' {
                is_float = true;
                self.bump();
                while self.cur().is_ascii_hexdigit() {
                    self.bump();
                    hex_digits += 1;
                }
            }
            // "0x" alone carries no mantissa.
            if hex_digits == 0 {
                let text = std::str::from_utf8(&self.chunk[start..self.pos]).unwrap_or("?");
                return Err(self.error(format!("malformed number near '{text}'")));
            }
            if matches!(self.cur(), b'p' | b'P') {
                is_float = true;
                self.bump();
                if matches!(self.cur(), b'+' | b'-') {
                    self.bump();
                }
                while self.cur().is_ascii_digit() {
                    self.bump();
                }
            }
        } else {
            while self.cur().is_ascii_digit() {
                self.bump();
            }
            if self.cur() == b'.' {
                is_float = true;
                self.bump();
                while self.cur().is_ascii_digit() {
                    self.bump();
                }
            }
            if matches!(self.cur(), b'e' | b'E') {
                is_float = true;
                self.bump();
                if matches!(self.cur(), b'+' | b'-') {
                    self.bump();
                }
                while self.cur().is_ascii_digit() {
                    self.bump();
                }
            }
        }

        // A numeral followed by an identifier character is malformed
        // ("3x", "1e2e3" never splits into two tokens).
        if matches!(self.cur(), b'_' | b'a'..=b'z' | b'A'..=b'Z') {
            while matches!(self.cur(), b'_' | b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9') {
                self.bump();
            }
            let text = std::str::from_utf8(&self.chunk[start..self.pos]).unwrap_or("?");
            return Err(self.error(format!("malformed number near '{text}'")));
        }

        let text = std::str::from_utf8(&self.chunk[start..self.pos]).unwrap_or("");
        let kind = if is_float { TokenKind::Float } else { TokenKind::Int };
        Ok(Token {
            kind,
            line,
            text: SmolStr::new(text),
        })
    }

    // ---- strings ----

    fn read_short_string(&mut self) -> LuaResult<String> {
        let quote = self.cur();
        self.bump();
        let mut out = String::new();
        loop {
            if self.is_eof() {
                return Err(self.error("unfinished string".to_string()));
            }
            match self.cur() {
                b'\n' | b'\r' => return Err(self.error("unfinished string".to_string())),
                b'\\' => {
                    self.bump();
                    self.read_escape(&mut out)?;
                }
                c if c == quote => {
                    self.bump();
                    return Ok(out);
                }
                c if c < 0x80 => {
                    out.push(c as char);
                    self.bump();
                }
                _ => {
                    // Copy a full UTF-8 sequence, not just one byte.
                    let start = self.pos;
                    let mut end = self.pos + 1;
                    while end < self.chunk.len() && self.chunk[end] & 0xC0 == 0x80 {
                        end += 1;
                    }
                    match std::str::from_utf8(&self.chunk[start..end]) {
                        Ok(s) => out.push_str(s),
                        Err(_) => {
                            return Err(self.error("invalid utf-8 in string".to_string()));
                        }
                    }
                    self.pos = end;
                }
            }
        }
    }

    fn read_escape(&mut self, out: &mut String) -> LuaResult<()> {
        let c = self.cur();
        match c {
            b'a' => {
                out.push('\x07');
                self.bump();
            }
            b'b' => {
                out.push('\x08');
                self.bump();
            }
            b'f' => {
                out.push('\x0C');
                self.bump();
            }
            b'n' => {
                out.push('\n');
                self.bump();
            }
            b'r' => {
                out.push('\r');
                self.bump();
            }
            b't' => {
                out.push('\t');
                self.bump();
            }
            b'v' => {
                out.push('\x0B');
                self.bump();
            }
            b'\\' | b'"' | b'\'' => {
                out.push(c as char);
                self.bump();
            }
            b'\n' | b'\r' => {
                self.skip_newline();
                out.push('\n');
            }
            b'x' => {
                self.bump();
                let mut v = 0u32;
                for _ in 0..2 {
                    let d = (self.cur() as char)
                        .to_digit(16)
                        .ok_or_else(|| self.error("hexadecimal digit expected".to_string()))?;
                    v = v * 16 + d;
                    self.bump();
                }
                push_codepoint(out, v).map_err(|m| self.error(m))?;
            }
            b'z' => {
                self.bump();
                loop {
                    match self.cur() {
                        b' ' | b'\t' | b'\x0B' | b'\x0C' => self.bump(),
                        b'\n' | b'\r' => self.skip_newline(),
                        _ => break,
                    }
                }
            }
            b'u' => {
                self.bump();
                if self.cur() != b'{' {
                    return Err(self.error("missing '{' in \\u{xxxx}".to_string()));
                }
                self.bump();
                let mut v = 0u32;
                while self.cur() != b'}' {
                    let d = (self.cur() as char)
                        .to_digit(16)
                        .ok_or_else(|| self.error("hexadecimal digit expected".to_string()))?;
                    v = v * 16 + d;
                    self.bump();
                }
                self.bump();
                push_codepoint(out, v).map_err(|m| self.error(m))?;
            }
            b'0'..=b'9' => {
                let mut v = 0u32;
                let mut n = 0;
                while n < 3 && self.cur().is_ascii_digit() {
                    v = v * 10 + (self.cur() - b'0') as u32;
                    self.bump();
                    n += 1;
                }
                if v > 255 {
                    return Err(self.error("decimal escape too large".to_string()));
                }
                push_codepoint(out, v).map_err(|m| self.error(m))?;
            }
            _ => return Err(self.error(format!("invalid escape sequence '\\{}'", c as char))),
        }
        Ok(())
    }

    // At a '[': count the level of a long bracket opener `[=*[`, without
    // consuming anything when it is a plain bracket.
    fn long_bracket_level(&self) -> Option<usize> {
        let mut i = 1;
        while self.at(i) == b'=' {
            i += 1;
        }
        if self.at(i) == b'[' { Some(i - 1) } else { None }
    }

    fn read_long_string(&mut self, level: usize) -> LuaResult<String> {
        self.pos += level + 2; // opening [=*[
        if matches!(self.cur(), b'\n' | b'\r') {
            self.skip_newline(); // first newline is not part of the string
        }
        let start = self.pos;
        loop {
            if self.is_eof() {
                return Err(self.error("unfinished long string or comment".to_string()));
            }
            match self.cur() {
                b']' => {
                    let mut i = 1;
                    while self.at(i) == b'=' {
                        i += 1;
                    }
                    if i - 1 == level && self.at(i) == b']' {
                        let body = &self.chunk[start..self.pos];
                        self.pos += level + 2;
                        return std::str::from_utf8(body)
                            .map(str::to_string)
                            .map_err(|_| self.error("invalid utf-8 in long string".to_string()));
                    }
                    self.bump();
                }
                b'\n' | b'\r' => self.skip_newline(),
                _ => self.bump(),
            }
        }
    }
}

fn push_codepoint(out: &mut String, v: u32) -> Result<(), String> {
    match char::from_u32(v) {
        Some(c) => {
            out.push(c);
            Ok(())
        }
        None => Err("utf-8 value out of range".to_string()),
    }
}
