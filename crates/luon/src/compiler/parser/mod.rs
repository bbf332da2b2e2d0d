// Recursive-descent parser producing the AST consumed by the code
// generator. Constant folding happens here, on the way up.

mod parse_exp;
mod parse_stat;

use smol_str::SmolStr;

use super::ast::Block;
use super::lexer::Lexer;
use super::token::{Token, TokenKind};
use crate::lua_vm::{LuaError, LuaResult};

pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

/// Parse a whole chunk. The chunk body is a block running to end of input.
pub fn parse(source: &str) -> LuaResult<Block> {
    let mut parser = Parser {
        lexer: Lexer::new(source),
    };
    let block = parser.parse_block()?;
    let (kind, line) = {
        let tok = parser.lexer.peek()?;
        (tok.kind, tok.line)
    };
    if kind != TokenKind::Eof {
        return Err(parser.error_near(line, "'<eof>' expected"));
    }
    Ok(block)
}

impl<'a> Parser<'a> {
    fn error_near(&self, line: u32, message: &str) -> LuaError {
        LuaError::Parse {
            line,
            message: message.to_string(),
        }
    }

    fn unexpected(&self, tok: &Token, expected: &str) -> LuaError {
        let near = if tok.kind == TokenKind::Eof {
            "<eof>".to_string()
        } else {
            tok.text.to_string()
        };
        LuaError::Parse {
            line: tok.line,
            message: format!("{expected} expected near '{near}'"),
        }
    }

    /// Consume an identifier, returning its line and name.
    fn check_name(&mut self) -> LuaResult<(u32, SmolStr)> {
        let tok = self.lexer.next_token()?;
        if tok.kind != TokenKind::Identifier {
            return Err(self.unexpected(&tok, "<name>"));
        }
        Ok((tok.line, tok.text))
    }

    fn is_block_end(kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Eof
                | TokenKind::KwEnd
                | TokenKind::KwElse
                | TokenKind::KwElseif
                | TokenKind::KwUntil
        )
    }

    pub(super) fn parse_block(&mut self) -> LuaResult<Block> {
        let mut stats = Vec::new();
        loop {
            let kind = self.lexer.peek_kind()?;
            if Self::is_block_end(kind) || kind == TokenKind::KwReturn {
                break;
            }
            let stat = self.parse_stat()?;
            if !matches!(stat, super::ast::Stat::Empty) {
                stats.push(stat);
            }
        }
        let ret_exps = if self.lexer.peek_kind()? == TokenKind::KwReturn {
            Some(self.parse_ret_exps()?)
        } else {
            None
        };
        let last_line = self.lexer.peek()?.line;
        Ok(Block {
            stats,
            ret_exps,
            last_line,
        })
    }

    // `return` closes the block; only a ';' may follow the expression list.
    fn parse_ret_exps(&mut self) -> LuaResult<Vec<super::ast::Exp>> {
        self.lexer.next_token()?; // return
        let kind = self.lexer.peek_kind()?;
        if Self::is_block_end(kind) {
            return Ok(Vec::new());
        }
        if kind == TokenKind::SepSemi {
            self.lexer.next_token()?;
            return Ok(Vec::new());
        }
        let exps = self.parse_exp_list()?;
        if self.lexer.peek_kind()? == TokenKind::SepSemi {
            self.lexer.next_token()?;
        }
        Ok(exps)
    }
}
