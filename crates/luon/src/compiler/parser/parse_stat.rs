// Statement grammar.

use smol_str::SmolStr;

use super::Parser;
use crate::compiler::ast::{Block, Exp, FuncDef, Stat};
use crate::compiler::token::TokenKind;
use crate::lua_vm::LuaResult;

impl<'a> Parser<'a> {
    pub(super) fn parse_stat(&mut self) -> LuaResult<Stat> {
        match self.lexer.peek_kind()? {
            TokenKind::SepSemi => {
                self.lexer.next_token()?;
                Ok(Stat::Empty)
            }
            TokenKind::KwBreak => {
                let tok = self.lexer.next_token()?;
                Ok(Stat::Break { line: tok.line })
            }
            TokenKind::SepLabel => self.parse_label_stat(),
            TokenKind::KwGoto => {
                let tok = self.lexer.next_token()?;
                let (_, name) = self.check_name()?;
                Ok(Stat::Goto {
                    name,
                    line: tok.line,
                })
            }
            TokenKind::KwDo => {
                self.lexer.next_token()?;
                let block = self.parse_block()?;
                self.lexer.expect(TokenKind::KwEnd)?;
                Ok(Stat::Do {
                    block: Box::new(block),
                })
            }
            TokenKind::KwWhile => self.parse_while_stat(),
            TokenKind::KwRepeat => self.parse_repeat_stat(),
            TokenKind::KwIf => self.parse_if_stat(),
            TokenKind::KwFor => self.parse_for_stat(),
            TokenKind::KwFunction => self.parse_func_def_stat(),
            TokenKind::KwLocal => self.parse_local_stat(),
            _ => self.parse_assign_or_call_stat(),
        }
    }

    fn parse_label_stat(&mut self) -> LuaResult<Stat> {
        self.lexer.next_token()?; // ::
        let (line, name) = self.check_name()?;
        self.lexer.expect(TokenKind::SepLabel)?;
        Ok(Stat::Label { name, line })
    }

    fn parse_while_stat(&mut self) -> LuaResult<Stat> {
        self.lexer.next_token()?; // while
        let exp = self.parse_exp()?;
        self.lexer.expect(TokenKind::KwDo)?;
        let block = self.parse_block()?;
        self.lexer.expect(TokenKind::KwEnd)?;
        Ok(Stat::While {
            exp,
            block: Box::new(block),
        })
    }

    fn parse_repeat_stat(&mut self) -> LuaResult<Stat> {
        self.lexer.next_token()?; // repeat
        let block = self.parse_block()?;
        self.lexer.expect(TokenKind::KwUntil)?;
        let exp = self.parse_exp()?;
        Ok(Stat::Repeat {
            block: Box::new(block),
            exp,
        })
    }

    // elseif arms flatten into parallel (condition, block) lists; a plain
    // `else` contributes a `true` condition.
    fn parse_if_stat(&mut self) -> LuaResult<Stat> {
        let mut exps = Vec::new();
        let mut blocks = Vec::new();

        self.lexer.next_token()?; // if
        exps.push(self.parse_exp()?);
        self.lexer.expect(TokenKind::KwThen)?;
        blocks.push(self.parse_block()?);

        loop {
            match self.lexer.peek_kind()? {
                TokenKind::KwElseif => {
                    self.lexer.next_token()?;
                    exps.push(self.parse_exp()?);
                    self.lexer.expect(TokenKind::KwThen)?;
                    blocks.push(self.parse_block()?);
                }
                TokenKind::KwElse => {
                    let tok = self.lexer.next_token()?;
                    exps.push(Exp::True { line: tok.line });
                    blocks.push(self.parse_block()?);
                    break;
                }
                _ => break,
            }
        }
        self.lexer.expect(TokenKind::KwEnd)?;
        Ok(Stat::If { exps, blocks })
    }

    fn parse_for_stat(&mut self) -> LuaResult<Stat> {
        let for_tok = self.lexer.next_token()?; // for
        let (_, name) = self.check_name()?;
        if self.lexer.peek_kind()? == TokenKind::OpAssign {
            self.parse_for_num_stat(for_tok.line, name)
        } else {
            self.parse_for_in_stat(name)
        }
    }

    fn parse_for_num_stat(&mut self, line_of_for: u32, var_name: SmolStr) -> LuaResult<Stat> {
        self.lexer.next_token()?; // =
        let init = self.parse_exp()?;
        self.lexer.expect(TokenKind::SepComma)?;
        let limit = self.parse_exp()?;
        let step = if self.lexer.peek_kind()? == TokenKind::SepComma {
            self.lexer.next_token()?;
            self.parse_exp()?
        } else {
            Exp::Integer {
                line: line_of_for,
                val: 1,
            }
        };
        let do_tok = self.lexer.expect(TokenKind::KwDo)?;
        let block = self.parse_block()?;
        self.lexer.expect(TokenKind::KwEnd)?;
        Ok(Stat::ForNum {
            line_of_for,
            line_of_do: do_tok.line,
            var_name,
            init,
            limit,
            step,
            block: Box::new(block),
        })
    }

    fn parse_for_in_stat(&mut self, first_name: SmolStr) -> LuaResult<Stat> {
        let mut name_list = vec![first_name];
        while self.lexer.peek_kind()? == TokenKind::SepComma {
            self.lexer.next_token()?;
            let (_, name) = self.check_name()?;
            name_list.push(name);
        }
        self.lexer.expect(TokenKind::KwIn)?;
        let exp_list = self.parse_exp_list()?;
        let do_tok = self.lexer.expect(TokenKind::KwDo)?;
        let block = self.parse_block()?;
        self.lexer.expect(TokenKind::KwEnd)?;
        Ok(Stat::ForIn {
            line_of_do: do_tok.line,
            name_list,
            exp_list,
            block: Box::new(block),
        })
    }

    // `function a.b.c:m(...) end` desugars to an assignment of a function
    // expression; method form prepends the implicit `self` parameter.
    fn parse_func_def_stat(&mut self) -> LuaResult<Stat> {
        self.lexer.next_token()?; // function
        let (var, is_method, last_line) = self.parse_func_name()?;
        let mut fd = self.parse_func_def_body(last_line)?;
        if is_method {
            fd.par_list.insert(0, SmolStr::new("self"));
        }
        Ok(Stat::Assign {
            last_line: fd.last_line,
            var_list: vec![var],
            exp_list: vec![Exp::FuncDef(fd)],
        })
    }

    fn parse_func_name(&mut self) -> LuaResult<(Exp, bool, u32)> {
        let (line, name) = self.check_name()?;
        let mut exp = Exp::Name { line, name };
        let mut last_line = line;
        while self.lexer.peek_kind()? == TokenKind::SepDot {
            self.lexer.next_token()?;
            let (line, name) = self.check_name()?;
            last_line = line;
            exp = Exp::TableAccess {
                last_line: line,
                obj: Box::new(exp),
                key: Box::new(Exp::Str { line, val: name }),
            };
        }
        let mut is_method = false;
        if self.lexer.peek_kind()? == TokenKind::SepColon {
            self.lexer.next_token()?;
            let (line, name) = self.check_name()?;
            last_line = line;
            is_method = true;
            exp = Exp::TableAccess {
                last_line: line,
                obj: Box::new(exp),
                key: Box::new(Exp::Str { line, val: name }),
            };
        }
        Ok((exp, is_method, last_line))
    }

    /// Parameter list and body; the `function` keyword (and any name) has
    /// already been consumed.
    pub(super) fn parse_func_def_body(&mut self, line: u32) -> LuaResult<FuncDef> {
        self.lexer.expect(TokenKind::SepLparen)?;
        let (par_list, is_vararg) = self.parse_par_list()?;
        self.lexer.expect(TokenKind::SepRparen)?;
        let block = self.parse_block()?;
        let end_tok = self.lexer.expect(TokenKind::KwEnd)?;
        Ok(FuncDef {
            line,
            last_line: end_tok.line,
            par_list,
            is_vararg,
            block: Box::new(block),
        })
    }

    fn parse_par_list(&mut self) -> LuaResult<(Vec<SmolStr>, bool)> {
        let mut params = Vec::new();
        match self.lexer.peek_kind()? {
            TokenKind::SepRparen => return Ok((params, false)),
            TokenKind::Vararg => {
                self.lexer.next_token()?;
                return Ok((params, true));
            }
            _ => {}
        }
        loop {
            let (_, name) = self.check_name()?;
            params.push(name);
            if self.lexer.peek_kind()? != TokenKind::SepComma {
                return Ok((params, false));
            }
            self.lexer.next_token()?;
            if self.lexer.peek_kind()? == TokenKind::Vararg {
                self.lexer.next_token()?;
                return Ok((params, true));
            }
        }
    }

    fn parse_local_stat(&mut self) -> LuaResult<Stat> {
        self.lexer.next_token()?; // local
        if self.lexer.peek_kind()? == TokenKind::KwFunction {
            let tok = self.lexer.next_token()?;
            let (_, name) = self.check_name()?;
            let fd = self.parse_func_def_body(tok.line)?;
            return Ok(Stat::LocalFuncDef {
                name,
                exp: Exp::FuncDef(fd),
            });
        }
        let (_, first) = self.check_name()?;
        let mut name_list = vec![first];
        while self.lexer.peek_kind()? == TokenKind::SepComma {
            self.lexer.next_token()?;
            let (_, name) = self.check_name()?;
            name_list.push(name);
        }
        let mut exp_list = Vec::new();
        if self.lexer.peek_kind()? == TokenKind::OpAssign {
            self.lexer.next_token()?;
            exp_list = self.parse_exp_list()?;
        }
        let last_line = self.lexer.peek()?.line;
        Ok(Stat::LocalVarDecl {
            last_line,
            name_list,
            exp_list,
        })
    }

    // A statement starting with an expression is either a call or the first
    // target of an assignment.
    fn parse_assign_or_call_stat(&mut self) -> LuaResult<Stat> {
        let line = self.lexer.peek()?.line;
        let exp = self.parse_prefix_exp()?;
        match self.lexer.peek_kind()? {
            TokenKind::OpAssign | TokenKind::SepComma => self.parse_assign_stat(exp),
            _ => match exp {
                Exp::FuncCall(fc) => Ok(Stat::FuncCall(fc)),
                _ => Err(self.error_near(line, "syntax error")),
            },
        }
    }

    fn parse_assign_stat(&mut self, first: Exp) -> LuaResult<Stat> {
        let mut var_list = vec![self.check_var(first)?];
        while self.lexer.peek_kind()? == TokenKind::SepComma {
            self.lexer.next_token()?;
            let exp = self.parse_prefix_exp()?;
            var_list.push(self.check_var(exp)?);
        }
        self.lexer.expect(TokenKind::OpAssign)?;
        let exp_list = self.parse_exp_list()?;
        let last_line = self.lexer.peek()?.line;
        Ok(Stat::Assign {
            last_line,
            var_list,
            exp_list,
        })
    }

    fn check_var(&self, exp: Exp) -> LuaResult<Exp> {
        match exp {
            Exp::Name { .. } | Exp::TableAccess { .. } => Ok(exp),
            other => Err(self.error_near(other.line(), "syntax error")),
        }
    }
}
