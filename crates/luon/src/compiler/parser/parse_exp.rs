// Expression grammar: one function per precedence level, lowest first.
// Constants fold as the tree is built, so `2 * 3` never reaches codegen.

use super::Parser;
use crate::compiler::ast::{Exp, FuncCall};
use crate::compiler::token::{Token, TokenKind};
use crate::lua_value::number;
use crate::lua_vm::LuaResult;

impl<'a> Parser<'a> {
    pub(super) fn parse_exp_list(&mut self) -> LuaResult<Vec<Exp>> {
        let mut exps = vec![self.parse_exp()?];
        while self.lexer.peek_kind()? == TokenKind::SepComma {
            self.lexer.next_token()?;
            exps.push(self.parse_exp()?);
        }
        Ok(exps)
    }

    /// exp ::= exp12 (lowest precedence: `or`).
    pub(super) fn parse_exp(&mut self) -> LuaResult<Exp> {
        self.parse_exp12()
    }

    fn parse_exp12(&mut self) -> LuaResult<Exp> {
        let mut exp = self.parse_exp11()?;
        while self.lexer.peek_kind()? == TokenKind::OpOr {
            let tok = self.lexer.next_token()?;
            exp = fold_or(tok.line, exp, self.parse_exp11()?);
        }
        Ok(exp)
    }

    fn parse_exp11(&mut self) -> LuaResult<Exp> {
        let mut exp = self.parse_exp10()?;
        while self.lexer.peek_kind()? == TokenKind::OpAnd {
            let tok = self.lexer.next_token()?;
            exp = fold_and(tok.line, exp, self.parse_exp10()?);
        }
        Ok(exp)
    }

    // comparisons
    fn parse_exp10(&mut self) -> LuaResult<Exp> {
        let mut exp = self.parse_exp9()?;
        loop {
            match self.lexer.peek_kind()? {
                op @ (TokenKind::OpLt
                | TokenKind::OpGt
                | TokenKind::OpLe
                | TokenKind::OpGe
                | TokenKind::OpEq
                | TokenKind::OpNe) => {
                    let tok = self.lexer.next_token()?;
                    exp = Exp::Binop {
                        line: tok.line,
                        op,
                        lhs: Box::new(exp),
                        rhs: Box::new(self.parse_exp9()?),
                    };
                }
                _ => return Ok(exp),
            }
        }
    }

    fn parse_exp9(&mut self) -> LuaResult<Exp> {
        let mut exp = self.parse_exp8()?;
        while self.lexer.peek_kind()? == TokenKind::OpBOr {
            let tok = self.lexer.next_token()?;
            exp = fold_binop(tok.line, TokenKind::OpBOr, exp, self.parse_exp8()?);
        }
        Ok(exp)
    }

    fn parse_exp8(&mut self) -> LuaResult<Exp> {
        let mut exp = self.parse_exp7()?;
        while self.lexer.peek_kind()? == TokenKind::OpWave {
            let tok = self.lexer.next_token()?;
            exp = fold_binop(tok.line, TokenKind::OpWave, exp, self.parse_exp7()?);
        }
        Ok(exp)
    }

    fn parse_exp7(&mut self) -> LuaResult<Exp> {
        let mut exp = self.parse_exp6()?;
        while self.lexer.peek_kind()? == TokenKind::OpBAnd {
            let tok = self.lexer.next_token()?;
            exp = fold_binop(tok.line, TokenKind::OpBAnd, exp, self.parse_exp6()?);
        }
        Ok(exp)
    }

    fn parse_exp6(&mut self) -> LuaResult<Exp> {
        let mut exp = self.parse_exp5()?;
        loop {
            match self.lexer.peek_kind()? {
                op @ (TokenKind::OpShl | TokenKind::OpShr) => {
                    let tok = self.lexer.next_token()?;
                    exp = fold_binop(tok.line, op, exp, self.parse_exp5()?);
                }
                _ => return Ok(exp),
            }
        }
    }

    // `..` is right-associative; a run of concatenations collapses into one
    // node so codegen can emit a single CONCAT over a register range.
    fn parse_exp5(&mut self) -> LuaResult<Exp> {
        let exp = self.parse_exp4()?;
        if self.lexer.peek_kind()? != TokenKind::OpConcat {
            return Ok(exp);
        }
        let mut line = 0;
        let mut exps = vec![exp];
        while self.lexer.peek_kind()? == TokenKind::OpConcat {
            line = self.lexer.next_token()?.line;
            exps.push(self.parse_exp4()?);
        }
        Ok(Exp::Concat { line, exps })
    }

    fn parse_exp4(&mut self) -> LuaResult<Exp> {
        let mut exp = self.parse_exp3()?;
        loop {
            match self.lexer.peek_kind()? {
                op @ (TokenKind::OpAdd | TokenKind::OpMinus) => {
                    let tok = self.lexer.next_token()?;
                    exp = fold_binop(tok.line, op, exp, self.parse_exp3()?);
                }
                _ => return Ok(exp),
            }
        }
    }

    fn parse_exp3(&mut self) -> LuaResult<Exp> {
        let mut exp = self.parse_exp2()?;
        loop {
            match self.lexer.peek_kind()? {
                op @ (TokenKind::OpMul
                | TokenKind::OpDiv
                | TokenKind::OpIDiv
                | TokenKind::OpMod) => {
                    let tok = self.lexer.next_token()?;
                    exp = fold_binop(tok.line, op, exp, self.parse_exp2()?);
                }
                _ => return Ok(exp),
            }
        }
    }

    // unary operators; `^` on the right binds tighter, so `-x^2` is `-(x^2)`
    fn parse_exp2(&mut self) -> LuaResult<Exp> {
        match self.lexer.peek_kind()? {
            op @ (TokenKind::OpNot
            | TokenKind::OpLen
            | TokenKind::OpMinus
            | TokenKind::OpWave) => {
                let tok = self.lexer.next_token()?;
                let exp = self.parse_exp2()?;
                Ok(fold_unop(tok.line, op, exp))
            }
            _ => self.parse_exp1(),
        }
    }

    fn parse_exp1(&mut self) -> LuaResult<Exp> {
        let exp = self.parse_exp0()?;
        if self.lexer.peek_kind()? == TokenKind::OpPow {
            let tok = self.lexer.next_token()?;
            // right-associative through the unary level
            let rhs = self.parse_exp2()?;
            return Ok(fold_binop(tok.line, TokenKind::OpPow, exp, rhs));
        }
        Ok(exp)
    }

    fn parse_exp0(&mut self) -> LuaResult<Exp> {
        let tok = self.lexer.peek()?.clone();
        match tok.kind {
            TokenKind::Vararg => {
                self.lexer.next_token()?;
                Ok(Exp::Vararg { line: tok.line })
            }
            TokenKind::KwNil => {
                self.lexer.next_token()?;
                Ok(Exp::Nil { line: tok.line })
            }
            TokenKind::KwTrue => {
                self.lexer.next_token()?;
                Ok(Exp::True { line: tok.line })
            }
            TokenKind::KwFalse => {
                self.lexer.next_token()?;
                Ok(Exp::False { line: tok.line })
            }
            TokenKind::Str => {
                self.lexer.next_token()?;
                Ok(Exp::Str {
                    line: tok.line,
                    val: tok.text,
                })
            }
            TokenKind::Int | TokenKind::Float => self.parse_number_exp(),
            TokenKind::SepLcurly => self.parse_table_constructor(),
            TokenKind::KwFunction => {
                self.lexer.next_token()?;
                let fd = self.parse_func_def_body(tok.line)?;
                Ok(Exp::FuncDef(fd))
            }
            _ => self.parse_prefix_exp(),
        }
    }

    fn parse_number_exp(&mut self) -> LuaResult<Exp> {
        let tok = self.lexer.next_token()?;
        let malformed = || {
            self.error_near(
                tok.line,
                &format!("malformed number near '{}'", tok.text),
            )
        };
        match tok.kind {
            TokenKind::Int => match number::parse_integer(&tok.text) {
                Some(val) => Ok(Exp::Integer {
                    line: tok.line,
                    val,
                }),
                // hex literals past 2^64 wrap; oversized decimals read as floats
                None => match number::parse_float(&tok.text) {
                    Some(val) => Ok(Exp::Float {
                        line: tok.line,
                        val,
                    }),
                    None => Err(malformed()),
                },
            },
            _ => match number::parse_float(&tok.text) {
                Some(val) => Ok(Exp::Float {
                    line: tok.line,
                    val,
                }),
                None => Err(malformed()),
            },
        }
    }

    // prefixexp ::= Name | '(' exp ')' | prefixexp '[' exp ']'
    //             | prefixexp '.' Name | prefixexp [':' Name] args
    pub(super) fn parse_prefix_exp(&mut self) -> LuaResult<Exp> {
        let tok = self.lexer.peek()?.clone();
        let mut exp = match tok.kind {
            TokenKind::Identifier => {
                self.lexer.next_token()?;
                Exp::Name {
                    line: tok.line,
                    name: tok.text,
                }
            }
            TokenKind::SepLparen => self.parse_parens_exp()?,
            _ => return Err(self.unexpected(&tok, "unexpected symbol")),
        };

        loop {
            match self.lexer.peek_kind()? {
                TokenKind::SepDot => {
                    self.lexer.next_token()?;
                    let (line, name) = self.check_name()?;
                    exp = Exp::TableAccess {
                        last_line: line,
                        obj: Box::new(exp),
                        key: Box::new(Exp::Str { line, val: name }),
                    };
                }
                TokenKind::SepLbrack => {
                    self.lexer.next_token()?;
                    let key = self.parse_exp()?;
                    let tok = self.lexer.expect(TokenKind::SepRbrack)?;
                    exp = Exp::TableAccess {
                        last_line: tok.line,
                        obj: Box::new(exp),
                        key: Box::new(key),
                    };
                }
                TokenKind::SepColon
                | TokenKind::SepLparen
                | TokenKind::SepLcurly
                | TokenKind::Str => {
                    exp = Exp::FuncCall(self.parse_call(exp)?);
                }
                _ => return Ok(exp),
            }
        }
    }

    // Parentheses matter semantically only around multi-value expressions
    // (calls and `...`), where they truncate to one value; elsewhere the
    // wrapper is dropped here.
    fn parse_parens_exp(&mut self) -> LuaResult<Exp> {
        self.lexer.next_token()?; // (
        let exp = self.parse_exp()?;
        self.lexer.expect(TokenKind::SepRparen)?;
        match exp {
            Exp::Vararg { .. } | Exp::FuncCall(_) | Exp::Name { .. } | Exp::TableAccess { .. } => {
                Ok(Exp::Parens(Box::new(exp)))
            }
            other => Ok(other),
        }
    }

    fn parse_call(&mut self, prefix: Exp) -> LuaResult<FuncCall> {
        let mut name_exp = None;
        let mut line = self.lexer.peek()?.line;
        if self.lexer.peek_kind()? == TokenKind::SepColon {
            self.lexer.next_token()?;
            let (name_line, name) = self.check_name()?;
            name_exp = Some(Box::new(Exp::Str {
                line: name_line,
                val: name,
            }));
            line = name_line;
        }
        let (args, last_line) = self.parse_call_args()?;
        Ok(FuncCall {
            line,
            last_line,
            prefix: Box::new(prefix),
            name_exp,
            args,
        })
    }

    fn parse_call_args(&mut self) -> LuaResult<(Vec<Exp>, u32)> {
        let tok = self.lexer.peek()?.clone();
        match tok.kind {
            TokenKind::SepLparen => {
                self.lexer.next_token()?;
                let args = if self.lexer.peek_kind()? == TokenKind::SepRparen {
                    Vec::new()
                } else {
                    self.parse_exp_list()?
                };
                let close = self.lexer.expect(TokenKind::SepRparen)?;
                Ok((args, close.line))
            }
            // f{...} and f"s" sugar
            TokenKind::SepLcurly => {
                let arg = self.parse_table_constructor()?;
                let last_line = arg.line();
                Ok((vec![arg], last_line))
            }
            TokenKind::Str => {
                self.lexer.next_token()?;
                let arg = Exp::Str {
                    line: tok.line,
                    val: tok.text,
                };
                Ok((vec![arg], tok.line))
            }
            _ => Err(self.unexpected(&tok, "function arguments")),
        }
    }

    fn parse_table_constructor(&mut self) -> LuaResult<Exp> {
        let open = self.lexer.expect(TokenKind::SepLcurly)?;
        let mut key_exps = Vec::new();
        let mut val_exps = Vec::new();
        while self.lexer.peek_kind()? != TokenKind::SepRcurly {
            let (key, val) = self.parse_field()?;
            key_exps.push(key);
            val_exps.push(val);
            match self.lexer.peek_kind()? {
                TokenKind::SepComma | TokenKind::SepSemi => {
                    self.lexer.next_token()?;
                }
                _ => break,
            }
        }
        let close = self.lexer.expect(TokenKind::SepRcurly)?;
        Ok(Exp::TableConstructor {
            line: open.line,
            last_line: close.line,
            key_exps,
            val_exps,
        })
    }

    // field ::= '[' exp ']' '=' exp | Name '=' exp | exp
    fn parse_field(&mut self) -> LuaResult<(Option<Exp>, Exp)> {
        if self.lexer.peek_kind()? == TokenKind::SepLbrack {
            self.lexer.next_token()?;
            let key = self.parse_exp()?;
            self.lexer.expect(TokenKind::SepRbrack)?;
            self.lexer.expect(TokenKind::OpAssign)?;
            let val = self.parse_exp()?;
            return Ok((Some(key), val));
        }
        // `Name =` needs two tokens of lookahead; probe by parsing the
        // expression and rewriting when it was a bare name before '='.
        let exp = self.parse_exp()?;
        if self.lexer.peek_kind()? == TokenKind::OpAssign {
            if let Exp::Name { line, name } = exp {
                self.lexer.next_token()?;
                let val = self.parse_exp()?;
                return Ok((Some(Exp::Str { line, val: name }), val));
            }
            let tok: Token = self.lexer.peek()?.clone();
            return Err(self.unexpected(&tok, "'}'"));
        }
        Ok((None, exp))
    }
}

// ---- constant folding ----

fn numeral(exp: &Exp) -> Option<NumConst> {
    match exp {
        Exp::Integer { val, .. } => Some(NumConst::Int(*val)),
        Exp::Float { val, .. } => Some(NumConst::Float(*val)),
        _ => None,
    }
}

#[derive(Clone, Copy)]
enum NumConst {
    Int(i64),
    Float(f64),
}

impl NumConst {
    fn as_float(self) -> f64 {
        match self {
            NumConst::Int(i) => i as f64,
            NumConst::Float(f) => f,
        }
    }

    fn as_int(self) -> Option<i64> {
        match self {
            NumConst::Int(i) => Some(i),
            NumConst::Float(f) => number::float_to_integer(f),
        }
    }
}

// Only side-effect-free constants short-circuit at parse time; anything
// else keeps the full and/or evaluation for runtime.
fn is_simple_const(exp: &Exp) -> bool {
    matches!(
        exp,
        Exp::Nil { .. }
            | Exp::True { .. }
            | Exp::False { .. }
            | Exp::Integer { .. }
            | Exp::Float { .. }
            | Exp::Str { .. }
    )
}

fn const_truthy(exp: &Exp) -> bool {
    !matches!(exp, Exp::Nil { .. } | Exp::False { .. })
}

fn fold_and(line: u32, lhs: Exp, rhs: Exp) -> Exp {
    if is_simple_const(&lhs) {
        return if const_truthy(&lhs) { rhs } else { lhs };
    }
    Exp::Binop {
        line,
        op: TokenKind::OpAnd,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn fold_or(line: u32, lhs: Exp, rhs: Exp) -> Exp {
    if is_simple_const(&lhs) {
        return if const_truthy(&lhs) { lhs } else { rhs };
    }
    Exp::Binop {
        line,
        op: TokenKind::OpOr,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

pub(super) fn fold_unop(line: u32, op: TokenKind, exp: Exp) -> Exp {
    match op {
        TokenKind::OpMinus => match &exp {
            Exp::Integer { val, .. } => {
                return Exp::Integer {
                    line,
                    val: val.wrapping_neg(),
                };
            }
            Exp::Float { val, .. } => return Exp::Float { line, val: -val },
            _ => {}
        },
        TokenKind::OpWave => {
            if let Some(i) = numeral(&exp).and_then(NumConst::as_int) {
                return Exp::Integer { line, val: !i };
            }
        }
        TokenKind::OpNot => {
            if is_simple_const(&exp) {
                return if const_truthy(&exp) {
                    Exp::False { line }
                } else {
                    Exp::True { line }
                };
            }
        }
        _ => {}
    }
    Exp::Unop {
        line,
        op,
        exp: Box::new(exp),
    }
}

fn fold_binop(line: u32, op: TokenKind, lhs: Exp, rhs: Exp) -> Exp {
    if let (Some(a), Some(b)) = (numeral(&lhs), numeral(&rhs)) {
        if let Some(folded) = fold_arith(line, op, a, b) {
            return folded;
        }
    }
    Exp::Binop {
        line,
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn fold_arith(line: u32, op: TokenKind, a: NumConst, b: NumConst) -> Option<Exp> {
    use NumConst::{Float, Int};
    let int = |val: i64| Some(Exp::Integer { line, val });
    let float = |val: f64| Some(Exp::Float { line, val });
    match op {
        TokenKind::OpAdd => match (a, b) {
            (Int(x), Int(y)) => int(x.wrapping_add(y)),
            _ => float(a.as_float() + b.as_float()),
        },
        TokenKind::OpMinus => match (a, b) {
            (Int(x), Int(y)) => int(x.wrapping_sub(y)),
            _ => float(a.as_float() - b.as_float()),
        },
        TokenKind::OpMul => match (a, b) {
            (Int(x), Int(y)) => int(x.wrapping_mul(y)),
            _ => float(a.as_float() * b.as_float()),
        },
        // integer division by zero is a runtime fault, not a fold
        TokenKind::OpIDiv => match (a, b) {
            (Int(_), Int(0)) => None,
            (Int(x), Int(y)) => int(number::i_floor_div(x, y)),
            _ => float(number::f_floor_div(a.as_float(), b.as_float())),
        },
        TokenKind::OpMod => match (a, b) {
            (Int(_), Int(0)) => None,
            (Int(x), Int(y)) => int(number::i_mod(x, y)),
            _ => float(number::f_mod(a.as_float(), b.as_float())),
        },
        // `/` and `^` always work on floats
        TokenKind::OpDiv => float(a.as_float() / b.as_float()),
        TokenKind::OpPow => float(a.as_float().powf(b.as_float())),
        TokenKind::OpBAnd => int(a.as_int()? & b.as_int()?),
        TokenKind::OpBOr => int(a.as_int()? | b.as_int()?),
        TokenKind::OpWave => int(a.as_int()? ^ b.as_int()?),
        TokenKind::OpShl => int(number::shift_left(a.as_int()?, b.as_int()?)),
        TokenKind::OpShr => int(number::shift_right(a.as_int()?, b.as_int()?)),
        _ => None,
    }
}
