// Abstract syntax. Operator nodes reuse `TokenKind` as their tag so the
// parser and code generator share one operator vocabulary.

use smol_str::SmolStr;

use super::token::TokenKind;

#[derive(Debug)]
pub struct Block {
    pub stats: Vec<Stat>,
    pub ret_exps: Option<Vec<Exp>>,
    pub last_line: u32,
}

#[derive(Debug)]
pub enum Stat {
    Empty,
    Break {
        line: u32,
    },
    Label {
        name: SmolStr,
        line: u32,
    },
    Goto {
        name: SmolStr,
        line: u32,
    },
    Do {
        block: Box<Block>,
    },
    While {
        exp: Exp,
        block: Box<Block>,
    },
    Repeat {
        block: Box<Block>,
        exp: Exp,
    },
    /// `if` with its `elseif` arms flattened: one condition per block, and a
    /// trailing `else` becomes a final `true` condition.
    If {
        exps: Vec<Exp>,
        blocks: Vec<Block>,
    },
    ForNum {
        line_of_for: u32,
        line_of_do: u32,
        var_name: SmolStr,
        init: Exp,
        limit: Exp,
        step: Exp,
        block: Box<Block>,
    },
    ForIn {
        line_of_do: u32,
        name_list: Vec<SmolStr>,
        exp_list: Vec<Exp>,
        block: Box<Block>,
    },
    LocalVarDecl {
        last_line: u32,
        name_list: Vec<SmolStr>,
        exp_list: Vec<Exp>,
    },
    Assign {
        last_line: u32,
        var_list: Vec<Exp>,
        exp_list: Vec<Exp>,
    },
    LocalFuncDef {
        name: SmolStr,
        exp: Exp,
    },
    FuncCall(FuncCall),
}

#[derive(Debug)]
pub enum Exp {
    Nil {
        line: u32,
    },
    True {
        line: u32,
    },
    False {
        line: u32,
    },
    Vararg {
        line: u32,
    },
    Integer {
        line: u32,
        val: i64,
    },
    Float {
        line: u32,
        val: f64,
    },
    Str {
        line: u32,
        val: SmolStr,
    },
    Name {
        line: u32,
        name: SmolStr,
    },
    Unop {
        line: u32,
        op: TokenKind,
        exp: Box<Exp>,
    },
    Binop {
        line: u32,
        op: TokenKind,
        lhs: Box<Exp>,
        rhs: Box<Exp>,
    },
    /// `a .. b .. c` is right-associative and generates one CONCAT over a
    /// register run, so adjacent concatenations are collected into one node.
    Concat {
        line: u32,
        exps: Vec<Exp>,
    },
    TableConstructor {
        line: u32,
        last_line: u32,
        /// One entry per field: `None` for list-style fields, `Some(key)`
        /// for `[k] = v` and `name = v` fields.
        key_exps: Vec<Option<Exp>>,
        val_exps: Vec<Exp>,
    },
    FuncDef(FuncDef),
    /// Kept in the tree only around varargs and calls, where it truncates
    /// a multi-value expression to exactly one value.
    Parens(Box<Exp>),
    TableAccess {
        last_line: u32,
        obj: Box<Exp>,
        key: Box<Exp>,
    },
    FuncCall(FuncCall),
}

#[derive(Debug)]
pub struct FuncDef {
    pub line: u32,
    pub last_line: u32,
    pub par_list: Vec<SmolStr>,
    pub is_vararg: bool,
    pub block: Box<Block>,
}

#[derive(Debug)]
pub struct FuncCall {
    pub line: u32,
    pub last_line: u32,
    pub prefix: Box<Exp>,
    /// Method name for `obj:m(...)` calls, always a `Str` expression.
    pub name_exp: Option<Box<Exp>>,
    pub args: Vec<Exp>,
}

impl Exp {
    pub fn line(&self) -> u32 {
        match self {
            Exp::Nil { line }
            | Exp::True { line }
            | Exp::False { line }
            | Exp::Vararg { line }
            | Exp::Integer { line, .. }
            | Exp::Float { line, .. }
            | Exp::Str { line, .. }
            | Exp::Name { line, .. }
            | Exp::Unop { line, .. }
            | Exp::Binop { line, .. }
            | Exp::Concat { line, .. }
            | Exp::TableConstructor { line, .. } => *line,
            Exp::FuncDef(fd) => fd.line,
            Exp::Parens(e) => e.line(),
            Exp::TableAccess { last_line, .. } => *last_line,
            Exp::FuncCall(fc) => fc.line,
        }
    }
}
