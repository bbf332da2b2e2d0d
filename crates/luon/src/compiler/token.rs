use smol_str::SmolStr;

/// Token kinds. Operator tokens double as the operator tags in the AST, so
/// the parser and code generator share one vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Eof,
    Vararg,   // ...
    SepSemi,  // ;
    SepComma, // ,
    SepDot,   // .
    SepColon, // :
    SepLabel, // ::
    SepLparen,
    SepRparen,
    SepLbrack,
    SepRbrack,
    SepLcurly,
    SepRcurly,
    OpAssign, // =
    OpMinus,  // - (binary or unary)
    OpWave,   // ~ (bxor or bnot)
    OpAdd,
    OpMul,
    OpDiv,
    OpIDiv,
    OpPow,
    OpMod,
    OpBAnd,
    OpBOr,
    OpShr,
    OpShl,
    OpConcat,
    OpLt,
    OpLe,
    OpGt,
    OpGe,
    OpEq,
    OpNe,
    OpLen, // # (unary)
    OpAnd,
    OpOr,
    OpNot,
    KwBreak,
    KwDo,
    KwElse,
    KwElseif,
    KwEnd,
    KwFalse,
    KwFor,
    KwFunction,
    KwGoto,
    KwIf,
    KwIn,
    KwLocal,
    KwNil,
    KwRepeat,
    KwReturn,
    KwThen,
    KwTrue,
    KwUntil,
    KwWhile,
    Identifier,
    Int,
    Float,
    Str,
}

impl TokenKind {
    pub fn keyword(name: &str) -> Option<TokenKind> {
        Some(match name {
            "and" => TokenKind::OpAnd,
            "break" => TokenKind::KwBreak,
            "do" => TokenKind::KwDo,
            "else" => TokenKind::KwElse,
            "elseif" => TokenKind::KwElseif,
            "end" => TokenKind::KwEnd,
            "false" => TokenKind::KwFalse,
            "for" => TokenKind::KwFor,
            "function" => TokenKind::KwFunction,
            "goto" => TokenKind::KwGoto,
            "if" => TokenKind::KwIf,
            "in" => TokenKind::KwIn,
            "local" => TokenKind::KwLocal,
            "nil" => TokenKind::KwNil,
            "not" => TokenKind::OpNot,
            "or" => TokenKind::OpOr,
            "repeat" => TokenKind::KwRepeat,
            "return" => TokenKind::KwReturn,
            "then" => TokenKind::KwThen,
            "true" => TokenKind::KwTrue,
            "until" => TokenKind::KwUntil,
            "while" => TokenKind::KwWhile,
            _ => return None,
        })
    }

    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Eof => "<eof>",
            TokenKind::Vararg => "'...'",
            TokenKind::SepSemi => "';'",
            TokenKind::SepComma => "','",
            TokenKind::SepDot => "'.'",
            TokenKind::SepColon => "':'",
            TokenKind::SepLabel => "'::'",
            TokenKind::SepLparen => "'('",
            TokenKind::SepRparen => "')'",
            TokenKind::SepLbrack => "'['",
            TokenKind::SepRbrack => "']'",
            TokenKind::SepLcurly => "'{'",
            TokenKind::SepRcurly => "'}'",
            TokenKind::OpAssign => "'='",
            TokenKind::KwDo => "'do'",
            TokenKind::KwEnd => "'end'",
            TokenKind::KwThen => "'then'",
            TokenKind::KwUntil => "'until'",
            TokenKind::KwIn => "'in'",
            TokenKind::Identifier => "<name>",
            TokenKind::Int | TokenKind::Float => "<number>",
            TokenKind::Str => "<string>",
            _ => "operator",
        }
    }
}

/// One token: kind, source line, and its text. Numeric and string payloads
/// are carried in `text` (strings already have escapes processed).
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub text: SmolStr,
}
