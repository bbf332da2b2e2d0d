// LuaValue - the runtime value model as a closed sum type.
// Integers and floats are distinct variants with explicit coercion rules;
// reference types (string body excepted) compare by identity.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use super::closure::Closure;
use super::lua_table::LuaTable;
use super::number;
use crate::lua_vm::LuaState;

pub type TableRef = Rc<RefCell<LuaTable>>;
pub type ThreadRef = Rc<LuaThread>;

/// A coroutine handle: the execution state behind a `RefCell` plus the
/// status kept outside it, so status stays readable while the coroutine
/// is borrowed and running.
pub struct LuaThread {
    pub state: RefCell<LuaState>,
    pub status: std::cell::Cell<CoStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoStatus {
    Suspended,
    Running,
    Normal,
    Dead,
}

impl CoStatus {
    pub fn name(self) -> &'static str {
        match self {
            CoStatus::Suspended => "suspended",
            CoStatus::Running => "running",
            CoStatus::Normal => "normal",
            CoStatus::Dead => "dead",
        }
    }
}

/// Opaque host-provided data with an optional metatable. The core never
/// looks inside; embedders downcast `data` themselves.
pub struct LuaUserData {
    pub data: RefCell<Box<dyn std::any::Any>>,
    pub meta: RefCell<Option<TableRef>>,
}

#[derive(Clone, Default)]
pub enum LuaValue {
    #[default]
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Str(Rc<str>),
    Table(TableRef),
    Function(Rc<Closure>),
    UserData(Rc<LuaUserData>),
    Thread(ThreadRef),
}

impl LuaValue {
    pub fn from_string(s: impl AsRef<str>) -> LuaValue {
        LuaValue::Str(Rc::from(s.as_ref()))
    }

    pub fn new_table() -> LuaValue {
        LuaValue::Table(Rc::new(RefCell::new(LuaTable::new(0, 0))))
    }

    /// Everything except `nil` and `false` is truthy.
    #[inline]
    pub fn truthy(&self) -> bool {
        !matches!(self, LuaValue::Nil | LuaValue::Boolean(false))
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, LuaValue::Nil)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            LuaValue::Nil => "nil",
            LuaValue::Boolean(_) => "boolean",
            LuaValue::Integer(_) | LuaValue::Float(_) => "number",
            LuaValue::Str(_) => "string",
            LuaValue::Table(_) => "table",
            LuaValue::Function(_) => "function",
            LuaValue::UserData(_) => "userdata",
            LuaValue::Thread(_) => "thread",
        }
    }

    /// Numeric coercion for arithmetic: numbers pass through, numeric
    /// strings are converted, everything else fails.
    pub fn to_float(&self) -> Option<f64> {
        match self {
            LuaValue::Integer(i) => Some(*i as f64),
            LuaValue::Float(f) => Some(*f),
            LuaValue::Str(s) => number::str_to_float(s),
            _ => None,
        }
    }

    /// Integer coercion: floats must have an exact integer representation.
    pub fn to_integer(&self) -> Option<i64> {
        match self {
            LuaValue::Integer(i) => Some(*i),
            LuaValue::Float(f) => number::float_to_integer(*f),
            LuaValue::Str(s) => number::str_to_integer(s),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&TableRef> {
        match self {
            LuaValue::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            LuaValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

// Raw (metamethod-free) equality. Integer/float pairs compare numerically,
// like `1 == 1.0` in Lua; reference types compare by identity.
impl PartialEq for LuaValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LuaValue::Nil, LuaValue::Nil) => true,
            (LuaValue::Boolean(a), LuaValue::Boolean(b)) => a == b,
            (LuaValue::Integer(a), LuaValue::Integer(b)) => a == b,
            (LuaValue::Float(a), LuaValue::Float(b)) => a == b,
            (LuaValue::Integer(a), LuaValue::Float(b)) => *a as f64 == *b,
            (LuaValue::Float(a), LuaValue::Integer(b)) => *a == *b as f64,
            (LuaValue::Str(a), LuaValue::Str(b)) => a == b,
            (LuaValue::Table(a), LuaValue::Table(b)) => Rc::ptr_eq(a, b),
            (LuaValue::Function(a), LuaValue::Function(b)) => Rc::ptr_eq(a, b),
            (LuaValue::UserData(a), LuaValue::UserData(b)) => Rc::ptr_eq(a, b),
            (LuaValue::Thread(a), LuaValue::Thread(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for LuaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LuaValue::Nil => write!(f, "nil"),
            LuaValue::Boolean(b) => write!(f, "{b}"),
            LuaValue::Integer(i) => write!(f, "{}", number::format_integer(*i)),
            LuaValue::Float(n) => write!(f, "{}", number::format_float(*n)),
            LuaValue::Str(s) => write!(f, "{s}"),
            LuaValue::Table(t) => write!(f, "table: {:p}", Rc::as_ptr(t)),
            LuaValue::Function(c) => write!(f, "function: {:p}", Rc::as_ptr(c)),
            LuaValue::UserData(u) => write!(f, "userdata: {:p}", Rc::as_ptr(u)),
            LuaValue::Thread(t) => write!(f, "thread: {:p}", Rc::as_ptr(t)),
        }
    }
}

impl fmt::Debug for LuaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LuaValue::Str(s) => write!(f, "{s:?}"),
            other => write!(f, "{other}"),
        }
    }
}

/// Table key wrapper: hashable view of a LuaValue. Float keys with an
/// integral value are normalized to integers before wrapping, so
/// `t[2.0]` and `t[2]` name the same slot.
#[derive(Clone, Debug)]
pub struct LuaKey(pub LuaValue);

impl LuaKey {
    /// Normalize a value into key form. `nil` and NaN are not valid keys;
    /// the table layer rejects them before building a `LuaKey`.
    pub fn normalize(v: LuaValue) -> LuaValue {
        match v {
            LuaValue::Float(f) => match number::float_to_integer(f) {
                Some(i) => LuaValue::Integer(i),
                None => LuaValue::Float(f),
            },
            other => other,
        }
    }
}

impl PartialEq for LuaKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for LuaKey {}

impl Hash for LuaKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.0 {
            LuaValue::Nil => 0u8.hash(state),
            LuaValue::Boolean(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            LuaValue::Integer(i) => {
                2u8.hash(state);
                i.hash(state);
            }
            // Only non-integral floats reach here (normalize() rewrites the
            // rest), so integer/float cross-equality cannot break hashing.
            LuaValue::Float(f) => {
                3u8.hash(state);
                f.to_bits().hash(state);
            }
            LuaValue::Str(s) => {
                4u8.hash(state);
                s.as_bytes().hash(state);
            }
            LuaValue::Table(t) => {
                5u8.hash(state);
                (Rc::as_ptr(t) as usize).hash(state);
            }
            LuaValue::Function(c) => {
                6u8.hash(state);
                (Rc::as_ptr(c) as usize).hash(state);
            }
            LuaValue::UserData(u) => {
                7u8.hash(state);
                (Rc::as_ptr(u) as usize).hash(state);
            }
            LuaValue::Thread(t) => {
                8u8.hash(state);
                (Rc::as_ptr(t) as usize).hash(state);
            }
        }
    }
}
