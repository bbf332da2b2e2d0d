// Metatable dispatch: index/newindex chains, arithmetic and comparison
// fallbacks, concatenation and length.

use crate::lua_value::{LuaValue, TableRef, number};
use crate::lua_vm::lua_state::LuaState;
use crate::lua_vm::{LuaResult, OpCode};

/// Longest `__index`/`__newindex` chain walked before giving up.
const MAX_META_DEPTH: usize = 100;

pub fn raw_metatable(v: &LuaValue) -> Option<TableRef> {
    match v {
        LuaValue::Table(t) => t.borrow().metatable(),
        LuaValue::UserData(u) => u.meta.borrow().clone(),
        _ => None,
    }
}

pub fn get_metamethod(v: &LuaValue, name: &str) -> LuaValue {
    match raw_metatable(v) {
        Some(mt) => mt.borrow().get(&LuaValue::from_string(name)),
        None => LuaValue::Nil,
    }
}

// ---- indexing ----

pub fn table_get(state: &mut LuaState, obj: &LuaValue, key: &LuaValue) -> LuaResult<LuaValue> {
    let mut cur = obj.clone();
    for _ in 0..MAX_META_DEPTH {
        if let LuaValue::Table(t) = &cur {
            let raw = t.borrow().get(key);
            if !raw.is_nil() {
                return Ok(raw);
            }
            let mm = get_metamethod(&cur, "__index");
            if mm.is_nil() {
                return Ok(LuaValue::Nil);
            }
            if matches!(mm, LuaValue::Function(_)) {
                return state.call_meta(mm, vec![cur, key.clone()]);
            }
            cur = mm;
            continue;
        }
        let mm = get_metamethod(&cur, "__index");
        if mm.is_nil() {
            return Err(state.runtime_error(format!(
                "attempt to index a {} value",
                cur.type_name()
            )));
        }
        if matches!(mm, LuaValue::Function(_)) {
            return state.call_meta(mm, vec![cur, key.clone()]);
        }
        cur = mm;
    }
    Err(state.runtime_error("'__index' chain too long; possible loop"))
}

pub fn table_set(
    state: &mut LuaState,
    obj: &LuaValue,
    key: &LuaValue,
    value: LuaValue,
) -> LuaResult<()> {
    let mut cur = obj.clone();
    for _ in 0..MAX_META_DEPTH {
        if let LuaValue::Table(t) = &cur {
            let existing = t.borrow().get(key);
            if !existing.is_nil() {
                return raw_set(state, t, key.clone(), value);
            }
            let mm = get_metamethod(&cur, "__newindex");
            if mm.is_nil() {
                return raw_set(state, t, key.clone(), value);
            }
            if matches!(mm, LuaValue::Function(_)) {
                state.call_function(mm, vec![cur, key.clone(), value], 0)?;
                return Ok(());
            }
            cur = mm;
            continue;
        }
        let mm = get_metamethod(&cur, "__newindex");
        if mm.is_nil() {
            return Err(state.runtime_error(format!(
                "attempt to index a {} value",
                cur.type_name()
            )));
        }
        if matches!(mm, LuaValue::Function(_)) {
            state.call_function(mm, vec![cur, key.clone(), value], 0)?;
            return Ok(());
        }
        cur = mm;
    }
    Err(state.runtime_error("'__newindex' chain too long; possible loop"))
}

fn raw_set(state: &LuaState, t: &TableRef, key: LuaValue, value: LuaValue) -> LuaResult<()> {
    t.borrow_mut()
        .put(key, value)
        .map_err(|e| state.runtime_error(e.fault_value()))
}

// ---- arithmetic ----

pub fn to_number(v: &LuaValue) -> Option<LuaValue> {
    match v {
        LuaValue::Integer(_) | LuaValue::Float(_) => Some(v.clone()),
        LuaValue::Str(s) => number::parse_integer(s)
            .map(LuaValue::Integer)
            .or_else(|| number::parse_float(s).map(LuaValue::Float)),
        _ => None,
    }
}

fn metamethod_name(op: OpCode) -> &'static str {
    match op {
        OpCode::Add => "__add",
        OpCode::Sub => "__sub",
        OpCode::Mul => "__mul",
        OpCode::Mod => "__mod",
        OpCode::Pow => "__pow",
        OpCode::Div => "__div",
        OpCode::IDiv => "__idiv",
        OpCode::BAnd => "__band",
        OpCode::BOr => "__bor",
        OpCode::BXor => "__bxor",
        OpCode::Shl => "__shl",
        OpCode::Shr => "__shr",
        OpCode::Unm => "__unm",
        OpCode::BNot => "__bnot",
        _ => "__add",
    }
}

/// Binary arithmetic with 5.3 coercions: `+ - * % //` stay on integers
/// when both operands are integers, `/` and `^` always go through floats,
/// bitwise operators need exact integer operands.
pub fn arith(state: &mut LuaState, op: OpCode, a: &LuaValue, b: &LuaValue) -> LuaResult<LuaValue> {
    if let Some(v) = raw_arith(state, op, a, b)? {
        return Ok(v);
    }
    let name = metamethod_name(op);
    let mm = {
        let m = get_metamethod(a, name);
        if m.is_nil() { get_metamethod(b, name) } else { m }
    };
    if mm.is_nil() {
        let bad = if to_number(a).is_none() { a } else { b };
        let verb = if matches!(
            op,
            OpCode::BAnd | OpCode::BOr | OpCode::BXor | OpCode::Shl | OpCode::Shr | OpCode::BNot
        ) {
            "perform bitwise operation on"
        } else {
            "perform arithmetic on"
        };
        return Err(state.runtime_error(format!("attempt to {verb} a {} value", bad.type_name())));
    }
    state.call_meta(mm, vec![a.clone(), b.clone()])
}

fn raw_arith(
    state: &LuaState,
    op: OpCode,
    a: &LuaValue,
    b: &LuaValue,
) -> LuaResult<Option<LuaValue>> {
    match op {
        OpCode::BAnd | OpCode::BOr | OpCode::BXor | OpCode::Shl | OpCode::Shr => {
            let (Some(x), Some(y)) = (a.to_integer(), b.to_integer()) else {
                // a number without an exact integer representation is its
                // own kind of fault
                if to_number(a).is_some() && to_number(b).is_some() {
                    return Err(
                        state.runtime_error("number has no integer representation")
                    );
                }
                return Ok(None);
            };
            let r = match op {
                OpCode::BAnd => x & y,
                OpCode::BOr => x | y,
                OpCode::BXor => x ^ y,
                OpCode::Shl => number::shift_left(x, y),
                _ => number::shift_right(x, y),
            };
            Ok(Some(LuaValue::Integer(r)))
        }
        OpCode::Div => {
            let (Some(x), Some(y)) = (num_f(a), num_f(b)) else {
                return Ok(None);
            };
            Ok(Some(LuaValue::Float(x / y)))
        }
        OpCode::Pow => {
            let (Some(x), Some(y)) = (num_f(a), num_f(b)) else {
                return Ok(None);
            };
            Ok(Some(LuaValue::Float(x.powf(y))))
        }
        _ => {
            let (Some(x), Some(y)) = (to_number(a), to_number(b)) else {
                return Ok(None);
            };
            if let (LuaValue::Integer(x), LuaValue::Integer(y)) = (&x, &y) {
                let (x, y) = (*x, *y);
                let r = match op {
                    OpCode::Add => x.wrapping_add(y),
                    OpCode::Sub => x.wrapping_sub(y),
                    OpCode::Mul => x.wrapping_mul(y),
                    OpCode::Mod => {
                        if y == 0 {
                            return Err(state.runtime_error("attempt to perform 'n%0'"));
                        }
                        number::i_mod(x, y)
                    }
                    _ => {
                        if y == 0 {
                            return Err(state.runtime_error("attempt to perform 'n//0'"));
                        }
                        number::i_floor_div(x, y)
                    }
                };
                return Ok(Some(LuaValue::Integer(r)));
            }
            let (Some(x), Some(y)) = (num_f(&x), num_f(&y)) else {
                return Ok(None);
            };
            let r = match op {
                OpCode::Add => x + y,
                OpCode::Sub => x - y,
                OpCode::Mul => x * y,
                OpCode::Mod => number::f_mod(x, y),
                _ => number::f_floor_div(x, y),
            };
            Ok(Some(LuaValue::Float(r)))
        }
    }
}

fn num_f(v: &LuaValue) -> Option<f64> {
    v.to_float()
}

/// Unary minus: integers stay integers.
pub fn unary_minus(state: &mut LuaState, v: &LuaValue) -> LuaResult<LuaValue> {
    match to_number(v) {
        Some(LuaValue::Integer(i)) => Ok(LuaValue::Integer(i.wrapping_neg())),
        Some(LuaValue::Float(f)) => Ok(LuaValue::Float(-f)),
        _ => {
            let mm = get_metamethod(v, "__unm");
            if mm.is_nil() {
                return Err(state.runtime_error(format!(
                    "attempt to perform arithmetic on a {} value",
                    v.type_name()
                )));
            }
            state.call_meta(mm, vec![v.clone(), v.clone()])
        }
    }
}

pub fn bitwise_not(state: &mut LuaState, v: &LuaValue) -> LuaResult<LuaValue> {
    match v.to_integer() {
        Some(i) => Ok(LuaValue::Integer(!i)),
        None => {
            let mm = get_metamethod(v, "__bnot");
            if mm.is_nil() {
                let msg = if to_number(v).is_some() {
                    "number has no integer representation".to_string()
                } else {
                    format!(
                        "attempt to perform bitwise operation on a {} value",
                        v.type_name()
                    )
                };
                return Err(state.runtime_error(msg));
            }
            state.call_meta(mm, vec![v.clone(), v.clone()])
        }
    }
}

// ---- comparison ----

pub fn values_eq(state: &mut LuaState, a: &LuaValue, b: &LuaValue) -> LuaResult<bool> {
    if a == b {
        return Ok(true);
    }
    // __eq fires only for two tables or two userdata
    let applicable = matches!(
        (a, b),
        (LuaValue::Table(_), LuaValue::Table(_)) | (LuaValue::UserData(_), LuaValue::UserData(_))
    );
    if !applicable {
        return Ok(false);
    }
    let mm = {
        let m = get_metamethod(a, "__eq");
        if m.is_nil() { get_metamethod(b, "__eq") } else { m }
    };
    if mm.is_nil() {
        return Ok(false);
    }
    Ok(state.call_meta(mm, vec![a.clone(), b.clone()])?.truthy())
}

fn number_lt(a: &LuaValue, b: &LuaValue) -> Option<bool> {
    match (a, b) {
        (LuaValue::Integer(x), LuaValue::Integer(y)) => Some(x < y),
        (LuaValue::Integer(x), LuaValue::Float(y)) => Some((*x as f64) < *y),
        (LuaValue::Float(x), LuaValue::Integer(y)) => Some(*x < *y as f64),
        (LuaValue::Float(x), LuaValue::Float(y)) => Some(x < y),
        _ => None,
    }
}

fn number_le(a: &LuaValue, b: &LuaValue) -> Option<bool> {
    match (a, b) {
        (LuaValue::Integer(x), LuaValue::Integer(y)) => Some(x <= y),
        (LuaValue::Integer(x), LuaValue::Float(y)) => Some((*x as f64) <= *y),
        (LuaValue::Float(x), LuaValue::Integer(y)) => Some(*x <= *y as f64),
        (LuaValue::Float(x), LuaValue::Float(y)) => Some(x <= y),
        _ => None,
    }
}

fn cmp_error(state: &LuaState, a: &LuaValue, b: &LuaValue) -> crate::lua_vm::LuaError {
    state.runtime_error(format!(
        "attempt to compare {} with {}",
        a.type_name(),
        b.type_name()
    ))
}

pub fn values_lt(state: &mut LuaState, a: &LuaValue, b: &LuaValue) -> LuaResult<bool> {
    if let Some(r) = number_lt(a, b) {
        return Ok(r);
    }
    if let (LuaValue::Str(x), LuaValue::Str(y)) = (a, b) {
        return Ok(x.as_bytes() < y.as_bytes());
    }
    let mm = {
        let m = get_metamethod(a, "__lt");
        if m.is_nil() { get_metamethod(b, "__lt") } else { m }
    };
    if mm.is_nil() {
        return Err(cmp_error(state, a, b));
    }
    Ok(state.call_meta(mm, vec![a.clone(), b.clone()])?.truthy())
}

pub fn values_le(state: &mut LuaState, a: &LuaValue, b: &LuaValue) -> LuaResult<bool> {
    if let Some(r) = number_le(a, b) {
        return Ok(r);
    }
    if let (LuaValue::Str(x), LuaValue::Str(y)) = (a, b) {
        return Ok(x.as_bytes() <= y.as_bytes());
    }
    let mm = {
        let m = get_metamethod(a, "__le");
        if m.is_nil() { get_metamethod(b, "__le") } else { m }
    };
    if !mm.is_nil() {
        return Ok(state.call_meta(mm, vec![a.clone(), b.clone()])?.truthy());
    }
    // 5.3 fallback: a <= b becomes not (b < a)
    let mm_lt = {
        let m = get_metamethod(b, "__lt");
        if m.is_nil() { get_metamethod(a, "__lt") } else { m }
    };
    if mm_lt.is_nil() {
        return Err(cmp_error(state, a, b));
    }
    Ok(!state
        .call_meta(mm_lt, vec![b.clone(), a.clone()])?
        .truthy())
}

// ---- concatenation and length ----

fn concat_piece(v: &LuaValue) -> Option<String> {
    match v {
        LuaValue::Str(s) => Some(s.to_string()),
        LuaValue::Integer(_) | LuaValue::Float(_) => Some(v.to_string()),
        _ => None,
    }
}

pub fn concat_pair(state: &mut LuaState, a: &LuaValue, b: &LuaValue) -> LuaResult<LuaValue> {
    if let (Some(x), Some(y)) = (concat_piece(a), concat_piece(b)) {
        return Ok(LuaValue::from_string(x + &y));
    }
    let mm = {
        let m = get_metamethod(a, "__concat");
        if m.is_nil() { get_metamethod(b, "__concat") } else { m }
    };
    if mm.is_nil() {
        let bad = if concat_piece(a).is_none() { a } else { b };
        return Err(state.runtime_error(format!(
            "attempt to concatenate a {} value",
            bad.type_name()
        )));
    }
    state.call_meta(mm, vec![a.clone(), b.clone()])
}

pub fn length_of(state: &mut LuaState, v: &LuaValue) -> LuaResult<LuaValue> {
    if let LuaValue::Str(s) = v {
        return Ok(LuaValue::Integer(s.len() as i64));
    }
    let mm = get_metamethod(v, "__len");
    if !mm.is_nil() {
        return state.call_meta(mm, vec![v.clone()]);
    }
    if let LuaValue::Table(t) = v {
        return Ok(LuaValue::Integer(t.borrow().length()));
    }
    Err(state.runtime_error(format!(
        "attempt to get length of a {} value",
        v.type_name()
    )))
}
