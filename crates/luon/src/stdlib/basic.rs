// The basic library: printing, type inspection, raw table access, error
// handling and the pairs/ipairs iteration protocol.

use std::rc::Rc;

use super::host_fn;
use crate::lua_value::LuaValue;
use crate::lua_vm::metamethod;
use crate::lua_vm::{LuaError, LuaResult, LuaState};

pub(super) fn open(state: &mut LuaState) {
    state.set_global("print", host_fn(print));
    state.set_global("type", host_fn(type_name));
    state.set_global("tostring", host_fn(tostring));
    state.set_global("tonumber", host_fn(tonumber));
    state.set_global("assert", host_fn(assert));
    state.set_global("error", host_fn(error));
    state.set_global("pcall", host_fn(pcall));
    state.set_global("next", host_fn(next));
    state.set_global("pairs", host_fn(pairs));
    state.set_global("ipairs", host_fn(ipairs));
    state.set_global("select", host_fn(select));
    state.set_global("rawget", host_fn(rawget));
    state.set_global("rawset", host_fn(rawset));
    state.set_global("rawequal", host_fn(rawequal));
    state.set_global("rawlen", host_fn(rawlen));
    state.set_global("setmetatable", host_fn(setmetatable));
    state.set_global("getmetatable", host_fn(getmetatable));
    state.set_global("_VERSION", LuaValue::from_string("Lua 5.3"));
    state.set_global("_G", LuaValue::Table(state.globals()));
}

/// `tostring` semantics shared by `print`: `__tostring` wins over the
/// default rendering.
fn stringify(s: &mut LuaState, v: &LuaValue) -> LuaResult<LuaValue> {
    let mm = metamethod::get_metamethod(v, "__tostring");
    if !mm.is_nil() {
        return s.call_meta(mm, vec![v.clone()]);
    }
    Ok(LuaValue::from_string(v.to_string()))
}

fn print(s: &mut LuaState) -> LuaResult<usize> {
    let mut line = String::new();
    for (i, v) in s.args().iter().enumerate() {
        if i > 0 {
            line.push('\t');
        }
        let text = stringify(s, v)?;
        line.push_str(text.as_str().unwrap_or(""));
    }
    println!("{line}");
    Ok(0)
}

fn type_name(s: &mut LuaState) -> LuaResult<usize> {
    s.check_arg(s.arg_count() >= 1, 0, "type", "value")?;
    let name = s.arg(0).type_name();
    s.push_value(LuaValue::from_string(name));
    Ok(1)
}

fn tostring(s: &mut LuaState) -> LuaResult<usize> {
    s.check_arg(s.arg_count() >= 1, 0, "tostring", "value")?;
    let v = s.arg(0);
    let text = stringify(s, &v)?;
    s.push_value(text);
    Ok(1)
}

fn tonumber(s: &mut LuaState) -> LuaResult<usize> {
    let v = s.arg(0);
    if s.arg(1).is_nil() {
        let n = metamethod::to_number(&v).unwrap_or(LuaValue::Nil);
        s.push_value(n);
        return Ok(1);
    }
    let base = s.arg(1).to_integer().unwrap_or(0);
    if !(2..=36).contains(&base) {
        return Err(s.runtime_error("bad argument #2 to 'tonumber' (base out of range)"));
    }
    s.check_arg(v.as_str().is_some(), 0, "tonumber", "string")?;
    let text = v.as_str().unwrap_or("").trim();
    let n = i64::from_str_radix(text, base as u32)
        .map(LuaValue::Integer)
        .unwrap_or(LuaValue::Nil);
    s.push_value(n);
    Ok(1)
}

fn assert(s: &mut LuaState) -> LuaResult<usize> {
    if s.arg(0).truthy() {
        // pass every argument through
        return Ok(s.arg_count());
    }
    match s.arg(1) {
        LuaValue::Nil => Err(s.runtime_error("assertion failed!")),
        message => Err(LuaError::Runtime(message)),
    }
}

fn error(s: &mut LuaState) -> LuaResult<usize> {
    let message = s.arg(0);
    let level = if s.arg(1).is_nil() {
        1
    } else {
        s.arg(1).to_integer().unwrap_or(1)
    };
    // Only string messages at level > 0 get a position prefix.
    if level > 0 {
        if let LuaValue::Str(_) = &message {
            return Err(s.runtime_error(message));
        }
    }
    Err(LuaError::Runtime(message))
}

fn pcall(s: &mut LuaState) -> LuaResult<usize> {
    s.check_arg(s.arg_count() >= 1, 0, "pcall", "value")?;
    let f = s.arg(0);
    let args = s.args_from(1);
    match s.call_function(f, args, -1) {
        Ok(results) => {
            s.push_value(LuaValue::Boolean(true));
            let n = results.len();
            for v in results {
                s.push_value(v);
            }
            Ok(1 + n)
        }
        Err(e) => {
            s.push_value(LuaValue::Boolean(false));
            s.push_value(e.fault_value());
            Ok(2)
        }
    }
}

fn next(s: &mut LuaState) -> LuaResult<usize> {
    s.check_arg(s.arg(0).as_table().is_some(), 0, "next", "table")?;
    let t = s.arg(0).as_table().cloned().unwrap();
    let key = s.arg(1);
    let entry = t
        .borrow()
        .next(&key)
        .map_err(|e| s.runtime_error(e.fault_value()))?;
    match entry {
        Some((k, v)) => {
            s.push_value(k);
            s.push_value(v);
            Ok(2)
        }
        None => {
            s.push_value(LuaValue::Nil);
            Ok(1)
        }
    }
}

fn pairs(s: &mut LuaState) -> LuaResult<usize> {
    let t = s.arg(0);
    let mm = metamethod::get_metamethod(&t, "__pairs");
    if !mm.is_nil() {
        let results = s.call_function(mm, vec![t], 3)?;
        for v in results {
            s.push_value(v);
        }
        return Ok(3);
    }
    s.check_arg(t.as_table().is_some(), 0, "pairs", "table")?;
    s.push_value(host_fn(next));
    s.push_value(t);
    s.push_value(LuaValue::Nil);
    Ok(3)
}

fn ipairs_iter(s: &mut LuaState) -> LuaResult<usize> {
    let t = s.arg(0);
    let i = s.arg(1).to_integer().unwrap_or(0) + 1;
    let v = metamethod::table_get(s, &t, &LuaValue::Integer(i))?;
    if v.is_nil() {
        s.push_value(LuaValue::Nil);
        Ok(1)
    } else {
        s.push_value(LuaValue::Integer(i));
        s.push_value(v);
        Ok(2)
    }
}

fn ipairs(s: &mut LuaState) -> LuaResult<usize> {
    s.check_arg(s.arg_count() >= 1, 0, "ipairs", "value")?;
    let t = s.arg(0);
    s.push_value(host_fn(ipairs_iter));
    s.push_value(t);
    s.push_value(LuaValue::Integer(0));
    Ok(3)
}

fn select(s: &mut LuaState) -> LuaResult<usize> {
    let rest = s.arg_count().saturating_sub(1);
    if s.arg(0).as_str() == Some("#") {
        s.push_value(LuaValue::Integer(rest as i64));
        return Ok(1);
    }
    let n = s.arg(0).to_integer().unwrap_or(0);
    let start = if n > 0 {
        n as usize
    } else if n < 0 && (-n) as usize <= rest {
        rest - (-n) as usize + 1
    } else {
        return Err(s.runtime_error("bad argument #1 to 'select' (index out of range)"));
    };
    let picked = s.args_from(start);
    let count = picked.len();
    for v in picked {
        s.push_value(v);
    }
    Ok(count)
}

fn rawget(s: &mut LuaState) -> LuaResult<usize> {
    s.check_arg(s.arg(0).as_table().is_some(), 0, "rawget", "table")?;
    let t = s.arg(0).as_table().cloned().unwrap();
    let v = t.borrow().get(&s.arg(1));
    s.push_value(v);
    Ok(1)
}

fn rawset(s: &mut LuaState) -> LuaResult<usize> {
    s.check_arg(s.arg(0).as_table().is_some(), 0, "rawset", "table")?;
    let tv = s.arg(0);
    let t = tv.as_table().cloned().unwrap();
    t.borrow_mut()
        .put(s.arg(1), s.arg(2))
        .map_err(|e| s.runtime_error(e.fault_value()))?;
    s.push_value(tv);
    Ok(1)
}

fn rawequal(s: &mut LuaState) -> LuaResult<usize> {
    let r = s.arg(0) == s.arg(1);
    s.push_value(LuaValue::Boolean(r));
    Ok(1)
}

fn rawlen(s: &mut LuaState) -> LuaResult<usize> {
    let v = s.arg(0);
    let n = match &v {
        LuaValue::Table(t) => t.borrow().length(),
        LuaValue::Str(text) => text.len() as i64,
        _ => {
            return Err(s.runtime_error("table or string expected"));
        }
    };
    s.push_value(LuaValue::Integer(n));
    Ok(1)
}

fn setmetatable(s: &mut LuaState) -> LuaResult<usize> {
    s.check_arg(s.arg(0).as_table().is_some(), 0, "setmetatable", "table")?;
    let meta_arg = s.arg(1);
    s.check_arg(
        meta_arg.is_nil() || meta_arg.as_table().is_some(),
        1,
        "setmetatable",
        "nil or table",
    )?;
    let tv = s.arg(0);
    let t = tv.as_table().cloned().unwrap();
    if !metamethod::get_metamethod(&tv, "__metatable").is_nil() {
        return Err(s.runtime_error("cannot change a protected metatable"));
    }
    t.borrow_mut().set_metatable(meta_arg.as_table().cloned());
    s.push_value(tv);
    Ok(1)
}

fn getmetatable(s: &mut LuaState) -> LuaResult<usize> {
    let v = s.arg(0);
    let result = match metamethod::raw_metatable(&v) {
        Some(meta) => {
            let guard = meta
                .borrow()
                .get(&LuaValue::from_string("__metatable"));
            if guard.is_nil() {
                LuaValue::Table(Rc::clone(&meta))
            } else {
                guard
            }
        }
        None => LuaValue::Nil,
    };
    s.push_value(result);
    Ok(1)
}
