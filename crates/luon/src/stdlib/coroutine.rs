// The coroutine table, bridging scripts to the control-transfer engine in
// `lua_vm::coroutine`.

use std::cell::RefCell;
use std::rc::Rc;

use super::host_fn;
use crate::lua_value::{Closure, LuaTable, LuaValue, ThreadRef, new_cell};
use crate::lua_vm::{LuaError, LuaResult, LuaState, coroutine};

pub(super) fn open(state: &mut LuaState) {
    let t = Rc::new(RefCell::new(LuaTable::new(0, 8)));
    {
        let mut t = t.borrow_mut();
        let mut set = |name: &str, v: LuaValue| {
            let _ = t.put(LuaValue::from_string(name), v);
        };
        set("create", host_fn(create));
        set("resume", host_fn(resume));
        set("yield", host_fn(yield_fn));
        set("status", host_fn(status));
        set("wrap", host_fn(wrap));
        set("isyieldable", host_fn(isyieldable));
        set("running", host_fn(running));
    }
    state.set_global("coroutine", LuaValue::Table(t));
}

fn check_thread(s: &LuaState, fname: &str) -> LuaResult<ThreadRef> {
    match s.arg(0) {
        LuaValue::Thread(co) => Ok(co),
        other => Err(s.runtime_error(format!(
            "bad argument #1 to '{fname}' (coroutine expected, got {})",
            other.type_name()
        ))),
    }
}

fn create(s: &mut LuaState) -> LuaResult<usize> {
    let body = s.arg(0);
    s.check_arg(
        matches!(body, LuaValue::Function(_)),
        0,
        "create",
        "function",
    )?;
    let co = coroutine::spawn(s, body);
    s.push_value(LuaValue::Thread(co));
    Ok(1)
}

fn resume(s: &mut LuaState) -> LuaResult<usize> {
    let co = check_thread(s, "resume")?;
    let args = s.args_from(1);
    let (ok, values) = coroutine::resume(s, &co, args);
    s.push_value(LuaValue::Boolean(ok));
    let n = values.len();
    for v in values {
        s.push_value(v);
    }
    Ok(1 + n)
}

fn yield_fn(s: &mut LuaState) -> LuaResult<usize> {
    if s.is_main {
        return Err(LuaError::Coroutine(
            "attempt to yield from outside a coroutine".to_string(),
        ));
    }
    s.yield_values = s.args();
    Err(LuaError::Yield)
}

fn status(s: &mut LuaState) -> LuaResult<usize> {
    let co = check_thread(s, "status")?;
    s.push_value(LuaValue::from_string(co.status.get().name()));
    Ok(1)
}

/// The wrapped function keeps its coroutine in an upvalue cell and
/// re-raises the fault on failed resume instead of returning a flag.
fn wrap_call(s: &mut LuaState) -> LuaResult<usize> {
    let LuaValue::Thread(co) = s.current_upvalue(0) else {
        return Err(s.runtime_error("wrapped coroutine is gone"));
    };
    let args = s.args();
    let (ok, values) = coroutine::resume(s, &co, args);
    if !ok {
        let fault = values.into_iter().next().unwrap_or(LuaValue::Nil);
        return Err(LuaError::Runtime(fault));
    }
    let n = values.len();
    for v in values {
        s.push_value(v);
    }
    Ok(n)
}

fn wrap(s: &mut LuaState) -> LuaResult<usize> {
    let body = s.arg(0);
    s.check_arg(matches!(body, LuaValue::Function(_)), 0, "wrap", "function")?;
    let co = coroutine::spawn(s, body);
    let cell = new_cell(LuaValue::Thread(co));
    s.push_value(LuaValue::Function(Closure::from_rust_fn(
        wrap_call,
        vec![cell],
    )));
    Ok(1)
}

fn isyieldable(s: &mut LuaState) -> LuaResult<usize> {
    s.push_value(LuaValue::Boolean(!s.is_main));
    Ok(1)
}

fn running(s: &mut LuaState) -> LuaResult<usize> {
    let current = match s.handle.upgrade() {
        Some(t) => LuaValue::Thread(t),
        None => LuaValue::Nil,
    };
    s.push_value(current);
    s.push_value(LuaValue::Boolean(s.is_main));
    Ok(2)
}
