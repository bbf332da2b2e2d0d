// Table creation, indexing and the SETLIST bulk store.

use std::cell::RefCell;
use std::rc::Rc;

use crate::lua_value::{LuaTable, LuaValue, number};
use crate::lua_vm::LuaResult;
use crate::lua_vm::instruction::Instruction;
use crate::lua_vm::lua_state::LuaState;
use crate::lua_vm::metamethod;

/// Array entries per SETLIST batch; matches the code generator.
const FIELDS_PER_FLUSH: usize = 50;

pub(super) fn new_table(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let asize = number::fb_to_int(i.b());
    let hsize = number::fb_to_int(i.c());
    let t = LuaValue::Table(Rc::new(RefCell::new(LuaTable::new(asize, hsize))));
    s.set_reg(i.a(), t);
    Ok(())
}

pub(super) fn get_table(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let obj = s.reg(i.b());
    let key = s.rk_value(i.c());
    let v = metamethod::table_get(s, &obj, &key)?;
    s.set_reg(i.a(), v);
    Ok(())
}

pub(super) fn set_table(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let obj = s.reg(i.a());
    let key = s.rk_value(i.b());
    let val = s.rk_value(i.c());
    metamethod::table_set(s, &obj, &key, val)
}

pub(super) fn get_tab_up(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let obj = s.current_upvalue(i.b());
    let key = s.rk_value(i.c());
    let v = metamethod::table_get(s, &obj, &key)?;
    s.set_reg(i.a(), v);
    Ok(())
}

pub(super) fn set_tab_up(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let obj = s.current_upvalue(i.a());
    let key = s.rk_value(i.b());
    let val = s.rk_value(i.c());
    metamethod::table_set(s, &obj, &key, val)
}

/// SELF a b c: R(a+1) = R(b); R(a) = R(b)[RK(c)]. Sets up a method call so
/// the receiver is evaluated once.
pub(super) fn self_load(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let obj = s.reg(i.b());
    let key = s.rk_value(i.c());
    s.set_reg(i.a() + 1, obj.clone());
    let v = metamethod::table_get(s, &obj, &key)?;
    s.set_reg(i.a(), v);
    Ok(())
}

pub(super) fn set_list(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let a = i.a();
    let n = if i.b() == 0 {
        s.frame().top.saturating_sub(a + 1)
    } else {
        i.b()
    };
    let batch = if i.c() == 0 {
        s.fetch_extra_arg()
    } else {
        i.c()
    };
    let base = (batch - 1) * FIELDS_PER_FLUSH;

    let LuaValue::Table(t) = s.reg(a) else {
        return Err(s.runtime_error("SETLIST target is not a table"));
    };
    for j in 1..=n {
        let v = s.reg(a + j);
        t.borrow_mut()
            .put(LuaValue::Integer((base + j) as i64), v)
            .map_err(|e| s.runtime_error(e.fault_value()))?;
    }
    Ok(())
}
