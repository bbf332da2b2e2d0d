// Numeric and generic `for` loops.
//
// FORPREP subtracts the step from the initial value once, so FORLOOP can
// add-then-test uniformly. Integer loops stay on integers and terminate on
// overflow instead of wrapping.

use crate::lua_value::LuaValue;
use crate::lua_vm::LuaResult;
use crate::lua_vm::instruction::Instruction;
use crate::lua_vm::lua_state::LuaState;
use crate::lua_vm::metamethod;

pub(super) fn for_prep(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let a = i.a();
    let init = metamethod::to_number(&s.reg(a))
        .ok_or_else(|| s.runtime_error("'for' initial value must be a number"))?;
    let limit = metamethod::to_number(&s.reg(a + 1))
        .ok_or_else(|| s.runtime_error("'for' limit must be a number"))?;
    let step = metamethod::to_number(&s.reg(a + 2))
        .ok_or_else(|| s.runtime_error("'for' step must be a number"))?;

    let step_is_zero = match &step {
        LuaValue::Integer(0) => true,
        LuaValue::Float(f) => *f == 0.0,
        _ => false,
    };
    if step_is_zero {
        return Err(s.runtime_error("'for' step is zero"));
    }

    if let (LuaValue::Integer(i0), LuaValue::Integer(st)) = (&init, &step) {
        let (i0, st) = (*i0, *st);
        // an integer loop; a float limit collapses to its integer bound
        let bound = match limit {
            LuaValue::Integer(l) => l,
            LuaValue::Float(f) => float_limit(f, st > 0),
            _ => 0,
        };
        s.set_reg(a, LuaValue::Integer(i0.wrapping_sub(st)));
        s.set_reg(a + 1, LuaValue::Integer(bound));
        s.set_reg(a + 2, LuaValue::Integer(st));
    } else {
        let i0 = init.to_float().unwrap_or(0.0);
        let lf = limit.to_float().unwrap_or(0.0);
        let st = step.to_float().unwrap_or(0.0);
        s.set_reg(a, LuaValue::Float(i0 - st));
        s.set_reg(a + 1, LuaValue::Float(lf));
        s.set_reg(a + 2, LuaValue::Float(st));
    }
    s.add_pc(i.sbx());
    Ok(())
}

// Clamp a float limit into the integer range, rounding toward the loop
// interior (floor for ascending loops, ceil for descending).
fn float_limit(f: f64, ascending: bool) -> i64 {
    let r = if ascending { f.floor() } else { f.ceil() };
    if r >= i64::MAX as f64 {
        i64::MAX
    } else if r <= i64::MIN as f64 {
        i64::MIN
    } else {
        r as i64
    }
}

pub(super) fn for_loop(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let a = i.a();
    match (s.reg(a), s.reg(a + 2)) {
        (LuaValue::Integer(idx), LuaValue::Integer(st)) => {
            // overflow means the loop is done
            let Some(next) = idx.checked_add(st) else {
                return Ok(());
            };
            let LuaValue::Integer(limit) = s.reg(a + 1) else {
                return Ok(());
            };
            let keep_going = if st > 0 { next <= limit } else { next >= limit };
            if keep_going {
                s.set_reg(a, LuaValue::Integer(next));
                s.set_reg(a + 3, LuaValue::Integer(next));
                s.add_pc(i.sbx());
            }
        }
        (idx, st) => {
            let (Some(idx), Some(st)) = (idx.to_float(), st.to_float()) else {
                return Ok(());
            };
            let limit = s.reg(a + 1).to_float().unwrap_or(0.0);
            let next = idx + st;
            let keep_going = if st > 0.0 { next <= limit } else { next >= limit };
            if keep_going {
                s.set_reg(a, LuaValue::Float(next));
                s.set_reg(a + 3, LuaValue::Float(next));
                s.add_pc(i.sbx());
            }
        }
    }
    Ok(())
}

/// TFORCALL a _ c: call the iterator R(a) with (state, control) and store
/// exactly c results at R(a+3)...
pub(super) fn tfor_call(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let a = i.a();
    let c = i.c();
    let f = s.reg(a);
    let st = s.reg(a + 1);
    let ctrl = s.reg(a + 2);
    let results = s.call_function(f, vec![st, ctrl], c as i32)?;
    for j in 0..c {
        let v = results.get(j).cloned().unwrap_or(LuaValue::Nil);
        s.set_reg(a + 3 + j, v);
    }
    Ok(())
}

/// TFORLOOP a sbx: continue while the first iterator result is non-nil.
pub(super) fn tfor_loop(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let a = i.a();
    let v = s.reg(a + 1);
    if !v.is_nil() {
        s.set_reg(a, v);
        s.add_pc(i.sbx());
    }
    Ok(())
}
