// Jumps, calls, returns, closures, upvalues and varargs.

use crate::lua_value::{Closure, LuaValue};
use crate::lua_vm::LuaResult;
use crate::lua_vm::instruction::Instruction;
use crate::lua_vm::lua_state::LuaState;

/// JMP sbx; a > 0 additionally closes upvalues for registers >= a-1.
pub(super) fn jmp(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    s.add_pc(i.sbx());
    let a = i.a();
    if a > 0 {
        let frame = s.frame_mut();
        for r in (a - 1)..frame.slots.len() {
            frame.close_slot(r);
        }
    }
    Ok(())
}

pub(super) fn get_upval(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let v = s.current_upvalue(i.b());
    s.set_reg(i.a(), v);
    Ok(())
}

pub(super) fn set_upval(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let v = s.reg(i.a());
    let cl = s.current_closure();
    if let Some(cell) = cl.upvals.get(i.b()) {
        *cell.borrow_mut() = v;
    }
    Ok(())
}

/// CLOSURE a bx: instantiate nested prototype bx, capturing upvalues from
/// the current frame's registers or the current closure's own upvalues.
pub(super) fn closure(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let proto = s.current_proto();
    let sub = proto.protos[i.bx()].clone();
    let parent = s.current_closure();

    let mut upvals = Vec::with_capacity(sub.upvalues.len());
    for desc in &sub.upvalues {
        let cell = if desc.in_stack != 0 {
            // alias the live register cell
            s.frame().cell(desc.idx as usize)
        } else {
            parent.upvals[desc.idx as usize].clone()
        };
        upvals.push(cell);
    }
    s.set_reg(i.a(), LuaValue::Function(Closure::from_proto(sub, upvals)));
    Ok(())
}

/// VARARG a b: copy b-1 varargs to a.. (b == 0: all of them, moving top).
pub(super) fn vararg(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let a = i.a();
    let varargs = s.frame().varargs.clone();
    if i.b() == 0 {
        let n = varargs.len();
        s.frame_mut().ensure(a + n);
        for (j, v) in varargs.into_iter().enumerate() {
            s.set_reg(a + j, v);
        }
        s.frame_mut().top = a + n;
    } else {
        let want = i.b() - 1;
        for j in 0..want {
            let v = varargs.get(j).cloned().unwrap_or(LuaValue::Nil);
            s.set_reg(a + j, v);
        }
    }
    Ok(())
}

pub(super) fn call(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let nargs = i.b() as i32 - 1;
    let want = i.c() as i32 - 1;
    s.precall(i.a(), nargs, want)?;
    Ok(())
}

/// TAILCALL a b: the current frame is replaced, so deep self-recursion in
/// tail position runs in constant frame space.
pub(super) fn tail_call(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let a = i.a();
    let nargs = if i.b() == 0 {
        s.frame().top.saturating_sub(a + 1)
    } else {
        i.b() - 1
    };
    let func = s.reg(a);
    let mut args = Vec::with_capacity(nargs);
    for j in 0..nargs {
        args.push(s.reg(a + 1 + j));
    }
    let leaving = s.frames.pop().expect("tail call without a frame");
    s.call_prepared(func, args, leaving.ret_dst, leaving.want)?;
    Ok(())
}

/// RETURN a b: b-1 results starting at a (b == 0: up to top). Results are
/// copied into the caller at the slot recorded when this frame was pushed.
pub(super) fn ret(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let a = i.a();
    let n = if i.b() == 0 {
        s.frame().top.saturating_sub(a)
    } else {
        i.b() - 1
    };
    let mut results = Vec::with_capacity(n);
    for j in 0..n {
        results.push(s.reg(a + j));
    }
    let leaving = s.frames.pop().expect("return without a frame");
    if !s.frames.is_empty() {
        s.place_results(leaving.ret_dst, leaving.want, results);
    }
    Ok(())
}
