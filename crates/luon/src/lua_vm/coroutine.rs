// Coroutine control transfer. Each coroutine owns a full `LuaState`; a
// yield unwinds the coroutine's Rust stack as `LuaError::Yield` and
// `resume` catches it here, leaving the suspended frames intact for the
// next resume.

use std::cell::{Cell, RefCell};
use std::mem;
use std::rc::Rc;

use crate::lua_value::{CoStatus, LuaThread, LuaValue, ThreadRef};
use crate::lua_vm::LuaError;
use crate::lua_vm::lua_state::LuaState;

/// Create a suspended coroutine over `body`, sharing the caller's registry
/// (and therefore its globals).
pub(crate) fn spawn(caller: &LuaState, body: LuaValue) -> ThreadRef {
    let registry = caller.registry.clone();
    Rc::new_cyclic(|weak| LuaThread {
        state: RefCell::new(LuaState::new_coroutine(registry, weak.clone(), body)),
        status: Cell::new(CoStatus::Suspended),
    })
}

/// Transfer control into `co`. Returns Lua's `resume` pair: success flag
/// plus either the yielded/returned values or the fault value. Misuse
/// (resuming a dead or running coroutine) reports failure rather than
/// raising in the caller.
pub(crate) fn resume(
    caller: &mut LuaState,
    co: &ThreadRef,
    args: Vec<LuaValue>,
) -> (bool, Vec<LuaValue>) {
    match co.status.get() {
        CoStatus::Dead => return failure("cannot resume dead coroutine"),
        CoStatus::Running | CoStatus::Normal => {
            return failure("cannot resume non-suspended coroutine");
        }
        CoStatus::Suspended => {}
    }
    // A coroutine resuming itself would reach its own borrowed state.
    let Ok(mut state) = co.state.try_borrow_mut() else {
        return failure("cannot resume non-suspended coroutine");
    };

    let caller_thread = caller.handle.upgrade();
    if let Some(t) = &caller_thread {
        t.status.set(CoStatus::Normal);
    }
    co.status.set(CoStatus::Running);

    let outcome = if !state.started {
        // First entry: the body closure sits in the base frame.
        state.started = true;
        let body = state.frames[0].get(0);
        state
            .call_prepared(body, args, 0, -1)
            .and_then(|pushed| if pushed { state.run(1) } else { Ok(()) })
    } else {
        // Deliver the resume arguments as the results of the call that
        // yielded, then pick the interpreter back up.
        if let Some((dst, want)) = state.resume_point.take() {
            state.place_results(dst, want, args);
        }
        state.run(1)
    };

    if let Some(t) = &caller_thread {
        t.status.set(CoStatus::Running);
    }

    match outcome {
        Ok(()) => {
            co.status.set(CoStatus::Dead);
            let base = &state.frames[0];
            let results = (0..base.top).map(|i| base.get(i)).collect();
            (true, results)
        }
        Err(LuaError::Yield) => {
            co.status.set(CoStatus::Suspended);
            (true, mem::take(&mut state.yield_values))
        }
        Err(e) => {
            co.status.set(CoStatus::Dead);
            state.frames.truncate(1);
            (false, vec![e.fault_value()])
        }
    }
}

fn failure(message: &str) -> (bool, Vec<LuaValue>) {
    (false, vec![LuaValue::from_string(message)])
}
