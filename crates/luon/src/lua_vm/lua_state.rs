// Execution state of one thread: frame stack, shared registry, and the
// call/return machinery. The main interpreter loop lives in `execute`.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::binchunk::Prototype;
use crate::lua_value::{Closure, LuaTable, LuaThread, LuaValue, TableRef, new_cell};
use crate::lua_vm::instruction::Instruction;
use crate::lua_vm::lua_frame::LuaFrame;
use crate::lua_vm::metamethod;
use crate::lua_vm::{LuaError, LuaResult};

/// Registry slot holding the globals table, as in the C API.
pub const LUA_RIDX_GLOBALS: i64 = 2;

/// Frame-stack ceiling; crossing it raises "stack overflow".
const MAX_FRAMES: usize = 20_000;

/// Longest `__call` indirection chain accepted for one call.
const MAX_CALL_CHAIN: usize = 100;

pub struct LuaState {
    pub(crate) frames: Vec<LuaFrame>,
    pub(crate) registry: TableRef,
    /// False until the coroutine body has been entered for the first time.
    pub(crate) started: bool,
    /// Values passed to the pending `yield`, harvested by `resume`.
    pub(crate) yield_values: Vec<LuaValue>,
    /// Where resume arguments land when the coroutine continues: the
    /// (register, want) of the call that yielded.
    pub(crate) resume_point: Option<(usize, i32)>,
    pub(crate) handle: Weak<LuaThread>,
    pub(crate) is_main: bool,
}

impl LuaState {
    pub(crate) fn new_main(registry: TableRef, handle: Weak<LuaThread>) -> LuaState {
        LuaState {
            frames: Vec::new(),
            registry,
            started: true,
            yield_values: Vec::new(),
            resume_point: None,
            handle,
            is_main: true,
        }
    }

    pub(crate) fn new_coroutine(
        registry: TableRef,
        handle: Weak<LuaThread>,
        body: LuaValue,
    ) -> LuaState {
        let mut base = LuaFrame::base();
        base.push(body);
        LuaState {
            frames: vec![base],
            registry,
            started: false,
            yield_values: Vec::new(),
            resume_point: None,
            handle,
            is_main: false,
        }
    }

    pub fn globals(&self) -> TableRef {
        let g = self
            .registry
            .borrow()
            .get(&LuaValue::Integer(LUA_RIDX_GLOBALS));
        match g {
            LuaValue::Table(t) => t,
            _ => Rc::new(RefCell::new(LuaTable::new(0, 0))),
        }
    }

    pub fn set_global(&self, name: &str, value: LuaValue) {
        let globals = self.globals();
        let _ = globals
            .borrow_mut()
            .put(LuaValue::from_string(name), value);
    }

    // ---- register access (current frame) ----

    pub(crate) fn frame(&self) -> &LuaFrame {
        self.frames.last().expect("no active frame")
    }

    pub(crate) fn frame_mut(&mut self) -> &mut LuaFrame {
        self.frames.last_mut().expect("no active frame")
    }

    pub(crate) fn reg(&self, i: usize) -> LuaValue {
        self.frame().get(i)
    }

    pub(crate) fn set_reg(&mut self, i: usize, v: LuaValue) {
        self.frame_mut().set(i, v);
    }

    pub(crate) fn current_closure(&self) -> Rc<Closure> {
        self.frame().closure.clone().expect("frame has no closure")
    }

    pub(crate) fn current_proto(&self) -> Rc<Prototype> {
        self.current_closure()
            .proto
            .clone()
            .expect("not a scripted frame")
    }

    pub(crate) fn const_value(&self, idx: usize) -> LuaValue {
        let proto = self.current_proto();
        LuaValue::from(&proto.constants[idx])
    }

    /// Resolve an RK operand: constant-pool reference or register.
    pub(crate) fn rk_value(&self, arg: usize) -> LuaValue {
        if Instruction::is_k(arg) {
            self.const_value(Instruction::rk_index(arg))
        } else {
            self.reg(arg)
        }
    }

    // ---- diagnostics ----

    /// Position of the instruction being executed, for error prefixes.
    fn current_position(&self) -> Option<(smol_str::SmolStr, u32)> {
        for frame in self.frames.iter().rev() {
            if let Some(cl) = &frame.closure {
                if let Some(proto) = &cl.proto {
                    let pc = frame.pc.saturating_sub(1);
                    let line = proto.line_at(pc).unwrap_or(0);
                    return Some((proto.source.clone(), line));
                }
            }
        }
        None
    }

    pub(crate) fn runtime_error(&self, message: impl std::fmt::Display) -> LuaError {
        let text = match self.current_position() {
            Some((source, line)) => format!("{source}:{line}: {message}"),
            None => message.to_string(),
        };
        LuaError::Runtime(LuaValue::from_string(text))
    }

    // ---- call machinery ----

    /// Begin a call with callee and arguments already laid out in the
    /// current frame: function at register `a`, arguments following it
    /// (`nargs` of them, or up to `top` when -1). Returns true when a
    /// scripted frame was pushed and the interpreter loop should continue
    /// into it.
    pub(crate) fn precall(&mut self, a: usize, nargs: i32, want: i32) -> LuaResult<bool> {
        let func = self.reg(a);
        let nargs = if nargs < 0 {
            self.frame().top.saturating_sub(a + 1)
        } else {
            nargs as usize
        };
        let mut args = Vec::with_capacity(nargs);
        for i in 0..nargs {
            args.push(self.reg(a + 1 + i));
        }
        self.call_prepared(func, args, a, want)
    }

    pub(crate) fn call_prepared(
        &mut self,
        mut func: LuaValue,
        mut args: Vec<LuaValue>,
        ret_dst: usize,
        want: i32,
    ) -> LuaResult<bool> {
        // resolve __call indirection
        let mut hops = 0;
        let closure = loop {
            if let LuaValue::Function(cl) = &func {
                break cl.clone();
            }
            let mm = metamethod::get_metamethod(&func, "__call");
            if mm.is_nil() {
                return Err(
                    self.runtime_error(format!("attempt to call a {} value", func.type_name()))
                );
            }
            args.insert(0, func);
            func = mm;
            hops += 1;
            if hops > MAX_CALL_CHAIN {
                return Err(self.runtime_error("'__call' chain too long; possible loop"));
            }
        };

        if self.frames.len() >= MAX_FRAMES {
            return Err(self.runtime_error("stack overflow"));
        }

        if let Some(proto) = closure.proto.clone() {
            self.frames
                .push(LuaFrame::for_lua(closure, &proto, args, ret_dst, want));
            return Ok(true);
        }

        let f = closure.rust_fn.expect("closure without code");
        self.frames
            .push(LuaFrame::for_host(closure, args, ret_dst, want));
        match f(self) {
            Ok(n) => {
                let frame = self.frames.pop().expect("host frame");
                let start = frame.top.saturating_sub(n);
                let results: Vec<LuaValue> = (start..frame.top).map(|i| frame.get(i)).collect();
                self.place_results(ret_dst, want, results);
                Ok(false)
            }
            Err(LuaError::Yield) => {
                // The coroutine suspends here; remember where the resume
                // arguments must land when it continues.
                self.frames.pop();
                self.resume_point = Some((ret_dst, want));
                Err(LuaError::Yield)
            }
            Err(e) => Err(e),
        }
    }

    /// Deliver call results into the current frame at `dst`, padding or
    /// truncating to `want` (-1 keeps all and moves `top`).
    pub(crate) fn place_results(&mut self, dst: usize, want: i32, results: Vec<LuaValue>) {
        let frame = self.frame_mut();
        if want < 0 {
            let n = results.len();
            frame.ensure(dst + n);
            for (i, v) in results.into_iter().enumerate() {
                frame.set(dst + i, v);
            }
            frame.top = dst + n;
        } else {
            let want = want as usize;
            frame.ensure(dst + want);
            for i in 0..want {
                let v = results.get(i).cloned().unwrap_or(LuaValue::Nil);
                frame.set(dst + i, v);
            }
        }
    }

    /// Interpreter loop: runs scripted frames until the stack shrinks back
    /// to `base` frames.
    pub(crate) fn run(&mut self, base: usize) -> LuaResult<()> {
        while self.frames.len() > base {
            let frame = self.frame_mut();
            let proto = frame
                .closure
                .as_ref()
                .and_then(|cl| cl.proto.clone())
                .expect("interpreter entered a non-scripted frame");
            let inst = Instruction(proto.code[frame.pc]);
            frame.pc += 1;
            self.execute_inst(inst)?;
        }
        Ok(())
    }

    /// Call `func` with `args` through a private base frame; used by the
    /// host API, metamethods and the standard library. Yields cannot cross
    /// this boundary.
    pub fn call_function(
        &mut self,
        func: LuaValue,
        args: Vec<LuaValue>,
        want: i32,
    ) -> LuaResult<Vec<LuaValue>> {
        let entry_depth = self.frames.len();
        self.frames.push(LuaFrame::base());

        let outcome = self
            .call_prepared(func, args, 0, want)
            .and_then(|pushed| if pushed { self.run(entry_depth + 1) } else { Ok(()) });
        if let Err(e) = outcome {
            self.frames.truncate(entry_depth);
            return Err(match e {
                LuaError::Yield => LuaError::Coroutine(
                    "attempt to yield across a protected call boundary".to_string(),
                ),
                other => other,
            });
        }

        let frame = self.frames.pop().expect("base frame");
        let n = if want < 0 { frame.top } else { want as usize };
        Ok((0..n).map(|i| frame.get(i)).collect())
    }

    /// Single metamethod-style call returning one value.
    pub(crate) fn call_meta(&mut self, func: LuaValue, args: Vec<LuaValue>) -> LuaResult<LuaValue> {
        let mut results = self.call_function(func, args, 1)?;
        Ok(results.pop().unwrap_or(LuaValue::Nil))
    }

    // ---- host-function API (operates on the running host frame) ----

    pub fn arg_count(&self) -> usize {
        self.frame().top
    }

    pub fn arg(&self, i: usize) -> LuaValue {
        if i < self.frame().top {
            self.frame().get(i)
        } else {
            LuaValue::Nil
        }
    }

    pub fn args(&self) -> Vec<LuaValue> {
        (0..self.frame().top).map(|i| self.frame().get(i)).collect()
    }

    pub fn args_from(&self, start: usize) -> Vec<LuaValue> {
        (start..self.frame().top)
            .map(|i| self.frame().get(i))
            .collect()
    }

    pub fn push_value(&mut self, v: LuaValue) {
        self.frame_mut().push(v);
    }

    /// Upvalue of the running host closure; host closures use these to
    /// carry bound data (coroutine.wrap, for instance).
    pub fn current_upvalue(&self, i: usize) -> LuaValue {
        let cl = self.current_closure();
        match cl.upvals.get(i) {
            Some(cell) => cell.borrow().clone(),
            None => LuaValue::Nil,
        }
    }

    /// Argument-check helper for library code: raises a positioned error
    /// naming the function and parameter.
    pub fn check_arg(&self, cond: bool, index: usize, fname: &str, expected: &str) -> LuaResult<()> {
        if cond {
            return Ok(());
        }
        let got = self.arg(index).type_name();
        Err(self.runtime_error(format!(
            "bad argument #{} to '{}' ({} expected, got {})",
            index + 1,
            fname,
            expected,
            got
        )))
    }

    /// Instantiate a chunk: a closure over the given prototype with `_ENV`
    /// bound to the globals table.
    pub fn make_chunk_closure(&self, proto: Rc<Prototype>) -> LuaValue {
        let mut upvals = Vec::with_capacity(proto.upvalues.len());
        for (i, desc) in proto.upvalues.iter().enumerate() {
            if i == 0 || desc.name == "_ENV" {
                upvals.push(new_cell(LuaValue::Table(self.globals())));
            } else {
                upvals.push(new_cell(LuaValue::Nil));
            }
        }
        LuaValue::Function(Closure::from_proto(proto, upvals))
    }
}

impl From<&crate::binchunk::Constant> for LuaValue {
    fn from(k: &crate::binchunk::Constant) -> LuaValue {
        use crate::binchunk::Constant;
        match k {
            Constant::Nil => LuaValue::Nil,
            Constant::Boolean(b) => LuaValue::Boolean(*b),
            Constant::Integer(i) => LuaValue::Integer(*i),
            Constant::Float(f) => LuaValue::Float(*f),
            Constant::Str(s) => LuaValue::from_string(s),
        }
    }
}
