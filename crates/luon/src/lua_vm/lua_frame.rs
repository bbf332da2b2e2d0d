// One activation record. Register slots are shared cells so that upvalue
// capture can alias a live register; writes go through the cell, and only
// an explicit close replaces it.

use std::rc::Rc;

use crate::binchunk::Prototype;
use crate::lua_value::{Closure, LuaValue, UpvalueCell, new_cell};

pub struct LuaFrame {
    /// None only for result-collecting base frames.
    pub closure: Option<Rc<Closure>>,
    pub slots: Vec<UpvalueCell>,
    /// Live extent of `slots`; instructions operating "to top" read it.
    pub top: usize,
    pub varargs: Vec<LuaValue>,
    pub pc: usize,
    /// Register in the caller's frame where results land.
    pub ret_dst: usize,
    /// Result count the caller asked for; -1 keeps everything.
    pub want: i32,
}

impl LuaFrame {
    /// Result collector at the bottom of a call; executes nothing.
    pub fn base() -> LuaFrame {
        LuaFrame {
            closure: None,
            slots: Vec::new(),
            top: 0,
            varargs: Vec::new(),
            pc: 0,
            ret_dst: 0,
            want: -1,
        }
    }

    pub fn for_lua(
        closure: Rc<Closure>,
        proto: &Prototype,
        args: Vec<LuaValue>,
        ret_dst: usize,
        want: i32,
    ) -> LuaFrame {
        let num_params = proto.num_params as usize;
        let size = proto.max_stack_size as usize;
        let mut slots = Vec::with_capacity(size);
        for i in 0..size {
            let v = args.get(i).filter(|_| i < num_params).cloned();
            slots.push(new_cell(v.unwrap_or(LuaValue::Nil)));
        }
        let varargs = if proto.is_vararg != 0 && args.len() > num_params {
            args[num_params..].to_vec()
        } else {
            Vec::new()
        };
        LuaFrame {
            closure: Some(closure),
            slots,
            top: size,
            varargs,
            pc: 0,
            ret_dst,
            want,
        }
    }

    pub fn for_host(closure: Rc<Closure>, args: Vec<LuaValue>, ret_dst: usize, want: i32) -> LuaFrame {
        let top = args.len();
        LuaFrame {
            closure: Some(closure),
            slots: args.into_iter().map(new_cell).collect(),
            top,
            varargs: Vec::new(),
            pc: 0,
            ret_dst,
            want,
        }
    }

    pub fn ensure(&mut self, len: usize) {
        while self.slots.len() < len {
            self.slots.push(new_cell(LuaValue::Nil));
        }
    }

    pub fn get(&self, i: usize) -> LuaValue {
        match self.slots.get(i) {
            Some(cell) => cell.borrow().clone(),
            None => LuaValue::Nil,
        }
    }

    pub fn set(&mut self, i: usize, v: LuaValue) {
        self.ensure(i + 1);
        *self.slots[i].borrow_mut() = v;
    }

    pub fn cell(&self, i: usize) -> UpvalueCell {
        self.slots[i].clone()
    }

    /// Close register `i`: captured closures keep the old cell (and its
    /// current value); the frame continues with a fresh one.
    pub fn close_slot(&mut self, i: usize) {
        if let Some(cell) = self.slots.get(i) {
            let v = cell.borrow().clone();
            self.slots[i] = new_cell(v);
        }
    }

    pub fn push(&mut self, v: LuaValue) {
        self.ensure(self.top);
        if self.top < self.slots.len() {
            *self.slots[self.top].borrow_mut() = v;
        } else {
            self.slots.push(new_cell(v));
        }
        self.top += 1;
    }
}
