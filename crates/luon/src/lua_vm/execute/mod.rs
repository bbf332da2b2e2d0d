// Instruction dispatch. Handlers are grouped by concern; each receives the
// running state and the decoded word.

mod arith;
mod compare;
mod control;
mod load;
mod loops;
mod table;

use crate::lua_vm::instruction::Instruction;
use crate::lua_vm::lua_state::LuaState;
use crate::lua_vm::{LuaResult, OpCode};

impl LuaState {
    pub(crate) fn execute_inst(&mut self, inst: Instruction) -> LuaResult<()> {
        match inst.opcode() {
            OpCode::Move => load::mov(self, inst),
            OpCode::LoadK => load::load_k(self, inst),
            OpCode::LoadKx => load::load_kx(self, inst),
            OpCode::LoadBool => load::load_bool(self, inst),
            OpCode::LoadNil => load::load_nil(self, inst),
            OpCode::GetUpval => control::get_upval(self, inst),
            OpCode::GetTabUp => table::get_tab_up(self, inst),
            OpCode::GetTable => table::get_table(self, inst),
            OpCode::SetTabUp => table::set_tab_up(self, inst),
            OpCode::SetUpval => control::set_upval(self, inst),
            OpCode::SetTable => table::set_table(self, inst),
            OpCode::NewTable => table::new_table(self, inst),
            OpCode::SelfLoad => table::self_load(self, inst),
            OpCode::Add
            | OpCode::Sub
            | OpCode::Mul
            | OpCode::Mod
            | OpCode::Pow
            | OpCode::Div
            | OpCode::IDiv
            | OpCode::BAnd
            | OpCode::BOr
            | OpCode::BXor
            | OpCode::Shl
            | OpCode::Shr => arith::binary(self, inst),
            OpCode::Unm => arith::unm(self, inst),
            OpCode::BNot => arith::bnot(self, inst),
            OpCode::Not => arith::not(self, inst),
            OpCode::Len => arith::len(self, inst),
            OpCode::Concat => arith::concat(self, inst),
            OpCode::Jmp => control::jmp(self, inst),
            OpCode::Eq => compare::eq(self, inst),
            OpCode::Lt => compare::lt(self, inst),
            OpCode::Le => compare::le(self, inst),
            OpCode::Test => compare::test(self, inst),
            OpCode::TestSet => compare::test_set(self, inst),
            OpCode::Call => control::call(self, inst),
            OpCode::TailCall => control::tail_call(self, inst),
            OpCode::Return => control::ret(self, inst),
            OpCode::ForLoop => loops::for_loop(self, inst),
            OpCode::ForPrep => loops::for_prep(self, inst),
            OpCode::TForCall => loops::tfor_call(self, inst),
            OpCode::TForLoop => loops::tfor_loop(self, inst),
            OpCode::SetList => table::set_list(self, inst),
            OpCode::Closure => control::closure(self, inst),
            OpCode::Vararg => control::vararg(self, inst),
            // standalone EXTRAARG: always consumed by its predecessor
            OpCode::ExtraArg => Ok(()),
        }
    }

    pub(crate) fn add_pc(&mut self, delta: i32) {
        let frame = self.frame_mut();
        frame.pc = (frame.pc as i64 + delta as i64) as usize;
    }

    /// Consume the EXTRAARG word following the current instruction.
    pub(crate) fn fetch_extra_arg(&mut self) -> usize {
        let proto = self.current_proto();
        let frame = self.frame_mut();
        let word = Instruction(proto.code[frame.pc]);
        frame.pc += 1;
        word.ax()
    }
}
