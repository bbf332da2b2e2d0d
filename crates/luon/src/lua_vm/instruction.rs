// 32-bit instruction word, Lua 5.3 layout:
//
//       31       23       14       6      0
//  iABC |  B(9)  |  C(9)  |  A(8)  | Op(6)|
//  iABx |      Bx(18)     |  A(8)  | Op(6)|
// iAsBx |     sBx(18)     |  A(8)  | Op(6)|
//   iAx |          Ax(26)          | Op(6)|
//
// sBx is stored excess-K: written = value + MAXARG_SBX.

use super::opcode::OpCode;

/// One instruction word. The encoding width is fixed at 32 bits regardless
/// of target platform.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction(pub u32);

pub const MAXARG_BX: u32 = (1 << 18) - 1;
pub const MAXARG_SBX: i32 = (MAXARG_BX >> 1) as i32;

/// RK operands: bit 8 set means "constant pool index" rather than register.
pub const BITRK: u32 = 1 << 8;

impl Instruction {
    #[inline(always)]
    pub fn opcode_raw(self) -> u8 {
        (self.0 & 0x3F) as u8
    }

    #[inline(always)]
    pub fn opcode(self) -> OpCode {
        // Generated code only ever contains valid opcodes; decoded chunks
        // are validated against the same table.
        OpCode::from_u8(self.opcode_raw()).unwrap_or(OpCode::ExtraArg)
    }

    #[inline(always)]
    pub fn a(self) -> usize {
        ((self.0 >> 6) & 0xFF) as usize
    }

    #[inline(always)]
    pub fn c(self) -> usize {
        ((self.0 >> 14) & 0x1FF) as usize
    }

    #[inline(always)]
    pub fn b(self) -> usize {
        ((self.0 >> 23) & 0x1FF) as usize
    }

    #[inline(always)]
    pub fn bx(self) -> usize {
        (self.0 >> 14) as usize
    }

    #[inline(always)]
    pub fn sbx(self) -> i32 {
        self.bx() as i32 - MAXARG_SBX
    }

    #[inline(always)]
    pub fn ax(self) -> usize {
        (self.0 >> 6) as usize
    }

    pub fn abc(op: OpCode, a: usize, b: usize, c: usize) -> Instruction {
        Instruction((b as u32) << 23 | (c as u32) << 14 | (a as u32) << 6 | op as u32)
    }

    pub fn abx(op: OpCode, a: usize, bx: usize) -> Instruction {
        Instruction((bx as u32) << 14 | (a as u32) << 6 | op as u32)
    }

    pub fn asbx(op: OpCode, a: usize, sbx: i32) -> Instruction {
        let bx = (sbx + MAXARG_SBX) as u32;
        Instruction(bx << 14 | (a as u32) << 6 | op as u32)
    }

    pub fn ax_arg(op: OpCode, ax: usize) -> Instruction {
        Instruction((ax as u32) << 6 | op as u32)
    }

    /// True if an RK operand refers to the constant pool.
    #[inline(always)]
    pub fn is_k(arg: usize) -> bool {
        arg as u32 & BITRK != 0
    }

    /// Strip the constant marker from an RK operand.
    #[inline(always)]
    pub fn rk_index(arg: usize) -> usize {
        arg & !(BITRK as usize)
    }
}
