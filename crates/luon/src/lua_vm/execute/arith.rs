// Arithmetic, logic, length and concatenation.

use crate::lua_value::LuaValue;
use crate::lua_vm::LuaResult;
use crate::lua_vm::instruction::Instruction;
use crate::lua_vm::lua_state::LuaState;
use crate::lua_vm::metamethod;

pub(super) fn binary(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let vb = s.rk_value(i.b());
    let vc = s.rk_value(i.c());
    let r = metamethod::arith(s, i.opcode(), &vb, &vc)?;
    s.set_reg(i.a(), r);
    Ok(())
}

pub(super) fn unm(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let v = s.reg(i.b());
    let r = metamethod::unary_minus(s, &v)?;
    s.set_reg(i.a(), r);
    Ok(())
}

pub(super) fn bnot(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let v = s.reg(i.b());
    let r = metamethod::bitwise_not(s, &v)?;
    s.set_reg(i.a(), r);
    Ok(())
}

pub(super) fn not(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let v = s.reg(i.b());
    s.set_reg(i.a(), LuaValue::Boolean(!v.truthy()));
    Ok(())
}

pub(super) fn len(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let v = s.reg(i.b());
    let r = metamethod::length_of(s, &v)?;
    s.set_reg(i.a(), r);
    Ok(())
}

/// CONCAT a b c: fold registers b..c right to left, so metamethods see the
/// same pairing as nested `..`.
pub(super) fn concat(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let (b, c) = (i.b(), i.c());
    let mut acc = s.reg(c);
    for r in (b..c).rev() {
        let lhs = s.reg(r);
        acc = metamethod::concat_pair(s, &lhs, &acc)?;
    }
    s.set_reg(i.a(), acc);
    Ok(())
}
