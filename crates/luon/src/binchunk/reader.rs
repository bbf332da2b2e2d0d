// Parses a binary chunk back into a Prototype tree.
// Every header byte and sentinel is validated; truncated input is an error,
// never a silent reinterpretation.

use std::rc::Rc;

use byteorder::{LittleEndian, ReadBytesExt};
use smol_str::SmolStr;

use super::*;
use crate::lua_vm::LuaError;

pub fn undump(data: &[u8]) -> LuaResult<Prototype> {
    let mut r = Reader { data };
    r.check_header()?;
    r.read_byte()?; // size of upvalues of the main closure
    r.read_proto()
}

struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    fn check_header(&mut self) -> LuaResult<()> {
        if self.read_bytes(4)? != LUA_SIGNATURE {
            return Err(err("not a binary chunk"));
        }
        if self.read_byte()? != LUAC_VERSION {
            return Err(err("version mismatch"));
        }
        if self.read_byte()? != LUAC_FORMAT {
            return Err(err("format mismatch"));
        }
        if self.read_bytes(6)? != LUAC_DATA {
            return Err(err("corrupted chunk"));
        }
        if self.read_byte()? != CINT_SIZE {
            return Err(err("int size mismatch"));
        }
        if self.read_byte()? != CSIZET_SIZE {
            return Err(err("size_t size mismatch"));
        }
        if self.read_byte()? != INSTRUCTION_SIZE {
            return Err(err("instruction size mismatch"));
        }
        if self.read_byte()? != LUA_INTEGER_SIZE {
            return Err(err("lua_Integer size mismatch"));
        }
        if self.read_byte()? != LUA_NUMBER_SIZE {
            return Err(err("lua_Number size mismatch"));
        }
        if self.read_lua_integer()? != LUAC_INT {
            return Err(err("endianness mismatch"));
        }
        if self.read_lua_number()? != LUAC_NUM {
            return Err(err("float format mismatch"));
        }
        Ok(())
    }

    fn read_proto(&mut self) -> LuaResult<Prototype> {
        let source = self.read_string()?;
        let line_defined = self.read_u32()?;
        let last_line_defined = self.read_u32()?;
        let num_params = self.read_byte()?;
        let is_vararg = self.read_byte()?;
        let max_stack_size = self.read_byte()?;

        let code = self.read_vec(|r| r.read_u32())?;
        let constants = self.read_vec(|r| r.read_constant())?;
        let upvalues = self.read_vec(|r| {
            Ok(UpvalueDesc {
                name: r.read_string()?,
                in_stack: r.read_byte()?,
                idx: r.read_byte()?,
            })
        })?;
        let protos = self.read_vec(|r| r.read_proto().map(Rc::new))?;
        let line_info = self.read_vec(|r| r.read_u32())?;
        let loc_vars = self.read_vec(|r| {
            Ok(LocVar {
                var_name: r.read_string()?,
                start_pc: r.read_u32()?,
                end_pc: r.read_u32()?,
            })
        })?;

        Ok(Prototype {
            source,
            line_defined,
            last_line_defined,
            num_params,
            is_vararg,
            max_stack_size,
            code,
            constants,
            upvalues,
            protos,
            line_info,
            loc_vars,
        })
    }

    fn read_constant(&mut self) -> LuaResult<Constant> {
        match self.read_byte()? {
            TAG_NIL => Ok(Constant::Nil),
            TAG_BOOLEAN => Ok(Constant::Boolean(self.read_byte()? != 0)),
            TAG_INTEGER => Ok(Constant::Integer(self.read_lua_integer()?)),
            TAG_NUMBER => Ok(Constant::Float(self.read_lua_number()?)),
            TAG_SHORT_STR | TAG_LONG_STR => Ok(Constant::Str(self.read_string()?)),
            tag => Err(err(&format!("unknown constant tag {tag:#04x}"))),
        }
    }

    fn read_vec<T>(
        &mut self,
        mut read_one: impl FnMut(&mut Self) -> LuaResult<T>,
    ) -> LuaResult<Vec<T>> {
        let n = self.read_u32()? as usize;
        let mut out = Vec::with_capacity(n.min(1 << 16));
        for _ in 0..n {
            out.push(read_one(self)?);
        }
        Ok(out)
    }

    fn read_byte(&mut self) -> LuaResult<u8> {
        self.data.read_u8().map_err(truncated)
    }

    fn read_bytes(&mut self, n: usize) -> LuaResult<&'a [u8]> {
        if self.data.len() < n {
            return Err(truncated(()));
        }
        let (head, tail) = self.data.split_at(n);
        self.data = tail;
        Ok(head)
    }

    fn read_u32(&mut self) -> LuaResult<u32> {
        self.data.read_u32::<LittleEndian>().map_err(truncated)
    }

    fn read_u64(&mut self) -> LuaResult<u64> {
        self.data.read_u64::<LittleEndian>().map_err(truncated)
    }

    fn read_lua_integer(&mut self) -> LuaResult<i64> {
        self.data.read_i64::<LittleEndian>().map_err(truncated)
    }

    fn read_lua_number(&mut self) -> LuaResult<f64> {
        self.data.read_f64::<LittleEndian>().map_err(truncated)
    }

    fn read_string(&mut self) -> LuaResult<SmolStr> {
        let size = match self.read_byte()? {
            0 => return Ok(SmolStr::default()),
            // long-form lengths below 0xFF would have used the short form
            0xFF => match self.read_u64()? as usize {
                0 => return Err(err("bad string length")),
                n => n,
            },
            n => n as usize,
        };
        let bytes = self.read_bytes(size - 1)?;
        match std::str::from_utf8(bytes) {
            Ok(s) => Ok(SmolStr::new(s)),
            Err(_) => Err(err("string constant is not valid utf-8")),
        }
    }
}

fn err(message: &str) -> LuaError {
    LuaError::ChunkFormat(message.to_string())
}

fn truncated<E>(_: E) -> LuaError {
    LuaError::ChunkFormat("truncated chunk".to_string())
}
