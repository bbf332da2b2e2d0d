// Serializes a Prototype tree into the binary chunk layout.
// Writing into a Vec cannot fail, so this side is infallible; all
// validation lives in the reader.

use super::*;

pub fn dump(proto: &Prototype) -> Vec<u8> {
    let mut w = Writer { data: Vec::new() };
    w.write_header();
    w.write_byte(proto.upvalues.len() as u8);
    w.write_proto(proto);
    w.data
}

struct Writer {
    data: Vec<u8>,
}

impl Writer {
    fn write_header(&mut self) {
        self.write_bytes(LUA_SIGNATURE);
        self.write_byte(LUAC_VERSION);
        self.write_byte(LUAC_FORMAT);
        self.write_bytes(LUAC_DATA);
        self.write_byte(CINT_SIZE);
        self.write_byte(CSIZET_SIZE);
        self.write_byte(INSTRUCTION_SIZE);
        self.write_byte(LUA_INTEGER_SIZE);
        self.write_byte(LUA_NUMBER_SIZE);
        self.write_lua_integer(LUAC_INT);
        self.write_lua_number(LUAC_NUM);
    }

    fn write_proto(&mut self, proto: &Prototype) {
        self.write_string(&proto.source);
        self.write_u32(proto.line_defined);
        self.write_u32(proto.last_line_defined);
        self.write_byte(proto.num_params);
        self.write_byte(proto.is_vararg);
        self.write_byte(proto.max_stack_size);

        self.write_u32(proto.code.len() as u32);
        for inst in &proto.code {
            self.write_u32(*inst);
        }

        self.write_u32(proto.constants.len() as u32);
        for k in &proto.constants {
            self.write_constant(k);
        }

        self.write_u32(proto.upvalues.len() as u32);
        for uv in &proto.upvalues {
            self.write_string(&uv.name);
            self.write_byte(uv.in_stack);
            self.write_byte(uv.idx);
        }

        self.write_u32(proto.protos.len() as u32);
        for p in &proto.protos {
            self.write_proto(p);
        }

        self.write_u32(proto.line_info.len() as u32);
        for line in &proto.line_info {
            self.write_u32(*line);
        }

        self.write_u32(proto.loc_vars.len() as u32);
        for lv in &proto.loc_vars {
            self.write_string(&lv.var_name);
            self.write_u32(lv.start_pc);
            self.write_u32(lv.end_pc);
        }
    }

    fn write_constant(&mut self, k: &Constant) {
        match k {
            Constant::Nil => self.write_byte(TAG_NIL),
            Constant::Boolean(b) => {
                self.write_byte(TAG_BOOLEAN);
                self.write_byte(if *b { 1 } else { 0 });
            }
            Constant::Integer(i) => {
                self.write_byte(TAG_INTEGER);
                self.write_lua_integer(*i);
            }
            Constant::Float(n) => {
                self.write_byte(TAG_NUMBER);
                self.write_lua_number(*n);
            }
            Constant::Str(s) => {
                if s.len() < 0xFE {
                    self.write_byte(TAG_SHORT_STR);
                } else {
                    self.write_byte(TAG_LONG_STR);
                }
                self.write_string(s);
            }
        }
    }

    fn write_byte(&mut self, b: u8) {
        self.data.push(b);
    }

    fn write_bytes(&mut self, b: &[u8]) {
        self.data.extend_from_slice(b);
    }

    fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_lua_integer(&mut self, i: i64) {
        self.write_u64(i as u64);
    }

    fn write_lua_number(&mut self, n: f64) {
        self.write_u64(n.to_bits());
    }

    // Length-prefixed string: 0 = absent, otherwise len+1 in one byte.
    // Strings of 254 bytes or more escape to a 64-bit length, like luac.
    fn write_string(&mut self, s: &str) {
        if s.is_empty() {
            self.write_byte(1);
            return;
        }
        let n = s.len() + 1;
        if n < 0xFF {
            self.write_byte(n as u8);
        } else {
            self.write_byte(0xFF);
            self.write_u64(n as u64);
        }
        self.write_bytes(s.as_bytes());
    }
}
