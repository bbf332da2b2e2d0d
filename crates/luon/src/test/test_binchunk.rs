// Binary chunk encode/decode and loading through the VM.

use crate::binchunk::{dump, is_binary_chunk, undump};
use crate::compiler::compile;
use crate::{LuaError, LuaVM, LuaValue};

const SAMPLE: &str = r#"
    local function add(a, b) return a + b end
    local t = {x = 1, 2, 3}
    return add(t.x, t[2]) + #"str"
"#;

#[test]
fn test_signature_detection() {
    let proto = compile(SAMPLE, "sample").unwrap();
    let bytes = dump(&proto);
    assert!(is_binary_chunk(&bytes));
    assert!(!is_binary_chunk(b"print('hello')"));
    assert!(!is_binary_chunk(b""));
}

#[test]
fn test_dump_undump_preserves_structure() {
    let proto = compile(SAMPLE, "sample").unwrap();
    let reloaded = undump(&dump(&proto)).unwrap();

    assert_eq!(reloaded.code, proto.code);
    assert_eq!(reloaded.constants, proto.constants);
    assert_eq!(reloaded.num_params, proto.num_params);
    assert_eq!(reloaded.is_vararg, proto.is_vararg);
    assert_eq!(reloaded.max_stack_size, proto.max_stack_size);
    assert_eq!(reloaded.upvalues, proto.upvalues);
    assert_eq!(reloaded.line_info, proto.line_info);
    assert_eq!(reloaded.protos.len(), proto.protos.len());
    // nested prototypes survive too
    assert_eq!(reloaded.protos[0].code, proto.protos[0].code);
}

#[test]
fn test_execute_reloaded_chunk() {
    let proto = compile("return 6 * 7", "chunk").unwrap();
    let bytes = dump(&proto);

    let mut vm = LuaVM::new();
    vm.open_libs();
    let f = vm.load(&bytes, "chunk").unwrap();
    let results = vm
        .main
        .state
        .borrow_mut()
        .call_function(f, Vec::new(), -1)
        .unwrap();
    assert_eq!(results, vec![LuaValue::Integer(42)]);
}

#[test]
fn test_reloaded_closure_keeps_upvalues() {
    let src = r#"
        local n = 0
        local function bump() n = n + 1 return n end
        bump()
        return bump()
    "#;
    let bytes = dump(&compile(src, "chunk").unwrap());
    let mut vm = LuaVM::new();
    vm.open_libs();
    let f = vm.load(&bytes, "chunk").unwrap();
    let results = vm
        .main
        .state
        .borrow_mut()
        .call_function(f, Vec::new(), -1)
        .unwrap();
    assert_eq!(results, vec![LuaValue::Integer(2)]);
}

#[test]
fn test_bad_header_rejected() {
    let proto = compile("return 1", "chunk").unwrap();
    let mut bytes = dump(&proto);

    // wrong signature
    let mut broken = bytes.clone();
    broken[0] = b'X';
    assert!(matches!(undump(&broken), Err(LuaError::ChunkFormat(_))));

    // wrong version byte
    bytes[4] ^= 0xFF;
    assert!(matches!(undump(&bytes), Err(LuaError::ChunkFormat(_))));
}

#[test]
fn test_zero_length_long_string_rejected() {
    let bytes = dump(&compile("return 1", "chunk").unwrap());
    // Keep the header and the upvalue-count byte, then claim the source
    // name is a long-form string of length zero.
    let mut crafted = bytes[..34].to_vec();
    crafted.push(0xFF);
    crafted.extend_from_slice(&[0u8; 8]);
    assert!(matches!(undump(&crafted), Err(LuaError::ChunkFormat(_))));
}

#[test]
fn test_opcode_names_and_modes() {
    use crate::lua_vm::Instruction;
    use crate::lua_vm::opcode::{OpCode, OpMode};

    // 1 + 2 folds to a constant, so the body starts with LOADK.
    let proto = compile("return 1 + 2", "chunk").unwrap();
    let first = Instruction(proto.code[0]);
    assert_eq!(first.opcode(), OpCode::LoadK);
    assert_eq!(first.opcode().name(), "LOADK");
    assert_eq!(first.opcode().mode(), OpMode::IABx);

    let last = Instruction(*proto.code.last().unwrap());
    assert_eq!(last.opcode(), OpCode::Return);
    assert_eq!(last.opcode().name(), "RETURN");
    assert_eq!(last.opcode().mode(), OpMode::IABC);

    assert_eq!(OpCode::Jmp.mode(), OpMode::IAsBx);
    assert_eq!(OpCode::ExtraArg.mode(), OpMode::IAx);

    for raw in 0..47u8 {
        let op = OpCode::from_u8(raw).unwrap();
        assert_eq!(op as u8, raw);
        assert!(!op.name().is_empty());
    }
    assert!(OpCode::from_u8(47).is_none());
}

#[test]
fn test_truncated_chunk_rejected() {
    let proto = compile("return 1 + 2", "chunk").unwrap();
    let bytes = dump(&proto);
    for cut in [bytes.len() - 1, bytes.len() / 2, 10] {
        assert!(
            matches!(undump(&bytes[..cut]), Err(LuaError::ChunkFormat(_))),
            "cut at {cut} was accepted"
        );
    }
}
