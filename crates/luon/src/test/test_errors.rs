// Error raising, pcall recovery and compile-time diagnostics.

use super::{run, run_err};
use crate::{LuaError, LuaVM};

#[test]
fn test_error_with_position_prefix() {
    let msg = run_err("\nerror('boom')");
    assert!(msg.contains("main:2: boom"), "got: {msg}");
}

#[test]
fn test_error_level_zero_raw_message() {
    let msg = run_err("error('raw', 0)");
    assert_eq!(msg, "raw");
}

#[test]
fn test_error_with_non_string_value() {
    run(r#"
        local sentinel = {}
        local ok, caught = pcall(function() error(sentinel) end)
        assert(ok == false)
        assert(caught == sentinel)
    "#);
}

#[test]
fn test_pcall_recovers() {
    run(r#"
        local ok, msg = pcall(function() error("inside") end)
        assert(ok == false and type(msg) == "string")

        local ok2, a, b = pcall(function() return 1, 2 end)
        assert(ok2 == true and a == 1 and b == 2)

        -- nested pcall: inner failure does not escape
        local ok3 = pcall(function()
            local inner_ok = pcall(error)
            assert(inner_ok == false)
            return true
        end)
        assert(ok3 == true)
    "#);
}

#[test]
fn test_call_non_function() {
    let msg = run_err("local x = nil x(1)");
    assert!(msg.contains("attempt to call a nil value"), "got: {msg}");
    let msg = run_err("local s = 'text' s()");
    assert!(msg.contains("attempt to call a string value"), "got: {msg}");
}

#[test]
fn test_index_non_table() {
    let msg = run_err("local n = 5 return n.field");
    assert!(msg.contains("attempt to index a number value"), "got: {msg}");
    let msg = run_err("local t = nil t.x = 1");
    assert!(msg.contains("attempt to index a nil value"), "got: {msg}");
}

#[test]
fn test_arith_type_errors() {
    let msg = run_err("return {} + 1");
    assert!(msg.contains("attempt to perform arithmetic on a table value"), "got: {msg}");
    let msg = run_err("return nil .. 'x'");
    assert!(msg.contains("attempt to concatenate a nil value"), "got: {msg}");
    let msg = run_err("return {} < {}");
    assert!(msg.contains("attempt to compare table with table"), "got: {msg}");
}

#[test]
fn test_assertion_messages() {
    let msg = run_err("assert(false)");
    assert!(msg.contains("assertion failed!"), "got: {msg}");
    let msg = run_err("assert(nil, 'custom reason')");
    assert_eq!(msg, "custom reason");
}

#[test]
fn test_stack_overflow_is_caught() {
    run(r#"
        local function dive() return 1 + dive() end
        local ok, msg = pcall(dive)
        assert(ok == false)
    "#);
}

#[test]
fn test_lex_errors() {
    let mut vm = LuaVM::new();
    let err = vm.execute("local s = 'unfinished").unwrap_err();
    assert!(matches!(err, LuaError::Lex { .. }), "got: {err}");

    let err = vm.execute("return 0x").unwrap_err();
    assert!(matches!(err, LuaError::Lex { .. }), "got: {err}");
}

#[test]
fn test_parse_errors() {
    let mut vm = LuaVM::new();
    for src in [
        "if true then",
        "local = 5",
        "return 1 +",
        "return 1 end",
        "end",
        "function f( end",
    ] {
        let err = vm.execute(src).unwrap_err();
        assert!(matches!(err, LuaError::Parse { .. }), "src {src:?} got: {err}");
    }
}

#[test]
fn test_break_outside_loop() {
    let mut vm = LuaVM::new();
    let err = vm.execute("break").unwrap_err();
    let text = err.to_string();
    assert!(text.contains("break"), "got: {text}");
}

#[test]
fn test_unresolved_goto() {
    let mut vm = LuaVM::new();
    assert!(vm.execute("goto nowhere").is_err());
}

#[test]
fn test_for_loop_type_errors() {
    let msg = run_err("for i = {}, 10 do end");
    assert!(msg.contains("'for' initial value must be a number"), "got: {msg}");
    let msg = run_err("for i = 1, 10, 0 do end");
    assert!(msg.contains("'for' step is zero"), "got: {msg}");
}
