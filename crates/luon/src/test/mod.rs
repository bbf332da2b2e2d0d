// Full-pipeline tests: each script runs through compile + execute with its
// assertions written in Lua.

pub mod test_binchunk;
pub mod test_closures;
pub mod test_coroutine;
pub mod test_errors;
pub mod test_operators;
pub mod test_syntax;
pub mod test_table;

use crate::LuaVM;

pub(crate) fn run(src: &str) {
    let mut vm = LuaVM::new();
    vm.open_libs();
    if let Err(e) = vm.execute(src) {
        panic!("script failed: {e}");
    }
}

pub(crate) fn run_err(src: &str) -> String {
    let mut vm = LuaVM::new();
    vm.open_libs();
    match vm.execute(src) {
        Ok(_) => panic!("script unexpectedly succeeded"),
        Err(e) => e.to_string(),
    }
}
