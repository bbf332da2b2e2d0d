// Statements, control flow and literal forms.

use super::run;

#[test]
fn test_local_declarations() {
    run(r#"
        local a, b, c = 1, 2
        assert(a == 1 and b == 2 and c == nil)
        local x = 1
        local x = x + 1
        assert(x == 2)
        a, b = b, a
        assert(a == 2 and b == 1)
    "#);
}

#[test]
fn test_if_elseif_else() {
    run(r#"
        local function classify(n)
            if n < 0 then
                return "negative"
            elseif n == 0 then
                return "zero"
            elseif n < 10 then
                return "small"
            else
                return "big"
            end
        end
        assert(classify(-5) == "negative")
        assert(classify(0) == "zero")
        assert(classify(3) == "small")
        assert(classify(99) == "big")
    "#);
}

#[test]
fn test_while_and_break() {
    run(r#"
        local n = 0
        while true do
            n = n + 1
            if n == 10 then break end
        end
        assert(n == 10)

        local outer = 0
        while outer < 3 do
            local inner = 0
            while true do
                inner = inner + 1
                if inner == 2 then break end
            end
            assert(inner == 2)
            outer = outer + 1
        end
        assert(outer == 3)
    "#);
}

#[test]
fn test_repeat_until_scope() {
    run(r#"
        local i = 0
        repeat
            local j = i
            i = i + 1
        until j >= 3
        assert(i == 4)
    "#);
}

#[test]
fn test_numeric_for() {
    run(r#"
        local s = 0
        for i = 1, 5 do s = s + i end
        assert(s == 15)

        local n = 0
        for i = 1, 10 do n = n + 1 end
        assert(n == 10)
        n = 0
        for i = 10, 1, -1 do n = n + 1 end
        assert(n == 10)

        local down = {}
        for i = 5, 1, -1 do down[#down + 1] = i end
        assert(down[1] == 5 and down[5] == 1)

        local f = 0
        for i = 1, 2, 0.5 do f = f + i end
        assert(f == 4.5)

        local never = 0
        for i = 1, 0 do never = never + 1 end
        assert(never == 0)
    "#);
}

#[test]
fn test_generic_for() {
    run(r#"
        local t = {10, 20, 30}
        local sum, count = 0, 0
        for i, v in ipairs(t) do
            sum = sum + v
            count = count + 1
            assert(t[i] == v)
        end
        assert(sum == 60 and count == 3)

        local keys = 0
        for k in pairs({a = 1, b = 2, c = 3}) do keys = keys + 1 end
        assert(keys == 3)
    "#);
}

#[test]
fn test_goto_continue() {
    run(r#"
        local n = 0
        for i = 1, 5 do
            if i % 2 == 0 then goto continue end
            n = n + i
            ::continue::
        end
        assert(n == 9)
    "#);
}

#[test]
fn test_method_definition() {
    run(r#"
        local obj = {n = 0}
        function obj:add(k)
            self.n = self.n + k
            return self
        end
        obj:add(3):add(4)
        assert(obj.n == 7)

        local lib = {inner = {}}
        function lib.inner.twice(x) return x * 2 end
        assert(lib.inner.twice(21) == 42)
    "#);
}

#[test]
fn test_string_literals() {
    run(r#"
        assert("\65" == "A")
        assert("\x41" == "A")
        assert("\u{48}\u{69}" == "Hi")
        assert("a\tb" ~= "a b")
        assert('single' == "single")
        assert(#"héllo" == 6)
        assert("héllo" ~= "hello")
        assert([[long
line]] == "long\nline")
        assert([==[bracket ]] inside]==] == "bracket ]] inside")
    "#);
}

#[test]
fn test_comments() {
    run(r#"
        -- line comment
        local a = 1 -- trailing
        --[[ block
             comment ]]
        local b = 2
        --[==[ nested ]] level ]==]
        assert(a + b == 3)
    "#);
}

#[test]
fn test_varargs() {
    run(r#"
        local function count(...)
            return select('#', ...)
        end
        assert(count() == 0)
        assert(count(1, nil, 3) == 3)

        local function tail(...)
            return select(2, ...)
        end
        local a, b = tail("x", "y", "z")
        assert(a == "y" and b == "z")

        local function pack(...)
            return {...}
        end
        local t = pack(7, 8, 9)
        assert(#t == 3 and t[3] == 9)
    "#);
}

#[test]
fn test_parens_truncate_results() {
    run(r#"
        local function two() return 1, 2 end
        local a, b = (two())
        assert(a == 1 and b == nil)
        local t = {(two())}
        assert(#t == 1)
    "#);
}

#[test]
fn test_chunk_returns_values() {
    let mut vm = crate::LuaVM::new();
    vm.open_libs();
    let results = vm.execute("return 1 + 2, 'ok'").unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0], crate::LuaValue::Integer(3));
    assert_eq!(results[1].as_str(), Some("ok"));
}
