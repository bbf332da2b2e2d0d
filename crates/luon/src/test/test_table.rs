// Tables, constructors and the metatable protocol.

use super::run;

#[test]
fn test_constructors() {
    run(r#"
        local t = {1, 2, 3, x = "a", ["y"] = "b", [10] = "c"}
        assert(t[1] == 1 and t[3] == 3)
        assert(t.x == "a" and t.y == "b" and t[10] == "c")
        assert(#t == 3)

        local nested = {inner = {deep = {value = 42}}}
        assert(nested.inner.deep.value == 42)

        local mixed = {[1] = "one"; "override"}
        assert(mixed[1] == "override")
    "#);
}

#[test]
fn test_large_constructor_batches() {
    // more than one 50-slot SETLIST batch
    let items: Vec<String> = (1..=60).map(|i| i.to_string()).collect();
    let src = format!(
        "local t = {{{}}} assert(#t == 60 and t[55] == 55 and t[60] == 60)",
        items.join(", ")
    );
    run(&src);
}

#[test]
fn test_assignment_and_removal() {
    run(r#"
        local t = {}
        t.a = 1
        t["b"] = 2
        t[1] = "first"
        assert(t.a == 1 and t.b == 2 and t[1] == "first")
        t.a = nil
        assert(t.a == nil)
        t[1] = nil
        assert(#t == 0)
    "#);
}

#[test]
fn test_length_border_with_hole() {
    run(r#"
        local t = {1, 2, 3}
        t[5] = 5
        assert(#t == 3)
        -- stable across repeated reads with no mutation between them
        assert(#t == #t)
        t[4] = 4
        assert(#t == 5)
    "#);
}

#[test]
fn test_float_keys_normalize() {
    run(r#"
        local t = {}
        t[2.0] = "two"
        assert(t[2] == "two")
        t[0.5] = "half"
        assert(t[0.5] == "half" and t[2] == "two")
    "#);
}

#[test]
fn test_index_metamethod() {
    run(r#"
        local base = {greet = function() return "hi" end, n = 1}
        local t = setmetatable({}, {__index = base})
        assert(t.greet() == "hi")
        assert(t.n == 1)
        t.n = 5
        assert(t.n == 5 and base.n == 1)

        local u = setmetatable({}, {__index = function(_, k) return k .. "!" end})
        assert(u.boom == "boom!")

        -- chained __index
        local top = setmetatable({}, {__index = setmetatable({}, {__index = base})})
        assert(top.greet() == "hi")
    "#);
}

#[test]
fn test_newindex_metamethod() {
    run(r#"
        local log = {}
        local t = setmetatable({}, {
            __newindex = function(tbl, k, v)
                log[#log + 1] = k
                rawset(tbl, k, v)
            end,
        })
        t.a = 1
        t.a = 2 -- key exists now, no metamethod
        t.b = 3
        assert(t.a == 2 and t.b == 3)
        assert(#log == 2 and log[1] == "a" and log[2] == "b")

        local store = {}
        local proxy = setmetatable({}, {__newindex = store})
        proxy.k = "v"
        assert(store.k == "v" and rawget(proxy, "k") == nil)
    "#);
}

#[test]
fn test_call_metamethod() {
    run(r#"
        local callable = setmetatable({}, {
            __call = function(self, a, b) return a + b end,
        })
        assert(callable(2, 3) == 5)
        local plain = {}
        assert(not pcall(function() return plain(1) end))
    "#);
}

#[test]
fn test_comparison_metamethods() {
    run(r#"
        local mt = {
            __eq = function(a, b) return a.v == b.v end,
            __lt = function(a, b) return a.v < b.v end,
        }
        local a = setmetatable({v = 1}, mt)
        local b = setmetatable({v = 1}, mt)
        local c = setmetatable({v = 2}, mt)
        assert(a == b)
        assert(a ~= c)
        assert(a < c)
        assert(not (c < a))
        -- no __le: falls back to not (b < a)
        assert(a <= c and a <= b)
    "#);
}

#[test]
fn test_arith_metamethods() {
    run(r#"
        local mt
        mt = {
            __add = function(a, b) return setmetatable({v = a.v + b.v}, mt) end,
            __unm = function(a) return setmetatable({v = -a.v}, mt) end,
        }
        local a = setmetatable({v = 3}, mt)
        local b = setmetatable({v = 4}, mt)
        assert((a + b).v == 7)
        assert((-a).v == -3)
    "#);
}

#[test]
fn test_concat_len_tostring_metamethods() {
    run(r#"
        local mt = {
            __concat = function(a, b)
                local av = type(a) == "table" and a.name or a
                local bv = type(b) == "table" and b.name or b
                return av .. "/" .. bv
            end,
            __len = function() return 99 end,
            __tostring = function(t) return "<" .. t.name .. ">" end,
        }
        local t = setmetatable({name = "box"}, mt)
        assert(t .. "x" == "box/x")
        assert("x" .. t == "x/box")
        assert(#t == 99)
        assert(tostring(t) == "<box>")
    "#);
}

#[test]
fn test_metatable_protection() {
    run(r#"
        local t = setmetatable({}, {__metatable = "locked"})
        assert(getmetatable(t) == "locked")
        assert(not pcall(setmetatable, t, {}))

        local open = setmetatable({}, {})
        assert(type(getmetatable(open)) == "table")
        setmetatable(open, nil)
        assert(getmetatable(open) == nil)
    "#);
}

#[test]
fn test_raw_access() {
    run(r#"
        local t = setmetatable({}, {
            __index = function() return "shadow" end,
            __newindex = function() error("blocked") end,
        })
        assert(t.missing == "shadow")
        assert(rawget(t, "missing") == nil)
        rawset(t, "k", 1)
        assert(rawget(t, "k") == 1)

        local a, b = {}, {}
        assert(rawequal(a, a) and not rawequal(a, b))
        assert(rawlen({1, 2, 3}) == 3)
        assert(rawlen("word") == 4)
    "#);
}

#[test]
fn test_next_iteration() {
    run(r#"
        local t = {a = 1, b = 2}
        local count = 0
        local k, v = next(t)
        while k ~= nil do
            count = count + 1
            assert(t[k] == v)
            k, v = next(t, k)
        end
        assert(count == 2)
        assert(next({}) == nil)
    "#);
}

#[test]
fn test_pairs_metamethod() {
    run(r#"
        local backing = {x = 1}
        local t = setmetatable({}, {
            __pairs = function()
                return next, backing, nil
            end,
        })
        local seen = 0
        for k, v in pairs(t) do
            seen = seen + 1
            assert(k == "x" and v == 1)
        end
        assert(seen == 1)
    "#);
}
