// Closures, upvalues, recursion and calls.

use super::run;

#[test]
fn test_counter_closure() {
    run(r#"
        local function make_counter()
            local n = 0
            return function()
                n = n + 1
                return n
            end
        end
        local c1 = make_counter()
        local c2 = make_counter()
        assert(c1() == 1 and c1() == 2 and c1() == 3)
        assert(c2() == 1)
    "#);
}

#[test]
fn test_shared_upvalue() {
    run(r#"
        local function make()
            local n = 0
            local function inc() n = n + 1 end
            local function get() return n end
            return inc, get
        end
        local inc, get = make()
        inc()
        inc()
        assert(get() == 2)
    "#);
}

#[test]
fn test_nested_upvalue_chain() {
    run(r#"
        local x = "outer"
        local function level1()
            local function level2()
                local function level3()
                    return x
                end
                return level3()
            end
            return level2()
        end
        assert(level1() == "outer")
    "#);
}

#[test]
fn test_local_function_recursion() {
    run(r#"
        local function fib(n)
            if n < 2 then return n end
            return fib(n - 1) + fib(n - 2)
        end
        assert(fib(10) == 55)

        local function fact(n)
            if n == 0 then return 1 end
            return n * fact(n - 1)
        end
        assert(fact(6) == 720)
    "#);
}

#[test]
fn test_tail_call_depth() {
    run(r#"
        local function loop(n)
            if n == 0 then return "done" end
            return loop(n - 1)
        end
        assert(loop(100000) == "done")
    "#);
}

#[test]
fn test_multiple_returns() {
    run(r#"
        local function three() return 1, 2, 3 end
        local a, b, c, d = three()
        assert(a == 1 and b == 2 and c == 3 and d == nil)

        -- only the last call in a list spreads
        local x, y, z = three(), three()
        assert(x == 1 and y == 1 and z == 2)

        local t = {three(), three()}
        assert(#t == 4)

        local function sum(...)
            local s = 0
            for _, v in ipairs({...}) do s = s + v end
            return s
        end
        assert(sum(three()) == 6)
    "#);
}

#[test]
fn test_globals_through_env() {
    run(r#"
        x = 5
        assert(x == 5)
        assert(_G.x == 5)
        _G.y = 6
        assert(y == 6)
        local function set_global()
            z = x + y
        end
        set_global()
        assert(z == 11)
    "#);
}

#[test]
fn test_higher_order_functions() {
    run(r#"
        local function apply(f, v) return f(v) end
        assert(apply(function(n) return n * 2 end, 21) == 42)

        local function compose(f, g)
            return function(x) return f(g(x)) end
        end
        local add1 = function(x) return x + 1 end
        local dbl = function(x) return x * 2 end
        assert(compose(add1, dbl)(5) == 11)
    "#);
}

#[test]
fn test_default_nil_parameters() {
    run(r#"
        local function f(a, b)
            return a, b
        end
        local a, b = f(1)
        assert(a == 1 and b == nil)
        local c, d = f(1, 2, 3)
        assert(c == 1 and d == 2)
    "#);
}
