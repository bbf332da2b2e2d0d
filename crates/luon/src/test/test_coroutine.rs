// Coroutine creation, value transfer in both directions, status and wrap.

use super::run;

#[test]
fn test_create_and_resume() {
    run(r#"
        local co = coroutine.create(function()
            return 42
        end)
        assert(type(co) == "thread")
        local ok, value = coroutine.resume(co)
        assert(ok == true and value == 42)
    "#);
}

#[test]
fn test_yield_sequence() {
    run(r#"
        local co = coroutine.create(function()
            coroutine.yield(1)
            coroutine.yield(2)
            return 3
        end)
        local ok1, v1 = coroutine.resume(co)
        assert(ok1 and v1 == 1)
        local ok2, v2 = coroutine.resume(co)
        assert(ok2 and v2 == 2)
        local ok3, v3 = coroutine.resume(co)
        assert(ok3 and v3 == 3)
        local ok4 = coroutine.resume(co)
        assert(ok4 == false)
    "#);
}

#[test]
fn test_value_transfer_both_ways() {
    run(r#"
        local co = coroutine.create(function(a, b)
            local c, d = coroutine.yield(a + b)
            return c - d
        end)
        local ok, sum = coroutine.resume(co, 3, 4)
        assert(ok and sum == 7)
        local ok2, diff = coroutine.resume(co, 10, 4)
        assert(ok2 and diff == 6)
    "#);
}

#[test]
fn test_multiple_yield_values() {
    run(r#"
        local co = coroutine.create(function()
            coroutine.yield(1, 2, 3)
            return "end"
        end)
        local ok, a, b, c = coroutine.resume(co)
        assert(ok and a == 1 and b == 2 and c == 3)
    "#);
}

#[test]
fn test_status_transitions() {
    run(r#"
        local co
        co = coroutine.create(function()
            assert(coroutine.status(co) == "running")
            coroutine.yield()
        end)
        assert(coroutine.status(co) == "suspended")
        coroutine.resume(co)
        assert(coroutine.status(co) == "suspended")
        coroutine.resume(co)
        assert(coroutine.status(co) == "dead")
    "#);
}

#[test]
fn test_resume_dead_fails() {
    run(r#"
        local co = coroutine.create(function() end)
        assert(coroutine.resume(co))
        local ok, msg = coroutine.resume(co)
        assert(ok == false and msg == "cannot resume dead coroutine")
    "#);
}

#[test]
fn test_error_inside_coroutine() {
    run(r#"
        local co = coroutine.create(function()
            error("inner fault")
        end)
        local ok, msg = coroutine.resume(co)
        assert(ok == false)
        assert(type(msg) == "string")
        assert(coroutine.status(co) == "dead")
    "#);
}

#[test]
fn test_wrap() {
    run(r#"
        local gen = coroutine.wrap(function(a)
            local b = coroutine.yield(a + 1)
            return b * 2
        end)
        assert(gen(1) == 2)
        assert(gen(10) == 20)

        local boom = coroutine.wrap(function() error("bad") end)
        assert(not pcall(boom))
    "#);
}

#[test]
fn test_wrap_as_iterator() {
    run(r#"
        local function range(n)
            return coroutine.wrap(function()
                for i = 1, n do coroutine.yield(i) end
            end)
        end
        local sum = 0
        for i in range(5) do sum = sum + i end
        assert(sum == 15)
    "#);
}

#[test]
fn test_isyieldable_and_running() {
    run(r#"
        assert(coroutine.isyieldable() == false)
        local main, is_main = coroutine.running()
        assert(is_main == true and type(main) == "thread")

        local co
        co = coroutine.create(function()
            assert(coroutine.isyieldable() == true)
            local me, m = coroutine.running()
            assert(m == false and me == co)
        end)
        local ok, err = coroutine.resume(co)
        assert(ok, err)
    "#);
}

#[test]
fn test_yield_from_main_fails() {
    run(r#"
        local ok = pcall(coroutine.yield)
        assert(ok == false)
    "#);
}

#[test]
fn test_nested_coroutines() {
    run(r#"
        local inner = coroutine.create(function()
            coroutine.yield("from inner")
        end)
        local outer = coroutine.create(function()
            local ok, v = coroutine.resume(inner)
            assert(ok)
            coroutine.yield(v)
        end)
        local ok, v = coroutine.resume(outer)
        assert(ok and v == "from inner")
    "#);
}
