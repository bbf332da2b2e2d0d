// Arithmetic, comparison, logical and string operators, including the
// integer/float split.

use super::run;

#[test]
fn test_integer_arithmetic() {
    run(r#"
        assert(7 + 3 == 10)
        assert(7 - 3 == 4)
        assert(7 * 3 == 21)
        assert(7 // 2 == 3)
        assert(-7 // 2 == -4)
        assert(7 % 3 == 1)
        assert(-7 % 3 == 2)
        assert(7 % -3 == -2)
        assert(2^10 == 1024.0)
        assert(1 / 2 == 0.5)
    "#);
}

#[test]
fn test_float_arithmetic() {
    run(r#"
        assert(0.5 + 0.25 == 0.75)
        assert(7.0 // 2.0 == 3.0)
        assert(7.5 % 2 == 1.5)
        assert(1e2 == 100.0)
        assert(1/0 > 1e308)
        assert(-1/0 < -1e308)
        local nan = 0/0
        assert(nan ~= nan)
    "#);
}

#[test]
fn test_integer_float_boundary() {
    run(r#"
        assert(1 == 1.0)
        assert(3 + 0.0 == 3.0)
        assert(type(3 + 1) == "number" and type(3 / 1) == "number")
        assert(0x7fffffffffffffff + 1 < 0)
        assert(10 // 3 == 3 and 10.0 // 3 == 3.0)
    "#);
}

#[test]
fn test_bitwise_operators() {
    run(r#"
        assert(3 & 5 == 1)
        assert(3 | 5 == 7)
        assert(3 ~ 5 == 6)
        assert(~0 == -1)
        assert(1 << 4 == 16)
        assert(256 >> 4 == 16)
        assert(1 << 100 == 0)
        assert(-1 >> 1 > 0)
        assert(2.0 & 3 == 2)
    "#);
}

#[test]
fn test_bitwise_requires_exact_integer() {
    run(r#"
        local ok, msg = pcall(function() return 1.5 & 1 end)
        assert(not ok)
        local ok2 = pcall(function() return 1 << 0.5 end)
        assert(not ok2)
    "#);
}

#[test]
fn test_integer_division_by_zero_faults() {
    run(r#"
        assert(not pcall(function() return 1 // 0 end))
        assert(not pcall(function() return 1 % 0 end))
        -- float zero division is defined
        assert(1 // 0.0 > 0)
    "#);
}

#[test]
fn test_min_integer_floor_division() {
    run(r#"
        local min = -9223372036854775807 - 1
        -- folded and runtime forms of the one overflowing quotient
        assert((-9223372036854775807 - 1) // -1 == min)
        local d = -1
        assert(min // d == min)
        assert(min % d == 0)
        assert(min // 1 == min)
        assert(min // -2 == 4611686018427387904)
    "#);
}

#[test]
fn test_string_number_coercion() {
    run(r#"
        assert("10" + 5 == 15)
        assert("3" * "4" == 12)
        assert(10 .. 20 == "1020")
        assert("n=" .. 42 == "n=42")
    "#);
}

#[test]
fn test_comparisons() {
    run(r#"
        assert(1 < 2 and 2 <= 2 and 3 > 2 and 3 >= 3)
        assert(1 < 1.5 and 1.5 < 2)
        assert("abc" < "abd")
        assert("abc" < "abcd")
        assert("" < "a")
        assert(not ("b" < "a"))
        assert(1 ~= "1")
        assert(nil == nil and nil ~= false)
    "#);
}

#[test]
fn test_logical_operators() {
    run(r#"
        assert((false or "fallback") == "fallback")
        assert((nil and 1) == nil)
        assert((1 and 2) == 2)
        assert((false and error("not reached")) == false)
        assert(not nil and not false)
        assert(not 0 == false)
        local x = nil
        local y = x or 7
        assert(y == 7)
    "#);
}

#[test]
fn test_length_and_concat() {
    run(r#"
        assert(#"hello" == 5)
        assert(#"" == 0)
        assert(#{1, 2, 3} == 3)
        assert("a" .. "b" .. "c" == "abc")
        local parts = "x"
        for i = 1, 3 do parts = parts .. i end
        assert(parts == "x123")
    "#);
}

#[test]
fn test_precedence() {
    run(r#"
        assert(2 + 3 * 4 == 14)
        assert((2 + 3) * 4 == 20)
        assert(2 ^ 3 ^ 2 == 512.0)
        assert(-2 ^ 2 == -4.0)
        assert(1 .. 2 == "12")
        assert(not (1 > 2) == true)
        assert(1 + 2 < 4 and true or false)
        assert(1 | 2 ~ 3 & 4 == 1 | (2 ~ (3 & 4)))
    "#);
}

#[test]
fn test_unary_minus() {
    run(r#"
        local n = 5
        assert(-n == -5)
        assert(-(-n) == 5)
        assert(-0.0 == 0.0)
        assert(-"3" == -3)
    "#);
}
