// Numeric rules shared by the lexer and the runtime: integer/float parsing
// (including hex and hex-float forms), exact float->integer conversion, and
// number formatting.

/// Parse an integer numeral: decimal, or hex with 64-bit wraparound
/// (`0xFFFFFFFFFFFFFFFF` is `-1`, as in Lua).
pub fn parse_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Some(hex) = strip_hex_prefix(s) {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let mut n: u64 = 0;
        for b in hex.bytes() {
            let d = (b as char).to_digit(16).unwrap() as u64;
            n = n.wrapping_mul(16).wrapping_add(d);
        }
        return Some(n as i64);
    }
    if let Some(rest) = s.strip_prefix('-') {
        if rest.bytes().all(|b| b.is_ascii_digit()) && !rest.is_empty() {
            return s.parse().ok();
        }
        if let Some(hex) = strip_hex_prefix(rest) {
            return parse_integer(&format!("0x{hex}")).map(i64::wrapping_neg);
        }
        return None;
    }
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Parse a float numeral: decimal with optional fraction/exponent, or a
/// hex float (`0x1p4`, `0xA.8`).
pub fn parse_float(s: &str) -> Option<f64> {
    let s = s.trim();
    if let Some(rest) = s.strip_prefix('-') {
        return parse_float(rest).map(|f| -f);
    }
    if let Some(hex) = strip_hex_prefix(s) {
        return parse_hex_float(hex);
    }
    // Reject forms Rust accepts but Lua does not (inf, nan, leading '+').
    if s.is_empty() || !s.bytes().next().is_some_and(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }
    s.parse().ok()
}

// 0xA.8p-2 style: hex digits, optional hex fraction, optional binary
// exponent marked with p/P.
fn parse_hex_float(s: &str) -> Option<f64> {
    let (mantissa_str, exp) = match s.find(['p', 'P']) {
        Some(i) => {
            let e: i32 = s[i + 1..].parse().ok()?;
            (&s[..i], e)
        }
        None => (s, 0),
    };
    let (int_part, frac_part) = match mantissa_str.find('.') {
        Some(i) => (&mantissa_str[..i], &mantissa_str[i + 1..]),
        None => (mantissa_str, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    let mut mantissa = 0.0f64;
    for b in int_part.bytes() {
        mantissa = mantissa * 16.0 + (b as char).to_digit(16)? as f64;
    }
    let mut scale = 1.0 / 16.0;
    for b in frac_part.bytes() {
        mantissa += (b as char).to_digit(16)? as f64 * scale;
        scale /= 16.0;
    }
    Some(mantissa * 2f64.powi(exp))
}

fn strip_hex_prefix(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

/// String->number coercion used by arithmetic: integer form wins, float
/// form otherwise.
pub fn str_to_integer(s: &str) -> Option<i64> {
    parse_integer(s).or_else(|| parse_float(s).and_then(float_to_integer))
}

pub fn str_to_float(s: &str) -> Option<f64> {
    parse_integer(s).map(|i| i as f64).or_else(|| parse_float(s))
}

/// Exact conversion; fails on fractional parts and out-of-range floats.
pub fn float_to_integer(f: f64) -> Option<i64> {
    let i = f as i64;
    if i as f64 == f { Some(i) } else { None }
}

// Arithmetic kernels shared by the interpreter and the constant folder.
// Floor division and modulo round toward negative infinity; callers check
// for zero divisors on the integer forms first.

pub fn i_floor_div(a: i64, b: i64) -> i64 {
    let q = a.wrapping_div(b);
    if (a.wrapping_rem(b) != 0) && ((a < 0) != (b < 0)) { q - 1 } else { q }
}

pub fn i_mod(a: i64, b: i64) -> i64 {
    let r = a.wrapping_rem(b);
    if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r }
}

pub fn f_floor_div(a: f64, b: f64) -> f64 {
    (a / b).floor()
}

pub fn f_mod(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && ((r < 0.0) != (b < 0.0)) { r + b } else { r }
}

/// Logical shift left; negative shift counts shift the other way, and
/// counts of 64 or more produce zero.
pub fn shift_left(a: i64, n: i64) -> i64 {
    if n < 0 {
        return shift_right(a, n.wrapping_neg());
    }
    if n >= 64 { 0 } else { ((a as u64) << n) as i64 }
}

pub fn shift_right(a: i64, n: i64) -> i64 {
    if n < 0 {
        return shift_left(a, n.wrapping_neg());
    }
    if n >= 64 { 0 } else { ((a as u64) >> n) as i64 }
}

pub fn format_integer(i: i64) -> String {
    let mut buf = itoa::Buffer::new();
    buf.format(i).to_string()
}

/// Lua prints floats with a trailing `.0` when they have no fractional
/// part; otherwise the shortest round-trippable form.
pub fn format_float(f: f64) -> String {
    if f.is_infinite() {
        return if f > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }
    if f.is_nan() {
        return "nan".to_string();
    }
    if f == f.trunc() && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

// Floating-point byte encoding used by NEWTABLE size hints:
// (eeeeexxx) means (1xxx) * 2^(eeeee-1) when eeeee > 0, else (xxx).
pub fn int_to_fb(mut x: usize) -> usize {
    let mut e = 0;
    if x < 8 {
        return x;
    }
    while x >= 8 << 4 {
        x = (x + 0xF) >> 4;
        e += 4;
    }
    while x >= 8 << 1 {
        x = (x + 1) >> 1;
        e += 1;
    }
    ((e + 1) << 3) | (x - 8)
}

pub fn fb_to_int(x: usize) -> usize {
    if x < 8 { x } else { ((x & 7) + 8) << ((x >> 3) - 1) }
}
