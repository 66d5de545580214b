//! Turning a sentinel-rooted access chain into a receiver and a key path.

use crate::syntax::ast::{Expr, ExprKind};
use easm_state::{Key, Path, SENTINEL};
use std::fmt;

/// The pieces of `receiver.state.a[0].b`.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualAddress {
    /// Expression the sentinel is accessed on.
    pub receiver: Expr,
    /// Keys after the sentinel, outermost first.
    pub path: Path,
}

/// Why a recognized call was left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The first argument never accesses `.state`.
    NoSentinel,
    /// An index between the sentinel and the end of the chain is not a
    /// string or number literal.
    ComputedIndex,
    /// The call has no arguments.
    MissingArgument,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoSentinel => write!(f, "argument does not access `.{}`", SENTINEL),
            SkipReason::ComputedIndex => write!(f, "argument uses a non-literal index"),
            SkipReason::MissingArgument => write!(f, "call has no arguments"),
        }
    }
}

/// Walk `expr` from the outside in, collecting keys until the nearest
/// `.state` access.
pub fn extract(expr: &Expr) -> Result<VirtualAddress, SkipReason> {
    let mut keys = Vec::new();
    let mut computed = false;
    let mut node = expr;

    loop {
        match &node.kind {
            ExprKind::Member {
                object, property, ..
            } if property == SENTINEL => {
                if computed {
                    return Err(SkipReason::ComputedIndex);
                }
                keys.reverse();
                return Ok(VirtualAddress {
                    receiver: (**object).clone(),
                    path: Path::from_keys(keys),
                });
            }
            ExprKind::Member {
                object, property, ..
            } => {
                keys.push(Key::name(property.clone()));
                node = object;
            }
            ExprKind::Index { object, index, .. } => {
                match literal_key(index) {
                    Some(key) => keys.push(key),
                    None => computed = true,
                }
                node = object;
            }
            _ => return Err(SkipReason::NoSentinel),
        }
    }
}

/// The property key a literal index evaluates to, the way the runtime
/// would coerce it.
fn literal_key(index: &Expr) -> Option<Key> {
    match &index.kind {
        ExprKind::Str(name) => Some(Key::name(name.clone())),
        ExprKind::Template(template) => template.as_plain().map(Key::name),
        ExprKind::Num(raw) => match raw.strip_suffix('n') {
            Some(digits) => bigint_key(digits),
            None => {
                let value = parse_number(raw)?;
                if value >= 0.0 && value.fract() == 0.0 && value <= MAX_SAFE_INDEX {
                    Some(Key::index(value as usize))
                } else {
                    Some(Key::name(js_number_string(value)))
                }
            }
        },
        _ => None,
    }
}

/// 2^53 - 1: integers above this are not exact in a double.
const MAX_SAFE_INDEX: f64 = 9_007_199_254_740_991.0;

/// `10n` indexes like `10`; larger values become their decimal name.
fn bigint_key(digits: &str) -> Option<Key> {
    let value = parse_integer(digits)?;
    if value <= MAX_SAFE_INDEX as u128 {
        usize::try_from(value).ok().map(Key::index)
    } else {
        Some(Key::name(value.to_string()))
    }
}

/// Integer literal in any radix, separators allowed.
fn parse_integer(raw: &str) -> Option<u128> {
    let digits: String = raw.chars().filter(|&c| c != '_').collect();
    let lower = digits.to_ascii_lowercase();
    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest, 8)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest, 2)
    } else {
        (lower.as_str(), 10)
    };
    u128::from_str_radix(digits, radix).ok()
}

fn parse_number(raw: &str) -> Option<f64> {
    let is_radix = raw.len() > 1
        && raw.starts_with('0')
        && matches!(raw.as_bytes()[1], b'x' | b'X' | b'o' | b'O' | b'b' | b'B');
    if is_radix {
        return parse_integer(raw).map(|n| n as f64);
    }
    let digits: String = raw.chars().filter(|&c| c != '_').collect();
    digits.parse().ok()
}

/// Format a double as `Number.prototype.toString` does: the shortest
/// digits that round-trip, in positional notation for decimal exponents
/// from -7 to 20 and in exponent notation outside.
fn js_number_string(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value < 0.0 {
        return format!("-{}", js_number_string(-value));
    }

    // `{:e}` yields the shortest round-trip mantissa, e.g. `1.5e-7`
    let scientific = format!("{:e}", value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return value.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return value.to_string();
    };
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let k = digits.len() as i32;
    let n = exponent + 1;

    if k <= n && n <= 21 {
        format!("{}{}", digits, "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        format!("{}.{}", int, frac)
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        let sign = if n - 1 < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", first, sign, (n - 1).abs())
        } else {
            format!("{}.{}e{}{}", first, rest, sign, (n - 1).abs())
        }
    }
}
