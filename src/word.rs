//! 256-bit word arithmetic shared by the opcode handlers.
//!
//! All operations wrap modulo 2^256. Signed variants reinterpret the same
//! bit pattern as two's complement; there is no separate signed type.

use primitive_types::{H160, U256, U512};

pub fn add(a: U256, b: U256) -> U256 {
    a.overflowing_add(b).0
}

pub fn sub(a: U256, b: U256) -> U256 {
    a.overflowing_sub(b).0
}

pub fn mul(a: U256, b: U256) -> U256 {
    a.overflowing_mul(b).0
}

/// Division by zero yields zero rather than faulting.
pub fn div(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        U256::zero()
    } else {
        a / b
    }
}

/// Modulo by zero yields zero rather than faulting.
pub fn rem(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        U256::zero()
    } else {
        a % b
    }
}

pub fn is_neg(a: U256) -> bool {
    a.bit(255)
}

/// Two's-complement negation.
pub fn neg(a: U256) -> U256 {
    (!a).overflowing_add(U256::one()).0
}

fn abs(a: U256) -> U256 {
    if is_neg(a) {
        neg(a)
    } else {
        a
    }
}

/// Signed division. Zero divisor yields zero; MIN / -1 wraps back to MIN.
pub fn sdiv(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let q = abs(a) / abs(b);
    if is_neg(a) != is_neg(b) {
        neg(q)
    } else {
        q
    }
}

/// Signed modulo. The result takes the sign of the dividend.
pub fn smod(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let r = abs(a) % abs(b);
    if is_neg(a) {
        neg(r)
    } else {
        r
    }
}

pub fn slt(a: U256, b: U256) -> bool {
    match (is_neg(a), is_neg(b)) {
        (true, false) => true,
        (false, true) => false,
        // Same sign: two's-complement order matches unsigned order.
        _ => a < b,
    }
}

pub fn sgt(a: U256, b: U256) -> bool {
    slt(b, a)
}

/// Exponentiation mod 2^256. `exp(0, 0)` is one.
pub fn exp(a: U256, e: U256) -> U256 {
    a.overflowing_pow(e).0
}

/// (a + b) % n over the full 512-bit sum; zero modulus yields zero.
pub fn addmod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    let s = U512::from(a) + U512::from(b);
    low_half(s % U512::from(n))
}

/// (a * b) % n over the full 512-bit product; zero modulus yields zero.
pub fn mulmod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    low_half(a.full_mul(b) % U512::from(n))
}

fn low_half(v: U512) -> U256 {
    let mut buf = [0u8; 64];
    v.to_big_endian(&mut buf);
    U256::from_big_endian(&buf[32..])
}

/// Sign-extends `x` from the byte at index `b` (0 = least significant).
/// Indices of 31 and above leave the word unchanged.
pub fn signextend(b: U256, x: U256) -> U256 {
    if b >= U256::from(31) {
        return x;
    }
    let sign_bit = b.low_u64() as usize * 8 + 7;
    let mask = (U256::one() << (sign_bit + 1)) - U256::one();
    if x.bit(sign_bit) {
        x | !mask
    } else {
        x & mask
    }
}

/// The `i`-th byte of `x` counted from the most significant end;
/// indices of 32 and above yield zero.
pub fn byte(i: U256, x: U256) -> U256 {
    if i >= U256::from(32) {
        return U256::zero();
    }
    U256::from(x.byte(31 - i.low_u64() as usize))
}

pub fn from_bool(v: bool) -> U256 {
    if v {
        U256::one()
    } else {
        U256::zero()
    }
}

/// Widens an address into a word, zero above the low 160 bits.
pub fn address_to_word(a: H160) -> U256 {
    let mut buf = [0u8; 32];
    buf[12..].copy_from_slice(a.as_bytes());
    U256::from_big_endian(&buf)
}

/// Truncates a word to its low 160 bits.
pub fn word_to_address(v: U256) -> H160 {
    let mut buf = [0u8; 32];
    v.to_big_endian(&mut buf);
    H160::from_slice(&buf[12..])
}

/// Narrows a word to a usize offset or length; None when it does not fit.
pub fn to_usize(v: U256) -> Option<usize> {
    if v > U256::from(usize::MAX as u64) {
        None
    } else {
        Some(v.low_u64() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(n: u64) -> U256 {
        U256::from(n)
    }

    #[test]
    fn add_wraps() {
        assert_eq!(add(U256::MAX, w(1)), U256::zero());
        assert_eq!(add(w(2), w(3)), w(5));
    }

    #[test]
    fn sub_wraps() {
        assert_eq!(sub(w(0), w(1)), U256::MAX);
    }

    #[test]
    fn div_and_rem_by_zero_yield_zero() {
        assert_eq!(div(w(7), w(0)), w(0));
        assert_eq!(rem(w(7), w(0)), w(0));
        assert_eq!(div(w(7), w(2)), w(3));
        assert_eq!(rem(w(7), w(2)), w(1));
    }

    #[test]
    fn sdiv_follows_signs() {
        // -2 / -1 == 2
        assert_eq!(sdiv(neg(w(2)), neg(w(1))), w(2));
        // -2 / 1 == -2
        assert_eq!(sdiv(neg(w(2)), w(1)), neg(w(2)));
        assert_eq!(sdiv(w(10), w(6)), w(1));
        assert_eq!(sdiv(w(6), w(0)), w(0));
    }

    #[test]
    fn sdiv_min_by_minus_one_is_min() {
        let min = U256::one() << 255;
        assert_eq!(sdiv(min, U256::MAX), min);
    }

    #[test]
    fn smod_takes_dividend_sign() {
        // -8 % -3 == -2
        assert_eq!(smod(neg(w(8)), neg(w(3))), neg(w(2)));
        // -3 % 2 == -1
        assert_eq!(smod(neg(w(3)), w(2)), neg(w(1)));
        // 3 % -2 == 1
        assert_eq!(smod(w(3), neg(w(2))), w(1));
        assert_eq!(smod(w(6), w(0)), w(0));
    }

    #[test]
    fn signed_comparisons() {
        assert!(slt(neg(w(1)), w(0)));
        assert!(!slt(w(0), neg(w(1))));
        assert!(slt(neg(w(2)), neg(w(1))));
        assert!(slt(w(1), w(2)));
        assert!(sgt(w(0), neg(w(1))));
    }

    #[test]
    fn exp_edge_cases() {
        assert_eq!(exp(w(0), w(0)), w(1));
        assert_eq!(exp(w(2), w(10)), w(1024));
        // 2^256 wraps to zero
        assert_eq!(exp(w(2), w(256)), w(0));
    }

    #[test]
    fn addmod_and_mulmod_use_wide_intermediates() {
        assert_eq!(addmod(U256::MAX, U256::MAX, w(12)), w(6));
        assert_eq!(mulmod(U256::MAX, U256::MAX, w(12)), w(9));
        assert_eq!(addmod(w(1), w(2), w(0)), w(0));
        assert_eq!(mulmod(w(1), w(2), w(0)), w(0));
    }

    #[test]
    fn signextend_extends_negative_bytes() {
        assert_eq!(signextend(w(0), w(0xff)), U256::MAX);
        assert_eq!(signextend(w(0), w(0x7f)), w(0x7f));
        assert_eq!(
            signextend(w(1), w(0x80ff)),
            (U256::MAX << 16) | w(0x80ff)
        );
        assert_eq!(signextend(w(1), w(0x7fff)), w(0x7fff));
        assert_eq!(signextend(w(31), U256::MAX), U256::MAX);
        assert_eq!(signextend(w(64), w(0xff)), w(0xff));
    }

    #[test]
    fn byte_indexes_from_most_significant() {
        let x = U256::from_big_endian(&{
            let mut b = [0u8; 32];
            b[0] = 0xaa;
            b[31] = 0xbb;
            b
        });
        assert_eq!(byte(w(0), x), w(0xaa));
        assert_eq!(byte(w(31), x), w(0xbb));
        assert_eq!(byte(w(32), x), w(0));
    }

    #[test]
    fn address_round_trip_truncates_high_bits() {
        let a = H160::repeat_byte(0xab);
        assert_eq!(word_to_address(address_to_word(a)), a);
        let high = U256::MAX;
        assert_eq!(word_to_address(high), H160::repeat_byte(0xff));
        assert_eq!(
            address_to_word(word_to_address(high)),
            U256::MAX >> 96
        );
    }

    #[test]
    fn to_usize_rejects_oversized() {
        assert_eq!(to_usize(w(42)), Some(42));
        assert_eq!(to_usize(U256::MAX), None);
    }
}
