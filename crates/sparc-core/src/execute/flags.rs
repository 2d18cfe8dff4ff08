//! Integer condition-code derivation for each ALU instruction class.

use crate::ConditionCodes;

const SIGN: u32 = 1 << 31;
const TAG_MASK: u32 = 0b11;

const fn nz(result: u32) -> (bool, bool) {
    (result & SIGN != 0, result == 0)
}

/// Flags of `result = left + right (+ carry)`.
///
/// The carry-out formula holds with or without a carry-in.
pub const fn add(left: u32, right: u32, result: u32) -> ConditionCodes {
    let (n, z) = nz(result);
    ConditionCodes {
        n,
        z,
        v: ((left & right & !result) | (!left & !right & result)) & SIGN != 0,
        c: ((left & right) | ((left | right) & !result)) & SIGN != 0,
    }
}

/// Flags of `result = left - right (- borrow)`; `C` is the unsigned borrow.
pub const fn sub(left: u32, right: u32, result: u32) -> ConditionCodes {
    let (n, z) = nz(result);
    ConditionCodes {
        n,
        z,
        v: ((left & !right & !result) | (!left & right & result)) & SIGN != 0,
        c: ((!left & right) | ((!left | right) & result)) & SIGN != 0,
    }
}

/// Flags of logical, multiply and shift-free results: `V` and `C` clear.
pub const fn logical(result: u32) -> ConditionCodes {
    let (n, z) = nz(result);
    ConditionCodes {
        n,
        z,
        v: false,
        c: false,
    }
}

/// Tagged add: arithmetic overflow or a non-zero tag in either operand sets `V`.
pub const fn tagged_add(left: u32, right: u32, result: u32) -> ConditionCodes {
    let mut icc = add(left, right, result);
    icc.v |= (left | right) & TAG_MASK != 0;
    icc
}

/// Tagged subtract counterpart of [`tagged_add`].
pub const fn tagged_sub(left: u32, right: u32, result: u32) -> ConditionCodes {
    let mut icc = sub(left, right, result);
    icc.v |= (left | right) & TAG_MASK != 0;
    icc
}

/// Divide flags: `V` reports a clamped quotient, `C` is always clear.
pub const fn divide(result: u32, overflow: bool) -> ConditionCodes {
    let (n, z) = nz(result);
    ConditionCodes {
        n,
        z,
        v: overflow,
        c: false,
    }
}

#[cfg(test)]
mod tests {
    use super::{add, divide, logical, sub, tagged_add, tagged_sub};
    use crate::ConditionCodes;
    use proptest::prelude::*;
    use rstest::rstest;

    const fn icc(n: bool, z: bool, v: bool, c: bool) -> ConditionCodes {
        ConditionCodes { n, z, v, c }
    }

    #[rstest]
    #[case(1, 1, icc(false, false, false, false))]
    #[case(0xFFFF_FFFF, 1, icc(false, true, false, true))]
    #[case(0x7FFF_FFFF, 1, icc(true, false, true, false))]
    #[case(0x8000_0000, 0x8000_0000, icc(false, true, true, true))]
    fn add_flags(#[case] left: u32, #[case] right: u32, #[case] expected: ConditionCodes) {
        assert_eq!(add(left, right, left.wrapping_add(right)), expected);
    }

    #[rstest]
    #[case(5, 5, icc(false, true, false, false))]
    #[case(0, 1, icc(true, false, false, true))]
    #[case(0x8000_0000, 1, icc(false, false, true, false))]
    #[case(0x7FFF_FFFF, 0xFFFF_FFFF, icc(true, false, true, true))]
    fn sub_flags(#[case] left: u32, #[case] right: u32, #[case] expected: ConditionCodes) {
        assert_eq!(sub(left, right, left.wrapping_sub(right)), expected);
    }

    #[test]
    fn tags_force_overflow() {
        assert!(tagged_add(4, 1, 5).v);
        assert!(!tagged_add(4, 8, 12).v);
        assert!(tagged_sub(8, 2, 6).v);
        assert!(!tagged_sub(8, 4, 4).v);
    }

    #[test]
    fn logical_and_divide_clear_carry() {
        assert_eq!(logical(0), icc(false, true, false, false));
        assert_eq!(logical(0x8000_0000), icc(true, false, false, false));
        assert_eq!(divide(0x7FFF_FFFF, true), icc(false, false, true, false));
    }

    proptest! {
        #[test]
        fn add_carry_matches_wide_arithmetic(left in any::<u32>(), right in any::<u32>()) {
            let wide = u64::from(left) + u64::from(right);
            let flags = add(left, right, left.wrapping_add(right));
            prop_assert_eq!(flags.c, wide > u64::from(u32::MAX));
            prop_assert_eq!(flags.v, (left as i32).checked_add(right as i32).is_none());
        }

        #[test]
        fn sub_carry_is_unsigned_borrow(left in any::<u32>(), right in any::<u32>()) {
            let flags = sub(left, right, left.wrapping_sub(right));
            prop_assert_eq!(flags.c, left < right);
            prop_assert_eq!(flags.v, (left as i32).checked_sub(right as i32).is_none());
        }
    }
}
