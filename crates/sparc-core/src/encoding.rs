use crate::ConditionCodes;

/// Major instruction format selector (`op`, bits 31..30).
pub const OP_BRANCH_SETHI: u32 = 0;
/// `op` value of `CALL`.
pub const OP_CALL: u32 = 1;
/// `op` value of arithmetic, logical, control and special-register instructions.
pub const OP_ARITHMETIC: u32 = 2;
/// `op` value of loads and stores.
pub const OP_MEMORY: u32 = 3;

/// `op2` value of `UNIMP`.
pub const OP2_UNIMP: u32 = 0;
/// `op2` value of `Bicc`.
pub const OP2_BICC: u32 = 2;
/// `op2` value of `SETHI`.
pub const OP2_SETHI: u32 = 4;
/// `op2` value of `FBfcc`.
pub const OP2_FBFCC: u32 = 6;
/// `op2` value of `CBccc`.
pub const OP2_CBCCC: u32 = 7;

/// `op3` value shared by `RDY`, `RDASR` and `STBAR`.
pub const OP3_RDASR: u8 = 0x28;
/// `op3` value shared by `WRY` and `WRASR`.
pub const OP3_WRASR: u8 = 0x30;
/// `op3` value of `Ticc`.
pub const OP3_TICC: u8 = 0x3A;

/// Ancillary state register number that `RDASR` reads as `STBAR` when `rd` is zero.
pub const STBAR_ASR: u8 = 15;

/// Integer condition selected by the 4-bit `cond` field of `Bicc` and `Ticc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Condition {
    Never = 0x0,
    Equal = 0x1,
    LessOrEqual = 0x2,
    Less = 0x3,
    LessOrEqualUnsigned = 0x4,
    CarrySet = 0x5,
    Negative = 0x6,
    OverflowSet = 0x7,
    Always = 0x8,
    NotEqual = 0x9,
    Greater = 0xA,
    GreaterOrEqual = 0xB,
    GreaterUnsigned = 0xC,
    CarryClear = 0xD,
    Positive = 0xE,
    OverflowClear = 0xF,
}

/// Condition table indexed by the `cond` field: `(condition, branch, trap)` mnemonics.
pub const CONDITION_TABLE: [(Condition, &str, &str); 16] = [
    (Condition::Never, "bn", "tn"),
    (Condition::Equal, "be", "te"),
    (Condition::LessOrEqual, "ble", "tle"),
    (Condition::Less, "bl", "tl"),
    (Condition::LessOrEqualUnsigned, "bleu", "tleu"),
    (Condition::CarrySet, "bcs", "tcs"),
    (Condition::Negative, "bneg", "tneg"),
    (Condition::OverflowSet, "bvs", "tvs"),
    (Condition::Always, "ba", "ta"),
    (Condition::NotEqual, "bne", "tne"),
    (Condition::Greater, "bg", "tg"),
    (Condition::GreaterOrEqual, "bge", "tge"),
    (Condition::GreaterUnsigned, "bgu", "tgu"),
    (Condition::CarryClear, "bcc", "tcc"),
    (Condition::Positive, "bpos", "tpos"),
    (Condition::OverflowClear, "bvc", "tvc"),
];

impl Condition {
    /// Decodes the low four bits of `bits` into a condition.
    #[must_use]
    pub const fn from_u4(bits: u8) -> Self {
        CONDITION_TABLE[(bits & 0x0F) as usize].0
    }

    /// Returns the 4-bit `cond` field value.
    #[must_use]
    pub const fn as_u4(self) -> u8 {
        self as u8
    }

    /// Returns the `Bicc` mnemonic for this condition.
    #[must_use]
    pub const fn branch_mnemonic(self) -> &'static str {
        CONDITION_TABLE[self as usize].1
    }

    /// Returns the `Ticc` mnemonic for this condition.
    #[must_use]
    pub const fn trap_mnemonic(self) -> &'static str {
        CONDITION_TABLE[self as usize].2
    }

    /// Evaluates the condition against the integer condition codes.
    #[must_use]
    pub const fn evaluate(self, icc: ConditionCodes) -> bool {
        let ConditionCodes { n, z, v, c } = icc;
        match self {
            Self::Never => false,
            Self::Equal => z,
            Self::LessOrEqual => z || (n ^ v),
            Self::Less => n ^ v,
            Self::LessOrEqualUnsigned => c || z,
            Self::CarrySet => c,
            Self::Negative => n,
            Self::OverflowSet => v,
            Self::Always => true,
            Self::NotEqual => !z,
            Self::Greater => !(z || (n ^ v)),
            Self::GreaterOrEqual => !(n ^ v),
            Self::GreaterUnsigned => !(c || z),
            Self::CarryClear => !c,
            Self::Positive => !n,
            Self::OverflowClear => !v,
        }
    }
}

/// Instruction identity produced by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Opcode {
    Call,
    Sethi,
    Bicc(Condition),
    Unimp,
    Fbfcc,
    Cbccc,
    Add,
    Addcc,
    Addx,
    Addxcc,
    Sub,
    Subcc,
    Subx,
    Subxcc,
    And,
    Andcc,
    Andn,
    Andncc,
    Or,
    Orcc,
    Orn,
    Orncc,
    Xor,
    Xorcc,
    Xnor,
    Xnorcc,
    Taddcc,
    Tsubcc,
    TaddccTv,
    TsubccTv,
    Mulscc,
    Sll,
    Srl,
    Sra,
    Umul,
    Umulcc,
    Smul,
    Smulcc,
    Udiv,
    Udivcc,
    Sdiv,
    Sdivcc,
    Rdy,
    Rdasr,
    Stbar,
    Rdpsr,
    Rdwim,
    Rdtbr,
    Wry,
    Wrasr,
    Wrpsr,
    Wrwim,
    Wrtbr,
    Fpop,
    Cpop,
    Jmpl,
    Rett,
    Ticc(Condition),
    Flush,
    Save,
    Restore,
    Ld,
    Ldub,
    Lduh,
    Ldd,
    St,
    Stb,
    Sth,
    Std,
    Ldsb,
    Ldsh,
    Ldstub,
    Swap,
    Lda,
    Lduba,
    Lduha,
    Ldda,
    Sta,
    Stba,
    Stha,
    Stda,
    Ldsba,
    Ldsha,
    Ldstuba,
    Swapa,
    FpMemory,
    CpMemory,
}

/// Single source-of-truth `op3` table for `op = 2`.
///
/// `RDASR`/`STBAR`, `WRASR` and `Ticc` share or refine entries and are
/// resolved by the decoder from `rs1`/`rd`/`cond`.
pub const ARITHMETIC_OP3_TABLE: &[(u8, Opcode)] = &[
    (0x00, Opcode::Add),
    (0x01, Opcode::And),
    (0x02, Opcode::Or),
    (0x03, Opcode::Xor),
    (0x04, Opcode::Sub),
    (0x05, Opcode::Andn),
    (0x06, Opcode::Orn),
    (0x07, Opcode::Xnor),
    (0x08, Opcode::Addx),
    (0x0A, Opcode::Umul),
    (0x0B, Opcode::Smul),
    (0x0C, Opcode::Subx),
    (0x0E, Opcode::Udiv),
    (0x0F, Opcode::Sdiv),
    (0x10, Opcode::Addcc),
    (0x11, Opcode::Andcc),
    (0x12, Opcode::Orcc),
    (0x13, Opcode::Xorcc),
    (0x14, Opcode::Subcc),
    (0x15, Opcode::Andncc),
    (0x16, Opcode::Orncc),
    (0x17, Opcode::Xnorcc),
    (0x18, Opcode::Addxcc),
    (0x1A, Opcode::Umulcc),
    (0x1B, Opcode::Smulcc),
    (0x1C, Opcode::Subxcc),
    (0x1E, Opcode::Udivcc),
    (0x1F, Opcode::Sdivcc),
    (0x20, Opcode::Taddcc),
    (0x21, Opcode::Tsubcc),
    (0x22, Opcode::TaddccTv),
    (0x23, Opcode::TsubccTv),
    (0x24, Opcode::Mulscc),
    (0x25, Opcode::Sll),
    (0x26, Opcode::Srl),
    (0x27, Opcode::Sra),
    (0x28, Opcode::Rdy),
    (0x29, Opcode::Rdpsr),
    (0x2A, Opcode::Rdwim),
    (0x2B, Opcode::Rdtbr),
    (0x30, Opcode::Wry),
    (0x31, Opcode::Wrpsr),
    (0x32, Opcode::Wrwim),
    (0x33, Opcode::Wrtbr),
    (0x34, Opcode::Fpop),
    (0x35, Opcode::Fpop),
    (0x36, Opcode::Cpop),
    (0x37, Opcode::Cpop),
    (0x38, Opcode::Jmpl),
    (0x39, Opcode::Rett),
    (0x3B, Opcode::Flush),
    (0x3C, Opcode::Save),
    (0x3D, Opcode::Restore),
];

/// Single source-of-truth `op3` table for `op = 3`.
pub const MEMORY_OP3_TABLE: &[(u8, Opcode)] = &[
    (0x00, Opcode::Ld),
    (0x01, Opcode::Ldub),
    (0x02, Opcode::Lduh),
    (0x03, Opcode::Ldd),
    (0x04, Opcode::St),
    (0x05, Opcode::Stb),
    (0x06, Opcode::Sth),
    (0x07, Opcode::Std),
    (0x09, Opcode::Ldsb),
    (0x0A, Opcode::Ldsh),
    (0x0D, Opcode::Ldstub),
    (0x0F, Opcode::Swap),
    (0x10, Opcode::Lda),
    (0x11, Opcode::Lduba),
    (0x12, Opcode::Lduha),
    (0x13, Opcode::Ldda),
    (0x14, Opcode::Sta),
    (0x15, Opcode::Stba),
    (0x16, Opcode::Stha),
    (0x17, Opcode::Stda),
    (0x19, Opcode::Ldsba),
    (0x1A, Opcode::Ldsha),
    (0x1D, Opcode::Ldstuba),
    (0x1F, Opcode::Swapa),
    (0x20, Opcode::FpMemory),
    (0x21, Opcode::FpMemory),
    (0x23, Opcode::FpMemory),
    (0x24, Opcode::FpMemory),
    (0x25, Opcode::FpMemory),
    (0x26, Opcode::FpMemory),
    (0x27, Opcode::FpMemory),
    (0x30, Opcode::CpMemory),
    (0x31, Opcode::CpMemory),
    (0x33, Opcode::CpMemory),
    (0x34, Opcode::CpMemory),
    (0x35, Opcode::CpMemory),
    (0x36, Opcode::CpMemory),
    (0x37, Opcode::CpMemory),
];

/// Returns the `op = 2` identity for an `op3` value.
///
/// `None` means the encoding is reserved.
#[must_use]
pub fn classify_arithmetic(op3: u8) -> Option<Opcode> {
    lookup(ARITHMETIC_OP3_TABLE, op3)
}

/// Returns the `op = 3` identity for an `op3` value.
///
/// `None` means the encoding is reserved.
#[must_use]
pub fn classify_memory(op3: u8) -> Option<Opcode> {
    lookup(MEMORY_OP3_TABLE, op3)
}

fn lookup(table: &[(u8, Opcode)], op3: u8) -> Option<Opcode> {
    table
        .iter()
        .find_map(|(code, opcode)| (*code == op3).then_some(*opcode))
}

impl Opcode {
    /// Returns the `(op, op3)` pair of a format 3 identity.
    ///
    /// Identities that several `op3` values share (`Fpop`, `FpMemory`, ...)
    /// resolve to their first table entry.
    #[must_use]
    pub fn format3_fields(self) -> Option<(u32, u8)> {
        match self {
            Self::Rdasr | Self::Stbar => return Some((OP_ARITHMETIC, OP3_RDASR)),
            Self::Wrasr => return Some((OP_ARITHMETIC, OP3_WRASR)),
            Self::Ticc(_) => return Some((OP_ARITHMETIC, OP3_TICC)),
            _ => {}
        }
        let reverse = |table: &[(u8, Self)]| {
            table
                .iter()
                .find_map(|(code, opcode)| (*opcode == self).then_some(*code))
        };
        reverse(ARITHMETIC_OP3_TABLE)
            .map(|op3| (OP_ARITHMETIC, op3))
            .or_else(|| reverse(MEMORY_OP3_TABLE).map(|op3| (OP_MEMORY, op3)))
    }

    /// Returns `true` for the `cc` forms that update the integer condition codes.
    #[must_use]
    pub const fn sets_condition_codes(self) -> bool {
        matches!(
            self,
            Self::Addcc
                | Self::Addxcc
                | Self::Subcc
                | Self::Subxcc
                | Self::Andcc
                | Self::Andncc
                | Self::Orcc
                | Self::Orncc
                | Self::Xorcc
                | Self::Xnorcc
                | Self::Taddcc
                | Self::Tsubcc
                | Self::TaddccTv
                | Self::TsubccTv
                | Self::Mulscc
                | Self::Umulcc
                | Self::Smulcc
                | Self::Udivcc
                | Self::Sdivcc
        )
    }

    /// Returns `true` for alternate-space loads and stores.
    #[must_use]
    pub const fn is_alternate_space(self) -> bool {
        matches!(
            self,
            Self::Lda
                | Self::Lduba
                | Self::Lduha
                | Self::Ldda
                | Self::Sta
                | Self::Stba
                | Self::Stha
                | Self::Stda
                | Self::Ldsba
                | Self::Ldsha
                | Self::Ldstuba
                | Self::Swapa
        )
    }

    /// Returns `true` for stores, whose `rd` is a source operand.
    #[must_use]
    pub const fn is_store(self) -> bool {
        matches!(
            self,
            Self::St
                | Self::Stb
                | Self::Sth
                | Self::Std
                | Self::Sta
                | Self::Stba
                | Self::Stha
                | Self::Stda
        )
    }

    /// Returns the assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Sethi => "sethi",
            Self::Bicc(cond) => cond.branch_mnemonic(),
            Self::Unimp => "unimp",
            Self::Fbfcc => "fbfcc",
            Self::Cbccc => "cbccc",
            Self::Add => "add",
            Self::Addcc => "addcc",
            Self::Addx => "addx",
            Self::Addxcc => "addxcc",
            Self::Sub => "sub",
            Self::Subcc => "subcc",
            Self::Subx => "subx",
            Self::Subxcc => "subxcc",
            Self::And => "and",
            Self::Andcc => "andcc",
            Self::Andn => "andn",
            Self::Andncc => "andncc",
            Self::Or => "or",
            Self::Orcc => "orcc",
            Self::Orn => "orn",
            Self::Orncc => "orncc",
            Self::Xor => "xor",
            Self::Xorcc => "xorcc",
            Self::Xnor => "xnor",
            Self::Xnorcc => "xnorcc",
            Self::Taddcc => "taddcc",
            Self::Tsubcc => "tsubcc",
            Self::TaddccTv => "taddcctv",
            Self::TsubccTv => "tsubcctv",
            Self::Mulscc => "mulscc",
            Self::Sll => "sll",
            Self::Srl => "srl",
            Self::Sra => "sra",
            Self::Umul => "umul",
            Self::Umulcc => "umulcc",
            Self::Smul => "smul",
            Self::Smulcc => "smulcc",
            Self::Udiv => "udiv",
            Self::Udivcc => "udivcc",
            Self::Sdiv => "sdiv",
            Self::Sdivcc => "sdivcc",
            Self::Rdy | Self::Rdasr | Self::Rdpsr | Self::Rdwim | Self::Rdtbr => "rd",
            Self::Stbar => "stbar",
            Self::Wry | Self::Wrasr | Self::Wrpsr | Self::Wrwim | Self::Wrtbr => "wr",
            Self::Fpop => "fpop",
            Self::Cpop => "cpop",
            Self::Jmpl => "jmpl",
            Self::Rett => "rett",
            Self::Ticc(cond) => cond.trap_mnemonic(),
            Self::Flush => "flush",
            Self::Save => "save",
            Self::Restore => "restore",
            Self::Ld => "ld",
            Self::Ldub => "ldub",
            Self::Lduh => "lduh",
            Self::Ldd => "ldd",
            Self::St => "st",
            Self::Stb => "stb",
            Self::Sth => "sth",
            Self::Std => "std",
            Self::Ldsb => "ldsb",
            Self::Ldsh => "ldsh",
            Self::Ldstub => "ldstub",
            Self::Swap => "swap",
            Self::Lda => "lda",
            Self::Lduba => "lduba",
            Self::Lduha => "lduha",
            Self::Ldda => "ldda",
            Self::Sta => "sta",
            Self::Stba => "stba",
            Self::Stha => "stha",
            Self::Stda => "stda",
            Self::Ldsba => "ldsba",
            Self::Ldsha => "ldsha",
            Self::Ldstuba => "ldstuba",
            Self::Swapa => "swapa",
            Self::FpMemory => "ldf/stf",
            Self::CpMemory => "ldc/stc",
        }
    }
}

/// Builds a `CALL` with a word displacement.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub const fn call(disp30: i32) -> u32 {
    (OP_CALL << 30) | (disp30 as u32 & 0x3FFF_FFFF)
}

/// Builds `SETHI imm22, rd`.
#[must_use]
pub const fn sethi(rd: u8, imm22: u32) -> u32 {
    ((rd as u32 & 0x1F) << 25) | (OP2_SETHI << 22) | (imm22 & 0x003F_FFFF)
}

/// Builds the canonical `NOP` (`SETHI 0, %g0`).
#[must_use]
pub const fn nop() -> u32 {
    sethi(0, 0)
}

/// Builds a `Bicc` with a word displacement.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub const fn branch(cond: Condition, annul: bool, disp22: i32) -> u32 {
    ((annul as u32) << 29)
        | ((cond as u32) << 25)
        | (OP2_BICC << 22)
        | (disp22 as u32 & 0x003F_FFFF)
}

/// Builds a register-form format 3 instruction: `opcode rs1, rs2, rd`.
///
/// For `Ticc` the condition replaces `rd`; for `RDASR`/`STBAR`/`WRASR`
/// the caller supplies the register number through `rs1`/`rd`.
#[must_use]
pub fn format3_register(opcode: Opcode, rd: u8, rs1: u8, rs2: u8) -> Option<u32> {
    format3_common(opcode, rd, rs1).map(|word| word | (u32::from(rs2) & 0x1F))
}

/// Builds an immediate-form format 3 instruction: `opcode rs1, simm13, rd`.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn format3_immediate(opcode: Opcode, rd: u8, rs1: u8, simm13: i32) -> Option<u32> {
    format3_common(opcode, rd, rs1).map(|word| word | (1 << 13) | (simm13 as u32 & 0x1FFF))
}

/// Builds an alternate-space load/store `opcode [rs1 + rs2] asi, rd`.
#[must_use]
pub fn format3_alternate(opcode: Opcode, rd: u8, rs1: u8, rs2: u8, asi: u8) -> Option<u32> {
    format3_register(opcode, rd, rs1, rs2).map(|word| word | (u32::from(asi) << 5))
}

fn format3_common(opcode: Opcode, rd: u8, rs1: u8) -> Option<u32> {
    let (op, op3) = opcode.format3_fields()?;
    let rd_field = match opcode {
        Opcode::Ticc(cond) => u32::from(cond.as_u4()),
        _ => u32::from(rd) & 0x1F,
    };
    Some((op << 30) | (rd_field << 25) | (u32::from(op3) << 19) | ((u32::from(rs1) & 0x1F) << 14))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{
        classify_arithmetic, classify_memory, Condition, Opcode, ARITHMETIC_OP3_TABLE,
        CONDITION_TABLE, MEMORY_OP3_TABLE,
    };
    use crate::ConditionCodes;
    use rstest::rstest;

    const fn icc(n: bool, z: bool, v: bool, c: bool) -> ConditionCodes {
        ConditionCodes { n, z, v, c }
    }

    #[test]
    fn op3_tables_contain_unique_codes() {
        for table in [ARITHMETIC_OP3_TABLE, MEMORY_OP3_TABLE] {
            let codes: HashSet<_> = table.iter().map(|(code, _)| *code).collect();
            assert_eq!(codes.len(), table.len());
            assert!(table.iter().all(|(code, _)| *code < 0x40));
        }
    }

    #[test]
    fn every_table_entry_resolves_via_lookup() {
        for (code, opcode) in ARITHMETIC_OP3_TABLE {
            assert_eq!(classify_arithmetic(*code), Some(*opcode));
        }
        for (code, opcode) in MEMORY_OP3_TABLE {
            assert_eq!(classify_memory(*code), Some(*opcode));
        }
    }

    #[rstest]
    #[case(0x09)]
    #[case(0x0D)]
    #[case(0x2C)]
    #[case(0x3E)]
    #[case(0x3F)]
    fn reserved_arithmetic_op3_values_are_unassigned(#[case] op3: u8) {
        assert_eq!(classify_arithmetic(op3), None);
    }

    #[test]
    fn condition_table_is_indexed_by_cond_field() {
        for (index, (cond, _, _)) in CONDITION_TABLE.iter().enumerate() {
            assert_eq!(usize::from(cond.as_u4()), index);
            assert_eq!(Condition::from_u4(cond.as_u4()), *cond);
        }
        assert_eq!(Condition::from_u4(0x9).branch_mnemonic(), "bne");
        assert_eq!(Condition::from_u4(0x8).trap_mnemonic(), "ta");
    }

    #[test]
    fn greater_is_not_z_or_n_xor_v() {
        assert!(Condition::Greater.evaluate(icc(false, false, false, false)));
        assert!(Condition::Greater.evaluate(icc(true, false, true, false)));
        assert!(!Condition::Greater.evaluate(icc(false, true, false, false)));
        assert!(!Condition::Greater.evaluate(icc(true, false, false, false)));
    }

    #[test]
    fn complementary_conditions_disagree_for_every_flag_combination() {
        for bits in 0u8..16 {
            let codes = icc(bits & 8 != 0, bits & 4 != 0, bits & 2 != 0, bits & 1 != 0);
            for cond in 0u8..8 {
                let low = Condition::from_u4(cond);
                let high = Condition::from_u4(cond + 8);
                assert_ne!(low.evaluate(codes), high.evaluate(codes), "{low:?} vs {high:?}");
            }
        }
    }

    #[test]
    fn unsigned_conditions_follow_carry_and_zero() {
        assert!(Condition::LessOrEqualUnsigned.evaluate(icc(false, false, false, true)));
        assert!(Condition::LessOrEqualUnsigned.evaluate(icc(false, true, false, false)));
        assert!(Condition::GreaterUnsigned.evaluate(icc(true, false, true, false)));
    }

    #[test]
    fn format3_fields_reverse_the_tables() {
        assert_eq!(Opcode::Subcc.format3_fields(), Some((2, 0x14)));
        assert_eq!(Opcode::Std.format3_fields(), Some((3, 0x07)));
        assert_eq!(Opcode::Ticc(Condition::Always).format3_fields(), Some((2, 0x3A)));
        assert_eq!(Opcode::Call.format3_fields(), None);
        assert_eq!(Opcode::Bicc(Condition::Always).format3_fields(), None);
    }

    #[test]
    fn builders_produce_known_words() {
        assert_eq!(super::nop(), 0x0100_0000);
        assert_eq!(super::sethi(2, 12), 0x0500_000C);
        assert_eq!(super::call(-1), 0x7FFF_FFFF);
        assert_eq!(super::branch(Condition::Always, true, 2), 0x3080_0002);
        assert_eq!(
            super::format3_immediate(Opcode::Or, 1, 0, 0xFF),
            Some(0x8210_20FF)
        );
        assert_eq!(
            super::format3_register(Opcode::Add, 3, 1, 2),
            Some(0x8600_4002)
        );
    }
}
