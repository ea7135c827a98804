/*
    cpu808x

    Copyright 2022-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    ---------------------------------------------------------------------------

    registers.rs

    Register file types: general-purpose register addressing, segment
    registers (selector + redundantly cached base, per spec §3), and the
    FLAGS bit layout.
*/

use serde_derive::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Register8 {
    AL,
    CL,
    DL,
    BL,
    AH,
    CH,
    DH,
    BH,
}

impl Register8 {
    /// Decode a ModR/M `reg`/`rm` field (0-7) per the standard encoding:
    /// 0-3 are the low bytes of AX/CX/DX/BX, 4-7 the high bytes.
    pub fn from_index(index: u8) -> Self {
        match index & 7 {
            0 => Register8::AL,
            1 => Register8::CL,
            2 => Register8::DL,
            3 => Register8::BL,
            4 => Register8::AH,
            5 => Register8::CH,
            6 => Register8::DH,
            7 => Register8::BH,
            _ => unreachable!(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Register16 {
    AX,
    CX,
    DX,
    BX,
    SP,
    BP,
    SI,
    DI,
    ES,
    CS,
    SS,
    DS,
    IP,
}

impl Register16 {
    /// Decode a ModR/M `reg`/`rm` field (0-7) into the general-purpose word
    /// register it names.
    pub fn from_index(index: u8) -> Self {
        match index & 7 {
            0 => Register16::AX,
            1 => Register16::CX,
            2 => Register16::DX,
            3 => Register16::BX,
            4 => Register16::SP,
            5 => Register16::BP,
            6 => Register16::SI,
            7 => Register16::DI,
            _ => unreachable!(),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    None,
    ES,
    #[default]
    CS,
    SS,
    DS,
}

/// FLAGS bitmasks, matching the 8086 layout. NEC V20/V30 additionally define
/// bit 15 as the MD (processor mode) flag instead of always-one.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum Flag {
    Carry = 0x0001,
    Parity = 0x0004,
    AuxCarry = 0x0010,
    Zero = 0x0040,
    Sign = 0x0080,
    Trap = 0x0100,
    Interrupt = 0x0200,
    Direction = 0x0400,
    Overflow = 0x0800,
    /// NEC-only "mode" flag; on 8086/8088/80186 this bit is a reserved one-bit.
    Mode = 0x8000,
}

/// Mask of bits POPF/IRET may actually change, and the reserved-bit policy for
/// PUSHF: on 8086/8088/80186 bits 12-15 always read as 1 and bit 1 always
/// reads as 1; on NEC silicon bit 15 is the MD flag and bits 12-14 stay 1.
pub const FLAGS_POP_MASK_8086: u16 = 0x0FD7;
pub const FLAGS_POP_MASK_NEC: u16 = 0x8FD7;
pub const FLAGS_RESERVED_ON_8086: u16 = 0xF002;
pub const FLAGS_RESERVED_ON_NEC: u16 = 0x7002;
pub const FLAGS_ALWAYS_ONE: u16 = 0x0002;

/// A segment register: the 16-bit selector that guest code manipulates, and a
/// precomputed 20-bit base kept in lockstep with it (spec §3 invariant:
/// `base == selector << 4`).
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize)]
pub struct SegmentRegister {
    selector: u16,
    base: u32,
}

impl SegmentRegister {
    pub fn new(selector: u16) -> Self {
        Self { selector, base: (selector as u32) << 4 }
    }

    #[inline(always)]
    pub fn selector(&self) -> u16 {
        self.selector
    }

    #[inline(always)]
    pub fn base(&self) -> u32 {
        self.base
    }

    #[inline(always)]
    pub fn set(&mut self, selector: u16) {
        self.selector = selector;
        self.base = (selector as u32) << 4;
        debug_assert_eq!(self.base, (self.selector as u32) << 4);
    }
}
