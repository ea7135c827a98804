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

    cpu/stack.rs

    PUSH/POP primitives and the FLAGS masking PUSHF/POPF apply on top of them
    (spec §4.4, §8 round-trip properties). Also the 80186 SP==1 boundary case
    noted in spec §8.
*/

use super::Cpu;
use crate::registers::{FLAGS_POP_MASK_8086, FLAGS_POP_MASK_NEC};

impl Cpu {
    /// Push a 16-bit value, decrementing SP first (standard 808x order).
    /// On the 80186 (non-NEC) with SP==1 at entry, the write lands split
    /// across SS:[-1] and SS:[0] and SP wraps to 0xFFFF rather than
    /// underflowing cleanly -- the documented 186 boundary case (spec §8).
    pub fn push_word(&mut self, value: u16) {
        if self.sp == 1 && self.config.cpu_type.is_186() && !self.config.cpu_type.is_nec() {
            self.write_byte(crate::registers::Segment::SS, 0xFFFF, (value & 0xFF) as u8);
            self.write_byte(crate::registers::Segment::SS, 0x0000, (value >> 8) as u8);
            self.sp = 0xFFFF;
            return;
        }
        self.sp = self.sp.wrapping_sub(2);
        let sp = self.sp;
        self.write_word(crate::registers::Segment::SS, sp, value);
    }

    pub fn pop_word(&mut self) -> u16 {
        let sp = self.sp;
        let value = self.read_word(crate::registers::Segment::SS, sp);
        self.sp = self.sp.wrapping_add(2);
        value
    }

    /// `PUSHF`: push FLAGS with the reserved bits forced to their fixed
    /// silicon values rather than whatever happens to be latched (spec §8).
    pub fn op_pushf(&mut self) {
        let flags = self.get_flags();
        let masked = if self.config.cpu_type.is_nec() { (flags & 0x8fd7) | 0x7000 } else { (flags & 0x0fd7) | 0xf000 };
        self.push_word(masked);
    }

    /// `POPF`: the reference core ORs the popped word with the fixed
    /// always-one bit (NEC: also the MD bit) and assigns it directly --
    /// no incoming-bit filtering. The §8 "masked per variant" round-trip
    /// property holds in combination with `op_pushf`, which forces the
    /// reserved bits to their fixed values before the matching push.
    pub fn op_popf(&mut self) {
        let raw = self.pop_word();
        let forced = if self.config.cpu_type.is_nec() { 0x8002 } else { 0x0002 };
        self.flags = raw | forced;
    }
}
