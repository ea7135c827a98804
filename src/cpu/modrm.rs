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

    cpu/modrm.rs

    ModR/M decoding and effective-address computation (spec §4.4.1). Base and
    segment-default tables follow the standard 8086 r/m encoding the
    reference core's `mod1add`/`mod1seg` tables implement.
*/

use super::Cpu;
use crate::registers::{Register16, Segment};

#[derive(Copy, Clone, Debug)]
pub(crate) struct ModRm {
    pub md: u8,
    pub reg: u8,
    pub rm: u8,
}

impl Cpu {
    #[inline(always)]
    fn sign_extend(byte: u8) -> u16 {
        byte as i8 as i16 as u16
    }

    /// Base register(s) contributing to the r/m-encoded effective address,
    /// for `mod != 3, rm != 6-with-mod-0`.
    fn ea_base(&self, rm: u8) -> (u16, Option<u16>) {
        match rm {
            0 => (self.bx, Some(self.si)),
            1 => (self.bx, Some(self.di)),
            2 => (self.bp, Some(self.si)),
            3 => (self.bp, Some(self.di)),
            4 => (self.si, None),
            5 => (self.di, None),
            6 => (self.bp, None),
            7 => (self.bx, None),
            _ => unreachable!(),
        }
    }

    /// BP-based forms default to SS; everything else defaults to DS.
    fn ea_default_segment(rm: u8) -> Segment {
        match rm {
            2 | 3 | 6 => Segment::SS,
            _ => Segment::DS,
        }
    }

    /// Read the ModR/M byte from the PFQ and, for `mod != 3`, compute
    /// `eaaddr`/`easeg` (spec §4.4.1). Fixed addressing-form cycle costs are
    /// charged inline via `self.cycles(..)`, matching the reference core's
    /// `wait()` calls at each decode step.
    pub(crate) fn do_mod_rm(&mut self) -> ModRm {
        let rmdat = self.fetch_byte();
        let reg = (rmdat >> 3) & 7;
        let md = (rmdat >> 6) & 3;
        let rm = rmdat & 7;
        self.modrm_md = md;
        self.modrm_reg = reg;
        self.modrm_rm = rm;

        if md == 3 {
            return ModRm { md, reg, rm };
        }

        self.cycles(2);

        if (rmdat & 0xc7) == 0x06 {
            // Direct address: mod==0, rm==6.
            self.eaaddr = self.fetch_word();
            self.easeg = self.ovr_seg.unwrap_or(Segment::DS);
            self.cycles(2);
            return ModRm { md, reg, rm };
        }

        match rm {
            0 | 3 => self.cycles(2),
            1 | 2 => self.cycles(3),
            _ => {}
        }

        let (base, index) = self.ea_base(rm);
        let mut addr = base.wrapping_add(index.unwrap_or(0));
        self.easeg = self.ovr_seg.unwrap_or_else(|| Self::ea_default_segment(rm));

        match md {
            0x01 => {
                self.cycles(2);
                let disp = self.fetch_byte();
                addr = addr.wrapping_add(Self::sign_extend(disp));
                self.cycles(1);
            }
            0x02 => {
                self.cycles(2);
                let disp = self.fetch_word();
                addr = addr.wrapping_add(disp);
                self.cycles(1);
            }
            _ => {}
        }
        self.eaaddr = addr;
        self.cycles(2);
        ModRm { md, reg, rm }
    }

    /// Read a byte operand from the r/m field decoded by `do_mod_rm`.
    pub(crate) fn get_ea_byte(&mut self, m: &ModRm) -> u8 {
        if m.md == 3 {
            self.get_register8(crate::registers::Register8::from_index(m.rm))
        }
        else {
            self.read_byte(self.easeg, self.eaaddr)
        }
    }

    pub(crate) fn get_ea_word(&mut self, m: &ModRm) -> u16 {
        if m.md == 3 {
            self.get_register16(Register16::from_index(m.rm))
        }
        else {
            self.read_word(self.easeg, self.eaaddr)
        }
    }

    pub(crate) fn set_ea_byte(&mut self, m: &ModRm, value: u8) {
        if m.md == 3 {
            self.set_register8(crate::registers::Register8::from_index(m.rm), value);
        }
        else {
            self.write_byte(self.easeg, self.eaaddr, value);
        }
    }

    pub(crate) fn set_ea_word(&mut self, m: &ModRm, value: u16) {
        if m.md == 3 {
            self.set_register16(Register16::from_index(m.rm), value);
        }
        else {
            self.write_word(self.easeg, self.eaaddr, value);
        }
    }
}
