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

    cpu/shift.rs

    The rotate/shift group shared by the D0-D3 (shift-by-1/shift-by-CL) and
    C0/C1 (80186+ shift-by-imm8) opcode groups: ROL, ROR, RCL, RCR, SHL, SHR,
    the undocumented SETMO form, and SAR, selected by the ModR/M `reg` field
    (spec §4.4.2). Transcribed from the reference core's shared rotate/shift
    switch.
*/

use super::Cpu;

/// One of the eight rotate/shift forms selected by a ModR/M `reg` field of
/// 0-7.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ShiftOp {
    Rol,
    Ror,
    Rcl,
    Rcr,
    Shl,
    Shr,
    SetMo,
    Sar,
}

impl ShiftOp {
    pub(crate) fn from_reg(reg: u8) -> Self {
        match reg & 7 {
            0 => ShiftOp::Rol,
            1 => ShiftOp::Ror,
            2 => ShiftOp::Rcl,
            3 => ShiftOp::Rcr,
            4 => ShiftOp::Shl,
            5 => ShiftOp::Shr,
            6 => ShiftOp::SetMo,
            7 => ShiftOp::Sar,
            _ => unreachable!(),
        }
    }
}

impl Cpu {
    /// Run `count` one-bit rotate/shift steps over `value` at the given
    /// operand width, charging the per-iteration cost the reference core
    /// pays only for the by-CL/by-imm8 forms (`charge_per_iter`). Only the
    /// 80186 proper (not NEC, which predates the 5-bit masking) truncates an
    /// incoming CL/imm8 count to 5 bits before the loop; plain 8086/8088 use
    /// the full 8-bit count.
    pub(crate) fn shift_rotate(&mut self, op: ShiftOp, bits: u32, value: u16, raw_count: u8, charge_per_iter: bool) -> u16 {
        use crate::registers::Flag;

        let mut count = if self.config.cpu_type.is_186() && !self.config.cpu_type.is_nec() { raw_count & 0x1F } else { raw_count };
        self.cpu_data = value;

        while count != 0 {
            self.cpu_dest = self.cpu_data;
            let old_carry = self.get_flag(Flag::Carry);
            match op {
                ShiftOp::Rol => {
                    let top = top_bit_u16(self.cpu_data, bits);
                    self.set_cf(top);
                    self.cpu_data <<= 1;
                    if self.get_flag(Flag::Carry) {
                        self.cpu_data |= 1;
                    }
                    self.set_of_rotate(bits);
                    self.set_af(false);
                }
                ShiftOp::Ror => {
                    self.set_cf(self.cpu_data & 1 != 0);
                    self.cpu_data >>= 1;
                    if self.get_flag(Flag::Carry) {
                        self.cpu_data |= if bits == 8 { 0x80 } else { 0x8000 };
                    }
                    self.set_of_rotate(bits);
                    self.set_af(false);
                }
                ShiftOp::Rcl => {
                    let top = top_bit_u16(self.cpu_data, bits);
                    self.set_cf(top);
                    self.cpu_data = (self.cpu_data << 1) | (old_carry as u16);
                    self.set_of_rotate(bits);
                    self.set_af(false);
                }
                ShiftOp::Rcr => {
                    self.set_cf(self.cpu_data & 1 != 0);
                    self.cpu_data >>= 1;
                    if old_carry {
                        self.cpu_data |= if bits == 8 { 0x80 } else { 0x8000 };
                    }
                    self.set_cf(self.cpu_dest & 1 != 0);
                    self.set_of_rotate(bits);
                    self.set_af(false);
                }
                ShiftOp::Shl => {
                    let top = top_bit_u16(self.cpu_data, bits);
                    self.set_cf(top);
                    self.cpu_data <<= 1;
                    self.set_of_rotate(bits);
                    self.set_af(self.cpu_data & 0x10 != 0);
                    self.set_pzs(bits);
                }
                ShiftOp::Shr => {
                    self.set_cf(self.cpu_data & 1 != 0);
                    self.cpu_data >>= 1;
                    self.set_of_rotate(bits);
                    self.set_af(false);
                    self.set_pzs(bits);
                }
                ShiftOp::SetMo => {
                    self.cpu_data = 0xFFFF;
                    self.set_cf(false);
                    self.set_of_rotate(bits);
                    self.set_af(false);
                    self.set_pzs(bits);
                }
                ShiftOp::Sar => {
                    self.set_cf(self.cpu_data & 1 != 0);
                    self.cpu_data >>= 1;
                    if bits == 8 {
                        self.cpu_data |= self.cpu_dest & 0x80;
                    }
                    else {
                        self.cpu_data |= self.cpu_dest & 0x8000;
                    }
                    self.set_of_rotate(bits);
                    self.set_af(false);
                    self.set_pzs(bits);
                }
            }
            if charge_per_iter {
                self.cycles(4);
            }
            count -= 1;
        }
        self.cpu_data
    }
}

#[inline(always)]
fn top_bit_u16(w: u16, bits: u32) -> bool {
    w & (1 << (bits - 1)) != 0
}
