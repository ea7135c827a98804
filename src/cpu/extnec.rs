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

    cpu/extnec.rs

    NEC V20/V30 extensions reached through the 0x0F prefix byte (which on
    non-NEC parts is instead `POP CS`, handled in execute.rs): the nibble
    rotates ROL4/ROR4, the bit-test/set group TEST1/NOT1/SET1/CLR1, the
    packed-BCD string ops ADD4S/SUB4S/CMP4S, the bitfield ops INS/EXT, and the
    BRKEM 8080-emulation-mode trap, which this core treats as an unsupported
    guest feature rather than emulating 8080 mode (spec §7 Non-goals).
*/

use super::modrm::ModRm;
use super::Cpu;
use crate::error::CpuError;
use crate::registers::Segment;

impl Cpu {
    /// `ROL4 r/m`, NEC opcode 0F 28: rotate the nibble pair `(AL low nibble,
    /// r/m low nibble)` as a single 8-bit unit one nibble left.
    pub fn op_rol4(&mut self, m: &ModRm) {
        self.cycles(21);
        let mem = self.get_ea_byte(m);
        let al = self.get_register8(crate::registers::Register8::AL);
        let new_mem = (al & 0x0F) | ((mem & 0x0F) << 4);
        let new_al = mem >> 4;
        self.set_ea_byte(m, new_mem);
        self.set_register8(crate::registers::Register8::AL, new_al);
    }

    /// `ROR4 r/m`, NEC opcode 0F 2A.
    pub fn op_ror4(&mut self, m: &ModRm) {
        self.cycles(21);
        let mem = self.get_ea_byte(m);
        let al = self.get_register8(crate::registers::Register8::AL);
        let new_al = mem & 0x0F;
        let new_mem = (mem >> 4) | ((al & 0x0F) << 4);
        self.set_ea_byte(m, new_mem);
        self.set_register8(crate::registers::Register8::AL, new_al);
    }

    fn read_bit_operand(&mut self, m: &ModRm, bits: u32) -> u16 {
        if bits == 8 {
            self.get_ea_byte(m) as u16
        }
        else {
            self.get_ea_word(m)
        }
    }

    fn write_bit_operand(&mut self, m: &ModRm, bits: u32, value: u16) {
        if bits == 8 {
            self.set_ea_byte(m, (value & 0xFF) as u8);
        }
        else {
            self.set_ea_word(m, value);
        }
    }

    /// `TEST1 r/m, {CL|imm}`: copy bit `bit` of the operand into ZF, clear
    /// OF/CF.
    pub fn op_test1(&mut self, m: &ModRm, bits: u32, bit: u8) {
        use crate::registers::Flag;
        self.cycles(3);
        let value = self.read_bit_operand(m, bits);
        let mask = 1u16 << bit;
        self.set_flag_state(Flag::Zero, value & mask == 0);
        self.set_flag_state(Flag::Overflow, false);
        self.set_flag_state(Flag::Carry, false);
    }

    pub fn op_not1(&mut self, m: &ModRm, bits: u32, bit: u8) {
        self.cycles(3);
        let value = self.read_bit_operand(m, bits);
        let mask = 1u16 << bit;
        self.write_bit_operand(m, bits, value ^ mask);
    }

    pub fn op_set1(&mut self, m: &ModRm, bits: u32, bit: u8) {
        self.cycles(3);
        let value = self.read_bit_operand(m, bits);
        let mask = 1u16 << bit;
        self.write_bit_operand(m, bits, value | mask);
    }

    pub fn op_clr1(&mut self, m: &ModRm, bits: u32, bit: u8) {
        self.cycles(3);
        let value = self.read_bit_operand(m, bits);
        let mask = 1u16 << bit;
        self.write_bit_operand(m, bits, value & !mask);
    }

    /// Shared packed-BCD-nibble loop body for ADD4S/SUB4S/CMP4S: `count`
    /// comes from CL, the odd trailing nibble is handled in the final
    /// half-iteration as the reference core does. `commit` controls whether
    /// results are written back (false for CMP4S).
    fn bcd4s(&mut self, subtract: bool, commit: bool) {
        use crate::registers::Flag;
        let count = self.get_register8(crate::registers::Register8::CL);
        let odd = count % 2 != 0;
        let nibble_count = count - (odd as u8);
        let src_seg = self.ovr_seg.unwrap_or(Segment::DS);
        self.cycles(5);

        let iterations = (nibble_count / 2) as u32 + odd as u32;
        let mut carry: i32 = 0;
        let mut zero = true;

        for i in 0..iterations {
            self.cycles(19);
            let dest_addr_di = self.di.wrapping_add(i as u16);
            let src_addr_si = self.si.wrapping_add(i as u16);
            let mut dest_byte = self.read_byte(Segment::ES, dest_addr_di);
            let src_byte = self.read_byte(src_seg, src_addr_si);

            for nibble in 0..2u32 {
                let is_last_half = i == iterations.saturating_sub(1) && nibble == 1 && odd;
                let d = ((dest_byte >> (nibble * 4)) & 0xF) as i32;
                let s = ((src_byte >> (nibble * 4)) & 0xF) as i32;
                let mut result = if is_last_half {
                    if subtract { d - carry } else { d + carry }
                }
                else if subtract {
                    d - s - carry
                }
                else {
                    d + s + carry
                };
                carry = 0;
                if subtract {
                    while result < 0 {
                        result += 10;
                        carry += 1;
                    }
                }
                else {
                    while result >= 10 {
                        result -= 10;
                        carry += 1;
                    }
                }
                if zero || is_last_half {
                    zero = result == 0;
                }
                let shift = nibble * 4;
                let keep_mask = if nibble == 0 { 0x0F } else { 0xF0 };
                dest_byte = (dest_byte & keep_mask) | ((result as u8) << shift);
            }
            if commit {
                self.write_byte(Segment::ES, dest_addr_di, dest_byte);
            }
        }
        self.set_flag_state(Flag::Carry, carry != 0);
        self.set_flag_state(Flag::Zero, zero);
    }

    pub fn op_add4s(&mut self) {
        self.bcd4s(false, true);
    }

    pub fn op_sub4s(&mut self) {
        self.bcd4s(true, true);
    }

    pub fn op_cmp4s(&mut self) {
        self.bcd4s(true, false);
    }

    /// `INS reg1, reg2` / `INS reg8, imm4`, NEC opcode 0F 31/39: write
    /// `bit_length` bits of AX into the ES:DI bitfield starting at the low
    /// nibble of the r/m register. Returns the final bit offset, which the
    /// caller writes back into the r/m register (reference core's
    /// `setr8(cpu_rm, bit_offset)`).
    pub fn op_ins_bitfield(&mut self, bit_length: u8, rm_bits: u8) -> u8 {
        let mut bit_offset = rm_bits & 0xF;
        let mut di = self.di;
        if bit_offset >= 8 {
            di = di.wrapping_add(1);
            bit_offset -= 8;
        }
        let ax = self.ax;
        for i in 0..bit_length {
            let byte = self.read_byte(Segment::ES, di);
            let bit = (ax >> i) & 1;
            let new_byte = (byte & !(1 << bit_offset)) | ((bit as u8) << bit_offset);
            self.write_byte(Segment::ES, di, new_byte);
            bit_offset += 1;
            if bit_offset == 8 {
                di = di.wrapping_add(1);
                bit_offset = 0;
            }
        }
        self.di = di;
        bit_offset
    }

    /// `EXT reg1, reg2` / `EXT reg8, imm4`, NEC opcode 0F 33/3B: read
    /// `bit_length` bits out of the DS:SI bitfield into AX. Returns the final
    /// bit offset for writeback into the r/m register, as `op_ins_bitfield`.
    pub fn op_ext_bitfield(&mut self, bit_length: u8, rm_bits: u8) -> u8 {
        let seg = self.ovr_seg.unwrap_or(Segment::DS);
        let mut bit_offset = rm_bits & 0xF;
        let mut si = self.si;
        if bit_offset >= 8 {
            si = si.wrapping_add(1);
            bit_offset -= 8;
        }
        let mut ax: u16 = 0;
        for i in 0..bit_length {
            let byte = self.read_byte(seg, si);
            let bit = (byte >> bit_offset) & 1;
            ax |= (bit as u16) << i;
            bit_offset += 1;
            if bit_offset == 8 {
                si = si.wrapping_add(1);
                bit_offset = 0;
            }
        }
        self.ax = ax;
        bit_offset
    }

    /// `BRKEM imm8`, NEC opcode 0F FF: enters 8080 emulation mode, which this
    /// core does not implement (spec §7).
    pub fn op_brkem(&mut self) {
        self.set_error(CpuError::UnimplementedFeature("BRKEM 8080 emulation mode"));
        self.state = super::CpuState::BreakpointHit;
    }
}
