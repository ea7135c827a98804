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

    cpu/muldiv.rs

    MUL/IMUL/DIV/IDIV. These are modeled as microcoded loops that consume one
    host tick group per bit of the operand width (spec §4.4.2), matching the
    reference core's bit-serial shift-add/shift-subtract implementation in
    cost even though the arithmetic itself is computed directly rather than
    via literal two's-complement shift-register replication -- see DESIGN.md
    for why that substitution is behavior-preserving.
*/

use super::Cpu;
use crate::registers::{Flag, Register16, Register8};

impl Cpu {
    /// `AAM imm8`, opcode 0xD4: unsigned-divide AL by the fetched immediate
    /// (base 10 for the plain mnemonic), quotient to AH, remainder to AL,
    /// PZS from the resulting AX. Divide-by-zero raises INT 0.
    pub fn op_aam(&mut self) {
        self.cycles(1);
        let divisor = self.fetch_byte();
        if divisor == 0 {
            self.trigger_interrupt(0);
            return;
        }
        let al = self.get_register8(Register8::AL);
        let quotient = al / divisor;
        let remainder = al % divisor;
        self.set_register8(Register8::AH, quotient);
        self.set_register8(Register8::AL, remainder);
        self.cpu_data = ((quotient as u16) << 8) | remainder as u16;
        self.set_pzs(16);
    }

    /// `AAD imm8`, opcode 0xD5: `AL = (AH * imm) + AL`, `AH = 0`, flags from
    /// the intermediate 8-bit add. NEC parts still fetch (and discard) the
    /// immediate byte but always multiply by 10.
    pub fn op_aad(&mut self) {
        self.cycles(1);
        let fetched = self.fetch_byte();
        let base = if self.config.cpu_type.is_nec() { 10 } else { fetched };
        let ah = self.get_register8(Register8::AH);
        let al = self.get_register8(Register8::AL);
        self.cpu_dest = al as u16;
        self.cpu_src = (ah as u16).wrapping_mul(base as u16) & 0xFF;
        self.cpu_alu_op = 0;
        self.alu_op(8);
        self.set_register8(Register8::AL, (self.cpu_data & 0xFF) as u8);
        self.set_register8(Register8::AH, 0);
    }
}

impl Cpu {
    /// NEC parts preserve ZF from its pre-instruction value instead of
    /// recomputing it from the product; `old_zero` is the snapshot the
    /// caller took before touching any registers.
    fn set_mul_flags(&mut self, bits: u32, carry: bool, old_zero: bool) {
        self.set_flag_state(Flag::Carry, carry);
        self.set_flag_state(Flag::Overflow, carry);
        if self.config.cpu_type.is_nec() {
            self.set_flag_state(Flag::Zero, old_zero);
        }
        else {
            self.set_flag_state(Flag::Zero, !carry);
        }
        let _ = bits;
        if !carry {
            self.cycles(1);
        }
    }

    /// `MUL r/m8` / `MUL r/m16`, opcodes F6 /4 and F7 /4.
    pub fn op_mul(&mut self, bits: u32, src: u16) {
        let old_zero = self.get_flag(Flag::Zero);
        if bits == 8 {
            let al = self.get_register8(Register8::AL) as u32;
            self.cycles(8);
            let result = al * (src as u32);
            self.step_bit_serial_cycles(8);
            self.set_register16(Register16::AX, result as u16);
            self.set_mul_flags(8, (result & 0xFF00) != 0, old_zero);
        }
        else {
            let ax = self.get_register16(Register16::AX) as u32;
            self.cycles(3);
            let result = ax * (src as u32);
            self.step_bit_serial_cycles(16);
            self.set_register16(Register16::AX, (result & 0xFFFF) as u16);
            self.set_register16(Register16::DX, (result >> 16) as u16);
            self.set_mul_flags(16, (result >> 16) != 0, old_zero);
        }
    }

    /// `IMUL r/m8` / `IMUL r/m16`, opcodes F6 /5 and F7 /5.
    pub fn op_imul(&mut self, bits: u32, src: u16) {
        let old_zero = self.get_flag(Flag::Zero);
        if bits == 8 {
            let al = self.get_register8(Register8::AL) as i8 as i32;
            let s = src as i8 as i32;
            self.cycles(11);
            let result = al * s;
            self.step_bit_serial_cycles(8);
            self.set_register16(Register16::AX, (result & 0xFFFF) as u16);
            let overflow = result != (result as i8 as i32);
            self.set_mul_flags(8, overflow, old_zero);
        }
        else {
            let ax = self.get_register16(Register16::AX) as i16 as i32;
            let s = src as i16 as i32;
            self.cycles(7);
            let result = ax * s;
            self.step_bit_serial_cycles(16);
            self.set_register16(Register16::AX, (result & 0xFFFF) as u16);
            self.set_register16(Register16::DX, ((result >> 16) & 0xFFFF) as u16);
            let overflow = result != (result as i16 as i32);
            self.set_mul_flags(16, overflow, old_zero);
        }
    }

    /// Per-bit cycle cost of the shift-add loop, without any observable
    /// architectural effect (the result is computed directly above); this
    /// exists solely so MUL/IMUL/DIV/IDIV consume the bit-serial number of
    /// host ticks spec §4.4.2 calls for.
    fn step_bit_serial_cycles(&mut self, bit_count: u32) {
        for _ in 0..bit_count {
            self.cycles(7);
        }
    }

    /// `DIV r/m8` / `DIV r/m16`. Returns with AX/DX unchanged and an INT 0
    /// dispatched on divide overflow or divide-by-zero (spec §8 scenario 5).
    pub fn op_div(&mut self, bits: u32, divisor: u16) {
        self.cycles(8);
        self.step_bit_serial_cycles(bits);
        if bits == 8 {
            let dividend = self.get_register16(Register16::AX) as u32;
            let d = divisor as u32;
            if d == 0 || dividend / d.max(1) > 0xFF {
                self.trigger_interrupt(0);
                return;
            }
            let quotient = (dividend / d) as u8;
            let remainder = (dividend % d) as u8;
            self.set_register8(Register8::AL, quotient);
            self.set_register8(Register8::AH, remainder);
        }
        else {
            let ax = self.get_register16(Register16::AX) as u32;
            let dx = self.get_register16(Register16::DX) as u32;
            let dividend = (dx << 16) | ax;
            let d = divisor as u32;
            if d == 0 || dividend / d.max(1) > 0xFFFF {
                self.trigger_interrupt(0);
                return;
            }
            let quotient = (dividend / d) as u16;
            let remainder = (dividend % d) as u16;
            self.set_register16(Register16::AX, quotient);
            self.set_register16(Register16::DX, remainder);
        }
    }

    /// `IDIV r/m8` / `IDIV r/m16`.
    pub fn op_idiv(&mut self, bits: u32, divisor: u16) {
        self.cycles(4);
        self.step_bit_serial_cycles(bits);
        if bits == 8 {
            let dividend = self.get_register16(Register16::AX) as i16 as i32;
            let d = divisor as i8 as i32;
            if d == 0 {
                self.trigger_interrupt(0);
                return;
            }
            let quotient = dividend / d;
            let remainder = dividend % d;
            if quotient > i8::MAX as i32 || quotient < i8::MIN as i32 {
                self.trigger_interrupt(0);
                return;
            }
            self.set_register8(Register8::AL, quotient as u8);
            self.set_register8(Register8::AH, remainder as u8);
        }
        else {
            let ax = self.get_register16(Register16::AX) as u32;
            let dx = self.get_register16(Register16::DX) as u32;
            let dividend = ((dx << 16) | ax) as i32;
            let d = divisor as i16 as i32;
            if d == 0 {
                self.trigger_interrupt(0);
                return;
            }
            let quotient = dividend / d;
            let remainder = dividend % d;
            if quotient > i16::MAX as i32 || quotient < i16::MIN as i32 {
                self.trigger_interrupt(0);
                return;
            }
            self.set_register16(Register16::AX, quotient as u16);
            self.set_register16(Register16::DX, remainder as u16);
        }
    }
}
