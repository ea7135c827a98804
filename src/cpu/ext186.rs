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

    cpu/ext186.rs

    Opcodes introduced by the 80186: PUSHA/POPA, PUSH imm16/imm8, IMUL
    reg,r/m,imm, BOUND, shift-by-imm8, and ENTER/LEAVE. Gated by
    `config.cpu_type.is_186()` in the main dispatch (spec §4.4, §7 "186
    extensions").
*/

use super::modrm::ModRm;
use super::shift::ShiftOp;
use super::Cpu;
use crate::registers::{Register16, Segment};

impl Cpu {
    /// `PUSHA`, opcode 0x60: push AX,CX,DX,BX, the pre-push SP, BP, SI, DI.
    pub fn op_pusha(&mut self) {
        let orig_sp = self.sp;
        self.cycles(1);
        self.push_word(self.ax);
        self.push_word(self.cx);
        self.push_word(self.dx);
        self.push_word(self.bx);
        self.push_word(orig_sp);
        self.push_word(self.bp);
        self.push_word(self.si);
        self.push_word(self.di);
    }

    /// `POPA`, opcode 0x61: the inverse order, discarding the saved SP slot.
    pub fn op_popa(&mut self) {
        self.cycles(9);
        self.di = self.pop_word();
        self.si = self.pop_word();
        self.bp = self.pop_word();
        let _orig_sp = self.pop_word();
        self.bx = self.pop_word();
        self.dx = self.pop_word();
        self.cx = self.pop_word();
        self.ax = self.pop_word();
    }

    /// `BOUND reg16, m16&16`, opcode 0x62: fault with INT 5 if `reg` falls
    /// outside `[lowbound, highbound]`. On fault, PC is rewound to the start
    /// of the instruction before dispatching, matching the reference core.
    pub fn op_bound(&mut self, reg_value: u16) {
        let low = self.read_word(self.easeg, self.eaaddr);
        let high = self.read_word(self.easeg, self.eaaddr.wrapping_add(2));
        if reg_value < low || reg_value > high {
            self.pc = self.oldpc;
            self.trigger_interrupt(5);
        }
    }

    /// `PUSH imm16`, opcode 0x68.
    pub fn op_push_imm16(&mut self) {
        let value = self.fetch_word();
        self.cycles(1);
        self.push_word(value);
    }

    /// `PUSH imm8` (sign-extended), opcode 0x6A.
    pub fn op_push_imm8(&mut self) {
        let value = self.fetch_i8() as i16 as u16;
        self.push_word(value);
    }

    /// `IMUL reg16, r/m16, imm16`, opcode 0x69.
    pub fn op_imul_imm16(&mut self, src: u16, reg: Register16) {
        let imm = self.fetch_word();
        let a = src as i16 as i32;
        let b = imm as i16 as i32;
        let result = a * b;
        self.set_register16(reg, (result & 0xFFFF) as u16);
        let overflow = result != (result as i16 as i32);
        self.set_flag_state_carry_overflow(overflow);
    }

    /// `IMUL reg16, r/m16, imm8`, opcode 0x6B.
    pub fn op_imul_imm8(&mut self, src: u16, reg: Register16) {
        let imm = self.fetch_i8() as i16 as i32;
        let a = src as i16 as i32;
        let result = a * imm;
        self.set_register16(reg, (result & 0xFFFF) as u16);
        let overflow = result != (result as i16 as i32);
        self.set_flag_state_carry_overflow(overflow);
    }

    fn set_flag_state_carry_overflow(&mut self, state: bool) {
        use crate::registers::Flag;
        self.set_flag_state(Flag::Carry, state);
        self.set_flag_state(Flag::Overflow, state);
    }

    /// Shift/rotate-by-imm8 group, opcodes 0xC0/0xC1.
    pub fn op_shift_imm8(&mut self, m: &ModRm, bits: u32) {
        if m.md == 3 {
            self.cycles(1);
        }
        let value = if bits == 8 { self.get_ea_byte(m) as u16 } else { self.get_ea_word(m) };
        let count = self.fetch_byte();
        self.cycles(if m.md != 3 { 9 } else { 6 });
        let op = ShiftOp::from_reg(m.reg);
        let result = self.shift_rotate(op, bits, value, count, false);
        if bits == 8 {
            self.set_ea_byte(m, (result & 0xFF) as u8);
        }
        else {
            self.set_ea_word(m, result);
        }
    }

    /// `ENTER imm16, imm8`, opcode 0xC8: allocate `size` bytes of locals and
    /// build a `nests`-deep display of outer BP frames.
    pub fn op_enter(&mut self) {
        let size = self.fetch_word();
        let mut nests = self.fetch_byte();
        self.push_word(self.bp);
        let frame_sp = self.sp;
        if nests > 0 {
            while nests > 1 {
                self.bp = self.bp.wrapping_sub(2);
                let level = self.read_word(Segment::SS, self.bp);
                self.push_word(level);
                nests -= 1;
            }
            self.push_word(frame_sp);
        }
        self.bp = frame_sp;
        self.sp = self.sp.wrapping_sub(size);
    }

    /// `LEAVE`, opcode 0xC9: collapse the current stack frame.
    pub fn op_leave(&mut self) {
        self.sp = self.bp;
        self.bp = self.pop_word();
    }
}
