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

    cpu/jump.rs

    Conditional jumps, LOOP/JCXZ, and the near/far CALL/JMP/RET/RETF/IRET
    family (spec §4.4.5). Every control transfer that changes PC mid-stream
    suspends prefetch and flushes the queue before resuming fetch at the new
    address.
*/

use super::Cpu;
use crate::registers::{Flag, Register16, Segment};

impl Cpu {
    /// Common tail of every taken control transfer: suspend prefetch for one
    /// tick, flush the queue, and let it refill from the new PC (spec §4.4.5,
    /// §8 property 7: PFQ is flushed before the next opcode fetch).
    fn redirect_fetch(&mut self) {
        self.suspend_prefetch();
        self.flush_queue();
    }

    /// `Jcc rel8`: fetch the signed displacement unconditionally (it's
    /// already consumed from the queue regardless of outcome), then branch
    /// only if `taken`.
    pub fn op_jcc(&mut self, taken: bool) {
        let disp = self.fetch_i8();
        if taken {
            self.pc = (self.pc as i16).wrapping_add(disp as i16) as u16;
            self.redirect_fetch();
        }
    }

    pub fn condition_o(&self) -> bool {
        self.get_flag(Flag::Overflow)
    }
    pub fn condition_b(&self) -> bool {
        self.get_flag(Flag::Carry)
    }
    pub fn condition_e(&self) -> bool {
        self.get_flag(Flag::Zero)
    }
    pub fn condition_be(&self) -> bool {
        self.get_flag(Flag::Carry) || self.get_flag(Flag::Zero)
    }
    pub fn condition_s(&self) -> bool {
        self.get_flag(Flag::Sign)
    }
    pub fn condition_p(&self) -> bool {
        self.get_flag(Flag::Parity)
    }
    pub fn condition_l(&self) -> bool {
        self.get_flag(Flag::Sign) != self.get_flag(Flag::Overflow)
    }
    pub fn condition_le(&self) -> bool {
        self.get_flag(Flag::Zero) || (self.get_flag(Flag::Sign) != self.get_flag(Flag::Overflow))
    }

    /// `LOOP`/`LOOPE`/`LOOPNE`/`JCXZ` (0xE0-0xE3). `extra` tests the zero
    /// flag in the direction LOOPE/LOOPNE require; `is_jcxz` skips the CX
    /// decrement entirely. CX==1 under LOOP decrements to 0 and does NOT
    /// branch; JCXZ with CX==0 DOES branch (spec §8 boundary behaviors).
    pub fn op_loop(&mut self, extra: Option<bool>, is_jcxz: bool) {
        let disp = self.fetch_i8();
        if is_jcxz || extra.is_some() {
            self.cycles(1);
        }
        let taken = if is_jcxz {
            self.cx == 0
        }
        else {
            self.cx = self.cx.wrapping_sub(1);
            let cx_nonzero = self.cx != 0;
            match extra {
                Some(want_zero) => cx_nonzero && (self.get_flag(Flag::Zero) == want_zero),
                None => cx_nonzero,
            }
        };
        if taken {
            self.pc = (self.pc as i16).wrapping_add(disp as i16) as u16;
            self.redirect_fetch();
        }
    }

    /// `CALL rel16`: push return IP, then branch.
    pub fn op_call_near(&mut self) {
        let disp = self.fetch_i16();
        self.cycles(1);
        let ret_ip = self.pc;
        self.push_word(ret_ip);
        self.pc = (self.pc as i16).wrapping_add(disp) as u16;
        self.redirect_fetch();
    }

    /// `CALL far ptr16:16`.
    pub fn op_call_far(&mut self) {
        let new_ip = self.fetch_word();
        let new_cs = self.fetch_word();
        let ret_cs = self.cs.selector();
        let ret_ip = self.pc;
        self.push_word(ret_cs);
        self.push_word(ret_ip);
        self.cs.set(new_cs);
        self.pc = new_ip;
        self.redirect_fetch();
    }

    /// `CALL rm16` / `CALL rm32` / `JMP rm16` / `JMP rm32` forms dispatched
    /// from the FE/FF group: indirect calls and jumps through an operand
    /// already resolved by the caller.
    pub fn op_call_near_indirect(&mut self, target: u16) {
        self.cycles(1);
        let ret_ip = self.pc;
        self.push_word(ret_ip);
        self.pc = target;
        self.redirect_fetch();
    }

    pub fn op_call_far_indirect(&mut self, new_ip: u16, new_cs: u16) {
        let ret_cs = self.cs.selector();
        let ret_ip = self.pc;
        self.push_word(ret_cs);
        self.push_word(ret_ip);
        self.cs.set(new_cs);
        self.pc = new_ip;
        self.redirect_fetch();
    }

    pub fn op_jmp_near(&mut self) {
        let disp = self.fetch_i16();
        self.pc = (self.pc as i16).wrapping_add(disp) as u16;
        self.redirect_fetch();
    }

    pub fn op_jmp_short(&mut self) {
        let disp = self.fetch_i8();
        self.pc = (self.pc as i16).wrapping_add(disp as i16) as u16;
        self.redirect_fetch();
    }

    pub fn op_jmp_far(&mut self) {
        let new_ip = self.fetch_word();
        let new_cs = self.fetch_word();
        self.cs.set(new_cs);
        self.pc = new_ip;
        self.redirect_fetch();
    }

    pub fn op_jmp_indirect(&mut self, target: u16) {
        self.pc = target;
        self.redirect_fetch();
    }

    pub fn op_jmp_far_indirect(&mut self, new_ip: u16, new_cs: u16) {
        self.cs.set(new_cs);
        self.pc = new_ip;
        self.redirect_fetch();
    }

    /// `RET imm16?` (near): pop return IP, optionally deallocate `extra`
    /// bytes of arguments.
    pub fn op_ret_near(&mut self, extra: u16) {
        self.cycles(1);
        let new_ip = self.pop_word();
        self.suspend_prefetch();
        self.flush_queue();
        self.sp = self.sp.wrapping_add(extra);
        self.pc = new_ip;
    }

    /// `RETF imm16?` (far).
    pub fn op_ret_far(&mut self, extra: u16) {
        self.cycles(1);
        let new_ip = self.pop_word();
        let new_cs = self.pop_word();
        self.suspend_prefetch();
        self.flush_queue();
        self.cs.set(new_cs);
        self.pc = new_ip;
        self.sp = self.sp.wrapping_add(extra);
    }

    /// `IRET`: pop IP, CS, FLAGS; forces the always-one bit (and the NEC
    /// MD bit) the way the reference core's `farret`+flags restore does,
    /// and opens a one-instruction interrupt shadow.
    pub fn op_iret(&mut self) {
        self.cycles(2);
        let new_ip = self.pop_word();
        let new_cs = self.pop_word();
        self.suspend_prefetch();
        self.flush_queue();
        self.cs.set(new_cs);
        self.pc = new_ip;
        let raw_flags = self.pop_word();
        let forced = if self.config.cpu_type.is_nec() { 0x8002 } else { 0x0002 };
        self.flags = raw_flags | forced;
        self.noint = true;
        self.nmi_enable = true;
    }

    /// `LES`/`LDS rw, rmd`: load the word at the EA into a GP register and
    /// the following word into ES or DS.
    pub fn op_load_far_pointer(&mut self, reg: Register16, seg: Segment, offset_value: u16, seg_value: u16) {
        self.set_register16(reg, offset_value);
        match seg {
            Segment::ES => self.es.set(seg_value),
            Segment::DS => self.ds.set(seg_value),
            _ => unreachable!("LES/LDS only ever target ES or DS"),
        }
    }
}
