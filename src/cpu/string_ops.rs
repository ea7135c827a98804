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

    cpu/string_ops.rs

    MOVS/LODS/STOS/CMPS/SCAS/INS/OUTS and the REP/REPE/REPNE iteration policy
    that wraps them (spec §4.4.4). Each `op_*` here performs exactly one
    iteration; the REP loop itself -- CX test, body, decrement, zero-flag
    termination check, interrupt safe point -- is driven by the dispatch loop
    in execute.rs, which calls `rep_should_terminate`/`rep_tick` around the
    per-iteration body the same way the reference core's top-level `execute()`
    wraps its string-op cases in a `while (rep_pending)` loop.
*/

use super::{Cpu, RepPrefix};
use crate::registers::{Flag, Register16, Register8, Segment};

impl Cpu {
    /// Step SI/DI by `bits/8` bytes, forward or backward per the Direction
    /// flag (reference core's `string_increment`).
    fn advance_index(&mut self, reg: Register16, bits: u32) {
        let step = (bits / 8) as u16;
        let cur = self.get_register16(reg);
        let next = if self.get_flag(Flag::Direction) { cur.wrapping_sub(step) } else { cur.wrapping_add(step) };
        self.set_register16(reg, next);
    }

    fn source_segment(&self) -> Segment {
        self.ovr_seg.unwrap_or(Segment::DS)
    }

    /// `MOVS`: `[ES:DI] = [DS:SI]` (DS overridable), advance SI and DI.
    pub fn op_movs(&mut self, bits: u32) {
        let seg = self.source_segment();
        if bits == 8 {
            let v = self.read_byte(seg, self.si);
            self.write_byte(Segment::ES, self.di, v);
        }
        else {
            let v = self.read_word(seg, self.si);
            self.write_word(Segment::ES, self.di, v);
        }
        self.advance_index(Register16::SI, bits);
        self.advance_index(Register16::DI, bits);
    }

    /// `LODS`: `AL/AX = [DS:SI]` (DS overridable), advance SI.
    pub fn op_lods(&mut self, bits: u32) {
        let seg = self.source_segment();
        if bits == 8 {
            let v = self.read_byte(seg, self.si);
            self.set_register8(Register8::AL, v);
        }
        else {
            let v = self.read_word(seg, self.si);
            self.set_register16(Register16::AX, v);
        }
        self.advance_index(Register16::SI, bits);
    }

    /// `STOS`: `[ES:DI] = AL/AX`, advance DI. ES is never overridable.
    pub fn op_stos(&mut self, bits: u32) {
        if bits == 8 {
            let v = self.get_register8(Register8::AL);
            self.write_byte(Segment::ES, self.di, v);
        }
        else {
            let v = self.get_register16(Register16::AX);
            self.write_word(Segment::ES, self.di, v);
        }
        self.advance_index(Register16::DI, bits);
    }

    /// `CMPS`: flags from `[DS:SI] - [ES:DI]`, advance both.
    pub fn op_cmps(&mut self, bits: u32) {
        let seg = self.source_segment();
        let (dest, src) = if bits == 8 {
            (self.read_byte(seg, self.si) as u16, self.read_byte(Segment::ES, self.di) as u16)
        }
        else {
            (self.read_word(seg, self.si), self.read_word(Segment::ES, self.di))
        };
        self.cpu_dest = dest;
        self.cpu_src = src;
        self.cpu_alu_op = 7;
        self.alu_op(bits);
        self.advance_index(Register16::SI, bits);
        self.advance_index(Register16::DI, bits);
    }

    /// `SCAS`: flags from `AL/AX - [ES:DI]`, advance DI.
    pub fn op_scas(&mut self, bits: u32) {
        let dest = if bits == 8 { self.get_register8(Register8::AL) as u16 } else { self.get_register16(Register16::AX) };
        let src = if bits == 8 { self.read_byte(Segment::ES, self.di) as u16 } else { self.read_word(Segment::ES, self.di) };
        self.cpu_dest = dest;
        self.cpu_src = src;
        self.cpu_alu_op = 7;
        self.alu_op(bits);
        self.advance_index(Register16::DI, bits);
    }

    /// `INS`: `[ES:DI] = IN(DX)`, advance DI (80186+).
    pub fn op_ins(&mut self, bits: u32) {
        let port = self.dx;
        if bits == 8 {
            let v = self.in_byte(port);
            self.write_byte(Segment::ES, self.di, v);
        }
        else {
            let v = self.in_word(port);
            self.write_word(Segment::ES, self.di, v);
        }
        self.advance_index(Register16::DI, bits);
    }

    /// `OUTS`: `OUT(DX) = [DS:SI]` (DS overridable), advance SI (80186+).
    pub fn op_outs(&mut self, bits: u32) {
        let seg = self.source_segment();
        let port = self.dx;
        if bits == 8 {
            let v = self.read_byte(seg, self.si);
            self.out_byte(port, v);
        }
        else {
            let v = self.read_word(seg, self.si);
            self.out_word(port, v);
        }
        self.advance_index(Register16::SI, bits);
    }

    /// Whether the current REP-prefixed string op should stop iterating
    /// after the iteration that just ran, beyond the ordinary CX==0 test:
    /// CMPS/SCAS under REPE/REPNE additionally stop on the first mismatching
    /// zero-flag outcome (spec §4.4.4). MOVS/LODS/STOS/INS/OUTS ignore the
    /// flag and only ever stop on CX. `rep_c_flag` (set by the NEC-only
    /// REPC/REPNC prefixes) tests Carry in place of Zero.
    pub(crate) fn rep_should_terminate_on_flags(&self, compares: bool) -> bool {
        if !compares {
            return false;
        }
        let flag_set = if self.rep_c_flag { self.get_flag(Flag::Carry) } else { self.get_flag(Flag::Zero) };
        match self.in_rep {
            RepPrefix::RepE => !flag_set,
            RepPrefix::RepNE => flag_set,
            RepPrefix::None => false,
        }
    }

    /// Decrement CX for one REP iteration and report whether another
    /// iteration is still pending purely by the CX test.
    pub(crate) fn rep_tick_cx(&mut self) -> bool {
        self.cx = self.cx.wrapping_sub(1);
        self.cycles(2);
        self.cx != 0
    }

    /// Rewind PC back over the REP prefix (and any segment-override prefix
    /// ahead of it) so that an interrupt taken between iterations resumes by
    /// re-fetching and re-dispatching the whole prefixed instruction, exactly
    /// as the reference core's `pc -= rep_prefix_len` does.
    pub(crate) fn rep_rewind_for_interrupt(&mut self) {
        self.pc = self.pc.wrapping_sub(self.prefix_len as u16);
        self.suspend_prefetch();
        self.flush_queue();
    }
}
