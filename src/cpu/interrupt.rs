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

    cpu/interrupt.rs

    The INTR microcode routine and the per-instruction-boundary priority
    check across trap flag, NMI, and maskable IRQ (spec §4.4.3).
*/

use super::{Cpu, CpuState};
use crate::registers::{Flag, Register16, Segment};

/// Host-facing events queued by the `INT FCh` emulator-service trap (spec
/// SPEC_FULL §B), drained via `Cpu::get_service_event`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ServiceEvent {
    TriggerLogging,
    QuitEmulator(u8),
}

impl Cpu {
    /// Read the new CS:IP out of the IVT at `intr * 4`, suspend/flush the
    /// queue, push FLAGS (masked per variant), clear T and I, and perform
    /// the FARCALL2 that lands at the handler. `skip_first` matches the
    /// reference core's `intr_routine(vector, skip_first)`, used by the
    /// external-IRQ path which has already spent the leading tick.
    fn intr_routine(&mut self, vector: u16, skip_first: bool) {
        use crate::registers::{FLAGS_POP_MASK_8086, FLAGS_POP_MASK_NEC};
        let pop_mask = if self.config.cpu_type.is_nec() { FLAGS_POP_MASK_NEC } else { FLAGS_POP_MASK_8086 };
        let saved_flags = self.flags & pop_mask;

        if !skip_first {
            self.cycles(1);
        }
        self.cycles(2);

        let table_addr = (vector as u32) * 4;
        let new_ip = self.read_word_abs(table_addr);
        self.cycles(1);
        let new_cs = self.read_word_abs(table_addr + 2);

        self.suspend_prefetch();
        self.cycles(2);
        self.push_word(saved_flags);
        self.set_flag_state(Flag::Interrupt, false);
        self.set_flag_state(Flag::Trap, false);
        self.cycles(1);

        let ret_cs = self.cs.selector();
        let ret_ip = self.pc;
        self.push_word(ret_cs);
        self.push_word(ret_ip);
        self.cs.set(new_cs);
        self.pc = new_ip;
        self.flush_queue();
    }

    /// `INT n` (software interrupt, opcode 0xCD and friends).
    pub fn trigger_interrupt(&mut self, vector: u16) {
        self.intr_routine(vector, false);
    }

    /// `INT imm8`, opcode 0xCD: intercepts `INT FCh` as the emulator-service
    /// trap when enabled (spec SPEC_FULL §B), otherwise dispatches normally.
    /// AH selects the sub-function, matching the reference host's trap
    /// convention: 01h relocates execution to CS:IP in BX:CX, 02h requests a
    /// logging toggle, 03h requests emulator exit with AL as the status code.
    pub fn sw_interrupt(&mut self, vector: u8) {
        if self.enable_service_interrupt && vector == 0xFC {
            use crate::registers::Register8;
            match self.get_register8(Register8::AH) {
                0x01 => {
                    self.suspend_prefetch();
                    self.cycles(4);
                    let new_cs = self.bx;
                    let new_ip = self.cx;
                    self.cs.set(new_cs);
                    self.pc = new_ip;
                    self.ds.set(new_cs);
                    self.es.set(new_cs);
                    self.ss.set(new_cs);
                    self.sp = 0xFFFE;
                    self.flush_queue();
                    self.cycles(4);
                }
                0x02 => {
                    self.service_events.push_back(ServiceEvent::TriggerLogging);
                }
                0x03 => {
                    let status = self.get_register8(Register8::AL);
                    self.service_events.push_back(ServiceEvent::QuitEmulator(status));
                }
                _ => {}
            }
            return;
        }
        self.trigger_interrupt(vector as u16);
    }

    pub fn op_int3(&mut self) {
        self.cycles(4);
        self.trigger_interrupt(3);
    }

    pub fn op_into(&mut self) {
        if self.get_flag(Flag::Overflow) {
            self.trigger_interrupt(4);
        }
    }

    fn custom_nmi(&mut self) {
        self.cycles(3);
        let new_ip = self.config.custom_nmi_vector as u16;
        let new_cs = 0u16;
        use crate::registers::{FLAGS_POP_MASK_8086, FLAGS_POP_MASK_NEC};
        let pop_mask = if self.config.cpu_type.is_nec() { FLAGS_POP_MASK_NEC } else { FLAGS_POP_MASK_8086 };
        let saved_flags = self.flags & pop_mask;
        self.suspend_prefetch();
        self.cycles(2);
        self.push_word(saved_flags);
        self.set_flag_state(Flag::Interrupt, false);
        self.set_flag_state(Flag::Trap, false);
        self.cycles(1);
        let ret_cs = self.cs.selector();
        let ret_ip = self.pc;
        self.push_word(ret_cs);
        self.push_word(ret_ip);
        self.cs.set(new_cs);
        self.pc = new_ip;
        self.flush_queue();
    }

    pub(crate) fn irq_pending(&self) -> bool {
        (self.nmi_pending && self.nmi_enable && self.nmi_mask)
            || (self.get_flag(Flag::Trap) && !self.noint)
            || (self.get_flag(Flag::Interrupt) && self.pic.int_pending() && !self.noint)
    }

    /// Priority-ordered interrupt check run at every instruction boundary
    /// and REP safe point (spec §4.4.3): trap flag, then NMI, then maskable
    /// IRQ via the two-cycle PIC acknowledge sequence under LOCK#.
    pub(crate) fn check_interrupts(&mut self) {
        if !self.irq_pending() {
            return;
        }

        // Any branch taken below ends the instruction currently in progress
        // (including a HLT loop's `repeating` state) in favor of dispatching
        // into the handler at the new CS:IP. A HLT that retired right as the
        // interrupt became pending has already set `state = Halted`; since
        // we are about to dispatch into the handler, the core must resume
        // running or it never gets there.
        self.repeating = false;
        self.completed = true;
        self.ovr_seg = None;
        self.state = CpuState::Running;

        if self.get_flag(Flag::Trap) && !self.noint {
            self.cycles(2);
            self.intr_routine(1, false);
            return;
        }

        if self.nmi_pending && self.nmi_enable && self.nmi_mask {
            self.nmi_enable = false;
            self.cycles(2);
            if self.config.use_custom_nmi_vector {
                self.custom_nmi();
            }
            else {
                self.intr_routine(2, false);
            }
            self.nmi_pending = false;
            return;
        }

        if self.get_flag(Flag::Interrupt) && self.pic.int_pending() && !self.noint {
            self.cycles(4);
            let old_in_lock = self.in_lock;
            self.in_lock = true;
            let _first = self.pic_acknowledge();
            self.cycles(1);
            let vector = self.pic_acknowledge();
            self.cycles(1);
            self.in_lock = old_in_lock;
            self.cycles(6);
            self.opcode = 0x00;
            self.intr_routine(vector as u16, false);
        }
    }

    /// `LAHF`: AH = low byte of FLAGS, with the unused bit 1 forced on and
    /// bits 3/5 forced off (reference core masks with `0xD7`).
    pub fn op_lahf(&mut self) {
        use crate::registers::Register8;
        let flags = self.get_flags();
        self.set_register8(Register8::AH, (flags & 0xD7) as u8);
    }

    /// `SAHF`: merge AH into the low byte of FLAGS (C,P,A,Z,S only).
    pub fn op_sahf(&mut self) {
        use crate::registers::Register8;
        let ah = self.get_register8(Register8::AH);
        let flags = (self.get_flags() & 0xFF00) | ah as u16;
        self.set_flags(flags);
    }

    pub fn op_xlat(&mut self) {
        use crate::registers::Register8;
        let al = self.get_register8(Register8::AL);
        let seg = self.ovr_seg.unwrap_or(Segment::DS);
        let offset = self.bx.wrapping_add(al as u16);
        let value = self.read_byte(seg, offset);
        self.set_register8(Register8::AL, value);
    }

    pub fn op_lea(&mut self, reg: Register16, offset: u16) {
        self.set_register16(reg, offset);
    }
}
