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

    cpu/biu.rs

    Implements the BIU: translating EU intents into T1-T4 bus cycles,
    scheduling code prefetches, and enforcing the wait-state and prefetch
    abort policy of spec §4.1-§4.3.
*/

use super::Cpu;
use crate::{
    bcsm::{BusRequestFlags, TCycle},
    registers::Segment,
};

/// What kind of operand transfer is pending, set up by the `biu_*` entry
/// points below and drained tick-by-tick by `cycle()`.
#[derive(Copy, Clone, Debug)]
struct PendingAccess {
    flags: BusRequestFlags,
    addr: u32,
    write_data: u8,
}

impl Cpu {
    // ---------------------------------------------------------------
    // The single host-tick primitive. Every wait() in the EU ultimately
    // calls this. `operand_active` is spec §4.5's `bus_flag`: true while
    // the EU is driving an operand bus cycle through to completion,
    // false while the EU is merely burning cycles (in which case the BIU
    // may use the tick to progress a scheduled code fetch instead).
    // ---------------------------------------------------------------
    pub(crate) fn cycle(&mut self) {
        self.cycle_count += 1;
        let was_non_negative = self.cycles_remaining >= 0;
        self.cycles_remaining -= 1;
        if was_non_negative && self.cycles_remaining < 0 {
            log::warn!("cycle budget went negative: {}", self.cycles_remaining);
        }
        self.tsc = self.tsc.wrapping_add(self.cpu_multiplier_fixedpoint >> 16);
        if self.tsc >= self.timer.timer_target() {
            self.timer.timer_process();
        }

        // DMA/refresh evaluation: a pending refresh cycle steals this tick
        // from the bus entirely if we're not mid-transfer and not locked.
        let refresh_eligible = !self.in_lock
            && (self.bus_request_type.is_idle() || matches!(self.phase, TCycle::T3 | TCycle::T4));
        if self.dma.hlda > 0 {
            self.dma.hlda -= 1;
            return;
        }
        if self.dma.try_drain_refresh(refresh_eligible && self.bus_request_type.is_idle()) {
            return;
        }

        // Wait-state insertion: not_ready holds off the start of a new
        // access. We only apply it while a request is queued but hasn't
        // begun transferring (phase still T1 and this is the first tick
        // of a fresh access).
        if self.config.enable_wait_states && self.dma.not_ready > 0 && !self.bus_request_type.is_idle() {
            self.dma.not_ready -= 1;
            return;
        }

        if self.bus_request_type.is_idle() {
            // Nothing in flight; see if a code prefetch should begin.
            if self.schedule_fetch && self.queue.has_room_for_fetch() {
                self.biu_start_code_fetch();
            }
            else {
                return;
            }
        }

        self.run_bus_phase();
    }

    /// Spend `n` host ticks with no operand access pending (the EU is busy
    /// computing); the BIU may use these ticks to progress a scheduled
    /// prefetch. This is the `wait(n)` primitive of spec §4.1.
    pub fn cycles(&mut self, n: u32) {
        for _ in 0..n {
            self.cycle();
        }
    }

    fn run_bus_phase(&mut self) {
        match self.phase {
            TCycle::T1 => {
                // Latch access_code; no external effect.
            }
            TCycle::T2 => {
                if self.bus_request_type.out() && !self.bus_request_type.code() {
                    self.perform_write();
                }
            }
            TCycle::T3 => {
                if !self.bus_request_type.out() {
                    self.perform_read();
                }
            }
            TCycle::T4 => {
                // No external effect; completion handling happens below.
            }
        }

        let was_t4 = matches!(self.phase, TCycle::T4);
        self.phase = self.phase.next();
        if was_t4 {
            self.complete_bus_cycle();
        }
    }

    fn perform_write(&mut self) {
        let addr = self.current_access_addr;
        let data = self.current_access_data;
        if self.bus_request_type.mem() {
            let _ = self.memory.write_mem_b(addr, data);
        }
        else if self.bus_request_type.io() {
            self.io.outb((addr & 0xFFFF) as u16, data);
        }
    }

    fn perform_read(&mut self) {
        let addr = self.current_access_addr;
        if self.bus_request_type.code() {
            let byte = self.memory.read_mem_b(addr).unwrap_or(0xF4);
            self.pending_fetch_byte = Some(byte);
        }
        else if self.bus_request_type.mem() {
            let byte = self.memory.read_mem_b(addr).unwrap_or(0xFF);
            self.current_access_result = byte;
        }
        else if self.bus_request_type.io() {
            let byte = self.io.inb((addr & 0xFFFF) as u16);
            self.current_access_result = byte;
        }
        else if self.bus_request_type.pic() {
            let byte = self.pic.pic_irq_ack();
            self.current_access_result = byte;
        }
    }

    fn complete_bus_cycle(&mut self) {
        if self.bus_request_type.code() {
            if let Some(byte) = self.pending_fetch_byte.take() {
                self.queue.push(byte);
            }
        }
        self.bus_request_type = BusRequestFlags::NONE;
        // A fresh fetch decision is re-evaluated on the next idle tick.
    }

    fn biu_start_code_fetch(&mut self) {
        self.bus_request_type = BusRequestFlags::code_fetch();
        self.current_access_addr = Cpu::calc_linear_address(self.cs.selector(), self.queue.ip);
        self.phase = TCycle::T1;
    }

    // ---------------------------------------------------------------
    // Operand access entry points used by the EU. Each one aborts an
    // in-flight prefetch per the §4.2 policy, runs exactly one 4-tick bus
    // cycle (or two, for an 8088-style split word access), and returns the
    // result.
    // ---------------------------------------------------------------

    fn begin_operand_access(&mut self, access: PendingAccess) {
        self.abort_prefetch_for_operand_access();
        self.bus_request_type = access.flags;
        self.current_access_addr = access.addr;
        self.current_access_data = access.write_data;
        self.phase = TCycle::T1;
        self.cycles(4);
    }

    /// Prefetch abort policy, spec §4.2: if we are not mid-fetch (bus idle,
    /// or an operand cycle is somehow already in progress) there is nothing
    /// to abort. Otherwise the cost depends on which phase the in-flight
    /// fetch has reached.
    fn abort_prefetch_for_operand_access(&mut self) {
        if !self.bus_request_type.code() {
            return;
        }
        match self.phase {
            TCycle::T1 | TCycle::T2 => {
                // Free abort: nothing fetched yet.
                self.bus_request_type = BusRequestFlags::NONE;
                self.phase = TCycle::T1;
            }
            TCycle::T3 | TCycle::T4 => {
                let phase_number = match self.phase {
                    TCycle::T1 => 1,
                    TCycle::T2 => 2,
                    TCycle::T3 => 3,
                    TCycle::T4 => 4,
                };
                let leftover = 5 - phase_number;
                self.pending_fetch_byte = None; // the staged byte (if any) is discarded, spec property 8
                self.bus_request_type = BusRequestFlags::NONE;
                self.phase = TCycle::T1;
                self.cycles(leftover + 2);
            }
        }
    }

    pub fn read_byte(&mut self, seg: Segment, offset: u16) -> u8 {
        let addr = self.calc_linear_address_seg(seg, offset);
        self.begin_operand_access(PendingAccess { flags: BusRequestFlags::mem_read(), addr, write_data: 0 });
        self.current_access_result
    }

    pub fn write_byte(&mut self, seg: Segment, offset: u16, data: u8) {
        let addr = self.calc_linear_address_seg(seg, offset);
        self.begin_operand_access(PendingAccess { flags: BusRequestFlags::mem_write(), addr, write_data: data });
    }

    /// Word read: a single WIDE cycle on a 16-bit-bus part at an even
    /// address; otherwise two consecutive byte cycles, low then high.
    pub fn read_word(&mut self, seg: Segment, offset: u16) -> u16 {
        if self.config.cpu_type.bus_is_16() && offset & 1 == 0 {
            let addr = self.calc_linear_address_seg(seg, offset);
            self.begin_operand_access(PendingAccess {
                flags: BusRequestFlags::mem_read().with_wide(true),
                addr,
                write_data: 0,
            });
            let lo = self.current_access_result;
            // A WIDE cycle transfers both bytes at once; read the upper
            // byte directly since no second bus cycle occurs.
            let hi = self.memory.read_mem_b(addr + 1).unwrap_or(0xFF);
            (lo as u16) | ((hi as u16) << 8)
        }
        else {
            let lo = self.read_byte(seg, offset);
            let hi = self.read_byte(seg, offset.wrapping_add(1));
            (lo as u16) | ((hi as u16) << 8)
        }
    }

    pub fn write_word(&mut self, seg: Segment, offset: u16, data: u16) {
        if self.config.cpu_type.bus_is_16() && offset & 1 == 0 {
            let addr = self.calc_linear_address_seg(seg, offset);
            self.begin_operand_access(PendingAccess {
                flags: BusRequestFlags::mem_write().with_wide(true),
                addr,
                write_data: (data & 0xFF) as u8,
            });
            let _ = self.memory.write_mem_b(addr + 1, (data >> 8) as u8);
        }
        else {
            self.write_byte(seg, offset, (data & 0xFF) as u8);
            self.write_byte(seg, offset.wrapping_add(1), (data >> 8) as u8);
        }
    }

    /// Read a byte at an absolute 20-bit physical address, bypassing segment
    /// translation. Used for IVT access during interrupt dispatch, which
    /// addresses physical memory directly rather than through a segment.
    pub fn read_byte_abs(&mut self, addr: u32) -> u8 {
        self.begin_operand_access(PendingAccess { flags: BusRequestFlags::mem_read(), addr, write_data: 0 });
        self.current_access_result
    }

    pub fn read_word_abs(&mut self, addr: u32) -> u16 {
        let lo = self.read_byte_abs(addr);
        let hi = self.read_byte_abs(addr + 1);
        (lo as u16) | ((hi as u16) << 8)
    }

    pub fn in_byte(&mut self, port: u16) -> u8 {
        self.begin_operand_access(PendingAccess {
            flags: BusRequestFlags::io_read(),
            addr: port as u32,
            write_data: 0,
        });
        self.current_access_result
    }

    pub fn out_byte(&mut self, port: u16, data: u8) {
        self.begin_operand_access(PendingAccess {
            flags: BusRequestFlags::io_write(),
            addr: port as u32,
            write_data: data,
        });
    }

    pub fn in_word(&mut self, port: u16) -> u16 {
        if port & 1 == 0 && self.config.cpu_type.bus_is_16() {
            // Even-aligned IO words still decompose into two byte cycles on
            // this family; only memory gets a WIDE cycle.
        }
        let lo = self.in_byte(port);
        let hi = self.in_byte(port.wrapping_add(1));
        (lo as u16) | ((hi as u16) << 8)
    }

    pub fn out_word(&mut self, port: u16, data: u16) {
        self.out_byte(port, (data & 0xFF) as u8);
        self.out_byte(port.wrapping_add(1), (data >> 8) as u8);
    }

    /// Run one 4-tick PIC bus cycle under LOCK#; the EU calls this twice in
    /// sequence to acknowledge a maskable interrupt (spec §4.2, §4.4.3).
    pub fn pic_acknowledge(&mut self) -> u8 {
        self.begin_operand_access(PendingAccess { flags: BusRequestFlags::pic_ack(), addr: 0, write_data: 0 });
        self.current_access_result
    }

    /// Finish the current bus phase, wait until T1, insert one idle tick,
    /// then disable prefetching (spec §4.2 `suspend_prefetch`).
    pub fn suspend_prefetch(&mut self) {
        while !matches!(self.phase, TCycle::T1) {
            self.cycle();
        }
        self.cycles(1);
        self.schedule_fetch = false;
        self.prefetching = false;
    }

    pub fn resume_prefetch(&mut self) {
        self.prefetching = true;
        self.schedule_fetch = self.queue.has_room_for_fetch();
    }

    /// Discard all buffered bytes and reset to T1 (spec §4.3 flush contract).
    pub fn flush_queue(&mut self) {
        self.queue.flush();
        self.bus_request_type = BusRequestFlags::NONE;
        self.pending_fetch_byte = None;
        self.phase = TCycle::T1;
        self.queue.ip = self.flat_pc();
        self.resume_prefetch();
    }

    /// Read one opcode/operand byte out of the PFQ, cycling the CPU until a
    /// byte is available if the queue is currently empty (spec §4.3
    /// `fetch_byte`).
    pub fn fetch_byte(&mut self) -> u8 {
        while self.queue.is_empty() {
            self.cycle();
        }
        let byte = self.queue.pop();
        self.pc = self.pc.wrapping_add(1);
        byte
    }

    pub fn fetch_word(&mut self) -> u16 {
        let lo = self.fetch_byte();
        let hi = self.fetch_byte();
        (lo as u16) | ((hi as u16) << 8)
    }

    pub fn fetch_i8(&mut self) -> i8 {
        self.fetch_byte() as i8
    }

    pub fn fetch_i16(&mut self) -> i16 {
        self.fetch_word() as i16
    }
}
