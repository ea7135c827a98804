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

    interfaces.rs

    Traits the host must implement and hand to the core. These are the only
    points of contact between the EU/BIU and the rest of the emulated machine;
    per spec §6 the CPU subsystem never touches memory or IO directly, only
    through the BIU, which calls through these traits.
*/

use crate::error::BusError;

/// 20-bit physical address space memory.
pub trait Memory {
    fn read_mem_b(&mut self, addr: u32) -> Result<u8, BusError>;
    fn read_mem_w(&mut self, addr: u32) -> Result<u16, BusError>;
    fn write_mem_b(&mut self, addr: u32, data: u8) -> Result<(), BusError>;
    fn write_mem_w(&mut self, addr: u32, data: u16) -> Result<(), BusError>;

    /// Non-fatal breakpoint-on-access hook; hosts that don't implement
    /// breakpoints can leave this at the default (no hit, ever).
    fn mem_breakpoint(&self, _addr: u32) -> bool {
        false
    }
}

/// 16-bit IO address space.
pub trait IoBus {
    fn inb(&mut self, port: u16) -> u8;
    fn inw(&mut self, port: u16) -> u16 {
        let lo = self.inb(port) as u16;
        let hi = self.inb(port.wrapping_add(1)) as u16;
        lo | (hi << 8)
    }
    fn outb(&mut self, port: u16, data: u8);
    fn outw(&mut self, port: u16, data: u16) {
        self.outb(port, (data & 0xFF) as u8);
        self.outb(port.wrapping_add(1), (data >> 8) as u8);
    }
}

/// Programmable interrupt controller seam. `int_pending` must reflect whether
/// any unmasked IRQ line is currently asserted; `pic_irq_ack` performs one
/// cycle of the two-cycle INTA sequence, and may be called up to twice per
/// interrupt acknowledgment.
pub trait Pic {
    fn int_pending(&self) -> bool;
    fn pic_irq_ack(&mut self) -> u8;
}

/// Scheduled-timer seam, used only to provide the temporal coupling described
/// in §5; the core does not implement timer semantics itself.
pub trait Timer {
    fn tsc(&self) -> u64;
    fn timer_target(&self) -> u64;
    fn timer_process(&mut self);
}

/// FPU (8087) dispatch seam. Opcodes D8..DF decode a ModR/M byte and hand the
/// (opcode, modrm) pair to the active table; the FPU's own instruction
/// semantics are out of scope for this core (§1).
pub trait FpuDispatch {
    fn dispatch(&mut self, opcode: u8, modrm: u8);
}

/// A no-op FPU table, used when no coprocessor is installed: the ESC opcodes
/// still consume a ModR/M byte and a fixed cycle count, but have no effect.
#[derive(Default)]
pub struct NullFpu;

impl FpuDispatch for NullFpu {
    fn dispatch(&mut self, _opcode: u8, _modrm: u8) {}
}

/// GDB stub hook, called once after every instruction retires. Returning
/// `true` requests that the core halt execution at the next safe point.
pub trait GdbHook {
    fn gdbstub_instruction(&mut self) -> bool {
        false
    }
}

impl GdbHook for () {}
