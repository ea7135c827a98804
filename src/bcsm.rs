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

    bcsm.rs

    The Bus Cycle State Machine: the T1-T4 phase sequencer and the bus request
    flags that tell it what kind of access is in flight. See spec §4.1.

    This is deliberately the simplified four-phase model spec.md describes,
    not the teacher's full Tr/Ts/T0/Td pipeline-slot microarchitecture: the
    distilled spec re-architects bus timing down to one side effect per T-state,
    and that is the model this crate implements.
*/

use modular_bitfield::prelude::*;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TCycle {
    #[default]
    T1,
    T2,
    T3,
    T4,
}

impl TCycle {
    /// Advance unconditionally to the next phase, wrapping T4 -> T1.
    #[inline(always)]
    pub fn next(self) -> TCycle {
        match self {
            TCycle::T1 => TCycle::T2,
            TCycle::T2 => TCycle::T3,
            TCycle::T3 => TCycle::T4,
            TCycle::T4 => TCycle::T1,
        }
    }
}

/// What kind of bus cycle is scheduled. A `bus_request_type` of all-zero bits
/// means the bus is idle this m-cycle.
#[bitfield]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BusRequestFlags {
    /// Set for a write (OUT), clear for a read.
    pub out: bool,
    /// High byte of a split word transfer.
    pub high: bool,
    /// A single 16-bit-aligned transfer permitted on a 16-bit-bus part.
    pub wide: bool,
    pub code: bool,
    pub io: bool,
    pub mem: bool,
    pub pic: bool,
    #[skip]
    __: B1,
}

impl BusRequestFlags {
    pub const NONE: BusRequestFlags = BusRequestFlags::new();

    #[inline(always)]
    pub fn is_idle(&self) -> bool {
        self.into_bytes()[0] == 0
    }

    pub fn code_fetch() -> Self {
        BusRequestFlags::new().with_code(true).with_mem(true)
    }

    pub fn mem_read() -> Self {
        BusRequestFlags::new().with_mem(true)
    }

    pub fn mem_write() -> Self {
        BusRequestFlags::new().with_mem(true).with_out(true)
    }

    pub fn io_read() -> Self {
        BusRequestFlags::new().with_io(true)
    }

    pub fn io_write() -> Self {
        BusRequestFlags::new().with_io(true).with_out(true)
    }

    pub fn pic_ack() -> Self {
        BusRequestFlags::new().with_pic(true)
    }
}
