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

    lib.rs

    Cycle-accurate execution core for the Intel 8088/8086 family: 8088, 8086,
    80186, and NEC V20/V30. See SPEC_FULL.md for the full behavioral contract;
    DESIGN.md records where each module is grounded and the choices made where
    the spec left something open.
*/

pub mod bcsm;
pub mod config;
pub mod cpu;
pub mod dma;
pub mod error;
pub mod interfaces;
pub mod queue;
pub mod registers;

pub use config::{CpuConfig, CpuType};
pub use cpu::{Cpu, CpuState, NullPic, NullTimer, RepPrefix, ServiceEvent, StepResult};
pub use error::{BusError, CpuError};
pub use interfaces::{FpuDispatch, GdbHook, IoBus, Memory, NullFpu, Pic, Timer};
pub use registers::{Flag, Register8, Register16, Segment};
