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

    error.rs

    Defines the error types returned by the core: `CpuError` for decode and
    execution failures, and `BusError` for host memory/IO failures surfaced
    through the `Memory`/`IoBus` traits.
*/

use std::{error::Error, fmt, fmt::Display};

#[derive(Debug, Clone)]
pub enum CpuError {
    InvalidInstructionError(u8, u32),
    UnhandledInstructionError(u8, u32),
    InstructionDecodeError(u32),
    ExecutionError(u32, String),
    CpuHaltedError(u32),
    UnimplementedFeature(&'static str),
}

impl Error for CpuError {}

impl Display for CpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            CpuError::InvalidInstructionError(op, addr) => {
                write!(f, "An invalid instruction was encountered: {:02X} at address: {:06X}", op, addr)
            }
            CpuError::UnhandledInstructionError(op, addr) => {
                write!(f, "An unhandled instruction was encountered: {:02X} at address: {:06X}", op, addr)
            }
            CpuError::InstructionDecodeError(addr) => {
                write!(f, "An error occurred during instruction decode at address: {:06X}", addr)
            }
            CpuError::ExecutionError(addr, ref msg) => {
                write!(f, "An execution error occurred at: {:06X} Message: {}", addr, msg)
            }
            CpuError::CpuHaltedError(addr) => {
                write!(f, "The CPU was halted at address: {:06X}.", addr)
            }
            CpuError::UnimplementedFeature(name) => {
                write!(f, "Unimplemented guest feature reached: {}", name)
            }
        }
    }
}

#[derive(Debug)]
pub enum BusError {
    ReadOutOfBoundsError,
    WriteOutOfBoundsError,
    IoError,
}

impl Error for BusError {}

impl Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            BusError::ReadOutOfBoundsError => write!(f, "An attempt was made to read out of bus bounds."),
            BusError::WriteOutOfBoundsError => write!(f, "An attempt was made to write out of bus bounds."),
            BusError::IoError => write!(f, "Error accessing an IO port."),
        }
    }
}
