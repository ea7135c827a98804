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

    cpu/decode.rs

    Small decode-time lookup tables shared by execute.rs: the segment-register
    selection used by MOV Sreg and PUSH/POP Sreg, and the bit-index masking
    NEC's TEST1/NOT1/SET1/CLR1 apply to their CL/imm8 bit-position operand
    (spec §4.4.6).
*/

use crate::registers::Segment;

/// ModR/M `reg` field -> segment register for `8C`/`8E` (MOV Sreg) and the
/// segment PUSH/POP opcodes. Bit 2 of `reg` is ignored on the reference
/// core (register forms above 3 alias back onto ES/CS/SS/DS), so we mask to
/// 2 bits rather than treat 4..7 as an error.
pub(crate) fn segment_from_reg_field(reg: u8) -> Segment {
    match reg & 0x3 {
        0 => Segment::ES,
        1 => Segment::CS,
        2 => Segment::SS,
        3 => Segment::DS,
        _ => unreachable!(),
    }
}

/// Mask a bit-index operand (from CL or an immediate) to the width of the
/// r/m operand it indexes: 3 bits for byte forms, 4 bits for word forms, per
/// the reference core's `bit &= ((1 << (3 + (opcode & 1))) - 1)`.
pub(crate) fn mask_bit_index(raw: u8, bits: u32) -> u8 {
    if bits == 8 {
        raw & 0x7
    }
    else {
        raw & 0xF
    }
}
