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

    dma.rs

    DMA-adjacent counters the BIU/BCSM honor between bus cycles: wait states
    inserted by the external READY line, hold-acknowledge to a DMA controller,
    and pending DRAM refresh cycles queued by channel-0 activity. See spec §5.
*/

#[derive(Copy, Clone, Debug, Default)]
pub struct DmaState {
    /// Wait-state countdown inserted by the external chipset (DMAWAIT).
    pub not_ready: u32,
    /// DMA hold-acknowledge countdown: 0 (not held), or counting down while a
    /// DMA controller owns the bus.
    pub hlda: u32,
    /// Pending DRAM refresh cycles queued from channel-0 DMA activity.
    pub refresh: u32,
}

impl DmaState {
    /// Called from the DMA model when channel 0 performs a transfer.
    pub fn refresh_read(&mut self) {
        self.refresh = self.refresh.saturating_add(1);
    }

    /// Drain one pending refresh cycle if the bus is in a state that can
    /// honor it (idle, or at T3/T4 of a non-locked cycle per spec §5).
    pub fn try_drain_refresh(&mut self, eligible: bool) -> bool {
        if eligible && self.refresh > 0 {
            self.refresh -= 1;
            true
        }
        else {
            false
        }
    }
}
