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

    queue.rs

    The prefetch queue (PFQ): a fixed-capacity byte FIFO, 4 bytes on 8088-class
    parts (and 80186/V20) or 6 bytes on 8086-class parts (and V30). Filled by
    the BIU in bus phase T3, drained by the EU. See spec §4.3.
*/

pub const QUEUE_MAX: usize = 6;

#[derive(Clone, Debug)]
pub struct InstructionQueue {
    capacity: usize,
    fetch_size: usize,
    len: usize,
    front: usize,
    back: usize,
    buf: [u8; QUEUE_MAX],
    /// Guest address of the next byte that will be fetched *into* the queue.
    /// Distinct from the architectural PC, which is the next byte the EU will
    /// *consume*.
    pub ip: u16,
}

impl InstructionQueue {
    pub fn new(capacity: usize, fetch_size: usize) -> Self {
        assert!(capacity <= QUEUE_MAX);
        Self {
            capacity,
            fetch_size,
            len: 0,
            front: 0,
            back: 0,
            buf: [0; QUEUE_MAX],
            ip: 0,
        }
    }

    pub fn set_capacity(&mut self, capacity: usize, fetch_size: usize) {
        assert!(capacity <= QUEUE_MAX);
        self.capacity = capacity;
        self.fetch_size = fetch_size;
        self.flush();
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    pub fn free_slots(&self) -> usize {
        self.capacity - self.len
    }

    /// The scheduling-eligibility rule from spec §4.2: on a 2-byte fetch part
    /// a queue with exactly one free slot is not eligible for a fetch (a word
    /// fetch needs two slots); on a 1-byte fetch part, one free slot suffices.
    #[inline(always)]
    pub fn has_room_for_fetch(&self) -> bool {
        self.free_slots() >= self.fetch_size
    }

    #[inline(always)]
    pub fn push(&mut self, byte: u8) {
        assert!(self.len < self.capacity, "prefetch queue overrun");
        self.buf[self.front] = byte;
        self.front = (self.front + 1) % self.capacity;
        self.len += 1;
        self.ip = self.ip.wrapping_add(1);
    }

    #[inline(always)]
    pub fn push_word(&mut self, word: u16) {
        self.push((word & 0xFF) as u8);
        self.push((word >> 8) as u8);
    }

    #[inline(always)]
    pub fn pop(&mut self) -> u8 {
        assert!(self.len > 0, "prefetch queue underrun");
        let byte = self.buf[self.back];
        self.back = (self.back + 1) % self.capacity;
        self.len -= 1;
        byte
    }

    /// Return the bytes currently buffered, oldest first, without consuming
    /// them. Used by tests checking the §8 property 2 invariant.
    pub fn peek_all(&self) -> Vec<u8> {
        (0..self.len).map(|i| self.buf[(self.back + i) % self.capacity]).collect()
    }

    /// Discard all buffered bytes. Invoked on branch taken, CS change, reset,
    /// and mid-instruction suspend (spec §4.3 flush contract).
    pub fn flush(&mut self) {
        self.len = 0;
        self.front = 0;
        self.back = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_preserved() {
        let mut q = InstructionQueue::new(4, 1);
        q.push(0x11);
        q.push(0x22);
        q.push(0x33);
        assert_eq!(q.pop(), 0x11);
        assert_eq!(q.pop(), 0x22);
        q.push(0x44);
        assert_eq!(q.pop(), 0x33);
        assert_eq!(q.pop(), 0x44);
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn room_for_fetch_respects_fetch_size() {
        let mut q = InstructionQueue::new(6, 2);
        // 5 free slots -> room for a 2-byte fetch.
        assert!(q.has_room_for_fetch());
        for _ in 0..5 {
            q.push(0);
        }
        // Exactly one free slot: not eligible for a 2-byte fetch.
        assert_eq!(q.free_slots(), 1);
        assert!(!q.has_room_for_fetch());
        q.push(0);
        assert!(!q.has_room_for_fetch());
    }

    #[test]
    fn one_byte_fetcher_only_needs_one_slot() {
        let mut q = InstructionQueue::new(4, 1);
        for _ in 0..3 {
            q.push(0);
        }
        assert_eq!(q.free_slots(), 1);
        assert!(q.has_room_for_fetch());
    }

    #[test]
    fn flush_resets_to_empty() {
        let mut q = InstructionQueue::new(4, 1);
        q.push(1);
        q.push(2);
        q.flush();
        assert_eq!(q.len(), 0);
        assert!(q.peek_all().is_empty());
    }
}
