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

    cpu/mod.rs

    The `Cpu` context: a single struct holding all EU, BIU, PFQ and
    architectural state (spec §3, §9 "re-architect as a single Cpu context").
    Per-file `impl Cpu` blocks elsewhere in this module implement the BIU
    (biu.rs), decode/addressing (decode.rs), ALU (alu.rs), multiply/divide
    microcode (muldiv.rs), stack helpers (stack.rs), branches (jump.rs),
    string/REP (string_ops.rs), interrupts (interrupt.rs), the main
    instruction dispatch (execute.rs), and the 80186/NEC extensions
    (ext186.rs, extnec.rs).
*/

mod biu;
mod decode;
mod execute;
mod ext186;
mod extnec;
mod interrupt;
mod jump;
mod modrm;
mod muldiv;
mod shift;
mod stack;
mod string_ops;

pub use execute::StepResult;
pub use interrupt::ServiceEvent;

use crate::{
    bcsm::{BusRequestFlags, TCycle},
    config::{CpuConfig, CpuType},
    dma::DmaState,
    error::CpuError,
    interfaces::{FpuDispatch, GdbHook, IoBus, Memory, NullFpu, Pic, Timer},
    queue::InstructionQueue,
    registers::{Flag, Register16, Register8, Segment, SegmentRegister},
};

/// REP/REPE/REPNE prefix currently latched for the instruction in progress.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RepPrefix {
    #[default]
    None,
    /// REPE/REPZ (or, on NEC, REPC if `rep_c_flag` is set).
    RepE,
    /// REPNE/REPNZ (or, on NEC, REPNC if `rep_c_flag` is set).
    RepNE,
}

/// Gross run/halt state of the EU.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CpuState {
    #[default]
    Running,
    Halted,
    /// Busy-waiting on the WAIT instruction's TEST pin, or a breakpoint.
    Waiting,
    BreakpointHit,
}

/// A no-op timer/pic/io host, useful for unit tests and as a documented
/// minimal composition.
#[derive(Default)]
pub struct NullPic;
impl Pic for NullPic {
    fn int_pending(&self) -> bool {
        false
    }
    fn pic_irq_ack(&mut self) -> u8 {
        0
    }
}

#[derive(Default)]
pub struct NullTimer;
impl Timer for NullTimer {
    fn tsc(&self) -> u64 {
        0
    }
    fn timer_target(&self) -> u64 {
        u64::MAX
    }
    fn timer_process(&mut self) {}
}

pub struct Cpu {
    // --- architectural state ---
    pub(crate) ax: u16,
    pub(crate) bx: u16,
    pub(crate) cx: u16,
    pub(crate) dx: u16,
    pub(crate) si: u16,
    pub(crate) di: u16,
    pub(crate) bp: u16,
    pub(crate) sp: u16,
    pub(crate) es: SegmentRegister,
    pub(crate) cs: SegmentRegister,
    pub(crate) ss: SegmentRegister,
    pub(crate) ds: SegmentRegister,
    /// Architectural IP: the address of the next byte the EU will consume.
    pub(crate) pc: u16,
    pub(crate) flags: u16,

    // --- EA decode staging (cleared each instruction) ---
    pub(crate) eaaddr: u16,
    pub(crate) easeg: Segment,
    pub(crate) modrm_md: u8,
    pub(crate) modrm_reg: u8,
    pub(crate) modrm_rm: u8,

    // --- BIU / BCSM ---
    pub(crate) phase: TCycle,
    pub(crate) schedule_fetch: bool,
    pub(crate) prefetching: bool,
    pub(crate) bus_request_type: BusRequestFlags,
    pub(crate) in_lock: bool,
    pub(crate) dma: DmaState,
    pub(crate) queue: InstructionQueue,
    /// Scratch state for the operand bus cycle currently in flight, staged
    /// by the `biu_*` entry points in biu.rs and drained phase-by-phase by
    /// `cycle()`.
    pub(crate) current_access_addr: u32,
    pub(crate) current_access_data: u8,
    pub(crate) current_access_result: u8,
    /// A code byte read at T3 of an in-flight fetch, not yet committed to
    /// the PFQ; discarded instead of pushed if the fetch is aborted before
    /// the bus cycle completes (spec §4.2 abort policy).
    pub(crate) pending_fetch_byte: Option<u8>,

    // --- EU transient state ---
    pub(crate) opcode: u8,
    pub(crate) cpu_alu_op: u8,
    pub(crate) cpu_src: u16,
    pub(crate) cpu_dest: u16,
    pub(crate) cpu_data: u16,
    pub(crate) in_rep: RepPrefix,
    pub(crate) repeating: bool,
    pub(crate) rep_c_flag: bool,
    pub(crate) ovr_seg: Option<Segment>,
    pub(crate) clear_lock: bool,
    pub(crate) noint: bool,
    pub(crate) completed: bool,
    pub(crate) state: CpuState,
    pub(crate) oldpc: u16,
    pub(crate) prefix_len: u8,

    // --- interrupts ---
    pub(crate) nmi_pending: bool,
    pub(crate) nmi_enable: bool,
    pub(crate) nmi_mask: bool,
    /// Last-seen level of the NMI line, used to detect the rising edge that
    /// latches `nmi_pending`.
    pub(crate) nmi_line: bool,
    pub(crate) intr: bool,

    // --- variant configuration ---
    pub(crate) config: CpuConfig,
    pub(crate) last_error: Option<CpuError>,

    // --- emulator-service trap (SPEC_FULL §B) ---
    pub(crate) enable_service_interrupt: bool,
    pub(crate) service_events: std::collections::VecDeque<ServiceEvent>,

    // --- timing substrate ---
    pub(crate) cycles_remaining: i64,
    pub(crate) cycle_count: u64,
    pub(crate) instruction_count: u64,
    pub(crate) tsc: u64,
    pub(crate) cpu_multiplier_fixedpoint: u64,

    // --- host collaborators (spec §6 "consumed") ---
    pub(crate) memory: Box<dyn Memory>,
    pub(crate) io: Box<dyn IoBus>,
    pub(crate) pic: Box<dyn Pic>,
    pub(crate) timer: Box<dyn Timer>,
    pub(crate) fpu: Box<dyn FpuDispatch>,
    pub(crate) gdb: Box<dyn GdbHook>,
}

impl Cpu {
    pub fn new(
        config: CpuConfig,
        memory: Box<dyn Memory>,
        io: Box<dyn IoBus>,
        pic: Box<dyn Pic>,
        timer: Box<dyn Timer>,
    ) -> Self {
        Self::with_fpu(config, memory, io, pic, timer, Box::new(NullFpu), Box::new(()))
    }

    pub fn with_fpu(
        config: CpuConfig,
        memory: Box<dyn Memory>,
        io: Box<dyn IoBus>,
        pic: Box<dyn Pic>,
        timer: Box<dyn Timer>,
        fpu: Box<dyn FpuDispatch>,
        gdb: Box<dyn GdbHook>,
    ) -> Self {
        let capacity = config.cpu_type.queue_capacity();
        let fetch_size = config.cpu_type.queue_fetch_size();
        let mut cpu = Self {
            ax: 0,
            bx: 0,
            cx: 0,
            dx: 0,
            si: 0,
            di: 0,
            bp: 0,
            sp: 0,
            es: SegmentRegister::default(),
            cs: SegmentRegister::default(),
            ss: SegmentRegister::default(),
            ds: SegmentRegister::default(),
            pc: 0,
            flags: FLAGS_ALWAYS_ONE_MASK,
            eaaddr: 0,
            easeg: Segment::DS,
            modrm_md: 0,
            modrm_reg: 0,
            modrm_rm: 0,
            phase: TCycle::T1,
            schedule_fetch: false,
            prefetching: false,
            bus_request_type: BusRequestFlags::NONE,
            in_lock: false,
            dma: DmaState::default(),
            queue: InstructionQueue::new(capacity, fetch_size),
            current_access_addr: 0,
            current_access_data: 0,
            current_access_result: 0,
            pending_fetch_byte: None,
            opcode: 0,
            cpu_alu_op: 0,
            cpu_src: 0,
            cpu_dest: 0,
            cpu_data: 0,
            in_rep: RepPrefix::None,
            repeating: false,
            rep_c_flag: false,
            ovr_seg: None,
            clear_lock: false,
            noint: false,
            completed: true,
            state: CpuState::Running,
            oldpc: 0,
            prefix_len: 0,
            nmi_pending: false,
            nmi_enable: true,
            nmi_mask: true,
            nmi_line: false,
            intr: false,
            config,
            last_error: None,
            enable_service_interrupt: false,
            service_events: std::collections::VecDeque::new(),
            cycles_remaining: 0,
            cycle_count: 0,
            instruction_count: 0,
            tsc: 0,
            cpu_multiplier_fixedpoint: 1 << 16,
            memory,
            io,
            pic,
            timer,
            fpu,
            gdb,
        };
        cpu.reset(true);
        cpu
    }

    /// Reset the CPU. A hard reset re-seats the PFQ capacity for the
    /// configured variant and clears BIU counters (spec §6 `reset(hard)`).
    pub fn reset(&mut self, hard: bool) {
        self.ax = 0;
        self.bx = 0;
        self.cx = 0;
        self.dx = 0;
        self.si = 0;
        self.di = 0;
        self.bp = 0;
        self.sp = 0;
        self.es = SegmentRegister::new(0);
        self.ss = SegmentRegister::new(0);
        self.ds = SegmentRegister::new(0);
        self.cs = SegmentRegister::new(self.config.reset_vector.0);
        self.pc = self.config.reset_vector.1;
        self.flags = FLAGS_ALWAYS_ONE_MASK;
        if self.config.cpu_type.is_nec() {
            self.flags |= Flag::Mode as u16;
        }

        self.eaaddr = 0;
        self.easeg = Segment::DS;
        self.ovr_seg = None;
        self.in_rep = RepPrefix::None;
        self.repeating = false;
        self.rep_c_flag = false;
        self.clear_lock = false;
        self.in_lock = false;
        self.noint = false;
        self.completed = true;
        self.state = CpuState::Running;

        self.nmi_pending = false;
        self.nmi_enable = true;
        self.nmi_mask = true;
        self.nmi_line = false;
        self.intr = false;

        if hard {
            let capacity = self.config.cpu_type.queue_capacity();
            let fetch_size = self.config.cpu_type.queue_fetch_size();
            self.queue.set_capacity(capacity, fetch_size);
            self.dma = DmaState::default();
            self.phase = TCycle::T1;
            self.bus_request_type = BusRequestFlags::NONE;
        }
        self.pending_fetch_byte = None;
        self.queue.flush();
        self.queue.ip = self.flat_pc();
        self.prefetching = true;
        self.schedule_fetch = true;
    }

    // --- register access ---

    #[inline]
    pub fn get_register16(&self, reg: Register16) -> u16 {
        match reg {
            Register16::AX => self.ax,
            Register16::BX => self.bx,
            Register16::CX => self.cx,
            Register16::DX => self.dx,
            Register16::SI => self.si,
            Register16::DI => self.di,
            Register16::BP => self.bp,
            Register16::SP => self.sp,
            Register16::ES => self.es.selector(),
            Register16::CS => self.cs.selector(),
            Register16::SS => self.ss.selector(),
            Register16::DS => self.ds.selector(),
            Register16::IP => self.pc,
        }
    }

    #[inline]
    pub fn set_register16(&mut self, reg: Register16, value: u16) {
        match reg {
            Register16::AX => self.ax = value,
            Register16::BX => self.bx = value,
            Register16::CX => self.cx = value,
            Register16::DX => self.dx = value,
            Register16::SI => self.si = value,
            Register16::DI => self.di = value,
            Register16::BP => self.bp = value,
            Register16::SP => self.sp = value,
            Register16::ES => self.es.set(value),
            Register16::CS => self.cs.set(value),
            Register16::SS => self.ss.set(value),
            Register16::DS => self.ds.set(value),
            Register16::IP => self.pc = value,
        }
    }

    #[inline]
    pub fn get_register8(&self, reg: Register8) -> u8 {
        match reg {
            Register8::AL => (self.ax & 0xFF) as u8,
            Register8::AH => (self.ax >> 8) as u8,
            Register8::BL => (self.bx & 0xFF) as u8,
            Register8::BH => (self.bx >> 8) as u8,
            Register8::CL => (self.cx & 0xFF) as u8,
            Register8::CH => (self.cx >> 8) as u8,
            Register8::DL => (self.dx & 0xFF) as u8,
            Register8::DH => (self.dx >> 8) as u8,
        }
    }

    #[inline]
    pub fn set_register8(&mut self, reg: Register8, value: u8) {
        match reg {
            Register8::AL => self.ax = (self.ax & 0xFF00) | value as u16,
            Register8::AH => self.ax = (self.ax & 0x00FF) | ((value as u16) << 8),
            Register8::BL => self.bx = (self.bx & 0xFF00) | value as u16,
            Register8::BH => self.bx = (self.bx & 0x00FF) | ((value as u16) << 8),
            Register8::CL => self.cx = (self.cx & 0xFF00) | value as u16,
            Register8::CH => self.cx = (self.cx & 0x00FF) | ((value as u16) << 8),
            Register8::DL => self.dx = (self.dx & 0xFF00) | value as u16,
            Register8::DH => self.dx = (self.dx & 0x00FF) | ((value as u16) << 8),
        }
    }

    #[inline]
    pub fn get_flags(&self) -> u16 {
        self.flags
    }

    /// Set FLAGS, masking reserved bits per variant (spec §3/§8 PUSHF/POPF
    /// idempotence property).
    pub fn set_flags(&mut self, value: u16) {
        use crate::registers::{FLAGS_ALWAYS_ONE, FLAGS_RESERVED_ON_8086, FLAGS_RESERVED_ON_NEC};
        let reserved_mask = if self.config.cpu_type.is_nec() {
            FLAGS_RESERVED_ON_NEC
        }
        else {
            FLAGS_RESERVED_ON_8086
        };
        let preserved_reserved_bits = self.flags & reserved_mask;
        self.flags = (value & !reserved_mask) | preserved_reserved_bits | FLAGS_ALWAYS_ONE;
    }

    #[inline]
    pub fn get_flag(&self, flag: Flag) -> bool {
        self.flags & (flag as u16) != 0
    }

    #[inline]
    pub fn set_flag_state(&mut self, flag: Flag, state: bool) {
        if state {
            self.flags |= flag as u16;
        }
        else {
            self.flags &= !(flag as u16);
        }
    }

    // --- addressing ---

    #[inline(always)]
    pub fn calc_linear_address(segment: u16, offset: u16) -> u32 {
        ((segment as u32) << 4).wrapping_add(offset as u32) & 0xFFFFF
    }

    #[inline(always)]
    pub fn calc_linear_address_seg(&self, seg: Segment, offset: u16) -> u32 {
        let base = self.segment_base(seg);
        (base + offset as u32) & 0xFFFFF
    }

    #[inline(always)]
    pub fn segment_base(&self, seg: Segment) -> u32 {
        match seg {
            Segment::ES => self.es.base(),
            Segment::CS => self.cs.base(),
            Segment::SS => self.ss.base(),
            Segment::DS | Segment::None => self.ds.base(),
        }
    }

    #[inline(always)]
    pub fn flat_pc(&self) -> u16 {
        self.pc
    }

    #[inline(always)]
    pub fn flat_ip(&self) -> u32 {
        Self::calc_linear_address(self.cs.selector(), self.pc)
    }

    #[inline(always)]
    pub fn flat_sp(&self) -> u32 {
        Self::calc_linear_address(self.ss.selector(), self.sp)
    }

    pub fn get_type(&self) -> CpuType {
        self.config.cpu_type
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.state, CpuState::Halted)
    }

    pub fn in_rep(&self) -> bool {
        self.repeating
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn instruction_count(&self) -> u64 {
        self.instruction_count
    }

    /// External entry point used to steal host ticks during a peripheral's
    /// own IO callback (spec §6 `sub_cycles`/`resub_cycles`).
    pub fn sub_cycles(&mut self, c: u32) {
        let was_non_negative = self.cycles_remaining >= 0;
        self.cycles_remaining -= c as i64;
        if was_non_negative && self.cycles_remaining < 0 {
            log::warn!("cycle budget went negative after sub_cycles({}): {}", c, self.cycles_remaining);
        }
    }

    pub fn resub_cycles(&mut self, old: u32) {
        self.cycles_remaining += old as i64;
    }

    /// External hook for the DMA model (spec §6 `refresh_read`).
    pub fn refresh_read(&mut self) {
        self.dma.refresh_read();
    }

    pub fn set_nmi(&mut self, state: bool) {
        // Edge-triggered: only a low-to-high transition latches a pending NMI.
        if state && !self.nmi_line {
            self.nmi_pending = true;
        }
        self.nmi_line = state;
    }

    pub fn set_intr(&mut self, state: bool) {
        self.intr = state;
    }

    pub fn get_error(&self) -> Option<CpuError> {
        self.last_error.clone()
    }

    pub(crate) fn set_error(&mut self, err: CpuError) {
        self.last_error = Some(err);
    }

    /// Toggle the `INT FCh` emulator-service trap (spec SPEC_FULL §B). Off by
    /// default; hosts that don't want INT FCh special-cased leave it disabled
    /// and it behaves as an ordinary software interrupt.
    pub fn set_service_interrupt_enabled(&mut self, enabled: bool) {
        self.enable_service_interrupt = enabled;
    }

    /// Pop the oldest pending service event queued by INT FCh, if any.
    pub fn get_service_event(&mut self) -> Option<ServiceEvent> {
        self.service_events.pop_front()
    }
}

const FLAGS_ALWAYS_ONE_MASK: u16 = crate::registers::FLAGS_ALWAYS_ONE;
