//! Stack/Execute stage (§4.4): the `A`/`B` top-of-stack register cache, the
//! 256-word stack RAM below it, the ALU/logic/shift units, and flag
//! derivation.
//!
//! JOP keeps the top two stack words in dedicated registers (`A` = TOS,
//! `B` = NOS) with everything below addressed through `SP` in the stack
//! RAM. Every instruction either *pushes* (the loaded value becomes the new
//! `A`, the old `A` flows down into `B`, the old `B` spills to RAM) or
//! *pops* (a computed/stored value consumes `A`/`B`, `B` refills from RAM).
//! `Instr` already tags which of the two a given microcode word is; this
//! stage doesn't re-derive it from individual mux-select signals.

use emu_core::{Observable, Value};

use crate::microcode::{Instr, LogicOp, MmuOp, OpdWidth, ShiftOp};

/// Depth of the stack RAM beneath the `A`/`B` register cache.
pub const RAM_SIZE: usize = 256;
const RAM_MASK: u16 = (RAM_SIZE as u16) - 1;

/// Flags derived combinationally from the current `A`/`B` (§4.4, §8 item 5).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub zf: bool,
    pub nf: bool,
    pub eq: bool,
    pub lt: bool,
}

/// External/cross-stage inputs an instruction may need this cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct SxInputs {
    pub instr: Instr,
    /// MC's registered read-data result, selectable as an A-source.
    pub mem_rd_data: u32,
    /// SX's hardware-multiply result (`A * B`, combinational — see
    /// `MmuOp::Mul`'s doc comment in `mc.rs`).
    pub mul: u32,
    /// BCF's current JPC, latched by `LdJpc`.
    pub bcf_jpc: u32,
    /// BCF's accumulated 16-bit Java bytecode operand, latched (with
    /// sign/zero extension per `OpdWidth`) by `LdOpd`.
    pub bcf_opd: u16,
    /// Base word address of the bytecode segment currently being fetched
    /// into the method cache, latched by `LdBcStart`. A core-level
    /// configuration constant (§6.4) rather than stage-local state — method
    /// dispatch/constant-pool resolution is out of scope.
    pub bc_start: u32,
    /// MC is already mid-transaction from a prior cycle's slow-path access
    /// (`getfield`/`putfield`/`iaload`/`iastore`/`bcRd`). The instruction
    /// that triggered it already retired on the cycle it dispatched; MF
    /// holds `PC`/`IR` steady for every cycle MC stays busy, so without this
    /// SX would re-execute (and re-pop) the same `Instr::Mmu` every such
    /// cycle instead of just once.
    pub stall: bool,
}

/// Per-cycle outputs of the Stack/Execute stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct SxOutputs {
    pub aout: u32,
    pub bout: u32,
    pub flags: Flags,
    /// Stack pointer wrapped past its bounds; informational only (§7).
    pub sp_ov: bool,
    /// `JPC_local ← A` also requests BCF load `JPC ← A` (method call/return).
    pub jpc_wr: bool,
    /// The value `jpc_wr` carries to BCF's `din` — the `A` captured by
    /// `StJpc` *before* this instruction's pop refill overwrites `A`.
    pub jpc_local: u32,
    /// `A` as it stood *before* this cycle's push/pop — the value an
    /// `Instr::Mmu` op actually operates on. Every MMU instruction pops
    /// immediately (consuming the operand off the top of stack), so by the
    /// time `step` returns, `aout`/`bout` already reflect the *next*
    /// instruction's stack, not the one MC needs to see.
    pub mmu_a: u32,
    /// `B` as it stood before this cycle's push/pop, for the same reason.
    pub mmu_b: u32,
}

#[derive(Debug, Clone)]
pub struct Sx {
    a: u32,
    b: u32,
    sp: u16,
    vp: u32,
    ar: u32,
    jpc_local: u32,
    immval: u32,
    opddly: u32,
    ram: Box<[u32; RAM_SIZE]>,
}

impl Sx {
    #[must_use]
    pub fn new() -> Self {
        Self {
            a: 0,
            b: 0,
            sp: (RAM_SIZE / 2) as u16,
            vp: 0,
            ar: 0,
            jpc_local: 0,
            immval: 0,
            opddly: 0,
            ram: Box::new([0u32; RAM_SIZE]),
        }
    }

    pub fn reset(&mut self) {
        self.a = 0;
        self.b = 0;
        self.sp = (RAM_SIZE / 2) as u16;
        self.vp = 0;
        self.ar = 0;
        self.jpc_local = 0;
        self.immval = 0;
        self.opddly = 0;
    }

    #[must_use]
    pub fn a(&self) -> u32 {
        self.a
    }

    #[must_use]
    pub fn b(&self) -> u32 {
        self.b
    }

    #[must_use]
    pub fn ar(&self) -> u32 {
        self.ar
    }

    #[must_use]
    pub fn vp(&self) -> u32 {
        self.vp
    }

    /// Directly load `A` (and, transitively, what the next push sees as the
    /// old TOS). Used by `core.rs`/tests to seed a value a real bytecode
    /// sequence would otherwise have pushed; not part of the microcode ISA.
    pub fn poke_a(&mut self, value: u32) {
        self.a = value;
    }

    pub fn poke_b(&mut self, value: u32) {
        self.b = value;
    }

    /// Directly load `AR`, bypassing the `star` microcode step that would
    /// normally populate it. Test-only, like `poke_a`/`poke_b`.
    pub fn poke_ar(&mut self, value: u32) {
        self.ar = value;
    }

    #[must_use]
    pub fn flags(&self) -> Flags {
        Flags {
            zf: self.a == 0,
            nf: (self.a as i32) < 0,
            eq: self.a == self.b,
            lt: (self.a as i32) < (self.b as i32),
        }
    }

    /// Push `value`: old `B` spills to RAM, old `A` moves to `B`, `value`
    /// becomes the new `A`. SP advances to point at the next free slot.
    fn push(&mut self, value: u32) {
        self.ram[(self.sp & RAM_MASK) as usize] = self.b;
        self.sp = self.sp.wrapping_add(1);
        self.b = self.a;
        self.a = value;
    }

    /// Pop: `a_result` becomes the new `A` (the caller already computed or
    /// consumed whatever the old `A`/`B` held); `B` refills from RAM and SP
    /// retreats.
    fn pop(&mut self, a_result: u32) -> bool {
        self.sp = self.sp.wrapping_sub(1);
        let overflow = self.sp == u16::MAX;
        self.a = a_result;
        self.b = self.ram[(self.sp.wrapping_sub(1) & RAM_MASK) as usize];
        overflow
    }

    fn ram_read(&self, addr: u16) -> u32 {
        self.ram[(addr & RAM_MASK) as usize]
    }

    fn ram_write(&mut self, addr: u16, value: u32) {
        self.ram[(addr & RAM_MASK) as usize] = value;
    }

    fn barrel_shift(op: ShiftOp, amount: u32, value: u32) -> u32 {
        let amount = amount & 0x1F;
        match op {
            ShiftOp::Ushr => value >> amount,
            ShiftOp::Shl => value << amount,
            ShiftOp::Shr => ((value as i32) >> amount) as u32,
        }
    }

    /// Advance SX by one cycle, executing `inputs.instr`.
    pub fn step(&mut self, inputs: SxInputs) -> SxOutputs {
        let flags = self.flags();
        let mmu_a = self.a;
        let mmu_b = self.b;

        if inputs.stall {
            // MC is still working the slow-path access the currently-latched
            // `Instr::Mmu` dispatched on the cycle it first issued. MF holds
            // `PC`/`IR` steady until MC clears `busy`, so without this guard
            // SX would decode and re-execute (re-pop) that same instruction
            // every intervening cycle.
            return SxOutputs {
                aout: self.a,
                bout: self.b,
                jpc_local: self.jpc_local,
                flags,
                sp_ov: false,
                jpc_wr: false,
                mmu_a,
                mmu_b,
            };
        }

        let mut jpc_wr = false;
        let mut sp_ov = false;

        match inputs.instr {
            Instr::Nop | Instr::Wait | Instr::Jbr | Instr::Bz(_) | Instr::Bnz(_) | Instr::Jmp(_) => {}

            Instr::Add => {
                let result = self.a.wrapping_add(self.b);
                sp_ov = self.pop(result);
            }
            Instr::Sub => {
                let result = self.b.wrapping_sub(self.a);
                sp_ov = self.pop(result);
            }
            Instr::Logic(op) => {
                let result = match op {
                    LogicOp::PassB => self.b,
                    LogicOp::And => self.a & self.b,
                    LogicOp::Or => self.a | self.b,
                    LogicOp::Xor => self.a ^ self.b,
                };
                sp_ov = self.pop(result);
            }
            Instr::Shift(op) => {
                let result = Self::barrel_shift(op, self.a, self.b);
                sp_ov = self.pop(result);
            }
            Instr::Dup => {
                self.push(self.a);
            }

            Instr::StSlot(slot) => {
                self.ram_write(u16::from(slot), self.a);
                sp_ov = self.pop(self.b);
            }
            Instr::Stm(offset) => {
                let addr = self.vp.wrapping_add(u32::from(offset)) as u16;
                self.ram_write(addr, self.a);
                sp_ov = self.pop(self.b);
            }
            Instr::St => {
                let addr = self.vp.wrapping_add(self.opddly) as u16;
                self.ram_write(addr, self.a);
                sp_ov = self.pop(self.b);
            }
            Instr::StMi => {
                self.ram_write(self.ar as u16, self.a);
                sp_ov = self.pop(self.b);
            }
            Instr::StVp => {
                self.vp = self.a;
                sp_ov = self.pop(self.b);
            }
            Instr::StAr => {
                self.ar = self.a;
                sp_ov = self.pop(self.b);
            }
            Instr::StSp => {
                self.sp = self.a as u16;
                sp_ov = self.pop(self.b);
            }
            Instr::StJpc => {
                self.jpc_local = self.a;
                jpc_wr = true;
                sp_ov = self.pop(self.b);
            }
            Instr::Mmu(MmuOp::Mul) => {
                // The multiplier is combinational from A,B; `stmul` just
                // latches the operands, no stack effect beyond the pop
                // every store performs.
                sp_ov = self.pop(self.b);
            }
            Instr::Mmu(_) => {
                // Every other `Mmu` op drives the memory controller from
                // the current A (and, for stores, B); MC reads them via
                // `McInputs` built by `Core::step`, not through SX.
                sp_ov = self.pop(self.b);
            }

            Instr::LdSlot(slot) => self.push(self.ram_read(u16::from(slot))),
            Instr::Ldm(offset) => {
                let addr = self.vp.wrapping_add(u32::from(offset)) as u16;
                self.push(self.ram_read(addr));
            }
            Instr::Ld => {
                let addr = self.vp.wrapping_add(self.opddly) as u16;
                self.push(self.ram_read(addr));
            }
            Instr::LdMi => self.push(self.ram_read(self.ar as u16)),
            Instr::LdMrd => self.push(inputs.mem_rd_data),
            Instr::LdMul => self.push(inputs.mul),
            Instr::LdBcStart => self.push(inputs.bc_start),
            Instr::LdSp => self.push(u32::from(self.sp)),
            Instr::LdVp => self.push(self.vp),
            Instr::LdJpc => self.push(inputs.bcf_jpc),
            Instr::LdImm(value) => {
                self.immval = value as i32 as u32;
                self.push(self.immval);
            }
            Instr::LdOpd(width) => {
                let opd = inputs.bcf_opd;
                let extended = match width {
                    OpdWidth::U8 => u32::from(opd & 0xFF),
                    OpdWidth::S8 => (opd as i8) as i32 as u32,
                    OpdWidth::U16 => u32::from(opd),
                    OpdWidth::S16 => (opd as i16) as i32 as u32,
                };
                self.opddly = extended;
                self.push(extended);
            }
        }

        SxOutputs {
            aout: self.a,
            bout: self.b,
            jpc_local: self.jpc_local,
            flags,
            sp_ov,
            jpc_wr,
            mmu_a,
            mmu_b,
        }
    }
}

impl Default for Sx {
    fn default() -> Self {
        Self::new()
    }
}

impl Observable for Sx {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "a" => Some(Value::U32(self.a)),
            "b" => Some(Value::U32(self.b)),
            "sp" => Some(Value::U16(self.sp)),
            "vp" => Some(Value::U32(self.vp)),
            "ar" => Some(Value::U32(self.ar)),
            "jpc_local" => Some(Value::U32(self.jpc_local)),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["a", "b", "sp", "vp", "ar", "jpc_local"]
    }
}
