//! Top-level `Core`: owns the five stages and drives them in the fixed
//! per-cycle order Design Notes §9 calls for — read combinational state
//! from the previous edge, compute next state, commit.
//!
//! Per-cycle ordering (leaves first, per §2's dependency note): MD decodes
//! the instruction MF has already latched; SX executes it; MC acts on
//! whatever `Instr::Mmu` SX just retired; MF's PC-mux and BCF's JPC-mux
//! close the loop using this cycle's `br`/`jmp`/`jfetch`/`jpc_wr`.

use emu_core::{Observable, Tickable, Value};

use crate::bcf::{self, Bcf, BcfInputs};
use crate::bus::{IoPort, MemoryPort};
use crate::md::{Md, MdInputs};
use crate::mf::{Mf, MfInputs};
use crate::microcode::Instr;
use crate::rom::{JumpTable, MicrocodeRom};
use crate::sx::{Sx, SxInputs};

/// Global interrupt/exception/enable lines (§6.6), supplied fresh each
/// cycle by the embedding application.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreInputs {
    pub irq: bool,
    pub exc: bool,
    pub ena: bool,
}

/// A snapshot of externally-visible state after one cycle, useful for
/// tests and trace tooling without going through [`Observable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreOutputs {
    pub jpc: u16,
    pub pc: u16,
    pub a: u32,
    pub b: u32,
    pub busy: bool,
    pub ack_irq: bool,
    pub ack_exc: bool,
}

/// Ties BCF, MF, MD, SX and MC together into one steppable core.
///
/// Generic over the external memory port and the programmed-I/O port so
/// tests can swap in [`crate::bus::SimpleMemory`]/[`crate::bus::SimpleIo`]
/// while a host application supplies its own.
pub struct Core<M, I> {
    bcf: Bcf,
    mf: Mf,
    md: Md,
    sx: Sx,
    mc: crate::mc::Mc<M, I>,
    /// Base word address of the bytecode segment currently being fetched
    /// into the method cache (§4.4's `LdBcStart` source; see `sx.rs`).
    bc_start: u32,
}

impl<M: MemoryPort, I: IoPort> Core<M, I> {
    #[must_use]
    pub fn new(rom: MicrocodeRom, jump_table: JumpTable, port: M, io: I) -> Self {
        Self {
            bcf: Bcf::new(jump_table),
            mf: Mf::new(rom),
            md: Md,
            sx: Sx::new(),
            mc: crate::mc::Mc::new(port, io),
            bc_start: 0,
        }
    }

    pub fn reset(&mut self) {
        self.bcf.reset();
        self.mf.reset();
        self.sx.reset();
        self.mc.reset();
    }

    /// Set the bytecode-segment base word address `LdBcStart` loads.
    pub fn set_bc_start(&mut self, bc_start: u32) {
        self.bc_start = bc_start;
    }

    #[must_use]
    pub fn sx(&self) -> &Sx {
        &self.sx
    }

    /// Direct access to SX's registers for tests that need to stage a
    /// value too wide for `ldi` (e.g. `Sx::poke_a`) without synthesizing it
    /// through a longer microcode sequence.
    pub fn sx_mut(&mut self) -> &mut Sx {
        &mut self.sx
    }

    #[must_use]
    pub fn bcf(&self) -> &Bcf {
        &self.bcf
    }

    /// Direct access to BCF's registers, for tests that need to stage an
    /// operand value without replaying the `jopdfetch` cycles that would
    /// normally populate it.
    pub fn bcf_mut(&mut self) -> &mut Bcf {
        &mut self.bcf
    }

    #[must_use]
    pub fn mc(&self) -> &crate::mc::Mc<M, I> {
        &self.mc
    }

    #[must_use]
    pub fn port_mut(&mut self) -> &mut M {
        self.mc.port_mut()
    }

    #[must_use]
    pub fn io_mut(&mut self) -> &mut I {
        self.mc.io_mut()
    }

    pub fn step(&mut self, inputs: CoreInputs) -> CoreOutputs {
        let ir = self.mf.ir_peek();
        let pc = self.mf.pc_peek();
        let zf = self.sx.flags().zf;
        let stall = self.mc.busy();

        let md_out = self.md.step(MdInputs { ir, pc, zf });

        let sx_inputs = SxInputs {
            instr: md_out.instr,
            mem_rd_data: self.mc.rd_data(),
            mul: self.sx.a().wrapping_mul(self.sx.b()),
            bcf_jpc: u32::from(self.bcf.jpc()),
            bcf_opd: self.bcf.opd(),
            bc_start: self.bc_start,
            stall,
        };
        let sx_out = self.sx.step(sx_inputs);

        let mc_op = match md_out.instr {
            Instr::Mmu(op) => Some(op),
            _ => None,
        };
        let (mc_out, bc_fill) = self.mc.step(crate::mc::McInputs {
            op: mc_op,
            aout: sx_out.mmu_a,
            bout: sx_out.mmu_b,
            bcopd: self.bcf.opd(),
        });
        for byte in bc_fill {
            self.bcf.jbc_write(byte.addr, byte.data);
        }

        let mf_out = self.mf.step(MfInputs {
            jpaddr: self.bcf.jpaddr(),
            br: md_out.br,
            br_target: md_out.br_target,
            jmp: md_out.jmp,
            jmp_target: md_out.jmp_target,
            bsy: mc_out.busy,
        });

        let bcf_out = self.bcf.step(BcfInputs {
            jfetch: mf_out.jfetch,
            jopdfetch: mf_out.jopdfetch,
            jbr: md_out.jbr,
            flags: bcf::Flags {
                zf: sx_out.flags.zf,
                nf: sx_out.flags.nf,
                eq: sx_out.flags.eq,
                lt: sx_out.flags.lt,
            },
            jpc_wr: sx_out.jpc_wr,
            din: sx_out.jpc_local,
            irq: inputs.irq,
            exc: inputs.exc,
            ena: inputs.ena,
        });

        CoreOutputs {
            jpc: bcf_out.jpc_out,
            pc: mf_out.pc_out,
            a: sx_out.aout,
            b: sx_out.bout,
            busy: mc_out.busy,
            ack_irq: bcf_out.ack_irq,
            ack_exc: bcf_out.ack_exc,
        }
    }
}

impl<M: MemoryPort, I: IoPort> Tickable for Core<M, I> {
    fn tick(&mut self) {
        self.step(CoreInputs {
            ena: true,
            ..Default::default()
        });
    }
}

impl<M, I> Observable for Core<M, I> {
    fn query(&self, path: &str) -> Option<Value> {
        match path.split_once('.') {
            Some(("bcf", rest)) => self.bcf.query(rest),
            Some(("sx", rest)) => self.sx.query(rest),
            Some(("mc", rest)) => self.mc.query(rest),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "bcf.jpc",
            "bcf.opd",
            "bcf.current_bytecode",
            "sx.a",
            "sx.b",
            "sx.sp",
            "sx.vp",
            "sx.ar",
            "mc.rd_data_reg",
        ]
    }
}

