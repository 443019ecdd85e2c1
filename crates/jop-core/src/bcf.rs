//! Bytecode Fetch stage (§4.1): Java PC management, the 2 KiB bytecode
//! cache, the operand accumulator, the jump-table lookup, and the 15-form
//! Java branch evaluation.

use emu_core::{Observable, Value};

use crate::rom::{JumpTable, ADDR_SYS_EXC, ADDR_SYS_INT};

/// Size of the byte-addressable bytecode cache.
pub const JBC_SIZE: usize = 1 << 11;
const JPC_MASK: u16 = 0x0FFF;
const JBC_ADDR_MASK: u16 = (JBC_SIZE as u16) - 1;

/// Current processor condition flags, sourced from SX (§4.1 inputs).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub zf: bool,
    pub nf: bool,
    pub eq: bool,
    pub lt: bool,
}

/// Per-cycle inputs to the Bytecode Fetch stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct BcfInputs {
    /// MF's `jfetch` for the instruction just retired.
    pub jfetch: bool,
    /// MF's `jopdfetch` for the instruction just retired.
    pub jopdfetch: bool,
    /// MD's `jbr` — the current microcode is the shared Java-branch handler.
    pub jbr: bool,
    pub flags: Flags,
    /// SX's `jpc_wr` (method call/return writing JPC from TOS).
    pub jpc_wr: bool,
    /// TOS value accompanying `jpc_wr`.
    pub din: u32,
    pub irq: bool,
    pub exc: bool,
    pub ena: bool,
}

/// Per-cycle outputs of the Bytecode Fetch stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct BcfOutputs {
    /// Microcode entry address for the currently-fetched bytecode.
    pub jpaddr: u16,
    /// Current 16-bit accumulated operand.
    pub opd: u16,
    /// Current 12-bit JPC.
    pub jpc_out: u16,
    pub ack_irq: bool,
    pub ack_exc: bool,
}

/// Branch-type tag decoded from the 3 LSBs of the current bytecode
/// (§4.1 item 5).
fn branch_taken(tp: u8, flags: Flags) -> bool {
    match tp & 0b111 {
        0 => flags.eq,       // if_icmpeq
        1 => flags.lt,       // if_icmplt
        2 => flags.eq,       // ifnull
        3 => !flags.eq,      // ifnonnull
        4 => flags.zf,       // ifeq / if_acmpeq
        5 => !flags.zf,      // ifne / if_acmpne
        6 => flags.nf,       // iflt
        7 => true,           // goto
        _ => unreachable!("3-bit field"),
    }
}

#[derive(Debug, Clone)]
pub struct Bcf {
    jpc: u16,
    jbc: Box<[u8; JBC_SIZE]>,
    /// Registered JBC read output — the byte at `jpc` one cycle after `jpc`
    /// last changed (§3 "Read synchronously").
    jbc_out: u8,
    opd_lo: u8,
    opd_hi: u8,
    /// JPC snapshot at the moment the current bytecode was fetched.
    jpc_br: u16,
    /// The dispatched opcode byte itself, snapshotted at fetch time — by
    /// the time the shared branch handler runs, `jbc_out` has moved on to
    /// the operand bytes, so `jbr` decode must not read it directly.
    current_opcode: u8,
    jump_table: JumpTable,
}

impl Bcf {
    #[must_use]
    pub fn new(jump_table: JumpTable) -> Self {
        Self {
            jpc: 0,
            jbc: Box::new([0u8; JBC_SIZE]),
            jbc_out: 0,
            opd_lo: 0,
            opd_hi: 0,
            jpc_br: 0,
            current_opcode: 0,
            jump_table,
        }
    }

    pub fn reset(&mut self) {
        self.jpc = 0;
        self.jbc_out = self.jbc[0];
        self.opd_lo = 0;
        self.opd_hi = 0;
        self.jpc_br = 0;
        self.current_opcode = self.jbc_out;
    }

    /// Write port driven by the memory controller during a method-cache
    /// fill (§4.5). Takes effect immediately; the single-writer/single-
    /// reader discipline (§5) means this never races the JBC read below.
    pub fn jbc_write(&mut self, addr: u16, data: u8) {
        self.jbc[(addr & JBC_ADDR_MASK) as usize] = data;
    }

    #[must_use]
    pub fn current_bytecode(&self) -> u8 {
        self.jbc_out
    }

    /// Read an arbitrary byte out of the cache without disturbing `jpc`, for
    /// test/debug inspection after a method-cache fill. Not part of BCF's
    /// microcode-visible interface, which only ever sees `current_bytecode`.
    #[must_use]
    pub fn jbc_byte(&self, addr: u16) -> u8 {
        self.jbc[(addr & JBC_ADDR_MASK) as usize]
    }

    /// Current JPC, for peeking ahead of `step` (e.g. by MD, to compute
    /// `PC_br`-equivalent context, or by `LdJpc`).
    #[must_use]
    pub fn jpc(&self) -> u16 {
        self.jpc
    }

    /// Current 16-bit accumulated operand, for peeking ahead of `step`
    /// (MC's `bcopd` input).
    #[must_use]
    pub fn opd(&self) -> u16 {
        (u16::from(self.opd_hi) << 8) | u16::from(self.opd_lo)
    }

    /// The microcode dispatch address for the currently-fetched bytecode,
    /// for peeking ahead of `step` (MF's `jpaddr` input).
    #[must_use]
    pub fn jpaddr(&self) -> u16 {
        self.jump_table.lookup(self.jbc_out)
    }

    /// Directly load the operand accumulator, bypassing the `jopdfetch`
    /// cycles that would normally populate it from the bytecode stream.
    /// Test-only.
    pub fn poke_opd(&mut self, value: u16) {
        self.opd_lo = value as u8;
        self.opd_hi = (value >> 8) as u8;
    }

    pub fn step(&mut self, inputs: BcfInputs) -> BcfOutputs {
        let tp = self.current_opcode & 0b111;
        let branch_fires = inputs.jbr && branch_taken(tp, inputs.flags);
        let opd_value = i32::from(self.opd_hi) << 8 | i32::from(self.opd_lo);
        let opd_signed = ((opd_value << 16) >> 16) as i32;

        let mut ack_irq = false;
        let mut ack_exc = false;
        let mut jpaddr = self.jump_table.lookup(self.jbc_out);

        let new_jpc = if inputs.jpc_wr {
            (inputs.din & u32::from(JPC_MASK)) as u16
        } else if branch_fires {
            (self.jpc_br as i32).wrapping_add(opd_signed) as u16 & JPC_MASK
        } else if inputs.ena && inputs.irq {
            ack_irq = true;
            jpaddr = ADDR_SYS_INT;
            0
        } else if inputs.ena && inputs.exc {
            ack_exc = true;
            jpaddr = ADDR_SYS_EXC;
            0
        } else if inputs.jfetch || inputs.jopdfetch {
            self.jpc.wrapping_add(1) & JPC_MASK
        } else {
            self.jpc
        };

        if inputs.jfetch {
            self.jpc_br = self.jpc;
            self.current_opcode = self.jbc_out;
        }

        let old_lo = self.opd_lo;
        self.opd_lo = self.jbc_out;
        if inputs.jopdfetch {
            self.opd_hi = old_lo;
        }

        self.jpc = new_jpc;
        self.jbc_out = self.jbc[(self.jpc & JBC_ADDR_MASK) as usize];

        BcfOutputs {
            jpaddr,
            opd: (u16::from(self.opd_hi) << 8) | u16::from(self.opd_lo),
            jpc_out: self.jpc,
            ack_irq,
            ack_exc,
        }
    }
}

impl Observable for Bcf {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "jpc" => Some(Value::U16(self.jpc)),
            "jpc_br" => Some(Value::U16(self.jpc_br)),
            "opd" => Some(Value::U16((u16::from(self.opd_hi) << 8) | u16::from(self.opd_lo))),
            "current_bytecode" => Some(Value::U8(self.jbc_out)),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["jpc", "jpc_br", "opd", "current_bytecode"]
    }
}
