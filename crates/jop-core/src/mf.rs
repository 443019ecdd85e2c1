//! Microcode Fetch stage (§4.2): the PC-mux priority chain and the
//! registered-address/unregistered-output microcode ROM read.
//!
//! `jfetch`/`jopdfetch` are precomputed ROM-word bits 11/10 (§6.3: "12-bit
//! with precomputed jfetch/jopdfetch flags"), not derived from the decoded
//! [`crate::microcode::Instr`] — the ROM author marks exactly the
//! instructions that end a bytecode handler or finish consuming an operand
//! byte.

use emu_core::{Observable, Value};

use crate::rom::MicrocodeRom;

const JFETCH_BIT: u16 = 1 << 11;
const JOPDFETCH_BIT: u16 = 1 << 10;
const PC_MASK: u16 = 0x7FF;

/// Per-cycle inputs to the Microcode Fetch stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct MfInputs {
    /// BCF's microcode dispatch address for the currently-fetched bytecode.
    pub jpaddr: u16,
    /// MD's conditional microcode branch, already resolved against flags.
    pub br: bool,
    /// MD's microcode branch target (meaningful only when `br`).
    pub br_target: u16,
    /// MD's unconditional microcode jump.
    pub jmp: bool,
    /// MD's microcode jump target (meaningful only when `jmp`).
    pub jmp_target: u16,
    /// External stall: MC busy OR MD's `wr_dly`.
    pub bsy: bool,
}

/// Per-cycle outputs of the Microcode Fetch stage, describing the
/// instruction retiring *this* cycle (already registered from the PC
/// decided last cycle).
#[derive(Debug, Clone, Copy, Default)]
pub struct MfOutputs {
    /// The PC that fetched `ir_out` — BCF/MD's `PC_br` snapshot source.
    pub pc_out: u16,
    pub ir_out: u16,
    /// Pass-through of `ir_out`, named separately to match the reference
    /// signal list (§4.2) consumed by MD.
    pub dout: u16,
    pub jfetch: bool,
    pub jopdfetch: bool,
}

/// Microcode PC and ROM read port.
#[derive(Debug, Clone)]
pub struct Mf {
    pc: u16,
    /// Registered ROM output — the word at `pc` one cycle after `pc` last
    /// changed, mirroring BCF's `jbc_out` timing.
    ir: u16,
    rom: MicrocodeRom,
}

impl Mf {
    #[must_use]
    pub fn new(rom: MicrocodeRom) -> Self {
        let ir = rom.raw(0);
        Self { pc: 0, ir, rom }
    }

    pub fn reset(&mut self) {
        self.pc = 0;
        self.ir = self.rom.raw(0);
    }

    /// Currently-latched microcode word, for peeking ahead of `step` (MD's
    /// `ir` input).
    #[must_use]
    pub fn ir_peek(&self) -> u16 {
        self.ir
    }

    /// The PC that fetched `ir_peek`, for peeking ahead of `step` (MD's
    /// `pc` input, used for branch-target computation).
    #[must_use]
    pub fn pc_peek(&self) -> u16 {
        self.pc
    }

    /// Advance the PC-mux and ROM read by one cycle.
    pub fn step(&mut self, inputs: MfInputs) -> MfOutputs {
        let jfetch = self.ir & JFETCH_BIT != 0;
        let jopdfetch = self.ir & JOPDFETCH_BIT != 0;
        let pc_out = self.pc;
        let ir_out = self.ir;

        let new_pc = if jfetch {
            inputs.jpaddr & PC_MASK
        } else if inputs.br {
            inputs.br_target & PC_MASK
        } else if inputs.jmp {
            inputs.jmp_target & PC_MASK
        } else if inputs.bsy {
            self.pc
        } else {
            self.pc.wrapping_add(1) & PC_MASK
        };

        self.pc = new_pc;
        self.ir = self.rom.raw(self.pc);

        MfOutputs {
            pc_out,
            ir_out,
            dout: ir_out,
            jfetch,
            jopdfetch,
        }
    }
}

impl Observable for Mf {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "pc" => Some(Value::U16(self.pc)),
            "ir" => Some(Value::U16(self.ir)),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["pc", "ir"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rom::MicrocodeRom;

    fn rom_with(words: &[(u16, u16)]) -> MicrocodeRom {
        let mut rom = MicrocodeRom::blank();
        for &(pc, word) in words {
            rom.set(pc, word);
        }
        rom
    }

    #[test]
    fn plain_advance_increments_pc_and_registers_ir_one_cycle_later() {
        let rom = rom_with(&[(0, 0x000), (1, 0x155)]);
        let mut mf = Mf::new(rom);
        let out = mf.step(MfInputs::default());
        assert_eq!(out.pc_out, 0);
        assert_eq!(out.ir_out, 0x000);

        let out = mf.step(MfInputs::default());
        assert_eq!(out.pc_out, 1);
        assert_eq!(out.ir_out, 0x155);
    }

    #[test]
    fn bsy_holds_pc() {
        let rom = rom_with(&[(0, 0x100)]);
        let mut mf = Mf::new(rom);
        let out = mf.step(MfInputs {
            bsy: true,
            ..Default::default()
        });
        assert_eq!(out.pc_out, 0);
        let out = mf.step(MfInputs {
            bsy: true,
            ..Default::default()
        });
        assert_eq!(out.pc_out, 0);
        assert_eq!(out.ir_out, 0x100);
    }

    #[test]
    fn jfetch_bit_dispatches_to_jpaddr_next_cycle() {
        // bit 11 set on the word at address 0: this instruction retires a
        // bytecode handler and should fetch `jpaddr` next.
        let rom = rom_with(&[(0, JFETCH_BIT), (40, 0x111)]);
        let mut mf = Mf::new(rom);
        let first = mf.step(MfInputs {
            jpaddr: 40,
            ..Default::default()
        });
        assert!(first.jfetch);
        let second = mf.step(MfInputs::default());
        assert_eq!(second.pc_out, 40);
        assert_eq!(second.ir_out, 0x111);
    }

    #[test]
    fn br_dominates_jmp_and_plain_advance() {
        let rom = rom_with(&[(0, 0x000), (15, 0x0AB)]);
        let mut mf = Mf::new(rom);
        mf.step(MfInputs::default());
        let out = mf.step(MfInputs {
            br: true,
            br_target: 15,
            jmp: true,
            jmp_target: 999,
            ..Default::default()
        });
        assert_eq!(out.pc_out, 1);
        let out = mf.step(MfInputs::default());
        assert_eq!(out.pc_out, 15);
        assert_eq!(out.ir_out, 0x0AB);
    }
}
