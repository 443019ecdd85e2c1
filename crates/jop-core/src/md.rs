//! Microcode Decode stage (§4.3): pure decode of the 10-bit instruction
//! plus the microcode branch/jump target computation.
//!
//! Control signals are not expanded into the individual mux-select lines
//! the reference signal list names (`sel_rda`, `sel_amux`, `sel_lmux`, ...);
//! [`crate::microcode::Instr`] already carries that information as a tagged
//! variant, and SX/MC match on it directly rather than re-decoding it
//! signal-by-signal. `jbr`/`br`/`jmp` are kept as their own outputs because
//! BCF and MF are driven by exactly those three lines, combinationally,
//! same cycle as the instruction itself.

use crate::microcode::{decode, Instr};

/// Per-cycle inputs to the Microcode Decode stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct MdInputs {
    /// The raw microcode word latched by MF this cycle.
    pub ir: u16,
    /// MF's current microcode PC — the address that fetched `ir`, used as
    /// `PC_br` for `bz`/`bnz` (§4.2 item 7: "the PC snapshot at IR-fetch
    /// time" is simply the PC that produced the currently-latched IR).
    pub pc: u16,
    /// SX's zero flag, sampled combinationally for `bz`/`bnz`.
    pub zf: bool,
}

/// Per-cycle (combinational) outputs of the Microcode Decode stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct MdOutputs {
    /// The decoded instruction, carried unchanged to SX and MC.
    pub instr: Instr,
    /// Asserted for exactly the cycle `instr == Jbr`: BCF should evaluate
    /// the pending Java-bytecode branch this cycle.
    pub jbr: bool,
    /// Conditional microcode branch, already resolved against `zf`.
    pub br: bool,
    pub br_target: u16,
    /// Unconditional microcode jump.
    pub jmp: bool,
    pub jmp_target: u16,
}

/// Stateless: MD holds no registers of its own, it is a pure function of
/// `(ir, pc, zf)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Md;

impl Md {
    #[must_use]
    pub fn step(&self, inputs: MdInputs) -> MdOutputs {
        let instr = decode(inputs.ir);

        let mut out = MdOutputs {
            instr,
            ..Default::default()
        };

        match instr {
            Instr::Jbr => out.jbr = true,
            Instr::Bz(offset) => {
                out.br = inputs.zf;
                out.br_target = branch_target(inputs.pc, offset);
            }
            Instr::Bnz(offset) => {
                out.br = !inputs.zf;
                out.br_target = branch_target(inputs.pc, offset);
            }
            Instr::Jmp(offset) => {
                out.jmp = true;
                out.jmp_target = (inputs.pc as i32).wrapping_add(offset as i32) as u16 & 0x7FF;
            }
            _ => {}
        }

        out
    }
}

fn branch_target(pc: u16, offset: i8) -> u16 {
    (pc as i32).wrapping_add(offset as i32) as u16 & 0x7FF
}
