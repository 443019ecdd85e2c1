//! Static initialisation data: the microcode ROM image and the bytecode
//! jump table.

use crate::microcode::{decode, Instr};

/// Number of addressable microcode words (`2^W_pc`).
pub const ROM_SIZE: usize = 1 << 11;
/// Number of bytecodes in the jump table.
pub const JUMP_TABLE_SIZE: usize = 256;

/// Reserved microcode entry point for an unimplemented bytecode.
pub const ADDR_SYS_NOIM: u16 = 0x000;
/// Reserved microcode entry point for interrupt dispatch.
pub const ADDR_SYS_INT: u16 = 0x001;
/// Reserved microcode entry point for exception dispatch.
pub const ADDR_SYS_EXC: u16 = 0x002;

/// Error returned when a static image does not match its expected shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageError {
    /// The supplied slice did not have the expected length.
    WrongSize { expected: usize, got: usize },
}

/// Immutable `pc -> instruction` mapping. An implementation MAY store a
/// wider (12-bit) word with precomputed `jfetch`/`jopdfetch` flags; here we
/// decode on load since the words are static and decoding is cheap.
#[derive(Debug, Clone)]
pub struct MicrocodeRom {
    words: Box<[u16]>,
}

impl MicrocodeRom {
    /// Build a ROM image from `2^W_pc` raw 10-bit (or 12-bit) words.
    pub fn new(words: &[u16]) -> Result<Self, ImageError> {
        if words.len() != ROM_SIZE {
            return Err(ImageError::WrongSize {
                expected: ROM_SIZE,
                got: words.len(),
            });
        }
        Ok(Self {
            words: words.into(),
        })
    }

    /// A ROM of all-zero words. Note that an all-zero word decodes as
    /// `Instr::Logic(LogicOp::PassB)`, not `Nop` — bit pattern `0000000000`
    /// falls into the ALU/logic group like any other `Instr` encoding.
    /// Callers that need inert filler between real instructions must write
    /// an explicit `Nop` word (`decode`'s `0b01_0000_0000`).
    #[must_use]
    pub fn blank() -> Self {
        Self {
            words: vec![0u16; ROM_SIZE].into_boxed_slice(),
        }
    }

    #[must_use]
    pub fn raw(&self, pc: u16) -> u16 {
        self.words[(pc as usize) & (ROM_SIZE - 1)]
    }

    #[must_use]
    pub fn decode_at(&self, pc: u16) -> Instr {
        decode(self.raw(pc))
    }

    /// Set the raw word at `pc`. Bits 0-9 are the `Instr` encoding `decode`
    /// reads; bits 11/10, if set, are the precomputed `jfetch`/`jopdfetch`
    /// flags [`crate::mf::Mf`] reads directly off its registered `ir` (see
    /// `SPEC_FULL.md` Open Question 5) — the ROM author marks exactly the
    /// instructions that end a bytecode handler or finish consuming an
    /// operand byte.
    pub fn set(&mut self, pc: u16, word: u16) {
        self.words[(pc as usize) & (ROM_SIZE - 1)] = word;
    }
}

/// Static 256-entry bytecode → microcode-address mapping.
#[derive(Debug, Clone)]
pub struct JumpTable {
    addrs: [u16; JUMP_TABLE_SIZE],
}

impl JumpTable {
    /// Build a jump table from exactly 256 entries. Any value equal to
    /// `u16::MAX` in the input is treated as "unmapped" and replaced with
    /// `ADDR_SYS_NOIM`.
    pub fn new(entries: &[u16]) -> Result<Self, ImageError> {
        if entries.len() != JUMP_TABLE_SIZE {
            return Err(ImageError::WrongSize {
                expected: JUMP_TABLE_SIZE,
                got: entries.len(),
            });
        }
        let mut addrs = [ADDR_SYS_NOIM; JUMP_TABLE_SIZE];
        for (slot, &entry) in addrs.iter_mut().zip(entries) {
            *slot = if entry == u16::MAX {
                ADDR_SYS_NOIM
            } else {
                entry
            };
        }
        Ok(Self { addrs })
    }

    /// A table where every bytecode routes to `ADDR_SYS_NOIM`.
    #[must_use]
    pub fn unmapped() -> Self {
        Self {
            addrs: [ADDR_SYS_NOIM; JUMP_TABLE_SIZE],
        }
    }

    #[must_use]
    pub fn lookup(&self, bytecode: u8) -> u16 {
        self.addrs[bytecode as usize]
    }

    pub fn set(&mut self, bytecode: u8, addr: u16) {
        self.addrs[bytecode as usize] = addr;
    }
}
