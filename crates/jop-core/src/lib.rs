//! Cycle-accurate functional model of a stack-based Java bytecode processor
//! core: a five-stage pipeline (Bytecode Fetch, Microcode Fetch, Microcode
//! Decode, Stack/Execute, Memory Controller) driven by a 10-bit horizontal
//! microcode ROM.
//!
//! The pipeline mirrors a real JOP-like design: each Java bytecode dispatches
//! into a microcode routine that ends by fetching the next bytecode, rather
//! than decoding bytecodes directly in hardware. [`core::Core`] ties the five
//! stages together; the individual stage modules can also be driven and
//! observed on their own for testing.

pub mod bcf;
pub mod bus;
pub mod core;
pub mod mc;
pub mod md;
pub mod mf;
pub mod microcode;
pub mod rom;
pub mod sx;

pub use bcf::{Bcf, BcfInputs, BcfOutputs};
pub use bus::{IoPort, MemCommand, MemOp, MemResponse, MemoryPort, SimpleIo, SimpleMemory};
pub use core::{Core, CoreInputs, CoreOutputs};
pub use mc::{BcFillByte, Mc, McInputs, McOutputs};
pub use md::{Md, MdInputs, MdOutputs};
pub use mf::{Mf, MfInputs, MfOutputs};
pub use microcode::{decode, Instr, LogicOp, MmuOp, OpdWidth, ShiftOp};
pub use rom::{ImageError, JumpTable, MicrocodeRom};
pub use sx::{Sx, SxInputs, SxOutputs};
