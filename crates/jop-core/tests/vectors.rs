//! Per-stage fixture tests, deserialized from inline JSON rather than an
//! external corpus — there is no published single-step vector set for this
//! microcode ISA, so the fixtures are authored here in the same shape
//! `zilog-z80/tests/single_step_tests.rs` expects from Tom Harte's suite:
//! an `initial` state, a `final` state, and the register getting checked.

use jop_core::bcf::{Bcf, BcfInputs, Flags as BcfFlags};
use jop_core::md::{Md, MdInputs};
use jop_core::mf::{Mf, MfInputs};
use jop_core::microcode::{decode, Instr};
use jop_core::rom::{JumpTable, MicrocodeRom};
use jop_core::sx::{Sx, SxInputs};
use serde::Deserialize;

#[derive(Deserialize)]
struct SxVector {
    name: String,
    initial_a: u32,
    initial_b: u32,
    instr_word: u16,
    #[serde(default)]
    mem_rd_data: u32,
    expect_a: u32,
    expect_b: u32,
}

const SX_VECTORS: &str = r#"
[
  {"name": "add", "initial_a": 3, "initial_b": 5, "instr_word": 4, "expect_a": 8, "expect_b": 0},
  {"name": "sub", "initial_a": 2, "initial_b": 10, "instr_word": 12, "expect_a": 8, "expect_b": 0},
  {"name": "and", "initial_a": 255, "initial_b": 15, "instr_word": 1, "expect_a": 15, "expect_b": 0},
  {"name": "or", "initial_a": 240, "initial_b": 15, "instr_word": 2, "expect_a": 255, "expect_b": 0},
  {"name": "xor", "initial_a": 255, "initial_b": 15, "instr_word": 3, "expect_a": 240, "expect_b": 0},
  {"name": "ldmrd_pushes_mem_rd_data", "initial_a": 1, "initial_b": 2, "instr_word": 224, "mem_rd_data": 999, "expect_a": 999, "expect_b": 1}
]
"#;

#[test]
fn sx_vectors_match_alu_and_load_results() {
    let vectors: Vec<SxVector> = serde_json::from_str(SX_VECTORS).expect("valid vector JSON");
    for v in &vectors {
        let mut sx = Sx::new();
        sx.poke_a(v.initial_a);
        sx.poke_b(v.initial_b);
        let out = sx.step(SxInputs {
            instr: decode(v.instr_word),
            mem_rd_data: v.mem_rd_data,
            ..Default::default()
        });
        assert_eq!(out.aout, v.expect_a, "{}: aout", v.name);
        assert_eq!(out.bout, v.expect_b, "{}: bout", v.name);
    }
}

#[derive(Deserialize)]
struct BcfVector {
    name: String,
    jbc: Vec<(u16, u8)>,
    jfetch: bool,
    jopdfetch: bool,
    expect_jpc: u16,
    expect_opd: u16,
}

const BCF_VECTORS: &str = r#"
[
  {
    "name": "jfetch_advances_one",
    "jbc": [[0, 170], [1, 187]],
    "jfetch": true,
    "jopdfetch": false,
    "expect_jpc": 1,
    "expect_opd": 170
  },
  {
    "name": "jopdfetch_shifts_byte_into_opd_lo",
    "jbc": [[0, 5], [1, 9]],
    "jfetch": false,
    "jopdfetch": true,
    "expect_jpc": 1,
    "expect_opd": 5
  }
]
"#;

// `opd_lo` tracks `jbc_out` every cycle regardless of `jopdfetch` (it only
// gates whether that byte also shifts into `opd_hi`), so a bare `jfetch`
// still changes the reported `opd` even though no operand byte was meant
// to be consumed yet.
#[test]
fn bcf_vectors_match_jpc_and_opd_results() {
    let vectors: Vec<BcfVector> = serde_json::from_str(BCF_VECTORS).expect("valid vector JSON");
    for v in &vectors {
        let mut bcf = Bcf::new(JumpTable::unmapped());
        for &(addr, data) in &v.jbc {
            bcf.jbc_write(addr, data);
        }
        bcf.reset();
        let out = bcf.step(BcfInputs {
            jfetch: v.jfetch,
            jopdfetch: v.jopdfetch,
            ena: true,
            flags: BcfFlags::default(),
            ..Default::default()
        });
        assert_eq!(out.jpc_out, v.expect_jpc, "{}: jpc", v.name);
        assert_eq!(out.opd, v.expect_opd, "{}: opd", v.name);
    }
}

#[derive(Deserialize)]
struct MfVector {
    name: String,
    rom_words: Vec<(u16, u16)>,
    steps: u32,
    expect_pc: u16,
}

const MF_VECTORS: &str = r#"
[
  {"name": "plain_advance_three_times", "rom_words": [], "steps": 3, "expect_pc": 3},
  {"name": "jfetch_dispatches_to_jpaddr", "rom_words": [[0, 2048]], "steps": 1, "expect_pc": 7}
]
"#;

#[test]
fn mf_vectors_match_pc_sequencing() {
    let vectors: Vec<MfVector> = serde_json::from_str(MF_VECTORS).expect("valid vector JSON");
    for v in &vectors {
        let mut rom = MicrocodeRom::blank();
        for &(addr, word) in &v.rom_words {
            rom.set(addr, word);
        }
        let mut mf = Mf::new(rom);
        for _ in 0..v.steps {
            mf.step(MfInputs {
                jpaddr: 7,
                ..Default::default()
            });
        }
        assert_eq!(mf.pc_peek(), v.expect_pc, "{}: pc", v.name);
    }
}

#[derive(Deserialize)]
struct MdVector {
    name: String,
    ir: u16,
    pc: u16,
    zf: bool,
    expect_br: bool,
    expect_jbr: bool,
}

const MD_VECTORS: &str = r#"
[
  {"name": "bz_fires_on_zf", "ir": 387, "pc": 10, "zf": true, "expect_br": true, "expect_jbr": false},
  {"name": "bz_holds_when_not_zf", "ir": 387, "pc": 10, "zf": false, "expect_br": false, "expect_jbr": false},
  {"name": "jbr_flags_the_shared_handler", "ir": 258, "pc": 0, "zf": false, "expect_br": false, "expect_jbr": true}
]
"#;

#[test]
fn md_vectors_match_branch_decisions() {
    let vectors: Vec<MdVector> = serde_json::from_str(MD_VECTORS).expect("valid vector JSON");
    let md = Md;
    for v in &vectors {
        let out = md.step(MdInputs {
            ir: v.ir,
            pc: v.pc,
            zf: v.zf,
        });
        assert_eq!(out.br, v.expect_br, "{}: br", v.name);
        assert_eq!(out.jbr, v.expect_jbr, "{}: jbr", v.name);
        assert!(matches!(decode(v.ir), Instr::Bz(_) | Instr::Jbr), "{}: ir decodes as expected", v.name);
    }
}
