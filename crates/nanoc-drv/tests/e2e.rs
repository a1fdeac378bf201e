//! End-to-end pipeline tests: drives lexing through register allocation
//! from one source string, the way a real invocation would, without going
//! through the CLI or the filesystem.

use nanoc_asm::{AssemblyGenerator, Opcode as AsmOpcode, Target};
use nanoc_lex::Lexer;
use nanoc_par::Parser;
use nanoc_tac::builder::PLACEHOLDER;
use nanoc_tac::mir::{Instruction, InstructionKind};
use nanoc_tac::TacGenerator;
use nanoc_util::diagnostic::{Handler, Level};
use nanoc_util::Interner;

fn compile_to_tac(src: &str) -> Vec<Instruction> {
    let mut interner = Interner::new();
    let tokens = Lexer::new(&mut interner).tokenize(src).unwrap();
    let (ast, root) = Parser::parse_program(tokens).unwrap();
    TacGenerator::generate(&ast, root, &mut interner).unwrap()
}

#[test]
fn empty_input_compiles_to_an_empty_program() {
    let mut handler = Handler::new(Level::None);
    let program = nanoc_drv::compile_source("", &mut handler).unwrap();
    assert!(program.is_empty());
}

#[test]
fn a_literal_assignment_emits_one_tac_instruction_and_one_ldi() {
    let tac = compile_to_tac("byte x = 5;");
    assert_eq!(tac.len(), 1);
    assert!(matches!(&tac[0].kind, InstructionKind::Assign { value, .. } if value.as_literal() == Some(5)));

    let mut interner = Interner::new();
    let tokens = Lexer::new(&mut interner).tokenize("byte x = 5;").unwrap();
    let (ast, root) = Parser::parse_program(tokens).unwrap();
    let tac = TacGenerator::generate(&ast, root, &mut interner).unwrap();
    let asm = AssemblyGenerator::generate(&tac, &interner).unwrap();

    assert_eq!(asm[0].opcode, AsmOpcode::Ldi);
    assert_eq!(asm[0].op1, 0);
    assert_eq!(asm[0].op2, 5);
    assert!(asm.iter().any(|i| i.opcode == AsmOpcode::Str), "expected the write to be flushed at block end");
}

#[test]
fn parenthesized_precedence_constant_folds_to_a_single_instruction() {
    let tac = compile_to_tac("byte r = (1 + 2) * 3;");
    assert_eq!(tac.len(), 1, "every operand is a literal, so the whole expression should fold: {tac:?}");
    assert!(matches!(&tac[0].kind, InstructionKind::Assign { value, .. } if value.as_literal() == Some(9)));
}

#[test]
fn a_while_loop_back_patches_every_branch() {
    let tac = compile_to_tac("byte i = 0; while (i < 5) { i = (i + 1); };");
    for instr in &tac {
        if let InstructionKind::Branch { target_label, .. } = &instr.kind {
            assert_ne!(target_label, PLACEHOLDER, "branch left unpatched: {instr:?}");
        }
    }
    assert!(tac.iter().any(|i| matches!(&i.kind, InstructionKind::Branch { .. })));
}

#[test]
fn an_if_else_emits_a_conditional_branch_to_the_else_body_and_an_unconditional_branch_to_the_end() {
    let tac = compile_to_tac("byte x = 1; if (1) { x = 1; } else { x = 0; };");
    let branches: Vec<_> = tac.iter().filter(|i| matches!(i.kind, InstructionKind::Branch { .. })).collect();
    assert!(branches.len() >= 2, "expected at least a conditional and an unconditional branch: {tac:?}");
    for instr in &tac {
        if let InstructionKind::Branch { target_label, .. } = &instr.kind {
            assert_ne!(target_label, PLACEHOLDER);
        }
    }
}

#[test]
fn twelve_simultaneously_live_variables_force_a_spill_and_a_reload() {
    let mut src = String::new();
    for i in 0..12 {
        src.push_str(&format!("byte v{i} = {i};\n"));
    }
    src.push_str("byte total = v0;\n");
    for i in 1..12 {
        src.push_str(&format!("total = total + v{i};\n"));
    }

    let mut interner = Interner::new();
    let tokens = Lexer::new(&mut interner).tokenize(&src).unwrap();
    let (ast, root) = Parser::parse_program(tokens).unwrap();
    let tac = TacGenerator::generate(&ast, root, &mut interner).unwrap();
    let asm = AssemblyGenerator::generate(&tac, &interner).unwrap();

    assert!(asm.iter().any(|i| i.opcode == AsmOpcode::Str));
    assert!(asm.iter().any(|i| i.opcode == AsmOpcode::Ld));
}

#[test]
fn branch_targets_in_rendered_assembly_are_never_the_raw_placeholder() {
    let mut interner = Interner::new();
    let tokens = Lexer::new(&mut interner).tokenize("byte i = 0; while (i < 3) { i = (i + 1); };").unwrap();
    let (ast, root) = Parser::parse_program(tokens).unwrap();
    let tac = TacGenerator::generate(&ast, root, &mut interner).unwrap();
    let asm = AssemblyGenerator::generate(&tac, &interner).unwrap();
    for instr in &asm {
        if let Target::Label(label) = &instr.target {
            assert_ne!(label, PLACEHOLDER);
        }
    }
}
