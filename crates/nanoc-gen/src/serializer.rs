//! Renders target instructions to their textual assembly form:
//! `[label:] OPCODE target op1 op2`, one instruction per line.

use std::fs;
use std::path::Path;

use nanoc_asm::{Target, TargetInstruction};
use nanoc_util::error::{PipelineError, PipelineResult};

/// Renders one instruction's line, with no trailing newline.
pub fn render_instruction(instr: &TargetInstruction) -> String {
    let target = match &instr.target {
        Target::Register(r) => r.to_string(),
        Target::Label(l) => l.clone(),
    };
    let body = format!("{} {target} {} {}", instr.opcode, instr.op1, instr.op2);
    match &instr.label {
        Some(label) => format!("{label}: {body}"),
        None => body,
    }
}

/// Renders a full program, one instruction per line.
pub fn render_program(program: &[TargetInstruction]) -> String {
    program.iter().map(render_instruction).collect::<Vec<_>>().join("\n")
}

/// Renders `program` and writes it to `path`, appending a trailing newline.
pub fn write_to_file(program: &[TargetInstruction], path: &Path) -> PipelineResult<()> {
    let mut text = render_program(program);
    text.push('\n');
    fs::write(path, text).map_err(|source| PipelineError::Io { path: path.display().to_string(), source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanoc_asm::Opcode;

    #[test]
    fn a_register_instruction_renders_without_a_label() {
        let instr = TargetInstruction { label: None, opcode: Opcode::Add, target: Target::Register(5), op1: 6, op2: 7 };
        assert_eq!(render_instruction(&instr), "ADD 5 6 7");
    }

    #[test]
    fn a_labelled_branch_renders_its_destination_as_the_target() {
        let instr = TargetInstruction { label: Some("L_cond0".to_string()), opcode: Opcode::Brlt, target: Target::Label("L_end0".to_string()), op1: 5, op2: 6 };
        assert_eq!(render_instruction(&instr), "L_cond0: BRLT L_end0 5 6");
    }

    #[test]
    fn a_program_joins_lines_without_a_trailing_newline() {
        let program = vec![
            TargetInstruction { label: None, opcode: Opcode::Ldi, target: Target::Register(5), op1: 0, op2: 7 },
            TargetInstruction { label: None, opcode: Opcode::Str, target: Target::Register(5), op1: 1, op2: 0 },
        ];
        assert_eq!(render_program(&program), "LDI 5 0 7\nSTR 5 1 0");
    }
}
