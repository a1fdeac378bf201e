//! Basic-block partitioning and live-interval computation: the analysis the
//! linear-scan allocator sweeps over.

use nanoc_tac::mir::{Instruction, InstructionKind, Operand};
use nanoc_util::{FxHashMap, Symbol};

/// A maximal run of instructions with one entry and one exit: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicBlock {
    pub start: usize,
    pub end: usize,
}

/// Partitions `program` into basic blocks. A new block starts at index 0,
/// right after any branch, and at any instruction carrying a label (a
/// branch destination, which may be reached from somewhere other than the
/// instruction immediately before it).
pub fn basic_blocks(program: &[Instruction]) -> Vec<BasicBlock> {
    let n = program.len();
    if n == 0 {
        return Vec::new();
    }

    let mut starts: Vec<usize> = vec![0];
    for i in 0..n {
        let next = i + 1;
        if next >= n {
            continue;
        }
        if program[i].is_branch() || program[next].label.is_some() {
            starts.push(next);
        }
    }
    starts.sort_unstable();
    starts.dedup();

    starts
        .iter()
        .enumerate()
        .map(|(idx, &start)| {
            let end = starts.get(idx + 1).copied().unwrap_or(n);
            BasicBlock { start, end }
        })
        .collect()
}

/// `[start, end]`, both inclusive instruction indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveInterval {
    pub start: usize,
    pub end: usize,
}

/// Computes one live interval per variable: the span from its first
/// occurrence (as a write or a read) to its last, across the whole program.
/// A variable's interval is not reset at block boundaries — a value written
/// in one block and read in the next is still live across the gap.
pub fn live_intervals(program: &[Instruction]) -> FxHashMap<Symbol, LiveInterval> {
    let mut intervals: FxHashMap<Symbol, LiveInterval> = FxHashMap::default();
    let mut touch = |name: Symbol, i: usize| {
        intervals
            .entry(name)
            .and_modify(|iv| iv.end = i)
            .or_insert(LiveInterval { start: i, end: i });
    };

    for (i, instr) in program.iter().enumerate() {
        match &instr.kind {
            InstructionKind::Assign { target, value } => {
                touch(*target, i);
                if let Operand::Ident(s) = value {
                    touch(*s, i);
                }
            }
            InstructionKind::Op { target, lhs, rhs, .. } => {
                touch(*target, i);
                if let Operand::Ident(s) = lhs {
                    touch(*s, i);
                }
                if let Some(Operand::Ident(s)) = rhs {
                    touch(*s, i);
                }
            }
            InstructionKind::Branch { lhs, rhs, .. } => {
                if let Operand::Ident(s) = lhs {
                    touch(*s, i);
                }
                if let Operand::Ident(s) = rhs {
                    touch(*s, i);
                }
            }
        }
    }
    intervals
}
