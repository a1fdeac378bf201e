//! Command-line driver: parses arguments, reads the source file, runs the
//! lex → parse → lower → allocate → serialize pipeline, and writes the
//! rendered assembly to disk.
//!
//! The pipeline is single-threaded end to end. One [`Handler`] is created
//! per invocation and threaded explicitly through [`run`] rather than kept
//! as global state, so the whole pipeline is testable in-process without
//! touching the filesystem (see [`compile_source`]).

use std::path::PathBuf;

use nanoc_asm::AssemblyGenerator;
use nanoc_asm::TargetInstruction;
use nanoc_gen::write_to_file;
use nanoc_lex::Lexer;
use nanoc_par::Parser;
use nanoc_tac::TacGenerator;
use nanoc_util::diagnostic::{Handler, Level};
use nanoc_util::error::{PipelineError, PipelineResult};
use nanoc_util::Interner;

/// Parsed command-line arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    pub input: PathBuf,
    pub output: PathBuf,
    pub log_level: Level,
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::from("./output.txt"),
            log_level: Level::Error,
        }
    }
}

const HELP_TEXT: &str = "\
nanoc - a tiny byte-language compiler

USAGE:
    nanoc -i <path> [-o <path>] [-l <level>]

OPTIONS:
    -h, --help              Print this message and exit
    -i, --input <path>      Source file to compile (required)
    -o, --output <path>     Where to write the rendered assembly (default ./output.txt)
    -l, --logLevel <level>  0..5 or NONE|ERROR|WARN|INFO|INFO_MEDIUM_LEVEL|INFO_LOW_LEVEL (default ERROR)
";

impl Cli {
    /// Parses `args` (not including the program name). Returns `Ok(None)`
    /// when `-h`/`--help` was given — the caller should print [`HELP_TEXT`]
    /// and exit successfully without running the pipeline.
    pub fn parse(args: &[String]) -> PipelineResult<Option<Cli>> {
        let mut input = None;
        let mut cli = Cli::default();

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-h" | "--help" => return Ok(None),
                "-i" | "--input" => input = Some(PathBuf::from(next_value(&mut iter, arg)?)),
                "-o" | "--output" => cli.output = PathBuf::from(next_value(&mut iter, arg)?),
                "-l" | "--logLevel" => cli.log_level = parse_log_level(&next_value(&mut iter, arg)?)?,
                other => return Err(PipelineError::UnknownFlag(other.to_string())),
            }
        }

        cli.input = input.ok_or(PipelineError::MissingInput)?;
        Ok(Some(cli))
    }
}

fn next_value<'a>(iter: &mut std::slice::Iter<'a, String>, flag: &str) -> PipelineResult<String> {
    iter.next()
        .cloned()
        .ok_or_else(|| PipelineError::MissingArgumentValue { flag: flag.to_string() })
}

fn parse_log_level(value: &str) -> PipelineResult<Level> {
    if let Ok(index) = value.parse::<i64>() {
        return Level::from_index(index).ok_or_else(|| PipelineError::UnknownLogLevel(value.to_string()));
    }
    Level::from_name(value).ok_or_else(|| PipelineError::UnknownLogLevel(value.to_string()))
}

/// Runs the full pipeline over in-memory source text, with no filesystem
/// access. Empty input short-circuits to an empty program: the grammar has
/// no rule that derives zero sections, so there is nothing for the parser
/// to usefully do with zero tokens.
pub fn compile_source(source: &str, handler: &mut Handler) -> PipelineResult<Vec<TargetInstruction>> {
    let mut interner = Interner::new();

    handler.info("lexing");
    let tokens = Lexer::new(&mut interner).tokenize_with_diagnostics(source, handler)?;
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    handler.info("parsing");
    let (ast, root) = Parser::parse_program(tokens)?;

    handler.info("checking declarations");
    nanoc_sem::SymbolTableBuilder::build_with_diagnostics(&ast, root, &interner, handler)?;

    handler.info("lowering to three-address code");
    let tac = TacGenerator::generate(&ast, root, &mut interner)?;

    handler.info("allocating registers");
    let asm = AssemblyGenerator::generate(&tac, &interner)?;

    Ok(asm)
}

/// Runs the pipeline against a file on disk and writes the rendered
/// assembly to `cli.output`.
pub fn run(cli: &Cli, handler: &mut Handler) -> PipelineResult<()> {
    let source = std::fs::read_to_string(&cli.input)
        .map_err(|source| PipelineError::Io { path: cli.input.display().to_string(), source })?;

    let program = compile_source(&source, handler)?;

    handler.info_and_print(format!("{} instructions emitted", program.len()));
    write_to_file(&program, &cli.output)?;
    Ok(())
}

/// Parses `std::env::args`, runs the pipeline, and returns the process exit
/// code: `0` on success (and for `--help`), `255` (the exit byte a `-1`
/// becomes in a real process) on any failure.
pub fn main() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let cli = match Cli::parse(&args) {
        Ok(Some(cli)) => cli,
        Ok(None) => {
            print!("{HELP_TEXT}");
            return 0;
        }
        Err(e) => {
            eprintln!("error: {e}");
            return 255;
        }
    };

    let mut handler = Handler::new(cli.log_level);
    match run(&cli, &mut handler) {
        Ok(()) => 0,
        Err(e) => {
            handler.error(e.to_string());
            255
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn help_flag_short_circuits_before_requiring_input() {
        assert_eq!(Cli::parse(&args(&["--help"])).unwrap(), None);
    }

    #[test]
    fn missing_input_is_an_error() {
        assert!(matches!(Cli::parse(&args(&[])), Err(PipelineError::MissingInput)));
    }

    #[test]
    fn output_defaults_when_not_given() {
        let cli = Cli::parse(&args(&["-i", "main.nc"])).unwrap().unwrap();
        assert_eq!(cli.output, PathBuf::from("./output.txt"));
        assert_eq!(cli.log_level, Level::Error);
    }

    #[test]
    fn every_flag_is_honored() {
        let cli = Cli::parse(&args(&["-i", "a.nc", "-o", "b.txt", "-l", "WARN"])).unwrap().unwrap();
        assert_eq!(cli.input, PathBuf::from("a.nc"));
        assert_eq!(cli.output, PathBuf::from("b.txt"));
        assert_eq!(cli.log_level, Level::Warn);
    }

    #[test]
    fn an_unknown_flag_is_rejected() {
        assert!(matches!(Cli::parse(&args(&["--bogus"])), Err(PipelineError::UnknownFlag(_))));
    }

    #[test]
    fn a_flag_missing_its_value_is_rejected() {
        assert!(matches!(Cli::parse(&args(&["-i"])), Err(PipelineError::MissingArgumentValue { .. })));
    }

    #[test]
    fn empty_source_compiles_to_an_empty_program() {
        let mut handler = Handler::new(Level::None);
        let program = compile_source("", &mut handler).unwrap();
        assert!(program.is_empty());
    }
}
