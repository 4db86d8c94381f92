use std::{collections::HashMap, io::Write};

pub mod backend;
pub mod error;
pub mod frontend;
pub mod runtime;

pub use error::Error;

/// Lexes, parses and lowers `source` to three-address code.
pub fn compile(source: &str) -> Result<Vec<backend::Instruction>, Error> {
    backend::compile(source)
}

/// Compiles and runs `source`, writing program output to `out`.
pub fn run(source: &str, out: &mut impl Write) -> Result<HashMap<String, i64>, Error> {
    let instructions = compile(source)?;
    Ok(runtime::interpret(&instructions, out)?)
}
