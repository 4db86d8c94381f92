mod generator;
mod tac;

pub use generator::{arg_slot, generate, return_label, Generator, ERROR_OPERAND, RETVAL};
pub use tac::{listing, Instruction, Op};

use crate::frontend;

pub fn compile(source: &str) -> Result<Vec<Instruction>, crate::error::Error> {
    let program = frontend::parse(source)?;
    Ok(generate(&program))
}
