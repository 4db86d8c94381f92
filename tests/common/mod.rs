#[cfg(test)]
#[allow(dead_code)]
mod tests {
    use std::{collections::HashMap, fs};

    use minipar::{
        backend::{generate, Instruction},
        error::Error,
        frontend::{self, ast::Program, ParseError},
        runtime::{Interpreter, Options},
    };

    pub struct Output {
        pub stdout: String,
        pub ints: HashMap<String, i64>,
        pub call_depth: usize,
    }

    pub fn source(name: &str) -> Result<String, Error> {
        Ok(fs::read_to_string(format!("tests/source/{name}.mp"))?)
    }

    pub fn parse(name: &str) -> Result<(Program, Vec<ParseError>), Error> {
        frontend::parse_with_diagnostics(&source(name)?)
    }

    pub fn compile(name: &str) -> Result<Vec<Instruction>, Error> {
        let (program, _) = parse(name)?;
        Ok(generate(&program))
    }

    pub fn execute(instructions: &[Instruction], options: Options) -> Result<Output, Error> {
        let mut stdout = vec![];
        let mut interpreter = Interpreter::new(options);

        interpreter.run(instructions, &mut stdout)?;

        Ok(Output {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            ints: interpreter.int_env(),
            call_depth: interpreter.call_depth(),
        })
    }

    pub fn run_source(source: &str, options: Options) -> Result<Output, Error> {
        let program = frontend::parse(source)?;
        execute(&generate(&program), options)
    }

    pub fn run(name: &str, options: Options) -> Result<Output, Error> {
        execute(&compile(name)?, options)
    }
}

#[cfg(test)]
pub use tests::*;
