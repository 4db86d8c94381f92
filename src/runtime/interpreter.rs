use std::{
    collections::HashMap,
    io::{BufRead, Write},
};

use crate::{
    backend::{Instruction, Op, ERROR_OPERAND, RETVAL},
    runtime::{
        channel::Channels,
        error::Error,
        legacy,
        value::{Num, Value},
    },
};

/// Largest array an element write or `array_init` may create.
const MAX_ARRAY_LEN: usize = 1 << 20;

#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Stop after this many executed instructions.
    pub max_steps: Option<usize>,
    /// Enable the `valor1`/`valor2`/`resultado`/`operacao` recompute after
    /// each completed receive.
    pub legacy_calculator: bool,
}

#[derive(Debug)]
struct Frame {
    return_ip: usize,
    return_target: String,
    has_target: bool,
}

fn unquote(token: &str) -> Option<&str> {
    token
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
}

fn arith(op: Op, lhs: Num, rhs: Num) -> Num {
    let cmp = |b: bool| Num::Int(b as i64);

    match op {
        Op::And => return cmp(lhs.truthy() && rhs.truthy()),
        Op::Or => return cmp(lhs.truthy() || rhs.truthy()),
        _ => {}
    }

    if lhs.is_float() || rhs.is_float() {
        let (a, b) = (lhs.as_f64(), rhs.as_f64());

        return match op {
            Op::Add => Num::Float(a + b),
            Op::Sub => Num::Float(a - b),
            Op::Mul => Num::Float(a * b),
            Op::Div if b == 0.0 => Num::Float(0.0),
            Op::Div => Num::Float(a / b),
            Op::Eq => cmp(a == b),
            Op::Ne => cmp(a != b),
            Op::Lt => cmp(a < b),
            Op::Lte => cmp(a <= b),
            Op::Gt => cmp(a > b),
            Op::Gte => cmp(a >= b),
            _ => Num::Int(0),
        };
    }

    let (a, b) = (lhs.as_i64(), rhs.as_i64());

    match op {
        Op::Add => Num::Int(a.wrapping_add(b)),
        Op::Sub => Num::Int(a.wrapping_sub(b)),
        Op::Mul => Num::Int(a.wrapping_mul(b)),
        Op::Div if b == 0 => Num::Int(0),
        Op::Div => Num::Int(a.wrapping_div(b)),
        Op::Eq => cmp(a == b),
        Op::Ne => cmp(a != b),
        Op::Lt => cmp(a < b),
        Op::Lte => cmp(a <= b),
        Op::Gt => cmp(a > b),
        Op::Gte => cmp(a >= b),
        _ => Num::Int(0),
    }
}

/// Executes three-address code. All state is reset at the start of each
/// [`Interpreter::run`], so one interpreter can run several programs.
pub struct Interpreter<'a> {
    options: Options,
    env: HashMap<String, Value>,
    channels: Channels,
    frames: Vec<Frame>,
    input: Option<&'a mut dyn BufRead>,
}

impl<'a> Interpreter<'a> {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            env: HashMap::new(),
            channels: Channels::default(),
            frames: vec![],
            input: None,
        }
    }

    pub fn with_input(mut self, input: &'a mut dyn BufRead) -> Self {
        self.input = Some(input);
        self
    }

    pub fn call_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.env.get(name)
    }

    /// Final integer-typed variables.
    pub fn int_env(&self) -> HashMap<String, i64> {
        self.env
            .iter()
            .filter_map(|(name, value)| match value {
                Value::Int(n) => Some((name.clone(), *n)),
                _ => None,
            })
            .collect()
    }

    fn num(&self, token: &str) -> Num {
        match self.env.get(token) {
            Some(value) => value.as_num(),
            None => Num::parse(token).unwrap_or(Num::Int(0)),
        }
    }

    /// Reads an operand. Unknown names read as `Int(0)` everywhere except
    /// the right-hand side of `=`, see [`Interpreter::assigned`].
    fn resolve(&self, token: &str) -> Value {
        if let Some(value) = self.env.get(token) {
            return value.clone();
        }

        if let Some(s) = unquote(token) {
            return Value::Str(s.to_string());
        }

        Num::parse(token).map_or(Value::Int(0), Value::from)
    }

    /// Right-hand side of `=`: a token that is neither bound, quoted nor
    /// numeric is stored as its raw text. The generator's own `retval` and
    /// `error` operands still read as zero.
    fn assigned(&self, token: &str) -> Value {
        let raw = !self.env.contains_key(token)
            && unquote(token).is_none()
            && Num::parse(token).is_none()
            && !token.is_empty()
            && token != RETVAL
            && token != ERROR_OPERAND;

        if raw {
            return Value::Str(token.to_string());
        }

        self.resolve(token)
    }

    fn index(&self, token: &str) -> Option<usize> {
        usize::try_from(self.num(token).as_i64()).ok()
    }

    fn bind(&mut self, name: &str, value: Value) {
        self.env.insert(name.to_string(), value);
    }

    fn jump(&self, labels: &HashMap<&str, usize>, label: &str, ip: usize) -> usize {
        match labels.get(label) {
            Some(target) => target + 1,
            None => {
                tracing::warn!(label, ip, "jump to unknown label");
                ip + 1
            }
        }
    }

    fn read_input(&mut self) -> Result<Value, Error> {
        let Some(input) = self.input.as_mut() else {
            return Ok(Value::Int(0));
        };

        let mut line = String::new();

        if input.read_line(&mut line).map_err(Error::Input)? == 0 {
            return Ok(Value::Int(0));
        }

        let line = line.trim_end_matches(['\r', '\n']);

        Ok(match Num::parse(line.trim()) {
            Some(num) => num.into(),
            None => Value::Str(line.to_string()),
        })
    }

    fn array_set(&mut self, name: &str, index: usize, value: Value) {
        if index >= MAX_ARRAY_LEN {
            tracing::warn!(array = name, index, "array index too large, write skipped");
            return;
        }

        let slot = self
            .env
            .entry(name.to_string())
            .or_insert_with(|| Value::Array(vec![]));

        if !matches!(slot, Value::Array(_)) {
            *slot = Value::Array(vec![]);
        }

        if let Value::Array(items) = slot {
            if items.len() <= index {
                items.resize(index + 1, Value::Int(0));
            }

            items[index] = value;
        }
    }

    fn array_get(&self, name: &str, index: Option<usize>) -> Value {
        match (self.env.get(name), index) {
            (Some(Value::Array(items)), Some(index)) => {
                items.get(index).cloned().unwrap_or(Value::Int(0))
            }
            _ => Value::Int(0),
        }
    }

    fn elements(&self, name: &str) -> Vec<Value> {
        match self.env.get(name) {
            Some(Value::Array(items)) => items.clone(),
            _ => vec![],
        }
    }

    fn display(&self, token: &str) -> String {
        if token.is_empty() {
            return String::new();
        }

        self.resolve(token).to_string()
    }

    fn step(
        &mut self,
        ip: usize,
        instr: &Instruction,
        labels: &HashMap<&str, usize>,
        out: &mut impl Write,
    ) -> Result<usize, Error> {
        let Instruction {
            result,
            op,
            arg1,
            arg2,
        } = instr;

        match op {
            Op::Assign => {
                let value = self.assigned(arg1);
                self.bind(result, value);
            }
            Op::Param => {
                let value = self.resolve(arg1);
                self.bind(result, value);
            }
            Op::Not => {
                let value = Num::Int(!self.num(arg1).truthy() as i64);
                self.bind(result, value.into());
            }
            op if op.is_binary() => {
                let value = arith(*op, self.num(arg1), self.num(arg2));
                self.bind(result, value.into());
            }
            Op::Label => {}
            Op::IfFalse => {
                if !self.num(arg1).truthy() {
                    return Ok(self.jump(labels, arg2, ip));
                }
            }
            Op::Goto => return Ok(self.jump(labels, arg1, ip)),
            Op::Print => write!(out, "{} ", self.display(arg1)).map_err(Error::Output)?,
            Op::PrintLast => writeln!(out, "{}", self.display(arg1)).map_err(Error::Output)?,
            Op::Call => {
                let Some(&target) = labels.get(arg1.as_str()) else {
                    tracing::warn!(function = %arg1, ip, "call to unknown function");
                    return Ok(ip + 1);
                };

                self.frames.push(Frame {
                    return_ip: ip + 1,
                    return_target: result.clone(),
                    has_target: !result.is_empty(),
                });

                return Ok(target + 1);
            }
            Op::Return => {
                if let Some(frame) = self.frames.pop() {
                    if frame.has_target {
                        let value = self.resolve(arg1);
                        self.bind(&frame.return_target, value);
                    }

                    return Ok(frame.return_ip);
                }
            }
            Op::Send => {
                let expected = self.index(arg2).unwrap_or(0);
                self.channels.send(arg1, expected);
            }
            Op::SendArg => {
                let value = self.num(arg1);
                self.channels.send_arg(result, value);
            }
            Op::Receive => {
                let expected = self.index(arg2).unwrap_or(0);
                self.channels.receive(arg1, expected);
            }
            Op::RecvArg => {
                let index = self.index(arg2).unwrap_or(0);
                let received = self.channels.recv_arg(arg1, index);
                self.bind(result, received.value.into());

                if received.complete && self.options.legacy_calculator {
                    legacy::recompute(&mut self.env);
                }
            }
            Op::ArrayInit => {
                let len = self.index(arg1).unwrap_or(0);

                if len > MAX_ARRAY_LEN {
                    tracing::warn!(array = %result, len, "array too large, left empty");
                }

                let len = len.min(MAX_ARRAY_LEN);
                self.bind(result, Value::Array(vec![Value::Int(0); len]));
            }
            Op::ArraySet => match self.index(arg2) {
                Some(index) => {
                    let value = self.resolve(arg1);
                    self.array_set(result, index, value);
                }
                None => tracing::warn!(array = %result, index = %arg2, "negative array index"),
            },
            Op::ArrayGet => {
                let value = self.array_get(arg1, self.index(arg2));
                self.bind(result, value);
            }
            Op::ArrayConcat => {
                let mut items = self.elements(arg1);
                items.extend(self.elements(arg2));
                self.bind(result, Value::Array(items));
            }
            Op::Input => {
                let value = self.read_input()?;
                self.bind(result, value);
            }
            _ => {}
        }

        Ok(ip + 1)
    }

    pub fn run(&mut self, instructions: &[Instruction], out: &mut impl Write) -> Result<(), Error> {
        self.env.clear();
        self.frames.clear();
        self.channels = Channels::default();

        let labels = instructions
            .iter()
            .enumerate()
            .filter(|(_, instr)| instr.op == Op::Label)
            .map(|(i, instr)| (instr.result.as_str(), i))
            .collect::<HashMap<_, _>>();

        let mut ip = 0;
        let mut steps = 0;

        while let Some(instr) = instructions.get(ip) {
            // a label closing the stream has nothing left to run
            if instr.op == Op::Label && ip + 1 == instructions.len() {
                break;
            }

            if self.options.max_steps.is_some_and(|max| steps >= max) {
                tracing::warn!(steps, "step limit reached, stopping");
                break;
            }

            tracing::trace!(ip, "{instr}");
            ip = self.step(ip, instr, &labels, out)?;
            steps += 1;
        }

        out.flush().map_err(Error::Output)?;
        Ok(())
    }
}

/// Runs `instructions` with default options and returns the final
/// integer-typed variables.
pub fn interpret(
    instructions: &[Instruction],
    out: &mut impl Write,
) -> Result<HashMap<String, i64>, Error> {
    let mut interpreter = Interpreter::new(Options::default());
    interpreter.run(instructions, out)?;

    Ok(interpreter.int_env())
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::backend::compile;

    fn output(source: &str) -> String {
        let mut out = vec![];
        interpret(&compile(source).unwrap(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test_case(Op::Add, Num::Int(2), Num::Int(3), Num::Int(5); "int add")]
    #[test_case(Op::Div, Num::Int(7), Num::Int(2), Num::Int(3); "truncating division")]
    #[test_case(Op::Div, Num::Int(-7), Num::Int(2), Num::Int(-3); "truncates toward zero")]
    #[test_case(Op::Div, Num::Int(1), Num::Int(0), Num::Int(0); "division by zero")]
    #[test_case(Op::Div, Num::Float(1.0), Num::Int(0), Num::Float(0.0); "float division by zero")]
    #[test_case(Op::Add, Num::Int(1), Num::Float(2.5), Num::Float(3.5); "promotes to float")]
    #[test_case(Op::Lt, Num::Float(1.5), Num::Int(2), Num::Int(1); "float comparison is int")]
    #[test_case(Op::And, Num::Int(2), Num::Int(0), Num::Int(0); "logical and")]
    #[test_case(Op::Or, Num::Int(0), Num::Float(0.5), Num::Int(1); "logical or")]
    #[test_case(Op::Add, Num::Int(i64::MAX), Num::Int(1), Num::Int(i64::MIN); "wrapping add")]
    fn arithmetic(op: Op, lhs: Num, rhs: Num, expected: Num) {
        assert_eq!(arith(op, lhs, rhs), expected);
    }

    #[test]
    fn strings_keep_their_type() {
        assert_eq!(output("s = \"hi\"; t = s; print t, 1;"), "hi 1\n");
    }

    #[test]
    fn last_writer_wins() {
        let instructions = compile("x = \"text\"; x = 2.5; x = 3;").unwrap();
        let mut interpreter = Interpreter::new(Options::default());
        interpreter.run(&instructions, &mut std::io::sink()).unwrap();

        assert_eq!(interpreter.get("x"), Some(&Value::Int(3)));
        assert_eq!(interpreter.int_env().get("x"), Some(&3));
    }

    #[test]
    fn undefined_reads_are_zero() {
        assert_eq!(output("print missing + 1;"), "1\n");
    }

    #[test]
    fn assigning_unknown_name_stores_text() {
        assert_eq!(output("x = y; print x;"), "y\n");
        assert_eq!(output("x = y + 0; print x;"), "0\n");
    }

    #[test]
    fn unset_retval_is_zero() {
        assert_eq!(output("fun f() { } x = f(); print x;"), "0\n");
    }

    #[test]
    fn empty_print_writes_newline() {
        assert_eq!(output("print;"), "\n");
    }

    #[test]
    fn unknown_jump_advances() {
        let instructions = vec![
            Instruction::new("", Op::Goto, "nowhere", ""),
            Instruction::new("x", Op::Assign, "1", ""),
        ];

        assert_eq!(interpret(&instructions, &mut std::io::sink()).unwrap().get("x"), Some(&1));
    }

    #[test]
    fn unknown_call_advances() {
        let env = interpret(&compile("missing(1); x = 2;").unwrap(), &mut std::io::sink()).unwrap();

        assert_eq!(env.get("x"), Some(&2));
    }

    #[test]
    fn top_level_return_is_noop() {
        assert_eq!(output("return 1; print 2;"), "2\n");
    }

    #[test]
    fn step_limit_stops_infinite_loop() {
        let instructions = compile("i = 0; while (1) { i = i + 1; }").unwrap();
        let mut interpreter = Interpreter::new(Options {
            max_steps: Some(100),
            ..Options::default()
        });
        interpreter.run(&instructions, &mut std::io::sink()).unwrap();

        assert!(matches!(interpreter.get("i"), Some(Value::Int(n)) if *n > 0));
    }

    #[test]
    fn array_assignment_grows() {
        assert_eq!(output("a = [1]; a[3] = 4; print a;"), "[1, 0, 0, 4]\n");
    }

    #[test]
    fn huge_array_index_is_skipped() {
        assert_eq!(
            output("a = [1]; a[4611686018427387903] = 1; print a, 7;"),
            "[1] 7\n"
        );
    }

    #[test]
    fn array_init_is_capped() {
        let instructions = vec![Instruction::new("a", Op::ArrayInit, "9223372036854775807", "")];
        let mut interpreter = Interpreter::new(Options::default());
        interpreter.run(&instructions, &mut std::io::sink()).unwrap();

        assert!(matches!(
            interpreter.get("a"),
            Some(Value::Array(items)) if items.len() == MAX_ARRAY_LEN
        ));
    }

    #[test]
    fn array_out_of_range_is_zero() {
        assert_eq!(output("a = [1, 2]; print a[5];"), "0\n");
    }

    #[test]
    fn array_copy_is_deep() {
        assert_eq!(output("a = [1, 2]; b = a; a[0] = 9; print a, b;"), "[9, 2] [1, 2]\n");
    }

    #[test]
    fn array_concat() {
        assert_eq!(output("a = [1]; b = [2, 3]; c = a + b; print c;"), "[1, 2, 3]\n");
    }

    #[test]
    fn input_is_typed() {
        let instructions = compile("input n; input f; input s; input none;").unwrap();
        let mut source = "42\n1.5\nhello world\n".as_bytes();
        let mut interpreter = Interpreter::new(Options::default()).with_input(&mut source);
        interpreter.run(&instructions, &mut std::io::sink()).unwrap();

        assert_eq!(interpreter.get("n"), Some(&Value::Int(42)));
        assert_eq!(interpreter.get("f"), Some(&Value::Float(1.5)));
        assert_eq!(interpreter.get("s"), Some(&Value::Str("hello world".to_string())));
        assert_eq!(interpreter.get("none"), Some(&Value::Int(0)));
    }

    #[test]
    fn state_is_fresh_per_run() {
        let mut interpreter = Interpreter::new(Options::default());
        interpreter.run(&compile("x = 1;").unwrap(), &mut std::io::sink()).unwrap();
        interpreter.run(&compile("y = 2;").unwrap(), &mut std::io::sink()).unwrap();

        assert_eq!(interpreter.get("x"), None);
    }

    #[test]
    fn legacy_calculator_is_opt_in() {
        let source = "c.send(6, 3, 3) resultado = 0 c.receive(valor1, valor2, operacao)";
        let instructions = compile(source).unwrap();

        let mut plain = Interpreter::new(Options::default());
        plain.run(&instructions, &mut std::io::sink()).unwrap();
        assert_eq!(plain.get("resultado"), Some(&Value::Int(0)));

        let mut legacy = Interpreter::new(Options {
            legacy_calculator: true,
            ..Options::default()
        });
        legacy.run(&instructions, &mut std::io::sink()).unwrap();
        assert_eq!(legacy.get("resultado"), Some(&Value::Int(18)));
    }
}
