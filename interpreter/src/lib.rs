use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

pub mod ast;
pub mod builtins;
pub mod env;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod value;

pub use env::{Env, Environment};
pub use error::{ParseError, RuntimeError};
pub use interpreter::Interpreter;
pub use parser::{parse, Parser};
pub use value::Value;

/// Parses and evaluates `source` in a fresh root environment, writing `imprimir` output to
/// `stdout`. Syntax errors prevent evaluation and are returned all at once.
pub fn run(source: &str, stdout: Rc<RefCell<dyn Write>>) -> Result<Value, Vec<ParseError>> {
    let program = parse(source)?;
    let mut interpreter = Interpreter::new(stdout);
    Ok(interpreter.evaluate(&program, Environment::root()))
}
