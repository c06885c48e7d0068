use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::rc::Rc;
use std::{env, fs};

use lpp::{parse, Environment, Interpreter, Value};
use tracing::info;

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Only initialize if RUST_LOG is set
    if env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(io::stderr))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn report(value: &Value) {
    match value {
        Value::Void => {}
        other => println!("{}", other),
    }
}

fn run_file(path: &str) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("No se pudo leer {}: {}", path, err);
            return ExitCode::FAILURE;
        }
    };

    let program = match parse(&source) {
        Ok(program) => program,
        Err(errs) => {
            for err in errs {
                eprintln!("{}", err);
            }
            return ExitCode::FAILURE;
        }
    };

    let stdout: Rc<RefCell<dyn Write>> = Rc::new(RefCell::new(io::stdout()));
    let mut interpreter = Interpreter::new(stdout);
    let value = interpreter.evaluate(&program, Environment::root());

    report(&value);
    match value {
        Value::Error(_) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

fn repl() -> ExitCode {
    println!("Bienvenido al lenguaje de programación LPP");
    println!("Escribe un comando para comenzar");

    let stdout: Rc<RefCell<dyn Write>> = Rc::new(RefCell::new(io::stdout()));
    let mut interpreter = Interpreter::new(stdout);
    // Bindings persist from one line to the next.
    let env = Environment::root();
    let stdin = io::stdin();

    loop {
        print!(">> ");
        if io::stdout().flush().is_err() {
            return ExitCode::FAILURE;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => return ExitCode::SUCCESS,
            Ok(_) => {}
            Err(err) => {
                eprintln!("{}", err);
                return ExitCode::FAILURE;
            }
        }

        if line.trim() == "salir()" {
            return ExitCode::SUCCESS;
        }

        match parse(&line) {
            Ok(program) => report(&interpreter.evaluate(&program, env.clone())),
            Err(errs) => {
                for err in errs {
                    println!("{}", err);
                }
            }
        }
    }
}

fn main() -> ExitCode {
    init_tracing();

    match env::args().nth(1) {
        Some(path) => {
            info!(%path, "running file");
            run_file(&path)
        }
        None => repl(),
    }
}
