use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::io::{BufRead, Write};
use std::rc::Rc;

use tracing::trace;

use crate::error::{BuiltinResult, RuntimeError};
use crate::interpreter::Interpreter;
use crate::value::{Iter, MapValue, Method, MethodTag, Value, FALSE, NULL, TRUE, VOID};

pub type BuiltinFn = fn(&mut Interpreter, Vec<Value>) -> BuiltinResult;

// `Builtin` bridges native rust functions and the interpreter. Unlike closures they don't live in
// any environment, identifiers fall back to `lookup` once the scope chain has no binding, so a
// user variable with the same name shadows them.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    func: BuiltinFn,
}

impl Builtin {
    fn new(name: &'static str, func: BuiltinFn) -> Self {
        Builtin { name, func }
    }

    pub(crate) fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> BuiltinResult {
        trace!(name = self.name, args = args.len(), "calling builtin");
        (self.func)(interpreter, args)
    }
}

impl Debug for Builtin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<funcion nativa {}>", self.name)
    }
}

pub fn lookup(name: &str) -> Option<Builtin> {
    let builtin = match name {
        "longitud" => Builtin::new("longitud", longitud),
        "imprimir" => Builtin::new("imprimir", imprimir),
        "leer" => Builtin::new("leer", leer),
        "entero" => Builtin::new("entero", entero),
        "decimal" => Builtin::new("decimal", decimal),
        "texto" => Builtin::new("texto", texto),
        "tipo" => Builtin::new("tipo", tipo),
        "rango" => Builtin::new("rango", rango),
        "agregar" => Builtin::new("agregar", agregar),
        "sacar" => Builtin::new("sacar", sacar),
        "eliminar" => Builtin::new("eliminar", eliminar),
        "contiene" => Builtin::new("contiene", contiene),
        "obtener" => Builtin::new("obtener", obtener),
        "poner" => Builtin::new("poner", poner),
        "llaves" => Builtin::new("llaves", llaves),
        "valores" => Builtin::new("valores", valores),
        "mayusculas" => Builtin::new("mayusculas", mayusculas),
        "minusculas" => Builtin::new("minusculas", minusculas),
        "es_mayusculas" => Builtin::new("es_mayusculas", es_mayusculas),
        "es_minusculas" => Builtin::new("es_minusculas", es_minusculas),
        "separar" => Builtin::new("separar", separar),
        _ => return None,
    };

    Some(builtin)
}

fn check_arity(expected: usize, args: &[Value]) -> Result<(), RuntimeError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(RuntimeError::WrongArgumentCount {
            expected,
            got: args.len(),
        })
    }
}

fn io_error(err: std::io::Error) -> RuntimeError {
    RuntimeError::Io(err.to_string())
}

fn longitud(_: &mut Interpreter, args: Vec<Value>) -> BuiltinResult {
    check_arity(1, &args)?;
    match &args[0] {
        Value::Str(text) => Ok(Value::from(text.chars().count())),
        Value::List(items) => Ok(Value::from(items.borrow().len())),
        Value::Map(map) => Ok(Value::from(map.borrow().len())),
        other => Err(RuntimeError::UnsupportedArgument {
            function: "longitud",
            ty: other.type_name(),
        }),
    }
}

fn imprimir(interpreter: &mut Interpreter, args: Vec<Value>) -> BuiltinResult {
    let line = args
        .iter()
        .map(|arg| arg.to_string())
        .collect::<Vec<String>>()
        .join(" ");

    writeln!(RefCell::borrow_mut(&interpreter.stdout), "{}", line).map_err(io_error)?;
    Ok(VOID)
}

fn leer(interpreter: &mut Interpreter, args: Vec<Value>) -> BuiltinResult {
    if args.len() > 1 {
        return Err(RuntimeError::WrongArgumentCount {
            expected: 1,
            got: args.len(),
        });
    }

    if let Some(prompt) = args.first() {
        let mut stdout = RefCell::borrow_mut(&interpreter.stdout);
        write!(stdout, "{}", prompt).map_err(io_error)?;
        stdout.flush().map_err(io_error)?;
    }

    let mut line = String::new();
    let read = RefCell::borrow_mut(&interpreter.stdin)
        .read_line(&mut line)
        .map_err(io_error)?;
    if read == 0 {
        return Ok(NULL);
    }

    let trimmed = line.trim_end_matches(&['\n', '\r'][..]);
    Ok(Value::from(trimmed))
}

fn entero(_: &mut Interpreter, args: Vec<Value>) -> BuiltinResult {
    check_arity(1, &args)?;
    match &args[0] {
        Value::Number(val) => Ok(Value::Number(*val)),
        Value::Float(val) => Ok(Value::Number(val.trunc() as i64)),
        Value::Bool(val) => Ok(Value::Number(i64::from(*val))),
        Value::Str(text) => text
            .trim()
            .parse::<i64>()
            .map(Value::Number)
            .map_err(|_| RuntimeError::InvalidCast {
                value: text.to_string(),
                target: "ENTERO",
            }),
        other => Err(RuntimeError::UnsupportedArgument {
            function: "entero",
            ty: other.type_name(),
        }),
    }
}

fn decimal(_: &mut Interpreter, args: Vec<Value>) -> BuiltinResult {
    check_arity(1, &args)?;
    match &args[0] {
        Value::Number(val) => Ok(Value::Float(*val as f64)),
        Value::Float(val) => Ok(Value::Float(*val)),
        Value::Bool(val) => Ok(Value::Float(if *val { 1.0 } else { 0.0 })),
        Value::Str(text) => text
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| RuntimeError::InvalidCast {
                value: text.to_string(),
                target: "DECIMAL",
            }),
        other => Err(RuntimeError::UnsupportedArgument {
            function: "decimal",
            ty: other.type_name(),
        }),
    }
}

fn texto(_: &mut Interpreter, args: Vec<Value>) -> BuiltinResult {
    check_arity(1, &args)?;
    match &args[0] {
        val @ Value::Str(_) => Ok(val.clone()),
        other => Ok(Value::from(other.to_string())),
    }
}

fn tipo(_: &mut Interpreter, args: Vec<Value>) -> BuiltinResult {
    check_arity(1, &args)?;
    Ok(Value::from(args[0].type_name()))
}

// rango(fin), rango(inicio, fin) or rango(inicio, fin, paso). The end is exclusive and a
// negative step counts down.
fn rango(_: &mut Interpreter, args: Vec<Value>) -> BuiltinResult {
    let mut bounds = Vec::with_capacity(args.len());
    for arg in &args {
        match arg {
            Value::Number(val) => bounds.push(*val),
            other => {
                return Err(RuntimeError::UnsupportedArgument {
                    function: "rango",
                    ty: other.type_name(),
                })
            }
        }
    }

    let (start, end, step) = match bounds[..] {
        [end] => (0, end, 1),
        [start, end] => (start, end, 1),
        [start, end, step] => (start, end, step),
        _ => {
            return Err(RuntimeError::WrongArgumentCount {
                expected: if args.is_empty() { 1 } else { 3 },
                got: args.len(),
            })
        }
    };

    if step == 0 {
        return Err(RuntimeError::InvalidStep);
    }

    let mut items = Vec::new();
    let mut current = start;
    while (step > 0 && current < end) || (step < 0 && current > end) {
        items.push(Value::Number(current));
        current = match current.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }

    Ok(Value::list(items))
}

fn method(tag: MethodTag, arity: usize, args: Vec<Value>) -> BuiltinResult {
    check_arity(arity, &args)?;
    Ok(Value::Method(Rc::new(Method { tag, args })))
}

// Accessors only produce the intent, `apply_method` runs it once the receiver is known.
macro_rules! method_accessors {
    ( $( $name:ident => $tag:ident, $arity:expr; )* ) => {
        $(
            fn $name(_: &mut Interpreter, args: Vec<Value>) -> BuiltinResult {
                method(MethodTag::$tag, $arity, args)
            }
        )*
    }
}

method_accessors! {
    agregar => Add, 1;
    sacar => Pop, 0;
    eliminar => Remove, 1;
    contiene => Contains, 1;
    obtener => Get, 1;
    poner => Set, 2;
    llaves => Keys, 0;
    valores => Values, 0;
    mayusculas => Upper, 0;
    minusculas => Lower, 0;
    es_mayusculas => IsUpper, 0;
    es_minusculas => IsLower, 0;
    separar => Split, 1;
}

/// Runs a method intent against its receiver.
pub(crate) fn apply_method(receiver: &Value, method: &Method) -> BuiltinResult {
    trace!(method = %method.tag, receiver = receiver.type_name(), "applying method");

    match receiver {
        // Nothing that displays or compares the arguments may run while the receiver is borrowed
        // mutably, an argument can be the receiver itself.
        Value::List(items) => match (method.tag, method.args.as_slice()) {
            (MethodTag::Add, [item]) => {
                items.borrow_mut().push(item.clone());
                Ok(VOID)
            }
            (MethodTag::Pop, []) => {
                let popped = items.borrow_mut().pop();
                popped.ok_or(RuntimeError::EmptyList)
            }
            (MethodTag::Remove, [Value::Number(index)]) => {
                let mut items = items.borrow_mut();
                let len = items.len();
                match usize::try_from(*index) {
                    Ok(pos) if pos < len => Ok(items.remove(pos)),
                    _ => Err(RuntimeError::IndexOutOfRange { index: *index, len }),
                }
            }
            (MethodTag::Remove, [other]) => Err(RuntimeError::InvalidIndex(other.type_name())),
            (MethodTag::Contains, [item]) => {
                let found = items.borrow().iter().any(|candidate| candidate == item);
                Ok(Value::from(found))
            }
            _ => no_such_method(receiver, method),
        },
        Value::Map(map) => match (method.tag, method.args.as_slice()) {
            (MethodTag::Get, [key]) => {
                let found = map.borrow().get(key).cloned();
                Ok(found.unwrap_or(VOID))
            }
            (MethodTag::Set, [key, value]) => {
                let encoded = MapValue::key_of(key);
                map.borrow_mut().set_encoded(encoded, key.clone(), value.clone());
                Ok(VOID)
            }
            (MethodTag::Remove, [key]) => {
                let encoded = MapValue::key_of(key);
                let removed = map.borrow_mut().remove_encoded(&encoded);
                Ok(removed.unwrap_or(VOID))
            }
            (MethodTag::Contains, [key]) => {
                let found = map.borrow().contains(key);
                Ok(Value::from(found))
            }
            (MethodTag::Keys, []) => {
                let keys = map.borrow().keys();
                Ok(Value::list(keys))
            }
            (MethodTag::Values, []) => {
                let values = map.borrow().values();
                Ok(Value::list(values))
            }
            _ => no_such_method(receiver, method),
        },
        Value::Str(text) => match (method.tag, method.args.as_slice()) {
            (MethodTag::Upper, []) => Ok(Value::from(text.to_uppercase())),
            (MethodTag::Lower, []) => Ok(Value::from(text.to_lowercase())),
            (MethodTag::Contains, [Value::Str(needle)]) => {
                Ok(Value::from(text.contains(needle.as_str())))
            }
            (MethodTag::Contains, [other]) => Err(RuntimeError::UnsupportedArgument {
                function: "contiene",
                ty: other.type_name(),
            }),
            (MethodTag::IsUpper, []) => Ok(case_predicate(text, char::is_lowercase)),
            (MethodTag::IsLower, []) => Ok(case_predicate(text, char::is_uppercase)),
            (MethodTag::Split, [Value::Str(separator)]) => {
                let parts: Vec<Value> = if separator.is_empty() {
                    Iter::from_text(text).collect()
                } else {
                    text.split(separator.as_str()).map(Value::from).collect()
                };
                Ok(Value::list(parts))
            }
            (MethodTag::Split, [other]) => Err(RuntimeError::UnsupportedArgument {
                function: "separar",
                ty: other.type_name(),
            }),
            _ => no_such_method(receiver, method),
        },
        _ => no_such_method(receiver, method),
    }
}

// True when the text has at least one letter and none of them is of the opposite case.
fn case_predicate(text: &str, opposite: fn(char) -> bool) -> Value {
    let has_letters = text.chars().any(char::is_alphabetic);
    if has_letters && !text.chars().any(opposite) {
        TRUE
    } else {
        FALSE
    }
}

fn no_such_method(receiver: &Value, method: &Method) -> BuiltinResult {
    Err(RuntimeError::NoSuchMethod {
        method: method.tag.to_string(),
        receiver: receiver.type_name(),
    })
}
