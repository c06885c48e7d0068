use lpp_core::Token;
use thiserror::Error;

use crate::value::Value;

#[derive(Debug, Error, PartialEq, Clone)]
#[error("[línea {line}] error de sintaxis: {msg}")]
pub struct ParseError {
    // line is copied from token, this is required because thiserror doesn't support field
    // access, e.g {token.line:?}, in error strings
    pub line: usize,
    pub msg: String,
}

impl ParseError {
    pub(crate) fn new(token: &Token, msg: &str) -> Self {
        ParseError {
            line: token.line + 1,
            msg: String::from(msg),
        }
    }
}

/// Every way an evaluation can fail. The display string is the message users see.
#[derive(Debug, Error, PartialEq, Clone)]
pub enum RuntimeError {
    #[error("Discrepancia de tipos: {left} {operator} {right}")]
    TypeMismatch {
        left: &'static str,
        operator: String,
        right: &'static str,
    },

    #[error("Operador desconocido: {operator}{right}")]
    UnknownPrefixOperator {
        operator: String,
        right: &'static str,
    },

    #[error("Operador desconocido: {left} {operator} {right}")]
    UnknownInfixOperator {
        left: &'static str,
        operator: String,
        right: &'static str,
    },

    #[error("Operador desconocido: {left}{operator}")]
    UnknownSuffixOperator {
        left: &'static str,
        operator: String,
    },

    #[error("Identificador no encontrado: {0}")]
    IdentifierNotFound(String),

    #[error("No es una función: {0}")]
    NotAFunction(&'static str),

    #[error("No es indexable: {0}")]
    NotIndexable(&'static str),

    #[error("El índice debe ser un ENTERO, se obtuvo {0}")]
    InvalidIndex(&'static str),

    #[error("Índice fuera de rango: {index} (longitud {len})")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("La lista está vacía")]
    EmptyList,

    #[error("Llave duplicada: {0}")]
    DuplicateKey(String),

    #[error("No existe el método {method} para {receiver}")]
    NoSuchMethod {
        method: String,
        receiver: &'static str,
    },

    #[error("Número incorrecto de argumentos: se esperaban {expected}, se recibieron {got}")]
    WrongArgumentCount { expected: usize, got: usize },

    #[error("Argumento no soportado por {function}: {ty}")]
    UnsupportedArgument {
        function: &'static str,
        ty: &'static str,
    },

    #[error("División entre cero")]
    DivisionByZero,

    #[error("No es iterable: {0}")]
    NotIterable(&'static str),

    #[error("Objetivo de asignación inválido: {0}")]
    InvalidAssignment(String),

    #[error("No se puede convertir {value} a {target}")]
    InvalidCast { value: String, target: &'static str },

    #[error("El paso de un rango no puede ser cero")]
    InvalidStep,

    #[error("Error de entrada/salida: {0}")]
    Io(String),
}

/// The non-local exits threaded through evaluation with `?`. A `Return` stops the enclosing
/// blocks and is unwrapped by the function call that produced it, an `Error` is never unwrapped
/// and becomes the result of the whole evaluation.
#[derive(Debug, PartialEq, Clone)]
pub enum Control {
    Return(Value),
    Error(RuntimeError),
}

impl From<RuntimeError> for Control {
    fn from(value: RuntimeError) -> Self {
        Control::Error(value)
    }
}

pub type EvalResult<T = Value> = Result<T, Control>;
pub type BuiltinResult = Result<Value, RuntimeError>;
