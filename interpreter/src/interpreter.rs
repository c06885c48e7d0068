use std::cell::RefCell;
use std::io::{self, BufRead, BufReader, Write};
use std::rc::Rc;

use lpp_core::{Token, Type};
use tracing::{debug, trace};

use crate::ast::{Block, Expr, ExprVisitor, Program, Stmt, StmtVisitor};
use crate::builtins::{self, Builtin};
use crate::env::{Env, Environment};
use crate::error::{Control, EvalResult, RuntimeError};
use crate::value::{Closure, Iter, MapValue, Value, VOID};

pub struct Interpreter {
    env: Env,
    pub(crate) stdout: Rc<RefCell<dyn Write>>,
    pub(crate) stdin: Rc<RefCell<dyn BufRead>>,
}

impl Interpreter {
    pub fn new(stdout: Rc<RefCell<dyn Write>>) -> Self {
        Interpreter {
            env: Environment::root(),
            stdout,
            stdin: Rc::new(RefCell::new(BufReader::new(io::stdin()))),
        }
    }

    /// Replaces the source `leer` reads lines from.
    pub fn with_input(mut self, stdin: Rc<RefCell<dyn BufRead>>) -> Self {
        self.stdin = stdin;
        self
    }

    /// Evaluates `program` inside `env`. The result is the value of the last statement, the value
    /// of the first top-level `regresa`, or `Value::Error` for the first error raised.
    pub fn evaluate(&mut self, program: &Program, env: Env) -> Value {
        debug!(statements = program.statements.len(), "evaluating program");

        let previous = std::mem::replace(&mut self.env, env);
        let result = self.execute_statements(&program.statements);
        self.env = previous;

        match result {
            Ok(value) | Err(Control::Return(value)) => value,
            Err(Control::Error(err)) => {
                debug!(%err, "evaluation failed");
                Value::from(err)
            }
        }
    }

    fn execute_statements(&mut self, statements: &[Stmt]) -> EvalResult {
        let mut result = VOID;
        for stmt in statements {
            result = self.visit_stmt(stmt)?;
        }
        Ok(result)
    }

    pub(crate) fn execute_block_with_env(&mut self, block: &Block, env: Env) -> EvalResult {
        let current = std::mem::replace(&mut self.env, env);
        let result = self.visit_block(block);
        self.env = current;
        result
    }

    fn lookup_variable(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = RefCell::borrow(&self.env).get(&name.lexeme) {
            return Ok(value);
        }

        builtins::lookup(&name.lexeme)
            .map(Value::Builtin)
            .ok_or_else(|| RuntimeError::IdentifierNotFound(name.lexeme.clone()))
    }

    fn call_value(&mut self, callee: Value, args: Vec<Value>) -> EvalResult {
        match callee {
            Value::Closure(closure) => self.call_closure(&closure, args),
            Value::Builtin(builtin) => self.call_builtin(builtin, args),
            other => Err(RuntimeError::NotAFunction(other.type_name()).into()),
        }
    }

    fn call_closure(&mut self, closure: &Closure, args: Vec<Value>) -> EvalResult {
        if args.len() < closure.params.len() {
            return Err(RuntimeError::WrongArgumentCount {
                expected: closure.params.len(),
                got: args.len(),
            }
            .into());
        }

        trace!(params = closure.params.len(), "calling closure");

        let mut env = Environment::with(closure.env.clone());
        for (param, arg) in closure.params.iter().zip(args) {
            env.define(&param.lexeme, arg);
        }

        match self.execute_block_with_env(&closure.body, Rc::new(RefCell::new(env))) {
            Ok(value) | Err(Control::Return(value)) => Ok(value),
            Err(err) => Err(err),
        }
    }

    fn call_builtin(&mut self, builtin: Builtin, args: Vec<Value>) -> EvalResult {
        Ok(builtin.call(self, args)?)
    }

    // Resolves the storage `target` names. The container and key of an element are evaluated
    // here, once, so reading and writing through the place touch the same slot.
    fn place<'a>(&mut self, target: &'a Expr) -> EvalResult<Place<'a>> {
        match target {
            Expr::Identifier { name } => Ok(Place::Variable(name)),
            Expr::Index { left, index, .. } => {
                let container = self.visit_expr(left)?;
                let key = self.visit_expr(index)?;
                Ok(Place::Element(container, key))
            }
            other => Err(RuntimeError::InvalidAssignment(other.to_string()).into()),
        }
    }

    fn read(&self, place: &Place) -> Result<Value, RuntimeError> {
        match place {
            Place::Variable(name) => self.lookup_variable(name),
            Place::Element(container, key) => get_index(container, key),
        }
    }

    fn write(&mut self, place: Place, value: Value) -> Result<(), RuntimeError> {
        match place {
            Place::Variable(name) => {
                if !RefCell::borrow(&self.env).contains(&name.lexeme) {
                    return Err(RuntimeError::IdentifierNotFound(name.lexeme.clone()));
                }
                RefCell::borrow_mut(&self.env).define(&name.lexeme, value);
                Ok(())
            }
            Place::Element(container, key) => set_index(&container, key, value),
        }
    }

    // A method call only makes sense when its name resolves to something callable by name.
    fn is_known_method(&self, call: &Expr) -> bool {
        match call {
            Expr::Call { callee, .. } => match callee.as_ref() {
                Expr::Identifier { name } => {
                    RefCell::borrow(&self.env).contains(&name.lexeme)
                        || builtins::lookup(&name.lexeme).is_some()
                }
                _ => true,
            },
            _ => true,
        }
    }
}

// Somewhere an assignment can write to.
enum Place<'a> {
    Variable(&'a Token),
    Element(Value, Value),
}

fn set_index(container: &Value, key: Value, value: Value) -> Result<(), RuntimeError> {
    match container {
        Value::List(items) => {
            let index = match key {
                Value::Number(index) => index,
                other => return Err(RuntimeError::InvalidIndex(other.type_name())),
            };
            let mut items = items.borrow_mut();
            let len = items.len();
            match usize::try_from(index) {
                Ok(pos) if pos < len => {
                    items[pos] = value;
                    Ok(())
                }
                _ => Err(RuntimeError::IndexOutOfRange { index, len }),
            }
        }
        Value::Map(map) => {
            // Encoded before borrowing, the key may be the map itself.
            let encoded = MapValue::key_of(&key);
            map.borrow_mut().set_encoded(encoded, key, value);
            Ok(())
        }
        other => Err(RuntimeError::NotIndexable(other.type_name())),
    }
}

fn get_index(container: &Value, key: &Value) -> Result<Value, RuntimeError> {
    match (container, key) {
        (Value::List(items), Value::Number(index)) => {
            let items = items.borrow();
            usize::try_from(*index)
                .ok()
                .and_then(|pos| items.get(pos))
                .cloned()
                .ok_or(RuntimeError::IndexOutOfRange {
                    index: *index,
                    len: items.len(),
                })
        }
        (Value::Str(text), Value::Number(index)) => usize::try_from(*index)
            .ok()
            .and_then(|pos| text.chars().nth(pos))
            .map(|c| Value::from(c.to_string()))
            .ok_or(RuntimeError::IndexOutOfRange {
                index: *index,
                len: text.chars().count(),
            }),
        (Value::List(_) | Value::Str(_), other) => {
            Err(RuntimeError::InvalidIndex(other.type_name()))
        }
        (Value::Map(map), key) => Ok(map.borrow().get(key).cloned().unwrap_or(VOID)),
        (other, _) => Err(RuntimeError::NotIndexable(other.type_name())),
    }
}

// The arithmetic behind a compound assignment.
fn base_operator(ty: Type) -> Option<Type> {
    match ty {
        Type::PlusAssign => Some(Type::Plus),
        Type::MinusAssign => Some(Type::Minus),
        Type::StarAssign => Some(Type::Star),
        Type::SlashAssign => Some(Type::Slash),
        _ => None,
    }
}

fn suffix(operator: &Token, value: &Value) -> Result<Value, RuntimeError> {
    match (operator.ty, value) {
        (Type::Increment, Value::Number(val)) => Ok(Value::Number(val.wrapping_add(1))),
        (Type::Decrement, Value::Number(val)) => Ok(Value::Number(val.wrapping_sub(1))),
        (Type::Power, Value::Number(val)) => Ok(Value::Number(val.wrapping_mul(*val))),
        (Type::Increment, Value::Float(val)) => Ok(Value::Float(val + 1.0)),
        (Type::Decrement, Value::Float(val)) => Ok(Value::Float(val - 1.0)),
        (Type::Power, Value::Float(val)) => Ok(Value::Float(val * val)),
        _ => Err(RuntimeError::UnknownSuffixOperator {
            left: value.type_name(),
            operator: operator.lexeme.clone(),
        }),
    }
}

// `symbol` is only used to build error messages, `op` decides what gets computed.
fn infix(op: Type, symbol: &str, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match (&left, &right) {
        (Value::Number(lhs), Value::Number(rhs)) => integer_infix(op, symbol, *lhs, *rhs),
        (Value::Number(_) | Value::Float(_), Value::Number(_) | Value::Float(_)) => {
            float_infix(op, symbol, as_float(&left), as_float(&right))
        }
        (Value::Str(lhs), Value::Str(rhs)) => match op {
            Type::Plus => Ok(Value::from(format!("{}{}", lhs, rhs))),
            Type::EqualEqual => Ok(Value::from(lhs == rhs)),
            Type::BangEqual => Ok(Value::from(lhs != rhs)),
            _ => Err(unknown_infix(symbol, &left, &right)),
        },
        (Value::Bool(lhs), Value::Bool(rhs)) => match op {
            Type::And => Ok(Value::from(*lhs && *rhs)),
            Type::Or => Ok(Value::from(*lhs || *rhs)),
            Type::EqualEqual => Ok(Value::from(lhs == rhs)),
            Type::BangEqual => Ok(Value::from(lhs != rhs)),
            _ => Err(unknown_infix(symbol, &left, &right)),
        },
        _ => match op {
            Type::EqualEqual => Ok(Value::from(left.identical(&right))),
            Type::BangEqual => Ok(Value::from(!left.identical(&right))),
            _ if left.type_name() != right.type_name() => Err(RuntimeError::TypeMismatch {
                left: left.type_name(),
                operator: String::from(symbol),
                right: right.type_name(),
            }),
            _ => Err(unknown_infix(symbol, &left, &right)),
        },
    }
}

fn integer_infix(op: Type, symbol: &str, lhs: i64, rhs: i64) -> Result<Value, RuntimeError> {
    let value = match op {
        Type::Plus => Value::Number(lhs.wrapping_add(rhs)),
        Type::Minus => Value::Number(lhs.wrapping_sub(rhs)),
        Type::Star => Value::Number(lhs.wrapping_mul(rhs)),
        Type::Slash if rhs == 0 => return Err(RuntimeError::DivisionByZero),
        Type::Slash => Value::Number(lhs.wrapping_div(rhs)),
        Type::Percent if rhs == 0 => return Err(RuntimeError::DivisionByZero),
        Type::Percent => Value::Number(lhs.wrapping_rem(rhs)),
        // Negative exponents (and ones too large to fit a u32) leave the integers.
        Type::Power => match u32::try_from(rhs) {
            Ok(exp) => Value::Number(lhs.wrapping_pow(exp)),
            Err(_) => Value::Float((lhs as f64).powf(rhs as f64)),
        },
        Type::Less => Value::from(lhs < rhs),
        Type::Greater => Value::from(lhs > rhs),
        Type::LessEqual => Value::from(lhs <= rhs),
        Type::GreaterEqual => Value::from(lhs >= rhs),
        Type::EqualEqual => Value::from(lhs == rhs),
        Type::BangEqual => Value::from(lhs != rhs),
        _ => {
            return Err(unknown_infix(
                symbol,
                &Value::Number(lhs),
                &Value::Number(rhs),
            ))
        }
    };

    Ok(value)
}

fn float_infix(op: Type, symbol: &str, lhs: f64, rhs: f64) -> Result<Value, RuntimeError> {
    let value = match op {
        Type::Plus => Value::Float(lhs + rhs),
        Type::Minus => Value::Float(lhs - rhs),
        Type::Star => Value::Float(lhs * rhs),
        Type::Slash | Type::Percent if rhs == 0.0 => return Err(RuntimeError::DivisionByZero),
        Type::Slash => Value::Float(lhs / rhs),
        Type::Percent => Value::Float(lhs % rhs),
        Type::Power => Value::Float(lhs.powf(rhs)),
        Type::Less => Value::from(lhs < rhs),
        Type::Greater => Value::from(lhs > rhs),
        Type::LessEqual => Value::from(lhs <= rhs),
        Type::GreaterEqual => Value::from(lhs >= rhs),
        Type::EqualEqual => Value::from(lhs == rhs),
        Type::BangEqual => Value::from(lhs != rhs),
        _ => return Err(unknown_infix(symbol, &Value::Float(lhs), &Value::Float(rhs))),
    };

    Ok(value)
}

fn as_float(value: &Value) -> f64 {
    match value {
        Value::Number(val) => *val as f64,
        Value::Float(val) => *val,
        _ => f64::NAN,
    }
}

fn unknown_infix(symbol: &str, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::UnknownInfixOperator {
        left: left.type_name(),
        operator: String::from(symbol),
        right: right.type_name(),
    }
}

impl ExprVisitor for Interpreter {
    type Item = Value;

    fn visit_identifier(&mut self, name: &Token) -> EvalResult {
        Ok(self.lookup_variable(name)?)
    }

    fn visit_integer(&mut self, value: i64) -> EvalResult {
        Ok(Value::Number(value))
    }

    fn visit_float(&mut self, value: f64) -> EvalResult {
        Ok(Value::Float(value))
    }

    fn visit_boolean(&mut self, value: bool) -> EvalResult {
        Ok(Value::from(value))
    }

    fn visit_str(&mut self, value: &str) -> EvalResult {
        Ok(Value::from(value))
    }

    fn visit_null(&mut self) -> EvalResult {
        Ok(Value::Null)
    }

    fn visit_prefix(&mut self, operator: &Token, right: &Expr) -> EvalResult {
        let right = self.visit_expr(right)?;
        match (operator.ty, &right) {
            (Type::Bang, _) => Ok(Value::from(!right.is_truthy())),
            (Type::Minus, Value::Number(val)) => Ok(Value::Number(val.wrapping_neg())),
            (Type::Minus, Value::Float(val)) => Ok(Value::Float(-val)),
            _ => Err(RuntimeError::UnknownPrefixOperator {
                operator: operator.lexeme.clone(),
                right: right.type_name(),
            }
            .into()),
        }
    }

    fn visit_infix(&mut self, left: &Expr, operator: &Token, right: &Expr) -> EvalResult {
        match base_operator(operator.ty) {
            Some(base) => {
                let place = self.place(left)?;
                let lhs = self.read(&place)?;
                let rhs = self.visit_expr(right)?;
                let value = infix(base, &operator.lexeme, lhs, rhs)?;
                self.write(place, value.clone())?;
                Ok(value)
            }
            None => {
                let lhs = self.visit_expr(left)?;
                let rhs = self.visit_expr(right)?;
                Ok(infix(operator.ty, &operator.lexeme, lhs, rhs)?)
            }
        }
    }

    fn visit_suffix(&mut self, left: &Expr, operator: &Token) -> EvalResult {
        if !left.is_assignable() {
            let value = self.visit_expr(left)?;
            return Ok(suffix(operator, &value)?);
        }

        let place = self.place(left)?;
        let updated = suffix(operator, &self.read(&place)?)?;
        self.write(place, updated.clone())?;
        Ok(updated)
    }

    fn visit_function(&mut self, params: &Rc<Vec<Token>>, body: &Rc<Block>) -> EvalResult {
        Ok(Value::Closure(Rc::new(Closure {
            params: params.clone(),
            body: body.clone(),
            env: self.env.clone(),
        })))
    }

    fn visit_call(&mut self, callee: &Expr, args: &[Expr]) -> EvalResult {
        let callee = self.visit_expr(callee)?;
        let mut evaluated_args = Vec::with_capacity(args.len());
        for arg in args {
            evaluated_args.push(self.visit_expr(arg)?);
        }

        self.call_value(callee, evaluated_args)
    }

    fn visit_array(&mut self, elements: &[Expr]) -> EvalResult {
        let mut items = Vec::with_capacity(elements.len());
        for element in elements {
            items.push(self.visit_expr(element)?);
        }
        Ok(Value::list(items))
    }

    fn visit_index(&mut self, left: &Expr, index: &Expr) -> EvalResult {
        let container = self.visit_expr(left)?;
        let key = self.visit_expr(index)?;
        Ok(get_index(&container, &key)?)
    }

    fn visit_map(&mut self, pairs: &[(Expr, Expr)]) -> EvalResult {
        let mut map = MapValue::new();
        for (key, value) in pairs {
            let key = self.visit_expr(key)?;
            let value = self.visit_expr(value)?;
            map.insert_new(key, value)?;
        }
        Ok(Value::map(map))
    }

    fn visit_method(&mut self, receiver: &Expr, call: &Expr) -> EvalResult {
        let receiver = self.visit_expr(receiver)?;
        let name = match call {
            Expr::Call { callee, .. } => callee.to_string(),
            other => other.to_string(),
        };

        let no_such_method = || RuntimeError::NoSuchMethod {
            method: name.clone(),
            receiver: receiver.type_name(),
        };

        if !self.is_known_method(call) {
            return Err(no_such_method().into());
        }

        match self.visit_expr(call)? {
            Value::Method(method) => Ok(builtins::apply_method(&receiver, &method)?),
            _ => Err(no_such_method().into()),
        }
    }

    fn visit_reassign(&mut self, target: &Expr, value: &Expr) -> EvalResult {
        let value = self.visit_expr(value)?;
        let place = self.place(target)?;
        self.write(place, value.clone())?;
        Ok(value)
    }

    fn visit_range(&mut self, _variable: &Token, iterable: &Expr) -> EvalResult {
        let iter = match self.visit_expr(iterable)? {
            Value::List(items) => Iter::new(items.borrow().clone()),
            Value::Str(text) => Iter::from_text(&text),
            other => return Err(RuntimeError::NotIterable(other.type_name()).into()),
        };
        Ok(Value::Iterator(Rc::new(RefCell::new(iter))))
    }

    fn visit_if(
        &mut self,
        condition: &Expr,
        consequence: &Block,
        alternative: Option<&Block>,
    ) -> EvalResult {
        if self.visit_expr(condition)?.is_truthy() {
            self.visit_block(consequence)
        } else if let Some(alternative) = alternative {
            self.visit_block(alternative)
        } else {
            Ok(VOID)
        }
    }

    fn visit_while(&mut self, condition: &Expr, body: &Block) -> EvalResult {
        while self.visit_expr(condition)?.is_truthy() {
            self.visit_block(body)?;
        }
        Ok(VOID)
    }

    fn visit_for(&mut self, condition: &Expr, body: &Block) -> EvalResult {
        let variable = match condition {
            Expr::Range { variable, .. } => variable,
            other => return Err(RuntimeError::InvalidAssignment(other.to_string()).into()),
        };

        let iter = match self.visit_expr(condition)? {
            Value::Iterator(iter) => iter,
            other => return Err(RuntimeError::NotIterable(other.type_name()).into()),
        };

        loop {
            let next = iter.borrow_mut().next();
            match next {
                Some(item) => {
                    RefCell::borrow_mut(&self.env).define(&variable.lexeme, item);
                    self.visit_block(body)?;
                }
                None => return Ok(VOID),
            }
        }
    }
}

impl StmtVisitor for Interpreter {
    type Item = Value;

    fn visit_let(&mut self, name: &Token, value: &Expr) -> EvalResult {
        let value = self.visit_expr(value)?;
        RefCell::borrow_mut(&self.env).define(&name.lexeme, value);
        Ok(VOID)
    }

    fn visit_return(&mut self, value: &Expr) -> EvalResult {
        let value = self.visit_expr(value)?;
        Err(Control::Return(value))
    }

    fn visit_expression(&mut self, expression: &Expr) -> EvalResult {
        #[cfg(feature = "trace-evaluation")]
        trace!(%expression, "evaluating");

        self.visit_expr(expression)
    }

    // Blocks share the environment they run in, only function calls open a new scope.
    fn visit_block(&mut self, block: &Block) -> EvalResult {
        self.execute_statements(&block.statements)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::env::Environment;
    use crate::interpreter::Interpreter;
    use crate::parser::parse;
    use crate::value::Value;

    fn run(src: &str) -> (Value, String) {
        let program = match parse(src) {
            Ok(program) => program,
            Err(errs) => panic!("Not expecting errors for '{}', found {:?}", src, errs),
        };

        let output: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::new(output.clone());
        let value = interpreter.evaluate(&program, Environment::root());
        let out = String::from_utf8(output.borrow().clone()).unwrap();
        (value, out)
    }

    fn test_values(tests: &[(&str, &str)]) {
        for (src, expected) in tests {
            let (value, _) = run(src);
            assert_eq!(value.to_string(), *expected, "source: {}", src);
        }
    }

    #[test]
    fn test_integer_arithmetic() {
        test_values(&[
            ("5", "5"),
            ("-10", "-10"),
            ("5 + 5 + 5 + 5 - 10", "10"),
            ("2 * 2 * 2 * 2 * 2", "32"),
            ("-50 + 100 + -50", "0"),
            ("20 + 2 * -10", "0"),
            ("50 / 2 * 2 + 10", "60"),
            ("2 * (5 + 10)", "30"),
            ("3 * 3 * 3 + 10", "37"),
            ("(5 + 10 * 2 + 15 / 3) * 2 + -10", "50"),
            ("7 / 2", "3"),
            ("-7 / 2", "-3"),
            ("7 % 3", "1"),
            ("-7 % 3", "-1"),
            ("2 ** 10", "1024"),
            ("2 ** -1", "0.5"),
            ("9223372036854775807 + 1", "-9223372036854775808"),
        ]);
    }

    #[test]
    fn test_float_arithmetic() {
        test_values(&[
            ("2.5", "2.5"),
            ("-2.5", "-2.5"),
            ("1.5 + 1", "2.5"),
            ("1 + 1.5", "2.5"),
            ("3.0 * 2", "6.0"),
            ("7.0 / 2", "3.5"),
            ("2.0 ** 3", "8.0"),
            ("1.5 < 2", "verdadero"),
            ("2 == 2.0", "verdadero"),
        ]);
    }

    #[test]
    fn test_boolean_expressions() {
        test_values(&[
            ("verdadero", "verdadero"),
            ("falso", "falso"),
            ("1 < 2", "verdadero"),
            ("1 > 2", "falso"),
            ("1 <= 1", "verdadero"),
            ("1 >= 2", "falso"),
            ("1 == 1", "verdadero"),
            ("1 != 1", "falso"),
            ("verdadero == verdadero", "verdadero"),
            ("verdadero != falso", "verdadero"),
            ("(1 < 2) == verdadero", "verdadero"),
            ("verdadero && falso", "falso"),
            ("falso || verdadero", "verdadero"),
            ("nulo == nulo", "verdadero"),
            ("1 == \"1\"", "falso"),
            ("[1] == [1]", "falso"),
            ("var l = [1]; l == l", "verdadero"),
        ]);
    }

    #[test]
    fn test_bang_operator() {
        test_values(&[
            ("!verdadero", "falso"),
            ("!falso", "verdadero"),
            ("!5", "falso"),
            ("!!verdadero", "verdadero"),
            ("!!5", "verdadero"),
            ("!nulo", "verdadero"),
            ("!0", "falso"),
        ]);
    }

    #[test]
    fn test_strings() {
        test_values(&[
            ("\"Hola\" + \" \" + \"mundo!\"", "Hola mundo!"),
            ("\"a\" == \"a\"", "verdadero"),
            ("\"a\" != \"a\"", "falso"),
            ("\"añejo\"[1]", "ñ"),
            ("longitud(\"añejo\")", "5"),
        ]);
    }

    #[test]
    fn test_if_expressions() {
        test_values(&[
            ("si (verdadero) { 10 }", "10"),
            ("si (falso) { 10 }", "nulo"),
            ("si (1) { 10 }", "10"),
            ("si (1 < 2) { 10 }", "10"),
            ("si (1 > 2) { 10 }", "nulo"),
            ("si (1 > 2) { 10 } si_no { 20 }", "20"),
            ("si (1 < 2) { 10 } si_no { 20 }", "10"),
            ("si (nulo) { 1 } si_no si (verdadero) { 2 } si_no { 3 }", "2"),
            ("var x = si (falso) { 1 } si_no { 2 }; x * 10", "20"),
        ]);

        let (value, _) = run("si (falso) { 10 }");
        assert!(value.is_void());
    }

    #[test]
    fn test_return_statements() {
        test_values(&[
            ("regresa 10;", "10"),
            ("regresa 10; 9;", "10"),
            ("regresa 2 * 5; 9;", "10"),
            ("9; regresa 2 * 5; 9;", "10"),
            ("si (10 > 1) { si (10 > 1) { regresa 10; } regresa 1; }", "10"),
            (
                "var f = funcion(x) { regresa x; x + 10; }; f(10);",
                "10",
            ),
            (
                "var f = funcion(x) { var r = x * 2; si (r > 10) { regresa r; } r + 1 }; f(8) + f(2);",
                "21",
            ),
        ]);
    }

    #[test]
    fn test_let_statements() {
        test_values(&[
            ("var a = 5; a;", "5"),
            ("var a = 5 * 5; a;", "25"),
            ("var a = 5; var b = a; b;", "5"),
            ("var a = 5; var b = a; var c = a + b + 5; c;", "15"),
            ("var a = 5;", "nulo"),
        ]);
    }

    #[test]
    fn test_reassignment() {
        test_values(&[
            ("var a = 1; a = 2; a", "2"),
            ("var a = 1; a = a + 1", "2"),
            ("var a = 1; var b = 1; a = b = 7; a + b", "14"),
            ("var a = 10; a += 5; a", "15"),
            ("var a = 10; a -= 5", "5"),
            ("var a = 10; a *= 2; a /= 4; a", "5"),
            ("var i = 1; i++; i++; i", "3"),
            ("var i = 1; i--", "0"),
            ("var i = 3; i**; i", "9"),
            ("var l = [1, 2]; l[0] = 5; l", "[5, 2]"),
            ("var l = [1, 2]; l[1] += 5; l", "[1, 7]"),
            ("var l = [1, 2]; l[0]++; l", "[2, 2]"),
            ("var m = {\"a\" => 1}; m[\"b\"] = 2; m", "{a => 1, b => 2}"),
            ("var m = {\"a\" => 1}; m[\"a\"] = 3; m", "{a => 3}"),
            ("3++", "4"),
            ("var x = 1; var y = 2; x += y + 10; x", "13"),
            ("var a = 1; var b = 2; a += b += 3; [a, b]", "[6, 5]"),
            ("var a = 2; var b = a *= 3 + 1; [a, b]", "[8, 8]"),
            // the new binding lands in the current scope, the outer one is untouched
            ("var a = 1; var f = funcion() { a = 2; a }; f() * 10 + a", "21"),
        ]);
    }

    #[test]
    fn test_indexed_assignment_evaluates_its_target_once() {
        test_values(&[
            ("var l = [0, 0, 0]; var i = 0; l[i++] += 1; [l, i]", "[[0, 1, 0], 1]"),
            ("var l = [0, 0, 0]; var i = 0; l[i++]++; [l, i]", "[[0, 1, 0], 1]"),
            ("var m = {}; var n = 0; m[n++] = n; [m, n]", "[{1 => 0}, 1]"),
        ]);

        let (value, out) = run(
            "var l = [10, 20]; var f = funcion() { imprimir(\"llamada\"); l }; f()[1] -= 5; l",
        );
        assert_eq!(value.to_string(), "[10, 15]");
        assert_eq!(out, "llamada\n");
    }

    #[test]
    fn test_collections_holding_themselves() {
        test_values(&[
            ("var m = {}; m:poner(m, 1); longitud(m)", "1"),
            ("var m = {}; m[m] = 1; longitud(m)", "1"),
            ("var m = {}; m:obtener(m)", "nulo"),
            ("var m = {}; m:contiene(m)", "falso"),
            ("var l = [[1]]; l:contiene(l)", "falso"),
            ("var l = [1]; l:agregar(l); l:contiene(l)", "verdadero"),
            ("var l = [1]; l:agregar(l); l", "[1, [...]]"),
            ("var m = {}; m[\"yo\"] = m; m", "{yo => {...}}"),
        ]);

        let (_, out) = run("var l = []; l:agregar(l); imprimir(l, longitud(l));");
        assert_eq!(out, "[[...]] 1\n");
    }

    #[test]
    fn test_functions_and_closures() {
        test_values(&[
            ("var identidad = funcion(x) { x; }; identidad(5);", "5"),
            ("var doble = funcion(x) { x * 2; }; doble(5);", "10"),
            ("var suma = funcion(x, y) { x + y; }; suma(5, 5);", "10"),
            ("var suma = funcion(x, y) { x + y; }; suma(5 + 5, suma(5, 5));", "20"),
            ("funcion(x) { x; }(5)", "5"),
            ("var suma_dos = funcion(x) { regresa x + 2; }; suma_dos(5)", "7"),
            ("var f = funcion(x) { x }; f(1, 2, 3)", "1"),
            (
                "var sumador = funcion(x) { funcion(y) { x + y } }; var mas_dos = sumador(2); mas_dos(3)",
                "5",
            ),
            (
                "var fib = funcion(n) { si (n < 2) { regresa n; } fib(n - 1) + fib(n - 2) }; fib(15)",
                "610",
            ),
            (
                "var contador = funcion() { var n = 0; funcion() { n = n + 1; n } }; var c = contador(); c(); c(); c()",
                "1",
            ),
            ("var f = funcion() { tarde }; var tarde = 7; f()", "7"),
            ("var f = funcion() { }; f()", "nulo"),
            ("funcion(x, y) { x + y; }", "funcion(x, y) { (x + y); }"),
        ]);
    }

    #[test]
    fn test_collections() {
        test_values(&[
            ("[1, 2 * 2, 3 + 3]", "[1, 4, 6]"),
            ("[1, 2, 3][0]", "1"),
            ("[1, 2, 3][1 + 1]", "3"),
            ("var l = [1, 2, 3]; l[0] + l[1] + l[2]", "6"),
            ("var l = [1, 2, 3]; var i = l[0]; l[i]", "2"),
            ("{\"uno\" => 1, 2 => \"dos\", verdadero => 3}", "{uno => 1, 2 => dos, verdadero => 3}"),
            ("{\"a\" => 5}[\"a\"]", "5"),
            ("{\"a\" => 5}[\"b\"]", "nulo"),
            ("var k = \"a\"; {k => 5}[\"a\"]", "5"),
            ("{1 => \"uno\"}[\"1\"]", "uno"),
            ("longitud([1, 2, 3])", "3"),
            ("longitud({})", "0"),
        ]);
    }

    #[test]
    fn test_methods() {
        test_values(&[
            ("var l = [1, 2]; l:agregar(3); l", "[1, 2, 3]"),
            ("var l = [1, 2]; l:sacar()", "2"),
            ("var l = [1, 2, 3]; l:eliminar(1); l", "[1, 3]"),
            ("[1, 2]:contiene(2)", "verdadero"),
            ("var m = {\"a\" => 1}; m:poner(\"b\", 2); m:llaves()", "[a, b]"),
            ("{\"a\" => 1}:valores()", "[1]"),
            ("{\"a\" => 1}:obtener(\"a\")", "1"),
            ("{\"a\" => 1}:contiene(\"b\")", "falso"),
            ("\"Hola\":mayusculas()", "HOLA"),
            ("\"Hola\":minusculas()", "hola"),
            ("\"HOLA\":es_mayusculas()", "verdadero"),
            ("\"hola\":es_minusculas()", "verdadero"),
            ("\"a,b,c\":separar(\",\")", "[a, b, c]"),
            ("\"a,b\":separar(\",\")[1]:mayusculas()", "B"),
        ]);
    }

    #[test]
    fn test_loops() {
        let tests = [
            ("var i = 0; mientras (i < 3) { imprimir(i); i++; }", "0\n1\n2\n"),
            ("por (x en [1, 2, 3]) { imprimir(x * 2); }", "2\n4\n6\n"),
            ("por (c en \"hola\") { imprimir(c); }", "h\no\nl\na\n"),
            ("por (i en rango(3)) { imprimir(i); } imprimir(i);", "0\n1\n2\n2\n"),
            ("var total = 0; por (x en rango(1, 5)) { total += x; } imprimir(total);", "10\n"),
            (
                "var f = funcion() { por (x en [1, 2, 3]) { si (x == 2) { regresa x; } } 0 }; imprimir(f());",
                "2\n",
            ),
        ];

        for (src, expected) in tests {
            let (value, out) = run(src);
            assert_eq!(out, expected, "source: {}", src);
            assert!(!matches!(value, Value::Error(_)), "source: {}", src);
        }
    }

    #[test]
    fn test_builtins() {
        let (value, out) = run("imprimir(\"a\", 1, verdadero, nulo, [1, \"b\"]);");
        assert_eq!(out, "a 1 verdadero nulo [1, b]\n");
        assert!(value.is_void());

        test_values(&[
            ("tipo(1)", "ENTERO"),
            ("tipo(1.5)", "DECIMAL"),
            ("tipo(verdadero)", "BOOLEANO"),
            ("tipo(\"a\")", "TEXTO"),
            ("tipo(nulo)", "NULO"),
            ("tipo([])", "LISTA"),
            ("tipo({})", "DICCIONARIO"),
            ("tipo(funcion() {})", "FUNCION"),
            ("tipo(imprimir)", "FUNCION_NATIVA"),
            ("entero(\"12\") + 1", "13"),
            ("texto(12) + \"!\"", "12!"),
            ("decimal(1) / 2", "0.5"),
            ("longitud", "<funcion nativa longitud>"),
            ("var longitud = 3; longitud", "3"),
        ]);
    }

    #[test]
    fn test_error_handling() {
        test_values(&[
            ("5 + verdadero;", "ERROR: Discrepancia de tipos: ENTERO + BOOLEANO"),
            ("5 + verdadero; 5;", "ERROR: Discrepancia de tipos: ENTERO + BOOLEANO"),
            ("-verdadero", "ERROR: Operador desconocido: -BOOLEANO"),
            ("verdadero + falso;", "ERROR: Operador desconocido: BOOLEANO + BOOLEANO"),
            ("5; verdadero + falso; 5", "ERROR: Operador desconocido: BOOLEANO + BOOLEANO"),
            (
                "si (10 > 1) { verdadero + falso; }",
                "ERROR: Operador desconocido: BOOLEANO + BOOLEANO",
            ),
            (
                "si (10 > 1) { si (10 > 1) { regresa verdadero + falso; } regresa 1; }",
                "ERROR: Operador desconocido: BOOLEANO + BOOLEANO",
            ),
            ("\"Hola\" - \"mundo\"", "ERROR: Operador desconocido: TEXTO - TEXTO"),
            ("1 && 2", "ERROR: Operador desconocido: ENTERO && ENTERO"),
            ("\"a\"++", "ERROR: Operador desconocido: TEXTO++"),
            ("foobar", "ERROR: Identificador no encontrado: foobar"),
            ("x = 5", "ERROR: Identificador no encontrado: x"),
            ("5 / 0", "ERROR: División entre cero"),
            ("5 % 0", "ERROR: División entre cero"),
            ("5(1)", "ERROR: No es una función: ENTERO"),
            ("5[0]", "ERROR: No es indexable: ENTERO"),
            ("[1, 2][\"a\"]", "ERROR: El índice debe ser un ENTERO, se obtuvo TEXTO"),
            ("[1, 2][2]", "ERROR: Índice fuera de rango: 2 (longitud 2)"),
            ("[1, 2][-1]", "ERROR: Índice fuera de rango: -1 (longitud 2)"),
            ("\"ab\"[\"a\"]", "ERROR: El índice debe ser un ENTERO, se obtuvo TEXTO"),
            ("\"ab\"[2]", "ERROR: Índice fuera de rango: 2 (longitud 2)"),
            ("[]:sacar()", "ERROR: La lista está vacía"),
            ("[1]:eliminar(3)", "ERROR: Índice fuera de rango: 3 (longitud 1)"),
            ("{1 => 1, \"1\" => 2}", "ERROR: Llave duplicada: 1"),
            ("[1]:mayusculas()", "ERROR: No existe el método mayusculas para LISTA"),
            ("[1]:desconocido()", "ERROR: No existe el método desconocido para LISTA"),
            ("var f = funcion() { 1 }; [1]:f()", "ERROR: No existe el método f para LISTA"),
            ("[1]:foo(foo)", "ERROR: No existe el método foo para LISTA"),
            ("[1]:agregar(nada)", "ERROR: Identificador no encontrado: nada"),
            (
                "var hacer = funcion() { funcion() { extra } }; var g = funcion() { var extra = hacer(); [1]:extra() }; g()",
                "ERROR: Identificador no encontrado: extra",
            ),
            (
                "var f = funcion(a, b) { a }; f(1)",
                "ERROR: Número incorrecto de argumentos: se esperaban 2, se recibieron 1",
            ),
            ("por (x en 5) { }", "ERROR: No es iterable: ENTERO"),
            ("longitud(1)", "ERROR: Argumento no soportado por longitud: ENTERO"),
            ("var f = funcion() { 1 + \"a\" }; f(); 2", "ERROR: Discrepancia de tipos: ENTERO + TEXTO"),
        ]);
    }

    #[test]
    fn test_environment_is_reusable_between_evaluations() {
        let output: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::new(output);
        let env = Environment::root();

        let first = parse("var x = 40;").unwrap();
        let second = parse("x + 2").unwrap();

        assert!(interpreter.evaluate(&first, env.clone()).is_void());
        assert_eq!(interpreter.evaluate(&second, env), Value::from(42));
        assert!(matches!(
            interpreter.evaluate(&second, Environment::root()),
            Value::Error(_)
        ));
    }
}
