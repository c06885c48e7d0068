use std::cell::RefCell;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;

use ahash::AHashMap;
use lpp_core::Token;

use crate::ast::Block;
use crate::builtins::Builtin;
use crate::env::Env;
use crate::error::RuntimeError;

#[derive(Clone)]
pub enum Value {
    Number(i64),
    Float(f64),
    Bool(bool),
    Str(Rc<String>),
    // `Null` is what the `nulo` literal evaluates to, `Void` is what statements and void builtins
    // produce. They behave the same today but are kept apart so callers can tell "no output"
    // from an explicit null.
    Null,
    Void,
    List(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<MapValue>>),
    Closure(Rc<Closure>),
    Builtin(Builtin),
    Iterator(Rc<RefCell<Iter>>),
    Method(Rc<Method>),
    Error(Rc<RuntimeError>),
}

pub const TRUE: Value = Value::Bool(true);
pub const FALSE: Value = Value::Bool(false);
pub const NULL: Value = Value::Null;
pub const VOID: Value = Value::Void;

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "ENTERO",
            Value::Float(_) => "DECIMAL",
            Value::Bool(_) => "BOOLEANO",
            Value::Str(_) => "TEXTO",
            Value::Null | Value::Void => "NULO",
            Value::List(_) => "LISTA",
            Value::Map(_) => "DICCIONARIO",
            Value::Closure(_) => "FUNCION",
            Value::Builtin(_) => "FUNCION_NATIVA",
            Value::Iterator(_) => "ITERADOR",
            Value::Method(_) => "METODO",
            Value::Error(_) => "ERROR",
        }
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false) | Value::Null | Value::Void)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    pub(crate) fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub(crate) fn map(map: MapValue) -> Value {
        Value::Map(Rc::new(RefCell::new(map)))
    }

    /// Language-level identity, used by `==` for values that have no value equality of their own.
    pub(crate) fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(lhs), Value::List(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Map(lhs), Value::Map(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Closure(lhs), Value::Closure(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Iterator(lhs), Value::Iterator(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Builtin(lhs), Value::Builtin(rhs)) => lhs.name == rhs.name,
            (Value::Null | Value::Void, Value::Null | Value::Void) => true,
            _ => false,
        }
    }
}

// Structural equality. The interpreter's `==` has its own rules, this one exists so values can be
// compared in tests and inside `Control`.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(lhs), Value::Number(rhs)) => lhs == rhs,
            (Value::Float(lhs), Value::Float(rhs)) => lhs == rhs,
            (Value::Bool(lhs), Value::Bool(rhs)) => lhs == rhs,
            (Value::Str(lhs), Value::Str(rhs)) => lhs == rhs,
            (Value::Null, Value::Null) => true,
            (Value::Void, Value::Void) => true,
            (Value::List(lhs), Value::List(rhs)) => {
                Rc::ptr_eq(lhs, rhs) || *lhs.borrow() == *rhs.borrow()
            }
            (Value::Map(lhs), Value::Map(rhs)) => {
                Rc::ptr_eq(lhs, rhs) || *lhs.borrow() == *rhs.borrow()
            }
            (Value::Closure(lhs), Value::Closure(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Builtin(lhs), Value::Builtin(rhs)) => lhs.name == rhs.name,
            (Value::Iterator(lhs), Value::Iterator(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Method(lhs), Value::Method(rhs)) => lhs == rhs,
            (Value::Error(lhs), Value::Error(rhs)) => lhs == rhs,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Rc::new(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Rc::new(String::from(value)))
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::list(value)
    }
}

impl From<RuntimeError> for Value {
    fn from(value: RuntimeError) -> Self {
        Value::Error(Rc::new(value))
    }
}

macro_rules! impl_from_int_for_value {
    ( $( $t:ident )* ) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Value {
                    Value::Number(n as i64)
                }
            }
        )*
    }
}

impl_from_int_for_value!(u8 i8 u16 i16 u32 i32 i64 usize);

macro_rules! impl_from_float_for_value {
    ( $( $t:ident )* ) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Value {
                    Value::Float(n as f64)
                }
            }
        )*
    }
}

impl_from_float_for_value!(f32 f64);

thread_local! {
    // Lists and maps being displayed right now, by address.
    static DISPLAYING: RefCell<Vec<usize>> = RefCell::new(Vec::new());
}

// Displays a container through `body` unless it is already being displayed further up, as happens
// once a list or map holds itself. The repeated occurrence prints `placeholder` instead.
fn display_once<T>(
    f: &mut Formatter<'_>,
    container: &Rc<RefCell<T>>,
    placeholder: &str,
    body: impl FnOnce(&mut Formatter<'_>, &T) -> std::fmt::Result,
) -> std::fmt::Result {
    let address = Rc::as_ptr(container) as *const () as usize;
    let entered = DISPLAYING.with(|active| {
        let mut active = active.borrow_mut();
        if active.contains(&address) {
            false
        } else {
            active.push(address);
            true
        }
    });

    if !entered {
        return write!(f, "{}", placeholder);
    }

    let result = body(f, &*container.borrow());
    DISPLAYING.with(|active| active.borrow_mut().retain(|&entry| entry != address));
    result
}

fn join(items: &[Value]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(val) => write!(f, "{}", val),
            Value::Float(val) => write!(f, "{:?}", val),
            Value::Bool(true) => write!(f, "verdadero"),
            Value::Bool(false) => write!(f, "falso"),
            Value::Str(val) => write!(f, "{}", val),
            Value::Null | Value::Void => write!(f, "nulo"),
            Value::List(items) => {
                display_once(f, items, "[...]", |f, items| write!(f, "[{}]", join(items)))
            }
            Value::Map(map) => display_once(f, map, "{...}", |f, map| write!(f, "{}", map)),
            Value::Closure(closure) => write!(f, "{}", closure),
            Value::Builtin(builtin) => write!(f, "<funcion nativa {}>", builtin.name),
            Value::Iterator(_) => write!(f, "<iterador>"),
            Value::Method(method) => write!(f, "<metodo {}>", method.tag),
            Value::Error(err) => write!(f, "ERROR: {}", err),
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Str(val) => write!(f, "{:?}", val),
            _ => write!(f, "{}", self),
        }
    }
}

pub struct Closure {
    pub(crate) params: Rc<Vec<Token>>,
    pub(crate) body: Rc<Block>,
    // Shared, never copied: the closure sees later changes made to the scope it was created in.
    pub(crate) env: Env,
}

impl Display for Closure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self
            .params
            .iter()
            .map(|param| param.lexeme.as_str())
            .collect();
        write!(f, "funcion({}) {}", names.join(", "), self.body)
    }
}

/// A map whose entries keep insertion order. Keys are looked up by their display string, which
/// means two different values printing the same way (`1` and `"1"`) are the same key.
#[derive(Debug, Clone, Default)]
pub struct MapValue {
    entries: Vec<(Value, Value)>,
    index: AHashMap<String, usize>,
}

impl MapValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// The string a key is stored under.
    pub(crate) fn key_of(key: &Value) -> String {
        key.to_string()
    }

    /// Inserts a key that must not be present yet, as required while building a map literal.
    pub fn insert_new(&mut self, key: Value, value: Value) -> Result<(), RuntimeError> {
        let encoded = Self::key_of(&key);
        if self.index.contains_key(&encoded) {
            return Err(RuntimeError::DuplicateKey(encoded));
        }

        self.index.insert(encoded, self.entries.len());
        self.entries.push((key, value));
        Ok(())
    }

    pub fn set(&mut self, key: Value, value: Value) {
        let encoded = Self::key_of(&key);
        self.set_encoded(encoded, key, value)
    }

    // For callers holding a key that may contain this very map, they have to encode it before
    // borrowing the map mutably.
    pub(crate) fn set_encoded(&mut self, encoded: String, key: Value, value: Value) {
        match self.index.get(&encoded) {
            Some(&pos) => self.entries[pos].1 = value,
            None => {
                self.index.insert(encoded, self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.index
            .get(&Self::key_of(key))
            .map(|&pos| &self.entries[pos].1)
    }

    pub fn contains(&self, key: &Value) -> bool {
        self.index.contains_key(&Self::key_of(key))
    }

    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        self.remove_encoded(&Self::key_of(key))
    }

    pub(crate) fn remove_encoded(&mut self, encoded: &str) -> Option<Value> {
        let pos = self.index.remove(encoded)?;
        let (_, value) = self.entries.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Some(value)
    }

    pub fn keys(&self) -> Vec<Value> {
        self.entries.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries.iter().map(|(_, value)| value.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for MapValue {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Display for MapValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let pairs: Vec<String> = self
            .entries
            .iter()
            .map(|(key, value)| format!("{} => {}", key, value))
            .collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

/// A cursor over a snapshot of a list, or of a string exploded into one-character strings.
#[derive(Debug, Clone, PartialEq)]
pub struct Iter {
    items: Vec<Value>,
    position: usize,
}

impl Iter {
    pub fn new(items: Vec<Value>) -> Self {
        Iter { items, position: 0 }
    }

    pub fn from_text(text: &str) -> Self {
        Iter::new(text.chars().map(|c| Value::from(c.to_string())).collect())
    }

    pub fn current(&self) -> Option<&Value> {
        self.items.get(self.position)
    }
}

impl Iterator for Iter {
    type Item = Value;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.items.get(self.position).cloned();
        if item.is_some() {
            self.position += 1;
        }
        item
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MethodTag {
    Add,
    Pop,
    Remove,
    Contains,
    Get,
    Set,
    Keys,
    Values,
    Upper,
    Lower,
    IsUpper,
    IsLower,
    Split,
}

impl Display for MethodTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MethodTag::Add => "agregar",
            MethodTag::Pop => "sacar",
            MethodTag::Remove => "eliminar",
            MethodTag::Contains => "contiene",
            MethodTag::Get => "obtener",
            MethodTag::Set => "poner",
            MethodTag::Keys => "llaves",
            MethodTag::Values => "valores",
            MethodTag::Upper => "mayusculas",
            MethodTag::Lower => "minusculas",
            MethodTag::IsUpper => "es_mayusculas",
            MethodTag::IsLower => "es_minusculas",
            MethodTag::Split => "separar",
        };
        write!(f, "{}", name)
    }
}

/// The intent produced by a method accessor builtin. It does not know its receiver, the method
/// expression applies it to one afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub tag: MethodTag,
    pub args: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use crate::value::{Iter, MapValue, Value, FALSE, NULL, TRUE, VOID};

    #[test]
    fn test_truthiness() {
        assert!(TRUE.is_truthy());
        assert!(!FALSE.is_truthy());
        assert!(!NULL.is_truthy());
        assert!(!VOID.is_truthy());
        assert!(Value::from(0).is_truthy());
        assert!(Value::from("").is_truthy());
        assert!(Value::from(Vec::<Value>::new()).is_truthy());
    }

    #[test]
    fn test_display() {
        let tests = [
            (Value::from(5), "5"),
            (Value::from(2.5), "2.5"),
            (Value::from(2.0), "2.0"),
            (TRUE, "verdadero"),
            (FALSE, "falso"),
            (NULL, "nulo"),
            (Value::from("hola"), "hola"),
            (
                Value::from(vec![Value::from(1), Value::from("a"), TRUE]),
                "[1, a, verdadero]",
            ),
        ];

        for (value, expected) in tests {
            assert_eq!(value.to_string(), expected);
        }
    }

    #[test]
    fn test_map_keys_collide_on_display_string() {
        let mut map = MapValue::new();
        map.insert_new(Value::from(1), Value::from("entero")).unwrap();

        assert!(map.insert_new(Value::from("1"), Value::from("texto")).is_err());
        assert_eq!(map.get(&Value::from("1")), Some(&Value::from("entero")));

        map.set(Value::from("1"), Value::from("texto"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&Value::from(1)), Some(&Value::from("texto")));
    }

    #[test]
    fn test_map_keeps_insertion_order() {
        let mut map = MapValue::new();
        for key in ["c", "a", "b"] {
            map.set(Value::from(key), Value::from(key.len()));
        }
        assert_eq!(map.to_string(), "{c => 1, a => 1, b => 1}");

        assert_eq!(map.remove(&Value::from("c")), Some(Value::from(1)));
        assert_eq!(map.keys(), vec![Value::from("a"), Value::from("b")]);
        assert_eq!(map.get(&Value::from("b")), Some(&Value::from(1)));
        assert_eq!(map.remove(&Value::from("z")), None);
    }

    #[test]
    fn test_string_iterator() {
        let mut iter = Iter::from_text("añ");
        assert_eq!(iter.current(), Some(&Value::from("a")));
        assert_eq!(iter.next(), Some(Value::from("a")));
        assert_eq!(iter.next(), Some(Value::from("ñ")));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_self_containing_collections_display_a_placeholder() {
        let list = Value::from(vec![Value::from(1)]);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        assert_eq!(list.to_string(), "[1, [...]]");
        assert_eq!(list, list.clone());

        let map = Value::map(MapValue::new());
        if let Value::Map(entries) = &map {
            entries.borrow_mut().set(Value::from("yo"), map.clone());
        }
        assert_eq!(map.to_string(), "{yo => {...}}");

        let outer = Value::from(vec![map.clone(), map]);
        assert_eq!(outer.to_string(), "[{yo => {...}}, {yo => {...}}]");
    }

    #[test]
    fn test_identity() {
        let list = Value::from(vec![Value::from(1)]);
        let same = list.clone();
        let other = Value::from(vec![Value::from(1)]);

        assert!(list.identical(&same));
        assert!(!list.identical(&other));
        assert_eq!(list, other);
        assert!(NULL.identical(&VOID));
    }
}
