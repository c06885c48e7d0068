//! Property tests for arithmetic and for the canonical form of parsed programs.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use lpp::{parse, Value};
use proptest::prelude::*;

fn eval(src: &str) -> Value {
    let sink: Rc<RefCell<dyn io::Write>> = Rc::new(RefCell::new(io::sink()));
    lpp::run(src, sink).unwrap()
}

/// Operands small enough to be written as literals, negatives included through the prefix `-`.
fn operand() -> impl Strategy<Value = i64> {
    -1_000_000i64..1_000_000
}

fn literal(n: i64) -> String {
    if n < 0 {
        format!("(-{})", -n)
    } else {
        n.to_string()
    }
}

fn identifier() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,8}")
        .expect("valid regex")
        .prop_filter("not a keyword", |s| lpp_core::Scanner::keyword(s).is_none())
}

/// Expressions over every operator form, written the way their canonical form prints them.
fn expr_strategy(depth: u32) -> BoxedStrategy<String> {
    let leaf = prop_oneof![
        (0i64..1000).prop_map(|n| n.to_string()),
        (0i64..1000, 0u32..100).prop_map(|(n, d)| format!("{}.{}", n, d)),
        identifier(),
        Just(String::from("verdadero")),
        Just(String::from("nulo")),
        "[a-z ]{0,6}".prop_map(|s| format!("\"{}\"", s)),
    ];

    leaf.prop_recursive(depth, 24, 3, |inner| {
        prop_oneof![
            (
                inner.clone(),
                prop::sample::select(vec!["+", "-", "*", "/", "%", "<", ">", "==", "!=", "&&"]),
                inner.clone()
            )
                .prop_map(|(l, op, r)| format!("({} {} {})", l, op, r)),
            (prop::sample::select(vec!["!", "-"]), inner.clone())
                .prop_map(|(op, r)| format!("({}{})", op, r)),
            (identifier(), prop::collection::vec(inner.clone(), 0..3))
                .prop_map(|(f, args)| format!("{}({})", f, args.join(", "))),
            prop::collection::vec(inner.clone(), 0..3)
                .prop_map(|items| format!("[{}]", items.join(", "))),
            (inner.clone(), inner.clone()).prop_map(|(l, i)| format!("({}[{}])", l, i)),
            (inner.clone(), prop::sample::select(vec!["++", "--", "**"]))
                .prop_map(|(l, op)| format!("({}{})", l, op)),
            prop::collection::vec((inner.clone(), inner.clone()), 0..3).prop_map(|pairs| {
                let pairs: Vec<String> =
                    pairs.iter().map(|(k, v)| format!("{} => {}", k, v)).collect();
                format!("{{{}}}", pairs.join(", "))
            }),
            (inner.clone(), identifier(), prop::collection::vec(inner.clone(), 0..3))
                .prop_map(|(r, m, args)| format!("({}:{}({}))", r, m, args.join(", "))),
            (
                identifier(),
                prop::sample::select(vec!["=", "+=", "-=", "*=", "/="]),
                inner
            )
                .prop_map(|(target, op, value)| format!("({} {} {})", target, op, value)),
        ]
    })
    .boxed()
}

proptest! {
    #[test]
    fn prop_integer_arithmetic(a in operand(), b in operand()) {
        let (x, y) = (literal(a), literal(b));

        prop_assert_eq!(eval(&format!("{} + {}", x, y)), Value::from(a + b));
        prop_assert_eq!(eval(&format!("{} - {}", x, y)), Value::from(a - b));
        prop_assert_eq!(eval(&format!("{} * {}", x, y)), Value::from(a * b));
        prop_assert_eq!(eval(&format!("{} < {}", x, y)), Value::from(a < b));
        prop_assert_eq!(eval(&format!("{} == {}", x, y)), Value::from(a == b));

        if b != 0 {
            prop_assert_eq!(eval(&format!("{} / {}", x, y)), Value::from(a / b));
            prop_assert_eq!(eval(&format!("{} % {}", x, y)), Value::from(a % b));
        } else {
            let is_error = matches!(eval(&format!("{} / {}", x, y)), Value::Error(_));
            prop_assert!(is_error);
        }
    }

    #[test]
    fn prop_string_concatenation(a in "[a-zñ ]{0,10}", b in "[a-zñ ]{0,10}") {
        let joined = eval(&format!("\"{}\" + \"{}\"", a, b));
        prop_assert_eq!(joined, Value::from(format!("{}{}", a, b)));
        prop_assert_eq!(eval(&format!("\"{}\" == \"{}\"", a, b)), Value::from(a == b));
    }

    #[test]
    fn prop_canonical_form_round_trips(expr in expr_strategy(3), name in identifier()) {
        let src = format!("var {} = {}; {}; regresa {};", name, expr, expr, name);
        let first = parse(&src).unwrap().to_string();
        let second = parse(&first).unwrap().to_string();
        prop_assert_eq!(first, second);
    }
}
