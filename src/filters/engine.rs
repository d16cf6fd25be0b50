//! Registers the helper library into a rhai engine.
//!
//! The engine is created raw: only the operators rhai evaluates natively and
//! the helpers below exist, so helper names never collide with built-ins.

use rhai::{Dynamic, Engine};

use super::functions::{self, NumberParsers, ParsedNumber};
use crate::values::to_string_safe;

/// Registers one arity of a variadic helper: `head` plus the listed trailing
/// arguments, all stringified.
macro_rules! register_variadic {
    ($engine:ident, $name:literal, $func:path, $($arg:ident)*) => {
        $engine.register_fn($name, |head: Dynamic $(, $arg: Dynamic)*| {
            let rest: Vec<String> = vec![$(dynamic_text(&$arg)),*];
            $func(&dynamic_text(&head), &rest)
        });
    };
}

macro_rules! register_arities {
    ($engine:ident, $name:literal, $func:path) => {
        register_variadic!($engine, $name, $func,);
        register_variadic!($engine, $name, $func, a1);
        register_variadic!($engine, $name, $func, a1 a2);
        register_variadic!($engine, $name, $func, a1 a2 a3);
        register_variadic!($engine, $name, $func, a1 a2 a3 a4);
        register_variadic!($engine, $name, $func, a1 a2 a3 a4 a5);
        register_variadic!($engine, $name, $func, a1 a2 a3 a4 a5 a6);
        register_variadic!($engine, $name, $func, a1 a2 a3 a4 a5 a6 a7);
        register_variadic!($engine, $name, $func, a1 a2 a3 a4 a5 a6 a7 a8);
    };
}

/// Builds an engine with every filter helper registered.
pub fn create_engine() -> Engine {
    let mut engine = Engine::new_raw();
    register_functions(&mut engine);
    engine
}

pub fn register_functions(engine: &mut Engine) {
    register_arities!(engine, "all", functions::all);
    register_arities!(engine, "any", functions::any);
    register_arities!(engine, "join", functions::join);

    engine.register_fn("endsWith", |value: Dynamic, suffix: Dynamic| {
        functions::ends_with(&dynamic_text(&value), &dynamic_text(&suffix))
    });
    engine.register_fn("startsWith", |value: Dynamic, prefix: Dynamic| {
        functions::starts_with(&dynamic_text(&value), &dynamic_text(&prefix))
    });
    engine.register_fn("indexOf", |value: Dynamic, needle: Dynamic| {
        functions::index_of(&dynamic_text(&value), &dynamic_text(&needle))
    });

    engine.register_fn("float", |value: Dynamic| {
        number_value(functions::float(&dynamic_text(&value)))
    });
    engine.register_fn("int", |value: Dynamic| {
        number_value(functions::int(&dynamic_text(&value)))
    });
    engine.register_fn("isNaN", |value: Dynamic| {
        NumberParsers::default().is_nan(&dynamic_text(&value), true.into())
    });
    engine.register_fn("isNaN", |value: Dynamic, use_float: Dynamic| {
        NumberParsers::default().is_nan(&dynamic_text(&value), is_truthy(&use_float).into())
    });

    engine.register_fn("log", |value: Dynamic| {
        log_value(&value);
        true
    });
    engine.register_fn("log", |value: Dynamic, passthrough: Dynamic| {
        log_value(&value);
        passthrough
    });

    engine.register_fn("lower", |value: Dynamic| functions::lower(&dynamic_text(&value)));
    engine.register_fn("upper", |value: Dynamic| functions::upper(&dynamic_text(&value)));
    engine.register_fn("trim", |value: Dynamic| functions::trim(&dynamic_text(&value)));
    engine.register_fn("trimStart", |value: Dynamic| {
        functions::trim_start(&dynamic_text(&value))
    });
    engine.register_fn("trimEnd", |value: Dynamic| {
        functions::trim_end(&dynamic_text(&value))
    });
    engine.register_fn("str", |value: Dynamic| dynamic_text(&value));
    engine.register_fn("norm", |value: Dynamic| functions::norm(&dynamic_text(&value)));

    engine.register_fn("regex", |value: Dynamic, pattern: Dynamic| {
        functions::regex(&dynamic_text(&value), &dynamic_text(&pattern), "i")
    });
    engine.register_fn("regex", |value: Dynamic, pattern: Dynamic, flags: Dynamic| {
        functions::regex(
            &dynamic_text(&value),
            &dynamic_text(&pattern),
            &dynamic_text(&flags),
        )
    });

    // logical not with the same truthiness as the filter result
    engine.register_fn("!", |value: Dynamic| !is_truthy(&value));
}

/// [`to_string_safe`] for rhai values.
pub fn dynamic_text(value: &Dynamic) -> String {
    if value.is_unit() {
        return String::new();
    }
    if value.is_string() {
        return value.clone().into_string().unwrap_or_default();
    }
    match rhai::serde::from_dynamic::<serde_json::Value>(value) {
        Ok(json) => to_string_safe(&json),
        Err(_) => value.to_string(),
    }
}

/// Logical truthiness: unit, `false`, zero, NaN and empty strings are false.
pub fn is_truthy(value: &Dynamic) -> bool {
    if value.is_unit() {
        return false;
    }
    if let Ok(flag) = value.as_bool() {
        return flag;
    }
    if let Ok(number) = value.as_int() {
        return number != 0;
    }
    if let Ok(number) = value.as_float() {
        return number != 0.0 && !number.is_nan();
    }
    if value.is_string() {
        return value
            .clone()
            .into_immutable_string()
            .is_ok_and(|text| !text.is_empty());
    }
    true
}

fn number_value(number: Option<ParsedNumber>) -> Dynamic {
    match number {
        Some(ParsedNumber::Float(number)) => Dynamic::from_float(number),
        Some(ParsedNumber::Int(number)) => Dynamic::from_int(number),
        None => Dynamic::FALSE,
    }
}

fn log_value(value: &Dynamic) {
    tracing::info!(target: "supertest_bridge::filter", "{}", dynamic_text(value));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn eval(expression: &str) -> Dynamic {
        create_engine()
            .eval_expression::<Dynamic>(expression)
            .unwrap()
    }

    #[test]
    fn variadic_helpers() {
        assert!(eval(r#"all("Hello World", "hello", "world")"#).as_bool().unwrap());
        assert!(!eval(r#"any("foo", "bar", "baz")"#).as_bool().unwrap());
        assert_eq!(
            eval(r#"join("/", "a", 1, true)"#).into_string().unwrap(),
            "a/1/true"
        );
    }

    #[test]
    fn optional_arguments() {
        assert!(eval(r#"regex("HELLO", "^hello$")"#).as_bool().unwrap());
        assert!(!eval(r#"regex("HELLO", "^hello$", "")"#).as_bool().unwrap());
        assert!(!eval(r#"regex("x", "(", "i")"#).as_bool().unwrap());
        assert!(eval(r#"isNaN("abc")"#).as_bool().unwrap());
        assert!(!eval(r#"isNaN("12", false)"#).as_bool().unwrap());
        assert_eq!(eval(r#"log("debug", 5)"#).as_int().unwrap(), 5);
    }

    #[test]
    fn numbers_or_false() {
        assert_eq!(eval(r#"float("2.5 kg")"#).as_float().unwrap(), 2.5);
        assert_eq!(eval(r#"int("42px")"#).as_int().unwrap(), 42);
        assert!(!eval(r#"int("none")"#).as_bool().unwrap());
        assert!(eval(r#"int("42px") > 40"#).as_bool().unwrap());
    }

    #[test]
    fn string_helpers() {
        assert_eq!(eval(r#"norm("a    b")"#).into_string().unwrap(), "a b");
        assert_eq!(eval(r#"upper(trim("  x "))"#).into_string().unwrap(), "X");
        assert_eq!(eval(r#"str(12)"#).into_string().unwrap(), "12");
        assert!(eval(r#"startsWith("/api/v1", "/api") && !endsWith("/api/v1", "v2")"#)
            .as_bool()
            .unwrap());
    }

    #[test]
    fn truthiness() {
        assert!(!is_truthy(&Dynamic::UNIT));
        assert!(!is_truthy(&Dynamic::from_int(0)));
        assert!(is_truthy(&Dynamic::from_int(3)));
        assert!(!is_truthy(&Dynamic::from_float(f64::NAN)));
        assert!(!is_truthy(&Dynamic::from("")));
        assert!(is_truthy(&Dynamic::from("x")));
    }
}
