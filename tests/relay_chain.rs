//! Integration tests for relay chains.

use function_chain::{ChainError, Func, Receiver, RelayChain, RelayFn, Result, Step, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Wraps its argument in a marker.
struct Decorator {
    mark: &'static str,
}

impl Receiver for Decorator {
    fn type_name(&self) -> &str {
        "Decorator"
    }

    fn invoke(&self, name: &str, args: &[Value], _block: Option<&Func>) -> Result<Value> {
        let text = args.first().map(Value::to_string).unwrap_or_default();
        match name {
            "decorate1" => Ok(Value::from(format!("{m}1{text}1{m}", m = self.mark))),
            "decorate2" => Ok(Value::from(format!("{m}2{text}2{m}", m = self.mark))),
            "split_pair" => Ok(Value::Tuple(vec![Value::from(text.clone()), Value::from(text)])),
            "join_pair" => Ok(Value::from(
                args.iter().map(Value::to_string).collect::<Vec<_>>().join("+"),
            )),
            _ => Err(ChainError::operation_not_found("Decorator", name)),
        }
    }
}

fn decorator(mark: &'static str) -> Value {
    Value::object(Decorator { mark })
}

// --- Scenarios ---

#[test]
fn test_decorate_in_order() {
    let decorator = decorator("*");
    let mut chain = RelayChain::with_receiver(decorator.clone())
        >> Step::name("decorate1")
        >> Step::name("decorate2");

    let once = decorator.invoke("decorate1", &[Value::from("x")], None).unwrap();
    let twice = decorator.invoke("decorate2", &[once], None).unwrap();
    assert_eq!(chain.call([Value::from("x")]).unwrap(), twice);
    assert_eq!(twice, Value::from("*2*1x1*2*"));
}

#[test]
fn test_string_steps_reach_registered_receivers() {
    let mut chain = RelayChain::with_receiver(decorator("*"));
    chain.add_receiver("angle", decorator("<")).add_receiver("round", decorator("("));
    chain.add("decorate1/angle.decorate1/round.decorate2").unwrap();
    assert_eq!(chain.call([Value::from("x")]).unwrap(), Value::from("(2<1*1x1*1<2("));
    assert_eq!(
        chain.to_string(),
        "RelayChain[\"decorate1\", \"angle.decorate1\", \"round.decorate2\"]"
    );
}

#[test]
fn test_delete_last_of_three() {
    let mut chain = RelayChain::with_steps(decorator("-"), ["decorate1/decorate1/decorate2"]).unwrap();
    chain.delete_at(2).unwrap();
    assert_eq!(chain.call([Value::from("x")]).unwrap(), Value::from("-1-1x1-1-"));
}

#[test]
fn test_clear_returns_nil_without_transforming() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&calls);
    let mut chain = RelayChain::new();
    chain
        .add(Step::func(move |args| {
            log.borrow_mut().push(args.to_vec());
            Ok(Value::Nil)
        }))
        .unwrap();
    chain.clear();
    assert_eq!(chain.call([Value::from("x")]).unwrap(), Value::Nil);
    assert!(calls.borrow().is_empty());
}

// --- Continuations ---

#[test]
fn test_connector_continues_with_new_arguments() {
    let mut chain = RelayChain::with_receiver(decorator("*"));
    chain
        .add(Step::relay(|chain, args| {
            let upper = args[0].invoke("upcase", &[], None)?;
            chain.call([upper])
        }))
        .unwrap()
        .add(Step::name("decorate1"))
        .unwrap();
    assert_eq!(chain.call([Value::from("x")]).unwrap(), Value::from("*1X1*"));
}

#[test]
fn test_stopper_short_circuits() {
    let stopper = RelayFn::new(|chain, args| {
        let text = args.first().cloned().unwrap_or_default();
        if text.as_str().is_some_and(|t| t.len() > 4) {
            Ok(text)
        } else {
            chain.call(args)
        }
    });

    let mut chain = RelayChain::with_receiver(decorator("#"));
    for _ in 0..3 {
        chain.add(stopper.clone()).unwrap().add("decorate1").unwrap();
    }
    assert_eq!(chain.call([Value::from("x")]).unwrap(), Value::from("#1x1#"));
    assert_eq!(chain.call([Value::from("longer")]).unwrap(), Value::from("longer"));
}

#[test]
fn test_continuation_sees_arguments_of_previous_step() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let mut chain = RelayChain::with_receiver(decorator("*"));
    chain.add("split_pair").unwrap();
    chain
        .add(Step::relay(move |chain, args| {
            log.borrow_mut().extend(args.iter().cloned());
            chain.call(args)
        }))
        .unwrap();
    chain.add("join_pair").unwrap();

    assert_eq!(chain.call([Value::from("ab")]).unwrap(), Value::from("ab+ab"));
    assert_eq!(*seen.borrow(), vec![Value::from("ab"), Value::from("ab")]);
}

// --- Mixed Steps ---

#[test]
fn test_bound_callables_and_targets_mix() {
    let shout = Func::new(|args| args[0].invoke("upcase", &[], None));
    let mut chain = RelayChain::new();
    chain
        .add_all([
            Step::from(shout),
            Step::target(decorator("!"), "decorate2"),
            Step::func(|args| args[0].invoke("length", &[], None)),
        ])
        .unwrap();
    assert_eq!(chain.call([Value::from("abc")]).unwrap(), Value::Int(7));
}

#[test]
fn test_receiver_table() {
    let mut chain = RelayChain::new();
    chain.add_receiver_table([("a", decorator("a")), ("b", decorator("b"))]);
    chain.add("a.decorate1/b.decorate1").unwrap();
    assert_eq!(chain.call([Value::from("")]).unwrap(), Value::from("b1a11a1b"));
}

#[test]
fn test_multiple_initial_arguments() {
    let mut chain = RelayChain::with_receiver(decorator("*"));
    chain.add("join_pair/decorate1").unwrap();
    assert_eq!(
        chain.call([Value::from("a"), Value::from("b"), Value::from("c")]).unwrap(),
        Value::from("*1a+b+c1*")
    );
}

#[test]
fn test_common_receiver_missing_operation() {
    let mut chain = RelayChain::new();
    chain.add("decorate1").unwrap();
    assert_eq!(
        chain.call([Value::from("x")]).unwrap_err(),
        ChainError::operation_not_found("nil", "decorate1")
    );
}
