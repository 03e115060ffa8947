use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use vexel::expr::{self, EvalError, MathError, Substitutor};
use vexel::store::{NotifyPolicy, StoreError, VectorStore};

fn store_with(entries: &[(&str, &[f64])]) -> VectorStore {
    let mut store = VectorStore::new();
    for (name, values) in entries {
        let id = store.create(name, 0).unwrap();
        store.reset_from_slice(id, values).unwrap();
    }
    store
}

#[test]
fn test_scalar_broadcast() {
    let store = store_with(&[("v", &[1.0, 2.0, 3.0])]);
    assert_eq!(expr::evaluate(&store, "v + 2").unwrap(), vec![3.0, 4.0, 5.0]);
    // Non-commutative order is preserved when the scalar is on the left
    assert_eq!(expr::evaluate(&store, "2 - v").unwrap(), vec![1.0, 0.0, -1.0]);
    assert_eq!(
        expr::evaluate(&store, "6 / (v * 2)").unwrap(),
        vec![3.0, 1.5, 1.0]
    );
}

#[test]
fn test_vector_vector_arithmetic() {
    let store = store_with(&[("a", &[1.0, 2.0, 3.0]), ("b", &[10.0, 20.0, 30.0])]);
    assert_eq!(
        expr::evaluate(&store, "a + b").unwrap(),
        vec![11.0, 22.0, 33.0]
    );
    assert_eq!(
        expr::evaluate(&store, "b - a").unwrap(),
        vec![9.0, 18.0, 27.0]
    );
}

#[test]
fn test_length_mismatch() {
    let store = store_with(&[("a", &[1.0, 2.0, 3.0]), ("c", &[1.0, 2.0])]);
    assert!(matches!(
        expr::evaluate(&store, "a + c"),
        Err(EvalError::LengthMismatch { left: 3, right: 2 })
    ));
}

#[test]
fn test_divide_by_zero() {
    let store = store_with(&[("v", &[1.0, 2.0]), ("z", &[1.0, 0.0])]);

    let err = expr::evaluate(&store, "v / 0").unwrap_err();
    assert_eq!(err, EvalError::DivideByZero);
    assert_eq!(err.error_code(), Some(("ARITH", "DIVZERO")));

    // Any zero component of a vector divisor fails too
    assert!(matches!(
        expr::evaluate(&store, "v / z"),
        Err(EvalError::DivideByZero)
    ));
    assert!(matches!(
        expr::evaluate(&store, "v % 0"),
        Err(EvalError::DivideByZero)
    ));
}

#[test]
fn test_statistics_functions() {
    let store = store_with(&[("v", &[1.0, 2.0, 3.0, 4.0])]);
    assert_eq!(expr::evaluate(&store, "mean(v)").unwrap(), vec![2.5]);
    assert_eq!(expr::evaluate(&store, "sum(v)").unwrap(), vec![10.0]);
    assert_eq!(expr::evaluate(&store, "median(v)").unwrap(), vec![2.5]);
    assert_eq!(expr::evaluate(&store, "min(v)").unwrap(), vec![1.0]);
    assert_eq!(expr::evaluate(&store, "max(v)").unwrap(), vec![4.0]);
    assert_eq!(expr::evaluate(&store, "length(v)").unwrap(), vec![4.0]);
}

#[test]
fn test_component_functions() {
    let store = store_with(&[("v", &[1.0, 4.0, 9.0])]);
    assert_eq!(
        expr::evaluate(&store, "sqrt(v)").unwrap(),
        vec![1.0, 2.0, 3.0]
    );
    assert_eq!(
        expr::evaluate(&store, "abs(0 - v)").unwrap(),
        vec![1.0, 4.0, 9.0]
    );
    assert_eq!(
        expr::evaluate(&store, "round(v / 2)").unwrap(),
        vec![1.0, 2.0, 5.0]
    );
}

#[test]
fn test_vector_functions() {
    let store = store_with(&[("v", &[3.0, 1.0, 2.0])]);
    assert_eq!(
        expr::evaluate(&store, "sort(v)").unwrap(),
        vec![1.0, 2.0, 3.0]
    );
    assert_eq!(
        expr::evaluate(&store, "norm(v)").unwrap(),
        vec![1.0, 0.0, 0.5]
    );
}

#[test]
fn test_math_error_classification() {
    let store = store_with(&[("v", &[-1.0])]);

    let err = expr::evaluate(&store, "log(v)").unwrap_err();
    assert_eq!(err, EvalError::Math(MathError::Domain));
    assert_eq!(err.error_code(), Some(("ARITH", "DOMAIN")));

    let err = expr::evaluate(&store, "exp(1000)").unwrap_err();
    assert_eq!(err, EvalError::Math(MathError::Overflow));
    assert_eq!(err.error_code(), Some(("ARITH", "OVERFLOW")));
}

#[test]
fn test_final_result_finiteness_check() {
    let store = VectorStore::new();
    // No single component function fails here; the overflow appears in a
    // plain multiplication and is caught by the final pass
    assert!(matches!(
        expr::evaluate(&store, "1e308 * 10"),
        Err(EvalError::Math(MathError::Overflow))
    ));
}

#[test]
fn test_comparisons_yield_indicator_vectors() {
    let store = store_with(&[("v", &[1.0, 2.0, 3.0])]);
    assert_eq!(
        expr::evaluate(&store, "v > 1.5").unwrap(),
        vec![0.0, 1.0, 1.0]
    );
    assert_eq!(
        expr::evaluate(&store, "v == 2").unwrap(),
        vec![0.0, 1.0, 0.0]
    );
    assert_eq!(
        expr::evaluate(&store, "v > 1 && v < 3").unwrap(),
        vec![0.0, 1.0, 0.0]
    );
}

#[test]
fn test_unknown_vector_name() {
    let store = VectorStore::new();
    assert!(matches!(
        expr::evaluate(&store, "ghost + 1"),
        Err(EvalError::Store(StoreError::NotFound { .. }))
    ));
}

struct MapSubstitutor {
    variables: HashMap<String, String>,
}

impl Substitutor for MapSubstitutor {
    fn variable(&mut self, name: &str) -> Option<String> {
        self.variables.get(name).cloned()
    }

    fn command(&mut self, script: &str) -> Option<String> {
        // Stand-in for a host interpreter: scripts named "double" yield 2
        match script {
            "double" => Some("2".to_string()),
            _ => None,
        }
    }
}

#[test]
fn test_substitution() {
    let store = store_with(&[("v", &[1.0, 2.0])]);
    let mut subst = MapSubstitutor {
        variables: HashMap::from([("offset".to_string(), "10".to_string())]),
    };

    assert_eq!(
        expr::evaluate_with(&store, "v + $offset", &mut subst).unwrap(),
        vec![11.0, 12.0]
    );
    assert_eq!(
        expr::evaluate_with(&store, "v * [double]", &mut subst).unwrap(),
        vec![2.0, 4.0]
    );
    // Substitution results re-parse as vector names too
    let mut named = MapSubstitutor {
        variables: HashMap::from([("which".to_string(), "v".to_string())]),
    };
    assert_eq!(
        expr::evaluate_with(&store, "$which + 0", &mut named).unwrap(),
        vec![1.0, 2.0]
    );

    assert!(matches!(
        expr::evaluate_with(&store, "$missing", &mut subst),
        Err(EvalError::UnknownVariable(_))
    ));
    assert!(matches!(
        expr::evaluate(&store, "$offset"),
        Err(EvalError::NoSubstitutor)
    ));
}

#[test]
fn test_quoted_and_braced_operands() {
    let store = store_with(&[("v", &[1.0, 2.0])]);
    assert_eq!(expr::evaluate(&store, "\"3.5\" + 1").unwrap(), vec![4.5]);
    assert_eq!(expr::evaluate(&store, "{v} + 1").unwrap(), vec![2.0, 3.0]);
}

#[test]
fn test_evaluate_into_notifies_target() {
    let mut store = store_with(&[("src", &[1.0, 2.0, 3.0])]);
    let dest = store.create("dest", 0).unwrap();
    store.set_policy(dest, NotifyPolicy::Always).unwrap();

    let seen: Rc<RefCell<Vec<Vec<f64>>>> = Rc::new(RefCell::new(Vec::new()));
    let cid = store.register_client(dest).unwrap();
    {
        let seen = Rc::clone(&seen);
        store
            .set_client_callback(cid, move |_, vector| {
                seen.borrow_mut().push(vector.values().to_vec())
            })
            .unwrap();
    }

    expr::evaluate_into(&mut store, dest, "src * 2 + 1").unwrap();
    assert_eq!(
        store.vector(dest).unwrap().values(),
        &[3.0, 5.0, 7.0]
    );
    assert_eq!(*seen.borrow(), vec![vec![3.0, 5.0, 7.0]]);
}

#[test]
fn test_evaluate_into_rejects_stale_target() {
    let mut store = store_with(&[("src", &[1.0])]);
    let dest = store.create("dest", 0).unwrap();
    store.destroy(dest).unwrap();

    assert!(matches!(
        expr::evaluate_into(&mut store, dest, "src"),
        Err(EvalError::Store(StoreError::NoLongerExists))
    ));
}

#[test]
fn test_qualified_names_in_expressions() {
    let mut store = VectorStore::new();
    store.set_namespace(Some("plot"));
    let id = store.create("x", 0).unwrap();
    store.reset_from_slice(id, &[5.0]).unwrap();
    store.set_namespace(None);

    assert_eq!(
        expr::evaluate(&store, "plot::x + 1").unwrap(),
        vec![6.0]
    );
}
