//! Scenario tests for wrapped methods feeding the registry.
//!
//! These tests exercise the full path: a method is wrapped through an
//! interceptor, called on a receiver, and the resulting entries and
//! observer notifications are checked.

#[cfg(test)]
mod scenario_tests {
    use std::{
        collections::BTreeMap,
        io::{Error as IoError, ErrorKind::TimedOut},
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering::SeqCst},
        },
    };

    use {
        anyhow::{Context, Result as AnyhowResult, anyhow},
        parking_lot::Mutex,
        serde::Serialize,
        serde_json::{Value, json},
        thiserror::Error,
    };

    use crate::{
        catch_error,
        config::{FailureMode, RegistrySettings},
        error::RegistryError,
        registry::{ErrorRegistry, ErrorRegistryEntry, Observer},
    };

    #[derive(Debug, Error, PartialEq)]
    enum WidgetError {
        #[error("boom")]
        Boom,
        #[error("jammed after {0} spins")]
        Jammed(u32),
    }

    #[derive(Debug, Serialize)]
    struct T {
        spins: u32,
    }

    impl T {
        fn risky_operation(&self) -> Result<u32, WidgetError> {
            Err(WidgetError::Boom)
        }

        fn scaled(&self, factor: u32) -> Result<u32, WidgetError> {
            if factor == 0 {
                return Err(WidgetError::Boom);
            }
            Ok(self.spins * factor)
        }

        fn spin(&mut self, turns: u32, limit: u32) -> Result<u32, WidgetError> {
            self.spins += turns;
            if self.spins > limit {
                return Err(WidgetError::Jammed(self.spins));
            }
            Ok(self.spins)
        }
    }

    #[derive(Serialize)]
    struct Opaque {
        grid: BTreeMap<(u8, u8), u8>,
    }

    struct Connection {
        sent: Mutex<u32>,
        limit: u32,
    }

    impl Connection {
        fn new(limit: u32) -> Self {
            Self {
                sent: Mutex::new(0),
                limit,
            }
        }

        fn send(&self, bytes: u32) -> Result<u32, WidgetError> {
            let mut sent = self.sent.lock();
            if bytes == 0 || *sent + bytes > self.limit {
                return Err(WidgetError::Jammed(*sent));
            }
            *sent += bytes;
            Ok(*sent)
        }

        fn reset(&mut self, limit: u32) -> Result<(), WidgetError> {
            self.limit = limit;
            *self.sent.lock() = 0;
            if limit == 0 {
                return Err(WidgetError::Boom);
            }
            Ok(())
        }
    }

    fn capturing_observer() -> (Observer, Arc<Mutex<Vec<Arc<ErrorRegistryEntry>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer = Observer::from_fn(move |entry| sink.lock().push(Arc::clone(entry)));
        (observer, seen)
    }

    fn counting_observer() -> (Observer, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let observer = Observer::from_fn(move |_| {
            counter.fetch_add(1, SeqCst);
        });
        (observer, calls)
    }

    #[test]
    fn test_failing_call_is_recorded_and_observed() {
        let registry = ErrorRegistry::new();
        let (observer, seen) = capturing_observer();
        registry.register_observer(observer);

        let risky = registry
            .catch_error()
            .wrap("risky_operation", T::risky_operation);
        let result = risky.call(&T { spins: 0 }, ()).unwrap();

        assert_eq!(result, None);
        let entries = registry.get_registry();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.error().message(), "boom");
        assert_eq!(entry.error().name(), "WidgetError");
        assert_eq!(entry.constructor_name(), "T");
        assert_eq!(entry.method_name(), "risky_operation");

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(Arc::ptr_eq(&seen[0], entry));
    }

    #[test]
    fn test_unregistered_observer_is_not_called() {
        let registry = ErrorRegistry::new();
        let (observer, calls) = counting_observer();
        registry.register_observer(observer.clone());
        registry.unregister_observer(&observer);

        let risky = registry
            .catch_error()
            .wrap("risky_operation", T::risky_operation);
        risky.call(&T { spins: 0 }, ()).unwrap();

        assert_eq!(calls.load(SeqCst), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_clear_after_failures_empties_registry() {
        let registry = ErrorRegistry::new();
        let risky = registry
            .catch_error()
            .wrap("risky_operation", T::risky_operation);
        let receiver = T { spins: 0 };
        risky.call(&receiver, ()).unwrap();
        risky.call(&receiver, ()).unwrap();
        assert_eq!(registry.len(), 2);

        registry.clear_registry();
        assert!(registry.get_registry().is_empty());

        risky.call(&receiver, ()).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_entry_count_matches_failures() {
        let registry = ErrorRegistry::new();
        let (observer, calls) = counting_observer();
        registry.register_observer(observer);
        let scaled = registry.catch_error().wrap("scaled", T::scaled);
        let receiver = T { spins: 2 };

        let mut failures = 0;
        for factor in [0, 1, 0, 3, 0, 0] {
            if scaled.call(&receiver, (factor,)).unwrap().is_none() {
                failures += 1;
            }
        }

        assert_eq!(failures, 4);
        assert_eq!(registry.len(), 4);
        assert_eq!(calls.load(SeqCst), 4);
    }

    #[test]
    fn test_success_passes_result_through() {
        let registry = ErrorRegistry::new();
        let (observer, calls) = counting_observer();
        registry.register_observer(observer);
        let scaled = registry.catch_error().wrap("scaled", T::scaled);

        assert_eq!(scaled.call(&T { spins: 4 }, (3,)).unwrap(), Some(12));
        assert!(registry.is_empty());
        assert_eq!(calls.load(SeqCst), 0);
    }

    #[test]
    fn test_names_fixed_at_wrap_time() {
        let registry = ErrorRegistry::new();
        let spin = registry.catch_error().wrap_mut("spin", T::spin);
        assert_eq!(spin.constructor_name(), "T");
        assert_eq!(spin.method_name(), "spin");

        let mut receiver = T { spins: 0 };
        for (turns, limit) in [(5, 1), (1, 0), (10, 2)] {
            assert_eq!(spin.call(&mut receiver, (turns, limit)).unwrap(), None);
        }

        for entry in registry.get_registry() {
            assert_eq!(entry.constructor_name(), "T");
            assert_eq!(entry.method_name(), "spin");
        }
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_macro_names_type_and_method() {
        let registry = ErrorRegistry::new();
        let interceptor = registry.catch_error();
        let risky = catch_error!(interceptor, T::risky_operation);
        let spin = catch_error!(interceptor, mut T::spin);

        let mut receiver = T { spins: 0 };
        risky.call(&receiver, ()).unwrap();
        assert_eq!(spin.call(&mut receiver, (1, 5)).unwrap(), Some(1));
        spin.call(&mut receiver, (9, 5)).unwrap();

        let names: Vec<_> = registry
            .get_registry()
            .iter()
            .map(|entry| format!("{}::{}", entry.constructor_name(), entry.method_name()))
            .collect();
        assert_eq!(names, ["T::risky_operation", "T::spin"]);
    }

    #[test]
    fn test_closure_with_explicit_names() {
        let registry = ErrorRegistry::new();
        let divide = registry.catch_error().wrap_as(
            "Calculator",
            "divide",
            |total: &u32, numerator: u32, denominator: u32| -> AnyhowResult<u32> {
                if denominator == 0 {
                    return Err(anyhow!("division by zero"));
                }
                Ok(total + numerator / denominator)
            },
        );

        assert_eq!(divide.call(&1, (10, 5)).unwrap(), Some(3));
        assert_eq!(divide.call(&1, (10, 0)).unwrap(), None);

        let entry = &registry.get_registry()[0];
        assert_eq!(entry.constructor_name(), "Calculator");
        assert_eq!(entry.method_name(), "divide");
        assert_eq!(entry.error().name(), "Error");
        assert_eq!(entry.error().message(), "division by zero");
        assert_eq!(entry.context(), &json!(1));
    }

    #[test]
    fn test_rethrow_mode_records_then_returns_entry() {
        let registry = ErrorRegistry::new();
        let (observer, seen) = capturing_observer();
        registry.register_observer(observer);

        let risky = registry
            .catch_error()
            .with_failure_mode(FailureMode::Rethrow)
            .wrap("risky_operation", T::risky_operation);
        assert_eq!(risky.failure_mode(), FailureMode::Rethrow);

        let error = risky.call(&T { spins: 0 }, ()).unwrap_err();
        let entry = error.entry().unwrap();
        assert_eq!(error.to_string(), "T::risky_operation failed: boom");
        assert_eq!(
            entry.error().downcast_ref::<WidgetError>(),
            Some(&WidgetError::Boom)
        );
        assert!(Arc::ptr_eq(entry, &registry.get_registry()[0]));
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_failure_mode_follows_settings() {
        let registry = ErrorRegistry::with_settings(RegistrySettings {
            failure_mode: FailureMode::Rethrow,
            ..RegistrySettings::default()
        });
        assert_eq!(registry.catch_error().failure_mode(), FailureMode::Rethrow);

        let scaled = registry.catch_error().wrap("scaled", T::scaled);
        assert_eq!(scaled.call(&T { spins: 1 }, (2,)).unwrap(), Some(2));
        assert!(matches!(
            scaled.call(&T { spins: 1 }, (0,)),
            Err(RegistryError::Rethrown { .. })
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_failing_observer_propagates_out_of_wrapped_call() {
        let registry = ErrorRegistry::new();
        let (after, calls) = counting_observer();
        registry.register_observer(Observer::new(|_| Err(anyhow!("pager offline"))));
        registry.register_observer(after);

        let risky = registry
            .catch_error()
            .wrap("risky_operation", T::risky_operation);
        let error = risky.call(&T { spins: 0 }, ()).unwrap_err();

        assert!(matches!(error, RegistryError::Observer { .. }));
        assert_eq!(calls.load(SeqCst), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_context_is_snapshot_at_catch_time() {
        let registry = ErrorRegistry::new();
        let spin = registry.catch_error().wrap_mut("spin", T::spin);
        let mut receiver = T { spins: 0 };

        spin.call(&mut receiver, (4, 3)).unwrap();
        receiver.spins = 100;

        let entry = &registry.get_registry()[0];
        assert_eq!(entry.context(), &json!({ "spins": 4 }));
        assert_eq!(entry.error().message(), "jammed after 4 spins");
    }

    #[test]
    fn test_unserializable_receiver_records_null_context() {
        let registry = ErrorRegistry::new();
        let lookup = registry.catch_error().wrap(
            "lookup",
            |opaque: &Opaque, x: u8, y: u8| -> AnyhowResult<u8> {
                opaque
                    .grid
                    .get(&(x, y))
                    .copied()
                    .ok_or_else(|| anyhow!("no cell at {x},{y}"))
            },
        );

        let opaque = Opaque {
            grid: BTreeMap::from([((0, 0), 1)]),
        };
        assert_eq!(lookup.call(&opaque, (0, 0)).unwrap(), Some(1));
        assert_eq!(lookup.call(&opaque, (2, 2)).unwrap(), None);

        let entry = &registry.get_registry()[0];
        assert_eq!(entry.constructor_name(), "Opaque");
        assert_eq!(entry.context(), &Value::Null);
    }

    #[test]
    fn test_entries_are_chronological() {
        let registry = ErrorRegistry::new();
        let risky = registry
            .catch_error()
            .wrap("risky_operation", T::risky_operation);
        let receiver = T { spins: 0 };
        for _ in 0..3 {
            risky.call(&receiver, ()).unwrap();
        }

        let entries = registry.get_registry();
        assert!(
            entries
                .windows(2)
                .all(|pair| pair[0].timestamp() <= pair[1].timestamp())
        );
    }

    #[test]
    fn test_log_registry_to_stderr() {
        let registry = ErrorRegistry::new();
        let risky = registry
            .catch_error()
            .wrap("risky_operation", T::risky_operation);
        risky.call(&T { spins: 0 }, ()).unwrap();

        registry.log_registry().unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_non_serializable_receiver_opaque_context() {
        let registry = ErrorRegistry::new();
        let send = registry.catch_error().wrap_opaque("send", Connection::send);
        let connection = Connection::new(8);

        assert_eq!(send.call(&connection, (5,)).unwrap(), Some(5));
        assert_eq!(send.call(&connection, (0,)).unwrap(), None);

        let entry = &registry.get_registry()[0];
        assert_eq!(entry.constructor_name(), "Connection");
        assert_eq!(entry.method_name(), "send");
        assert_eq!(entry.context(), &Value::Null);
        assert_eq!(entry.error().message(), "jammed after 5 spins");
    }

    #[test]
    fn test_non_serializable_receiver_custom_context() {
        let registry = ErrorRegistry::new();
        let send = registry.catch_error().wrap_with_context(
            "send",
            |connection: &Connection| json!({ "sent": *connection.sent.lock() }),
            Connection::send,
        );
        let connection = Connection::new(8);

        assert_eq!(send.call(&connection, (4,)).unwrap(), Some(4));
        assert_eq!(send.call(&connection, (6,)).unwrap(), None);

        let entry = &registry.get_registry()[0];
        assert_eq!(entry.constructor_name(), "Connection");
        assert_eq!(entry.context(), &json!({ "sent": 4 }));
    }

    #[test]
    fn test_non_serializable_receiver_mut_methods() {
        let registry = ErrorRegistry::new();
        let interceptor = registry.catch_error();
        let reset = interceptor.wrap_mut_with_context(
            "reset",
            |connection: &Connection| json!({ "limit": connection.limit }),
            Connection::reset,
        );
        let reset_quietly = interceptor.wrap_mut_opaque("reset", Connection::reset);
        let mut connection = Connection::new(8);

        assert_eq!(reset.call(&mut connection, (16,)).unwrap(), Some(()));
        assert_eq!(reset.call(&mut connection, (0,)).unwrap(), None);
        assert_eq!(reset_quietly.call(&mut connection, (0,)).unwrap(), None);

        let entries = registry.get_registry();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].context(), &json!({ "limit": 0 }));
        assert_eq!(entries[1].context(), &Value::Null);
        assert!(
            entries
                .iter()
                .all(|entry| entry.constructor_name() == "Connection")
        );
    }

    #[test]
    fn test_anyhow_failures_keep_concrete_error_reachable() {
        let registry = ErrorRegistry::new();
        let fetch = registry.catch_error().wrap(
            "fetch",
            |_: &T, attempt: u32| -> AnyhowResult<u32> {
                Err(IoError::new(TimedOut, "upstream timed out"))
                    .with_context(|| format!("fetch attempt {attempt} failed"))
            },
        );

        assert_eq!(fetch.call(&T { spins: 0 }, (3,)).unwrap(), None);

        let entry = &registry.get_registry()[0];
        let caught = entry.error();
        assert_eq!(caught.name(), "Error");
        assert_eq!(caught.message(), "fetch attempt 3 failed");
        assert_eq!(caught.downcast_ref::<IoError>().unwrap().kind(), TimedOut);
        assert_eq!(
            caught.chain().last().unwrap().to_string(),
            "upstream timed out"
        );
    }
}
