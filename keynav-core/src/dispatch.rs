//! Key dispatch: fire every action bound to a key
//!
//! # Example
//!
//! ```
//! use keynav_core::prelude::*;
//! use keynav_core::testing::{RecordingLauncher, RecordingReporter};
//!
//! let executor = Executor::new(
//!     RecordingLauncher::new(),
//!     RecordingReporter::new(),
//!     ScriptConfig::default(),
//! );
//! let mut dispatcher = Dispatcher::new(Store::new(MemorySettings::new()), executor);
//!
//! dispatcher
//!     .store_mut()
//!     .add(Action::new_web("docs", vec!["docs.rs".into()]).bound_to(["d"]));
//!
//! let result = dispatcher.on_key("D");
//! assert!(result.changed());
//! assert_eq!(dispatcher.executor().launcher().opened(), ["http://docs.rs/"]);
//! ```

use crate::action::{Action, ActionId};
use crate::executor::{ErrorReporter, Executor, Launcher};
use crate::keys::normalize_key_name;
use crate::settings::SettingsStore;
use crate::store::Store;

/// What happened when a key was dispatched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchResult {
    /// Every action that fired, in list order
    pub matched: Vec<ActionId>,
    /// The subset of `matched` whose execution reported failure
    pub failed: Vec<ActionId>,
}

impl DispatchResult {
    /// Whether anything fired (and counters changed)
    pub fn changed(&self) -> bool {
        !self.matched.is_empty()
    }

    /// Whether every fired action succeeded
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Hooks around every fired action
///
/// Implement this trait to add logging, auditing, or similar cross-cutting
/// concerns to dispatch.
pub trait Middleware {
    /// Called before the action executes
    fn before(&mut self, action: &Action, key: &str);

    /// Called after the action executed and its counter was incremented
    fn after(&mut self, action: &Action, key: &str, succeeded: bool);
}

/// A no-op middleware that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMiddleware;

impl Middleware for NoopMiddleware {
    fn before(&mut self, _action: &Action, _key: &str) {}
    fn after(&mut self, _action: &Action, _key: &str, _succeeded: bool) {}
}

/// Middleware that logs fired actions
#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware {
    /// Whether to log before execution
    pub log_before: bool,
    /// Whether to log after execution
    pub log_after: bool,
}

impl LoggingMiddleware {
    /// Log after execution only
    pub fn new() -> Self {
        Self {
            log_before: false,
            log_after: true,
        }
    }

    /// Log both before and after execution
    pub fn verbose() -> Self {
        Self {
            log_before: true,
            log_after: true,
        }
    }
}

impl Middleware for LoggingMiddleware {
    fn before(&mut self, action: &Action, key: &str) {
        if self.log_before {
            tracing::debug!(action = %action.name(), id = %action.id(), key, "Executing action");
        }
    }

    fn after(&mut self, action: &Action, key: &str, succeeded: bool) {
        if self.log_after {
            tracing::debug!(
                action = %action.name(),
                id = %action.id(),
                key,
                succeeded,
                total = action.total_activations(),
                "Action executed"
            );
        }
    }
}

/// Compose multiple middleware into a single middleware
#[derive(Default)]
pub struct ComposedMiddleware {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl std::fmt::Debug for ComposedMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposedMiddleware")
            .field("middlewares_count", &self.middlewares.len())
            .finish()
    }
}

impl ComposedMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a middleware to the composition
    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Box::new(middleware));
    }
}

impl Middleware for ComposedMiddleware {
    fn before(&mut self, action: &Action, key: &str) {
        for middleware in &mut self.middlewares {
            middleware.before(action, key);
        }
    }

    fn after(&mut self, action: &Action, key: &str, succeeded: bool) {
        // Reverse order for proper nesting
        for middleware in self.middlewares.iter_mut().rev() {
            middleware.after(action, key, succeeded);
        }
    }
}

/// Routes key presses to the actions bound to them
pub struct Dispatcher<S, L, R, M = NoopMiddleware>
where
    S: SettingsStore,
    L: Launcher,
    R: ErrorReporter,
    M: Middleware,
{
    store: Store<S>,
    executor: Executor<L, R>,
    middleware: M,
}

impl<S, L, R> Dispatcher<S, L, R>
where
    S: SettingsStore,
    L: Launcher,
    R: ErrorReporter,
{
    pub fn new(store: Store<S>, executor: Executor<L, R>) -> Self {
        Self::with_middleware(store, executor, NoopMiddleware)
    }
}

impl<S, L, R, M> Dispatcher<S, L, R, M>
where
    S: SettingsStore,
    L: Launcher,
    R: ErrorReporter,
    M: Middleware,
{
    pub fn with_middleware(store: Store<S>, executor: Executor<L, R>, middleware: M) -> Self {
        Self {
            store,
            executor,
            middleware,
        }
    }

    /// Fire every loaded action bound to `key`
    ///
    /// The key is matched case-insensitively. Matching actions run in list
    /// order; a failing action does not stop the others. Each fired action's
    /// counter for the key is incremented, and if anything fired the stored
    /// list is saved again so counters (and fixed-up URLs) persist.
    pub fn on_key(&mut self, key: &str) -> DispatchResult {
        let key = normalize_key_name(key);
        self.store.load();

        let mut result = DispatchResult::default();
        for action in self.store.actions_mut() {
            let Some(index) = action.key_index(&key) else {
                continue;
            };

            self.middleware.before(action, &key);
            let succeeded = action.execute(&mut self.executor);
            action.record_activation(index);
            self.middleware.after(action, &key, succeeded);

            result.matched.push(action.id());
            if !succeeded {
                result.failed.push(action.id());
            }
        }

        if result.changed() {
            tracing::debug!(
                key = %key,
                matched = result.matched.len(),
                failed = result.failed.len(),
                "Key dispatched"
            );
            self.store.save_loaded();
        } else {
            tracing::trace!(key = %key, "No action bound to key");
        }
        result
    }

    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store<S> {
        &mut self.store
    }

    pub fn executor(&self) -> &Executor<L, R> {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut Executor<L, R> {
        &mut self.executor
    }

    pub fn middleware(&self) -> &M {
        &self.middleware
    }

    pub fn middleware_mut(&mut self) -> &mut M {
        &mut self.middleware
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionKind;
    use crate::codec;
    use crate::config::ScriptConfig;
    use crate::settings::{MemorySettings, INTERNAL_ACTIONS_KEY};
    use crate::testing::{RecordingLauncher, RecordingReporter};

    #[derive(Default)]
    struct CountingMiddleware {
        before_count: usize,
        after_count: usize,
        failures: usize,
    }

    impl Middleware for CountingMiddleware {
        fn before(&mut self, _action: &Action, _key: &str) {
            self.before_count += 1;
        }

        fn after(&mut self, _action: &Action, _key: &str, succeeded: bool) {
            self.after_count += 1;
            if !succeeded {
                self.failures += 1;
            }
        }
    }

    fn dispatcher_with<M: Middleware>(
        actions: &[Action],
        middleware: M,
    ) -> Dispatcher<MemorySettings, RecordingLauncher, RecordingReporter, M> {
        let settings = MemorySettings::with_value(INTERNAL_ACTIONS_KEY, codec::encode_list(actions));
        let executor = Executor::new(
            RecordingLauncher::new(),
            RecordingReporter::new(),
            ScriptConfig::default(),
        );
        Dispatcher::with_middleware(Store::new(settings), executor, middleware)
    }

    #[test]
    fn test_fan_out_is_case_insensitive() {
        let a = Action::new_default("a", vec!["app-a".into()]).bound_to(["a", "b"]);
        let b = Action::new_default("b", vec!["app-b".into()]).bound_to(["b"]);
        let mut dispatcher = dispatcher_with(&[a.clone(), b.clone()], NoopMiddleware);

        let result = dispatcher.on_key("B");
        assert_eq!(result.matched, [a.id(), b.id()]);
        assert!(result.all_succeeded());

        let store = dispatcher.store();
        assert_eq!(store.find(a.id()).unwrap().activation_counts(), [0, 1]);
        assert_eq!(store.find(b.id()).unwrap().activation_counts(), [1]);
    }

    #[test]
    fn test_counters_persist() {
        let a = Action::new_default("a", vec![]).bound_to(["x"]);
        let mut dispatcher = dispatcher_with(&[a.clone()], NoopMiddleware);
        dispatcher.on_key("x");
        dispatcher.on_key("x");

        let mut fresh = Store::new(dispatcher.store().settings().clone());
        let stored = fresh.load()[0].clone().unwrap();
        assert_eq!(stored.activation_counts(), [2]);
    }

    #[test]
    fn test_failure_does_not_short_circuit() {
        let broken = Action::new_default("broken", vec!["missing".into()]).bound_to(["k"]);
        let fine = Action::new_web("fine", vec!["example.com".into()]).bound_to(["k"]);
        let mut dispatcher = dispatcher_with(&[broken.clone(), fine.clone()], CountingMiddleware::default());
        dispatcher.executor_mut().launcher_mut().fail_on("missing");

        let result = dispatcher.on_key("k");
        assert_eq!(result.matched, [broken.id(), fine.id()]);
        assert_eq!(result.failed, [broken.id()]);
        assert_eq!(dispatcher.executor().launcher().opened(), ["http://example.com/"]);
        assert_eq!(dispatcher.executor().reporter().errors().len(), 1);

        // failed actions still count
        assert_eq!(
            dispatcher.store().find(broken.id()).unwrap().activation_counts(),
            [1]
        );
        let mw = dispatcher.middleware();
        assert_eq!((mw.before_count, mw.after_count, mw.failures), (2, 2, 1));
    }

    #[test]
    fn test_unbound_key_changes_nothing() {
        let a = Action::new(ActionKind::Cmd, "a").bound_to(["a"]);
        let mut dispatcher = dispatcher_with(&[a], NoopMiddleware);
        let saves = dispatcher.store().settings().save_count();

        let result = dispatcher.on_key("z");
        assert!(!result.changed());
        assert_eq!(dispatcher.store().settings().save_count(), saves);
    }

    #[test]
    fn test_web_fix_is_persisted() {
        let web = Action::new_web("w", vec!["example.com".into()]).bound_to(["w"]);
        let mut dispatcher = dispatcher_with(&[web], NoopMiddleware);
        dispatcher.on_key("w");

        let mut fresh = Store::new(dispatcher.store().settings().clone());
        let stored = fresh.load()[0].clone().unwrap();
        assert_eq!(
            stored.payload(),
            &crate::action::Payload::Web {
                websites: vec!["http://example.com".into()]
            }
        );
    }

    #[test]
    fn test_keypress_keeps_undecodable_tokens() {
        let a = Action::new_default("a", vec![]).bound_to(["x"]);
        let raw = format!("{}|9bogus", codec::encode_one(&a));
        let settings = MemorySettings::with_value(INTERNAL_ACTIONS_KEY, raw);
        let executor = Executor::new(
            RecordingLauncher::new(),
            RecordingReporter::new(),
            ScriptConfig::default(),
        );
        let mut dispatcher = Dispatcher::new(Store::new(settings), executor);

        assert_eq!(dispatcher.on_key("x").matched, [a.id()]);
        let stored = dispatcher.store().raw();
        assert_eq!(codec::fragment_count(&stored), 2);
        assert_eq!(codec::fragments(&stored).nth(1), Some("9bogus"));

        let mut fresh = Store::new(dispatcher.store().settings().clone());
        let counted = fresh.load()[0].clone().unwrap();
        assert_eq!(counted.activation_counts(), [1]);
    }

    #[test]
    fn test_embedded_actions_fire_but_are_not_stored() {
        let own = Action::new_default("own", vec!["own-app".into()]).bound_to(["e"]);
        let policy = Action::new_default("policy", vec!["policy-app".into()]).bound_to(["e"]);
        let mut dispatcher = dispatcher_with(&[own.clone()], NoopMiddleware);
        dispatcher
            .store_mut()
            .load_with_embedded(&codec::encode_one(&policy));

        let result = dispatcher.on_key("e");
        assert_eq!(result.matched, [own.id(), policy.id()]);
        assert_eq!(codec::fragment_count(&dispatcher.store().raw()), 1);
        assert_eq!(
            dispatcher.store().find(policy.id()).unwrap().activation_counts(),
            [1]
        );
    }

    #[test]
    fn test_composed_middleware() {
        let mut composed = ComposedMiddleware::new();
        composed.add(LoggingMiddleware::verbose());
        composed.add(NoopMiddleware);

        let a = Action::new(ActionKind::Web, "a").bound_to(["a"]);
        let mut dispatcher = dispatcher_with(&[a.clone()], composed);
        assert_eq!(dispatcher.on_key("a").matched, [a.id()]);
    }
}
