//! SPI hook bundle (§9 "Dynamic decisions / subclass overrides", §12
//! "Named SPI hook bundle as a first-class value").
//!
//! The original exposes many overridable `spi*` methods; this port
//! replaces inheritance with a value of callable fields, the way
//! `tower-resilience-retry`'s `on_retry`/`on_success`/`on_budget_exhausted`
//! builder callbacks work. Defaults are all no-ops.

use std::marker::PhantomData;
use std::sync::Arc;

type Hook<Req> = Arc<dyn Fn(&Arc<Req>) + Send + Sync>;

/// A bundle of "after X happened" callbacks, composed rather than
/// overridden by subclassing.
pub struct SchedulerHooks<Req, Resp, E> {
    pub(crate) after_request_added: Hook<Req>,
    pub(crate) after_request_removed: Hook<Req>,
    pub(crate) after_request_success: Arc<dyn Fn(&Arc<Req>, &Resp) + Send + Sync>,
    pub(crate) after_request_attempt_failed: Arc<dyn Fn(&Arc<Req>, usize, &E) + Send + Sync>,
    pub(crate) after_request_final_failure: Hook<Req>,
    pub(crate) after_request_final_timeout: Arc<dyn Fn(&Arc<Req>, i64) + Send + Sync>,
    pub(crate) after_request_cancelled: Hook<Req>,
    _marker: PhantomData<(Resp, E)>,
}

impl<Req, Resp, E> Clone for SchedulerHooks<Req, Resp, E> {
    fn clone(&self) -> Self {
        Self {
            after_request_added: Arc::clone(&self.after_request_added),
            after_request_removed: Arc::clone(&self.after_request_removed),
            after_request_success: Arc::clone(&self.after_request_success),
            after_request_attempt_failed: Arc::clone(&self.after_request_attempt_failed),
            after_request_final_failure: Arc::clone(&self.after_request_final_failure),
            after_request_final_timeout: Arc::clone(&self.after_request_final_timeout),
            after_request_cancelled: Arc::clone(&self.after_request_cancelled),
            _marker: PhantomData,
        }
    }
}

impl<Req, Resp, E> Default for SchedulerHooks<Req, Resp, E> {
    fn default() -> Self {
        Self {
            after_request_added: Arc::new(|_| {}),
            after_request_removed: Arc::new(|_| {}),
            after_request_success: Arc::new(|_, _| {}),
            after_request_attempt_failed: Arc::new(|_, _, _| {}),
            after_request_final_failure: Arc::new(|_| {}),
            after_request_final_timeout: Arc::new(|_, _| {}),
            after_request_cancelled: Arc::new(|_| {}),
            _marker: PhantomData,
        }
    }
}

impl<Req, Resp, E> SchedulerHooks<Req, Resp, E> {
    pub fn builder() -> SchedulerHooksBuilder<Req, Resp, E> {
        SchedulerHooksBuilder::new()
    }
}

/// Builder for [`SchedulerHooks`].
pub struct SchedulerHooksBuilder<Req, Resp, E> {
    hooks: SchedulerHooks<Req, Resp, E>,
}

impl<Req, Resp, E> Default for SchedulerHooksBuilder<Req, Resp, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Resp, E> SchedulerHooksBuilder<Req, Resp, E> {
    pub fn new() -> Self {
        Self {
            hooks: SchedulerHooks::default(),
        }
    }

    pub fn after_request_added<F>(mut self, f: F) -> Self
    where
        F: Fn(&Arc<Req>) + Send + Sync + 'static,
    {
        self.hooks.after_request_added = Arc::new(f);
        self
    }

    pub fn after_request_removed<F>(mut self, f: F) -> Self
    where
        F: Fn(&Arc<Req>) + Send + Sync + 'static,
    {
        self.hooks.after_request_removed = Arc::new(f);
        self
    }

    pub fn after_request_success<F>(mut self, f: F) -> Self
    where
        F: Fn(&Arc<Req>, &Resp) + Send + Sync + 'static,
    {
        self.hooks.after_request_success = Arc::new(f);
        self
    }

    pub fn after_request_attempt_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(&Arc<Req>, usize, &E) + Send + Sync + 'static,
    {
        self.hooks.after_request_attempt_failed = Arc::new(f);
        self
    }

    pub fn after_request_final_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(&Arc<Req>) + Send + Sync + 'static,
    {
        self.hooks.after_request_final_failure = Arc::new(f);
        self
    }

    pub fn after_request_final_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn(&Arc<Req>, i64) + Send + Sync + 'static,
    {
        self.hooks.after_request_final_timeout = Arc::new(f);
        self
    }

    pub fn after_request_cancelled<F>(mut self, f: F) -> Self
    where
        F: Fn(&Arc<Req>) + Send + Sync + 'static,
    {
        self.hooks.after_request_cancelled = Arc::new(f);
        self
    }

    pub fn build(self) -> SchedulerHooks<Req, Resp, E> {
        self.hooks
    }
}

/// Calls a hook, catching a panic the way `errorSpiMethodException` does
/// for the original's SPI methods. Returns `false` if the hook panicked.
pub(crate) fn call_guarded<F>(f: F) -> bool
where
    F: FnOnce() + std::panic::UnwindSafe,
{
    std::panic::catch_unwind(f).is_ok()
}
