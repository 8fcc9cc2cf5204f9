//! Execution-scoped context: the active span and the telemetry suppression flag.
//!
//! Contexts are attached to the current thread with [`Context::attach`] and
//! detached when the returned [`ContextGuard`] is dropped. Guards may be
//! dropped out of order; the previous context is only restored once the
//! topmost guard is gone.
//!
//! ```
//! use otel_pipeline_sdk::Context;
//!
//! assert!(!Context::is_current_telemetry_suppressed());
//! {
//!     let _guard = Context::enter_telemetry_suppressed_scope();
//!     assert!(Context::is_current_telemetry_suppressed());
//! }
//! assert!(!Context::is_current_telemetry_suppressed());
//! ```
use crate::ids::SpanContext;
use crate::otel_warn;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

thread_local! {
    static CURRENT_CONTEXT: RefCell<ContextStack> = RefCell::new(ContextStack::default());
}

/// An immutable, execution-scoped set of values.
#[derive(Clone, Default, Debug)]
pub struct Context {
    span: Option<Arc<SpanContext>>,
    suppress_telemetry: bool,
}

impl Context {
    /// An empty context.
    pub fn new() -> Self {
        Context::default()
    }

    /// Snapshot of the context attached to the current thread.
    pub fn current() -> Self {
        Self::map_current(|cx| cx.clone())
    }

    /// Apply `f` to the current context without cloning it.
    pub fn map_current<T>(f: impl FnOnce(&Context) -> T) -> T {
        CURRENT_CONTEXT.with(|cx| cx.borrow().map_current_cx(f))
    }

    /// A copy of this context with `span` as the active span.
    pub fn with_span(&self, span: SpanContext) -> Self {
        Context {
            span: Some(Arc::new(span)),
            suppress_telemetry: self.suppress_telemetry,
        }
    }

    /// The active span of this context, if any.
    pub fn span(&self) -> Option<&SpanContext> {
        self.span.as_deref()
    }

    /// The active span of the current thread's context, if any.
    pub fn current_span() -> Option<SpanContext> {
        Self::map_current(|cx| cx.span().cloned())
    }

    /// Returns whether telemetry is suppressed in this context.
    #[inline]
    pub fn is_telemetry_suppressed(&self) -> bool {
        self.suppress_telemetry
    }

    /// Returns a new context with telemetry suppression enabled.
    pub fn with_telemetry_suppressed(&self) -> Self {
        Context {
            span: self.span.clone(),
            suppress_telemetry: true,
        }
    }

    /// Enters a scope in which telemetry produced on this thread is dropped.
    ///
    /// The batch worker and every transport send run inside such a scope so
    /// that telemetry emitted by the network stack never feeds back into the
    /// queue it is draining.
    pub fn enter_telemetry_suppressed_scope() -> ContextGuard {
        Self::map_current(|cx| cx.with_telemetry_suppressed()).attach()
    }

    /// Returns whether telemetry is suppressed in the current context.
    #[inline]
    pub fn is_current_telemetry_suppressed() -> bool {
        Self::map_current(|cx| cx.is_telemetry_suppressed())
    }

    /// Replaces the current context on this thread with this context.
    ///
    /// Dropping the returned [`ContextGuard`] restores the previous context.
    pub fn attach(self) -> ContextGuard {
        let cx_pos = CURRENT_CONTEXT.with(|cx| cx.borrow_mut().push(self));

        ContextGuard {
            cx_pos,
            _marker: PhantomData,
        }
    }
}

/// Resets the current context to the prior one when dropped.
#[derive(Debug)]
pub struct ContextGuard {
    cx_pos: u16,
    // Thread-local position: the guard must not move threads.
    _marker: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let id = self.cx_pos;
        if id > ContextStack::BASE_POS && id < ContextStack::MAX_POS {
            CURRENT_CONTEXT.with(|context_stack| context_stack.borrow_mut().pop_id(id));
        }
    }
}

/// The contexts attached to one thread. `current_cx` is the top of the stack.
struct ContextStack {
    current_cx: Context,
    stack: Vec<Option<Context>>,
    _marker: PhantomData<*const ()>,
}

impl ContextStack {
    const BASE_POS: u16 = 0;
    const MAX_POS: u16 = u16::MAX;
    const INITIAL_CAPACITY: usize = 8;

    #[inline(always)]
    fn push(&mut self, cx: Context) -> u16 {
        let next_id = self.stack.len() + 1;
        if next_id < ContextStack::MAX_POS.into() {
            let current_cx = std::mem::replace(&mut self.current_cx, cx);
            self.stack.push(Some(current_cx));
            next_id as u16
        } else {
            otel_warn!(
                name: "Context.AttachFailed",
                message = format!("Too many contexts. Max limit is {}. Context::current() remains unchanged.", ContextStack::MAX_POS)
            );
            ContextStack::MAX_POS
        }
    }

    #[inline(always)]
    fn pop_id(&mut self, pos: u16) {
        let len: u16 = self.stack.len() as u16;
        if pos == len {
            // Clear out entries left behind by earlier out of order drops.
            while let Some(None) = self.stack.last() {
                _ = self.stack.pop();
            }
            if let Some(Some(next_cx)) = self.stack.pop() {
                self.current_cx = next_cx;
            }
        } else if pos < len {
            _ = self.stack[pos as usize].take();
        } else {
            otel_warn!(
                name: "Context.PopOutOfBounds",
                position = pos,
                stack_length = len
            );
        }
    }

    #[inline(always)]
    fn map_current_cx<T>(&self, f: impl FnOnce(&Context) -> T) -> T {
        f(&self.current_cx)
    }
}

impl Default for ContextStack {
    fn default() -> Self {
        ContextStack {
            current_cx: Context::default(),
            stack: Vec::with_capacity(ContextStack::INITIAL_CAPACITY),
            _marker: PhantomData,
        }
    }
}
