//! Handler fan-out for load results.
//!
//! Handlers are grouped by [`HandlerKind`]. [`Handlers::dispatch`] runs a
//! single-consumer work queue: each event goes to every handler of its kind
//! in registration order, and events a handler pushes onto [`Pending`] are
//! delivered, in push order, before `dispatch` returns. A handler that keeps
//! re-queueing events keeps `dispatch` running.

use std::collections::VecDeque;
use std::fmt;

use thiserror::Error;
use tracing::{debug, error};

/// Which handler list an event is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Success,
    Error,
    Broken,
}

/// An event that can be routed to a handler list.
pub trait Event {
    fn kind(&self) -> HandlerKind;
}

/// Failure reported by a single handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// Follow-up events queued by a handler during dispatch.
#[derive(Debug)]
pub struct Pending<E> {
    queue: VecDeque<E>,
}

impl<E> Pending<E> {
    fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Queue `event` for delivery within the current dispatch.
    pub fn push(&mut self, event: E) {
        self.queue.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

type Handler<E> = Box<dyn FnMut(&E, &mut Pending<E>) -> Result<(), HandlerError>>;

/// Outcome of one [`Handlers::dispatch`] call.
#[derive(Debug)]
pub struct DispatchReport<E> {
    /// Every event processed, in delivery order.
    pub events: Vec<E>,
    /// Handler calls that returned `Ok`.
    pub delivered: usize,
    /// Handler calls that returned `Err`.
    pub failed: usize,
}

impl<E> DispatchReport<E> {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Success, error and broken handler lists.
pub struct Handlers<E> {
    success: Vec<Handler<E>>,
    error: Vec<Handler<E>>,
    broken: Vec<Handler<E>>,
}

impl<E> Default for Handlers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Handlers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("success", &self.success.len())
            .field("error", &self.error.len())
            .field("broken", &self.broken.len())
            .finish()
    }
}

impl<E> Handlers<E> {
    pub fn new() -> Self {
        Self {
            success: Vec::new(),
            error: Vec::new(),
            broken: Vec::new(),
        }
    }

    /// Register a handler for `kind`.
    pub fn on<F>(&mut self, kind: HandlerKind, handler: F) -> &mut Self
    where
        F: FnMut(&E, &mut Pending<E>) -> Result<(), HandlerError> + 'static,
    {
        self.list_mut(kind).push(Box::new(handler));
        self
    }

    pub fn on_success<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&E, &mut Pending<E>) -> Result<(), HandlerError> + 'static,
    {
        self.on(HandlerKind::Success, handler)
    }

    pub fn on_error<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&E, &mut Pending<E>) -> Result<(), HandlerError> + 'static,
    {
        self.on(HandlerKind::Error, handler)
    }

    pub fn on_broken<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&E, &mut Pending<E>) -> Result<(), HandlerError> + 'static,
    {
        self.on(HandlerKind::Broken, handler)
    }

    /// Number of handlers registered for `kind`.
    pub fn count(&self, kind: HandlerKind) -> usize {
        match kind {
            HandlerKind::Success => self.success.len(),
            HandlerKind::Error => self.error.len(),
            HandlerKind::Broken => self.broken.len(),
        }
    }

    fn list_mut(&mut self, kind: HandlerKind) -> &mut Vec<Handler<E>> {
        match kind {
            HandlerKind::Success => &mut self.success,
            HandlerKind::Error => &mut self.error,
            HandlerKind::Broken => &mut self.broken,
        }
    }
}

impl<E: Event> Handlers<E> {
    /// Deliver `event` and everything handlers queue in response.
    ///
    /// Failed handlers are logged and counted; they never stop delivery to
    /// the remaining handlers.
    pub fn dispatch(&mut self, event: E) -> DispatchReport<E> {
        let mut queue = VecDeque::from([event]);
        let mut report = DispatchReport {
            events: Vec::new(),
            delivered: 0,
            failed: 0,
        };

        while let Some(event) = queue.pop_front() {
            let kind = event.kind();
            let mut pending = Pending::new();
            for (position, handler) in self.list_mut(kind).iter_mut().enumerate() {
                match handler(&event, &mut pending) {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        error!(?kind, position, error = %e, "handler failed");
                        report.failed += 1;
                    }
                }
            }
            queue.extend(pending.queue);
            report.events.push(event);
        }

        debug!(
            events = report.events.len(),
            delivered = report.delivered,
            failed = report.failed,
            "dispatch finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tracing_test::traced_test;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Signal {
        Ok(u32),
        Err(u32),
        Broken,
    }

    impl Event for Signal {
        fn kind(&self) -> HandlerKind {
            match self {
                Signal::Ok(_) => HandlerKind::Success,
                Signal::Err(_) => HandlerKind::Error,
                Signal::Broken => HandlerKind::Broken,
            }
        }
    }

    #[test]
    fn test_routes_by_kind() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut handlers = Handlers::new();
        for label in ["success", "error", "broken"] {
            let seen = Rc::clone(&seen);
            let kind = match label {
                "success" => HandlerKind::Success,
                "error" => HandlerKind::Error,
                _ => HandlerKind::Broken,
            };
            handlers.on(kind, move |_: &Signal, _| {
                seen.borrow_mut().push(label);
                Ok(())
            });
        }

        handlers.dispatch(Signal::Err(1));
        handlers.dispatch(Signal::Broken);
        handlers.dispatch(Signal::Ok(1));
        assert_eq!(*seen.borrow(), vec!["error", "broken", "success"]);
    }

    #[test]
    #[traced_test]
    fn test_failing_handler_does_not_block_others() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut handlers = Handlers::new();

        let first = Rc::clone(&calls);
        handlers.on_success(move |_: &Signal, _| {
            first.borrow_mut().push(1);
            Err("first handler exploded".into())
        });
        let second = Rc::clone(&calls);
        handlers.on_success(move |_: &Signal, _| {
            second.borrow_mut().push(2);
            Ok(())
        });

        let report = handlers.dispatch(Signal::Ok(7));
        assert_eq!(*calls.borrow(), vec![1, 2]);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
        assert!(!report.is_clean());
        assert!(logs_contain("handler failed"));
        assert!(logs_contain("first handler exploded"));
    }

    #[test]
    fn test_appends_during_drain_are_delivered() {
        let mut handlers = Handlers::new();
        handlers.on_success(|event: &Signal, pending| {
            if let Signal::Ok(n) = event {
                if *n < 3 {
                    pending.push(Signal::Ok(n + 1));
                } else {
                    pending.push(Signal::Broken);
                }
            }
            Ok(())
        });
        handlers.on_broken(|_: &Signal, _| Ok(()));

        let report = handlers.dispatch(Signal::Ok(1));
        assert_eq!(
            report.events,
            vec![Signal::Ok(1), Signal::Ok(2), Signal::Ok(3), Signal::Broken]
        );
        assert_eq!(report.delivered, 4);
    }

    #[test]
    fn test_queue_is_fifo() {
        let mut handlers = Handlers::new();
        handlers.on_success(|event: &Signal, pending| {
            if *event == Signal::Ok(0) {
                pending.push(Signal::Err(1));
                pending.push(Signal::Err(2));
            }
            Ok(())
        });
        handlers.on_error(|event: &Signal, pending| {
            if *event == Signal::Err(1) {
                pending.push(Signal::Err(3));
            }
            Ok(())
        });

        let report = handlers.dispatch(Signal::Ok(0));
        assert_eq!(
            report.events,
            vec![Signal::Ok(0), Signal::Err(1), Signal::Err(2), Signal::Err(3)]
        );
    }

    #[test]
    fn test_no_handlers() {
        let mut handlers: Handlers<Signal> = Handlers::default();
        let report = handlers.dispatch(Signal::Broken);
        assert_eq!(report.delivered, 0);
        assert_eq!(report.events, vec![Signal::Broken]);
        assert_eq!(handlers.count(HandlerKind::Broken), 0);
    }
}
