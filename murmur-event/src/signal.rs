use crate::connection::{CallbackId, Connection, Disconnect};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Callback<A, R> = Rc<dyn Fn(&mut A) -> R>;

struct CallbackCell<A: 'static, R: 'static> {
    id: CallbackId,
    callback: Callback<A, R>,
}

impl<A, R> Clone for CallbackCell<A, R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: self.callback.clone(),
        }
    }
}

struct Registry<A: 'static, R: 'static> {
    next_id: Cell<u64>,
    cells: RefCell<Vec<CallbackCell<A, R>>>,
}

impl<A, R> Registry<A, R> {
    fn issue_id(&self) -> CallbackId {
        let raw = self.next_id.get();
        self.next_id.set(raw + 1);
        CallbackId::new(raw)
    }
}

impl<A, R> Disconnect for Registry<A, R> {
    fn disconnect(&self, id: CallbackId) {
        let mut cells = self.cells.borrow_mut();
        if let Some(index) = cells.iter().position(|cell| cell.id == id) {
            cells.remove(index);
        }
    }
}

/// Single-threaded callback registry for one signature.
///
/// Callbacks take the publish argument by `&mut A` and may
/// return a value; a signature with several arguments uses a
/// tuple for `A`. Publishing invokes every registered callback
/// in connection order and collects the returned values in
/// that order.
///
/// Each publish iterates the callback set captured at its
/// start: disconnecting any callback mid-publish leaves the
/// running iteration intact, and a callback connected during
/// a publish is first invoked by the next publish.
///
/// Cloning yields another handle to the same registry, which
/// is how a callback reaches the handler it is registered on.
/// Use [`SignalHandler::duplicate`] for an independent registry
/// holding the same callbacks.
pub struct SignalHandler<A: 'static, R: 'static = ()> {
    registry: Rc<Registry<A, R>>,
}

impl<A, R> SignalHandler<A, R> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(Registry {
                next_id: Cell::new(0),
                cells: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Register a callback, returning its disconnection handle.
    pub fn connect<F>(&self, callback: F) -> Connection
    where
        F: Fn(&mut A) -> R + 'static,
    {
        let id = self.registry.issue_id();
        self.registry.cells.borrow_mut().push(CallbackCell {
            id,
            callback: Rc::new(callback),
        });
        let concrete = Rc::downgrade(&self.registry);
        let weak: std::rc::Weak<dyn Disconnect> = concrete;
        Connection::new(weak, id)
    }

    /// Number of registered callbacks.
    pub fn size(&self) -> usize {
        self.registry.cells.borrow().len()
    }

    /// Remove every registered callback.
    pub fn disconnect_all(&self) {
        self.registry.cells.borrow_mut().clear();
    }

    /// Invoke every callback with `args`, in connection order,
    /// collecting the results in the same order.
    pub fn publish(&self, args: &mut A) -> Vec<R> {
        let cells = self.registry.cells.borrow().clone();
        let mut results = Vec::with_capacity(cells.len());
        for cell in &cells {
            results.push((cell.callback)(args));
        }
        results
    }

    /// Publish lazily: the returned iterator invokes one
    /// callback per `next` call and yields its result. The
    /// sequence is finite and cannot be restarted.
    pub fn publish_iter<'a>(&self, args: &'a mut A) -> PublishIter<'a, A, R> {
        PublishIter {
            cells: self.registry.cells.borrow().clone().into_iter(),
            args,
        }
    }

    /// Create an independent registry holding this handler's
    /// current callbacks. Connections issued by this handler
    /// keep referring to this handler only.
    pub fn duplicate(&self) -> Self {
        Self {
            registry: Rc::new(Registry {
                next_id: Cell::new(self.registry.next_id.get()),
                cells: RefCell::new(self.registry.cells.borrow().clone()),
            }),
        }
    }
}

impl<A, R> Clone for SignalHandler<A, R> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<A, R> Default for SignalHandler<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy publish sequence, see [`SignalHandler::publish_iter`].
pub struct PublishIter<'a, A: 'static, R: 'static> {
    cells: std::vec::IntoIter<CallbackCell<A, R>>,
    args: &'a mut A,
}

impl<'a, A, R> Iterator for PublishIter<'a, A, R> {
    type Item = R;

    fn next(&mut self) -> Option<R> {
        let cell = self.cells.next()?;
        Some((cell.callback)(self.args))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.cells.size_hint()
    }
}

#[cfg(test)]
mod test {
    use crate::connection::Connection;
    use crate::signal::SignalHandler;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_starts_with_zero_size() {
        let handler: SignalHandler<()> = SignalHandler::new();
        assert_eq!(handler.size(), 0);
    }

    #[test]
    fn test_connect_increases_size() {
        let handler: SignalHandler<()> = SignalHandler::new();
        let _c1 = handler.connect(|_| {});
        assert_eq!(handler.size(), 1);
        let _c2 = handler.connect(|_| {});
        assert_eq!(handler.size(), 2);
    }

    #[test]
    fn test_disconnect_decreases_size() {
        let handler: SignalHandler<()> = SignalHandler::new();
        let mut conn = handler.connect(|_| {});
        assert_eq!(handler.size(), 1);
        conn.disconnect();
        assert_eq!(handler.size(), 0);
    }

    #[test]
    fn test_disconnect_all_clears_callbacks() {
        let handler: SignalHandler<()> = SignalHandler::new();
        let _c1 = handler.connect(|_| {});
        let _c2 = handler.connect(|_| {});
        let _c3 = handler.connect(|_| {});
        assert_eq!(handler.size(), 3);
        handler.disconnect_all();
        assert_eq!(handler.size(), 0);
    }

    #[test]
    fn test_publish_invokes_all_callbacks() {
        let handler: SignalHandler<i32> = SignalHandler::new();
        let _c1 = handler.connect(|n: &mut i32| *n += 1);
        let _c2 = handler.connect(|n: &mut i32| *n += 10);
        let _c3 = handler.connect(|n: &mut i32| *n += 100);

        let mut value = 0;
        handler.publish(&mut value);
        assert_eq!(value, 111);
    }

    #[test]
    fn test_publish_with_no_callbacks_is_safe() {
        let handler: SignalHandler<i32> = SignalHandler::new();
        handler.publish(&mut 42);
    }

    #[test]
    fn test_publish_forwards_arguments() {
        let handler: SignalHandler<(String, i32)> = SignalHandler::new();
        let captured = Rc::new(RefCell::new((String::new(), 0)));
        let moved = captured.clone();

        let _conn = handler.connect(move |args: &mut (String, i32)| {
            *moved.borrow_mut() = args.clone();
        });

        handler.publish(&mut ("hello".to_string(), 42));
        assert_eq!(*captured.borrow(), ("hello".to_string(), 42));
    }

    #[test]
    fn test_publish_collects_results_in_order() {
        let handler: SignalHandler<i32, i32> = SignalHandler::new();
        let _c1 = handler.connect(|n: &mut i32| *n * 2);
        let _c2 = handler.connect(|n: &mut i32| *n * 10);

        let results = handler.publish(&mut 5);
        assert_eq!(results, vec![10, 50]);
    }

    #[test]
    fn test_publish_with_no_callbacks_returns_empty() {
        let handler: SignalHandler<(), i32> = SignalHandler::new();
        let results = handler.publish(&mut ());
        assert!(results.is_empty());
    }

    #[test]
    fn test_publish_iter_yields_one_result_per_callback() {
        let handler: SignalHandler<i32, i32> = SignalHandler::new();
        let _c1 = handler.connect(|n: &mut i32| *n + 1);
        let _c2 = handler.connect(|n: &mut i32| *n + 2);
        let _c3 = handler.connect(|n: &mut i32| *n + 3);

        let mut args = 10;
        let results: Vec<i32> = handler.publish_iter(&mut args).collect();
        assert_eq!(results, vec![11, 12, 13]);
    }

    #[test]
    fn test_publish_iter_is_lazy() {
        let handler: SignalHandler<(), i32> = SignalHandler::new();
        let invoked = Rc::new(RefCell::new(0));
        for _ in 0..3 {
            let moved = invoked.clone();
            let _ = handler.connect(move |_| {
                *moved.borrow_mut() += 1;
                0
            });
        }

        let mut args = ();
        let mut iter = handler.publish_iter(&mut args);
        assert_eq!(iter.next(), Some(0));
        drop(iter);
        // Only the consumed element ran its callback.
        assert_eq!(*invoked.borrow(), 1);
    }

    #[test]
    fn test_duplicate_holds_same_callbacks() {
        let handler: SignalHandler<i32> = SignalHandler::new();
        let _conn = handler.connect(|n: &mut i32| *n += 1);

        let copy = handler.duplicate();
        let mut value = 0;
        copy.publish(&mut value);
        assert_eq!(value, 1);
    }

    #[test]
    fn test_duplicate_does_not_share_connections() {
        let handler: SignalHandler<i32> = SignalHandler::new();
        let mut conn = handler.connect(|n: &mut i32| *n += 1);

        let copy = handler.duplicate();
        conn.disconnect();

        // The copy keeps its callback; only the source lost one.
        let mut value = 0;
        copy.publish(&mut value);
        assert_eq!(value, 1);
        assert_eq!(handler.size(), 0);
    }

    #[test]
    fn test_disconnect_during_publish_is_safe() {
        let handler: SignalHandler<()> = SignalHandler::new();
        let calls = Rc::new(RefCell::new(0));
        let self_conn = Rc::new(RefCell::new(Connection::default()));

        let moved_calls = calls.clone();
        let moved_conn = self_conn.clone();
        *self_conn.borrow_mut() = handler.connect(move |_| {
            *moved_calls.borrow_mut() += 1;
            moved_conn.borrow_mut().disconnect();
        });

        let moved_calls = calls.clone();
        let _other = handler.connect(move |_| {
            *moved_calls.borrow_mut() += 1;
        });

        // The iteration set was captured at entry, so both run.
        handler.publish(&mut ());
        assert_eq!(*calls.borrow(), 2);

        // The self-disconnected callback is gone afterwards.
        handler.publish(&mut ());
        assert_eq!(*calls.borrow(), 3);
    }

    #[test]
    fn test_connect_during_publish_is_deferred() {
        let handler: SignalHandler<()> = SignalHandler::new();
        let outer_calls = Rc::new(RefCell::new(0));
        let inner_calls = Rc::new(RefCell::new(0));

        let reentrant = handler.clone();
        let moved_outer = outer_calls.clone();
        let moved_inner = inner_calls.clone();
        let _outer = handler.connect(move |_| {
            *moved_outer.borrow_mut() += 1;
            if *moved_outer.borrow() == 1 {
                let inner = moved_inner.clone();
                // Leak the connection on purpose, the registry keeps it.
                let _ = reentrant.connect(move |_| *inner.borrow_mut() += 1);
            }
        });

        handler.publish(&mut ());
        assert_eq!(*outer_calls.borrow(), 1);
        assert_eq!(*inner_calls.borrow(), 0);

        handler.publish(&mut ());
        assert_eq!(*outer_calls.borrow(), 2);
        assert_eq!(*inner_calls.borrow(), 1);
    }

    #[test]
    fn test_callbacks_run_in_connection_order() {
        let handler: SignalHandler<Vec<i32>> = SignalHandler::new();
        let _c1 = handler.connect(|order: &mut Vec<i32>| order.push(1));
        let _c2 = handler.connect(|order: &mut Vec<i32>| order.push(2));
        let _c3 = handler.connect(|order: &mut Vec<i32>| order.push(3));

        let mut order = Vec::new();
        handler.publish(&mut order);
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_many_connects_and_disconnects() {
        let handler: SignalHandler<()> = SignalHandler::new();

        let mut conns = Vec::new();
        for _ in 0..1000 {
            conns.push(handler.connect(|_| {}));
        }
        assert_eq!(handler.size(), 1000);

        for conn in &mut conns {
            conn.disconnect();
        }
        assert_eq!(handler.size(), 0);
    }

    #[test]
    fn test_interleaved_connect_and_disconnect() {
        let handler: SignalHandler<()> = SignalHandler::new();

        let mut conns = Vec::new();
        for _round in 0..10 {
            for _ in 0..5 {
                conns.push(handler.connect(|_| {}));
            }
            for _ in 0..3 {
                if let Some(mut conn) = conns.pop() {
                    conn.disconnect();
                }
            }
        }

        assert_eq!(handler.size(), 20);
    }
}
