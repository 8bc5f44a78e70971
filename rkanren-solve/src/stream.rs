//! The answer stream (Stream).
//!
//! A stream is either empty, a mature answer followed by the rest of the
//! stream, or an immature (suspended) computation. This is the classic
//! miniKanren representation of `mplus`/`bind` as a trampoline that avoids
//! unbounded native-stack recursion on infinite disjunctions/conjunctions.
//!
//! Cancellation is a shared flag checked at every suspension point (every
//! time an immature stream is forced); fairness comes from always
//! swapping the two operands on each recursive step so that an infinite
//! left stream cannot prevent the right stream's answers from ever being
//! reached.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation token. Cloning is cheap (`Arc` to a single flag);
/// every worker and every stream derived from a run shares one.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

enum Thunk<T> {
    Pending(Box<dyn FnOnce() -> Stream<T>>),
    Forced(Stream<T>),
}

/// A suspended, memoized computation of a `Stream<T>`.
pub struct LazyStream<T>(Rc<RefCell<Thunk<T>>>);

impl<T> Clone for LazyStream<T> {
    fn clone(&self) -> Self {
        LazyStream(Rc::clone(&self.0))
    }
}

impl<T: 'static + Clone> LazyStream<T> {
    pub fn delay<F>(f: F) -> LazyStream<T>
    where
    F: FnOnce() -> Stream<T> + 'static,
    {
        LazyStream(Rc::new(RefCell::new(Thunk::Pending(Box::new(f)))))
    }

    /// Forces the thunk, memoizing the result so repeated forcing (e.g.
    /// from multiple consumers of the same suspended stream) does not
    /// re-run the computation.
    pub fn force(&self) -> Stream<T> {
        {
            let borrow = self.0.borrow();
            if let Thunk::Forced(s) = &*borrow {
                return s.clone();
            }
        }
        let thunk = self.0.replace(Thunk::Forced(Stream::Empty));
        let forced = match thunk {
            Thunk::Pending(f) => f(),
            Thunk::Forced(s) => s,
        };
        *self.0.borrow_mut() = Thunk::Forced(forced.clone());
        forced
    }
}

/// A lazy, possibly infinite sequence of answers.
pub enum Stream<T> {
    /// `mzero`.
    Empty,
    /// A mature answer, with the remainder of the stream (possibly
    /// immature) following it.
    Unit(Box<T>, Box<Stream<T>>),
    /// An immature stream: forcing it may or may not yield a mature answer.
    Lazy(LazyStream<T>),
}

impl<T: 'static> Stream<T> {
    pub fn empty() -> Stream<T> {
        Stream::Empty
    }

    pub fn single(value: T) -> Stream<T> {
        Stream::Unit(Box::new(value), Box::new(Stream::Empty))
    }

    pub fn cons(value: T, rest: Stream<T>) -> Stream<T> {
        Stream::Unit(Box::new(value), Box::new(rest))
    }
}

impl<T: Clone> Clone for Stream<T> {
    /// A forced thunk may memoize to any shape, including a mature `Unit`,
    /// so this is a real recursive clone rather than a cheap re-wrap of
    /// `Empty`/`Lazy`. `T` (always `State` in this engine) is itself
    /// `Rc`-backed and cheap to clone.
    fn clone(&self) -> Stream<T> {
        match self {
            Stream::Empty => Stream::Empty,
            Stream::Lazy(l) => Stream::Lazy(l.clone()),
            Stream::Unit(head, tail) => {
                Stream::Unit(Box::new((**head).clone()), Box::new((**tail).clone()))
            }
        }
    }
}

impl<T: 'static + Clone> Stream<T> {
    /// `mplus(a, b)`: fair interleaved concatenation.
    pub fn mplus(a: Stream<T>, b: Stream<T>) -> Stream<T> {
        match a {
            Stream::Empty => b,
            Stream::Unit(head, tail) => Stream::Unit(head, Box::new(Stream::mplus(b, *tail))),
            Stream::Lazy(thunk) => Stream::Lazy(LazyStream::delay(move || {
                        // Swap order on every suspension: this is what keeps an
                        // infinite `a` from starving `b`.
                        Stream::mplus(b, thunk.force())
            })),
        }
    }

    /// `bind(a, g)`: runs `g` over every element of `a`, interleaving the
    /// resulting streams.
    pub fn bind<G>(a: Stream<T>, g: Rc<G>) -> Stream<T>
    where
    G: Fn(T) -> Stream<T> + 'static,
    {
        match a {
            Stream::Empty => Stream::Empty,
            Stream::Unit(head, tail) => {
                let g2 = Rc::clone(&g);
                Stream::mplus(g(*head), Stream::Lazy(LazyStream::delay(move || Stream::bind(*tail, g2))))
            }
            Stream::Lazy(thunk) => {
                Stream::Lazy(LazyStream::delay(move || Stream::bind(thunk.force(), g)))
            }
        }
    }

    /// Takes up to `n` answers (or all of them, if `n == 0`), honoring
    /// cancellation at every suspension point. Returns the answers plus a
    /// flag that is `true` if more answers might still be available (the
    /// stream was not exhausted).
    pub fn take(self, n: usize, cancel: &CancelToken) -> (Vec<T>, bool) {
        let mut out = Vec::new();
        let mut current = self;
        loop {
            if cancel.is_cancelled() {
                return (out, true);
            }
            if n != 0 && out.len() >= n {
                return (out, !matches!(current, Stream::Empty));
            }
            match current {
                Stream::Empty => return (out, false),
                Stream::Unit(head, tail) => {
                    out.push(*head);
                    current = *tail;
                }
                Stream::Lazy(thunk) => {
                    current = thunk.force();
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ints(from: i64, cancel: CancelToken) -> Stream<i64> {
        if cancel.is_cancelled() {
            return Stream::Empty;
        }
        Stream::Unit(
            Box::new(from),
            Box::new(Stream::Lazy(LazyStream::delay(move || ints(from + 1, cancel)))),
        )
    }

    #[test]
    fn take_bounds_infinite_stream() {
        let cancel = CancelToken::new();
        let (v, more) = ints(0, cancel).take(5, &CancelToken::new());
        assert_eq!(v, vec![0, 1, 2, 3, 4]);
        assert!(more);
    }

    #[test]
    fn mplus_interleaves_two_infinite_streams() {
        let cancel = CancelToken::new();
        let a = ints(0, cancel.clone());
        let b = Stream::bind(ints(100, cancel.clone()), Rc::new(|x: i64| Stream::single(x)));
        let merged = Stream::mplus(a, b);
        let (v, _) = merged.take(6, &CancelToken::new());
        // fair interleave: one from `a`, one from `b`, alternating
        assert_eq!(v, vec![0, 100, 1, 101, 2, 102]);
    }

    #[test]
    fn cancellation_stops_production() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let (v, more) = ints(0, cancel.clone()).take(5, &cancel);
        assert!(v.is_empty());
        assert!(more);
    }

    #[test]
    fn empty_stream_take_returns_no_more() {
        let (v, more): (Vec<i64>, bool) = Stream::empty().take(3, &CancelToken::new());
        assert!(v.is_empty());
        assert!(!more);
    }
}
