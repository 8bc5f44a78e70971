//! Small macros shared by the rest of the `rkanren` workspace: a tiny,
//! dependency-light crate that the other workspace members can all pull
//! in without circular path dependencies.

/// Declares a lazily-initialized, process-wide singleton guarded by
/// `lazy_static`. Used for the variable-id counter and the tabling
/// cache's global state.
#[macro_export]
macro_rules! global_singleton {
    ($(#[$meta:meta])* $vis:vis static $name:ident : $ty:ty = $init:expr; reset = $reset_name:ident) => {
        $crate::lazy_static::lazy_static! {
            $(#[$meta])*
            $vis static ref $name: $ty = $init;
        }

        /// Resets the process-wide singleton to a fresh state. Intended for
        /// test isolation; never called implicitly by the engine itself.
        $vis fn $reset_name() {
            // The singleton itself cannot be replaced (lazy_static only
            // hands out a shared reference), so reset is delegated to the
            // value's own interior-mutable reset method.
            $name.reset();
        }
    };
}

pub use lazy_static;

/// Asserts, in debug builds only, that a closure's result holds; logs at
/// `error!` level before panicking so the failure is visible in engines
/// that run with `log` filtered above `error`.
#[macro_export]
macro_rules! invariant {
    ($cond:expr, $($arg:tt)+) => {
        if cfg!(debug_assertions) && !$cond {
            log::error!($($arg)+);
            panic!($($arg)+);
        }
    };
}

#[cfg(test)]
mod test {
    struct Counter(std::sync::atomic::AtomicU64);
    impl Counter {
        fn reset(&self) {
            self.0.store(0, std::sync::atomic::Ordering::SeqCst);
        }
    }

    global_singleton! {
        static COUNTER: Counter = Counter(std::sync::atomic::AtomicU64::new(0));
        reset = reset_counter
    }

    #[test]
    fn singleton_resets() {
        COUNTER.0.fetch_add(5, std::sync::atomic::Ordering::SeqCst);
        assert_eq!(COUNTER.0.load(std::sync::atomic::Ordering::SeqCst), 5);
        reset_counter();
        assert_eq!(COUNTER.0.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
