use std::fmt;
use std::sync::{Mutex, PoisonError};

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Thread-safe pool of reusable objects.
///
/// `checkout` hands out an idle object or builds a new one with the factory;
/// the caller owns it exclusively until `checkin` returns it. Objects that
/// end up in a bad state should simply be dropped instead of checked in.
pub struct Pool<T> {
    idle: Mutex<Vec<T>>,
    factory: Factory<T>,
    max_idle: usize,
}

impl<T> Pool<T> {
    /// Default cap on idle objects kept for reuse.
    pub const DEFAULT_MAX_IDLE: usize = 8;

    pub fn new(factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self::with_max_idle(factory, Self::DEFAULT_MAX_IDLE)
    }

    pub fn with_max_idle(factory: impl Fn() -> T + Send + Sync + 'static, max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            factory: Box::new(factory),
            max_idle,
        }
    }

    /// Take an idle object, constructing one if none is available.
    pub fn checkout(&self) -> T {
        let reused = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        reused.unwrap_or_else(|| (self.factory)())
    }

    /// Return an object for reuse. Objects beyond the idle cap are dropped.
    pub fn checkin(&self, item: T) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_idle {
            idle.push(item);
        }
    }

    /// Number of idle objects.
    pub fn idle(&self) -> usize {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drop every idle object.
    pub fn clear(&self) {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("idle", &self.idle())
            .field("max_idle", &self.max_idle)
            .finish()
    }
}
