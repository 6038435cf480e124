//! Lock-free parameter handles shared between the control side and the
//! render side of an effect graph.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use atomic_float::AtomicF64;

/// One automatable value, in physical units.
///
/// Cloning shares the underlying cell: every clone observes every `set`.
#[derive(Debug, Clone)]
pub struct ParamHandle {
    value: Arc<AtomicF64>,
}

impl ParamHandle {
    pub fn new(value: f64) -> Self {
        Self {
            value: Arc::new(AtomicF64::new(value)),
        }
    }

    #[inline]
    pub fn get(&self) -> f64 {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: f64) {
        self.value.store(value, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_value() {
        let a = ParamHandle::new(1.0);
        let b = a.clone();
        b.set(2.5);
        assert_eq!(a.get(), 2.5);
    }

    #[test]
    fn separate_handles_are_independent() {
        let a = ParamHandle::new(440.0);
        let b = ParamHandle::new(440.0);
        a.set(880.0);
        assert_eq!(a.get(), 880.0);
        assert_eq!(b.get(), 440.0);
    }
}
