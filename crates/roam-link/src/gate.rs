//! The consumption gate.
//!
//! A shared boolean with an edge-triggered change callback. The link
//! simulator is the single writer; the consumption loop reads it before
//! dispatching each delivery. While the gate is closed, deliveries are
//! neither acked nor nacked — they stay in the broker's unacknowledged
//! window until the gate reopens or the consumer disconnects.

use std::sync::Arc;

use parking_lot::RwLock;

/// Edge callback, invoked with the new value on each actual flip.
type EdgeCallback = Arc<dyn Fn(bool) + Send + Sync>;

struct GateInner {
    open: RwLock<bool>,
    on_edge: RwLock<Option<EdgeCallback>>,
}

/// Shared flag controlling whether deliveries are dispatched.
///
/// Cloning is cheap; all clones observe the same flag.
#[derive(Clone)]
pub struct Gate {
    inner: Arc<GateInner>,
}

impl Gate {
    /// Create a gate with an initial value.
    #[must_use]
    pub fn new(initially_open: bool) -> Self {
        Self {
            inner: Arc::new(GateInner {
                open: RwLock::new(initially_open),
                on_edge: RwLock::new(None),
            }),
        }
    }

    /// Register the change callback, replacing any previous one.
    ///
    /// The callback fires at most once per actual value change, never on
    /// a repeated identical `set`, and runs outside the gate's lock so it
    /// may read the gate itself.
    pub fn on_edge(&self, callback: impl Fn(bool) + Send + Sync + 'static) {
        *self.inner.on_edge.write() = Some(Arc::new(callback));
    }

    /// Flip the flag. No-op (and no callback) if the value is unchanged.
    pub fn set(&self, up: bool) {
        {
            let mut open = self.inner.open.write();
            if *open == up {
                return;
            }
            *open = up;
        }
        let callback = self.inner.on_edge.read().clone();
        if let Some(callback) = callback {
            callback(up);
        }
    }

    /// Whether deliveries should currently be dispatched.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.inner.open.read()
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate").field("open", &self.is_open()).finish()
    }
}
