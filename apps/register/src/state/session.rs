//! # Session State
//!
//! The register's single active sale.
//!
//! ## Thread Safety
//! Uses `Arc<Mutex<CheckoutSession>>`. Commands are short and synchronous,
//! so a plain `std::sync::Mutex` is enough. A poisoned lock is recovered;
//! session commands never leave the session half-updated.

use std::sync::{Arc, Mutex, MutexGuard};

use checkout_core::CheckoutSession;

/// Shared handle to the active [`CheckoutSession`].
#[derive(Clone)]
pub struct SessionState {
    session: Arc<Mutex<CheckoutSession>>,
}

impl SessionState {
    pub fn new(session: CheckoutSession) -> Self {
        SessionState {
            session: Arc::new(Mutex::new(session)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CheckoutSession> {
        match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Executes a function with read access to the session.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let totals = state.with_session(|s| s.totals());
    /// ```
    pub fn with_session<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&CheckoutSession) -> R,
    {
        let session = self.lock();
        f(&session)
    }

    /// Executes a function with write access to the session.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// state.with_session_mut(|s| s.apply_coupon("SAVE10"))?;
    /// ```
    pub fn with_session_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut CheckoutSession) -> R,
    {
        let mut session = self.lock();
        f(&mut session)
    }
}
