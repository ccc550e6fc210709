use std::sync::{Mutex, MutexGuard};

/// The Authorization value every request inherits. Mutated only through a
/// [`CredentialGuard`], which restores the captured value when dropped.
#[derive(Debug, Default)]
pub struct SessionCredential {
    inner: Mutex<Option<String>>,
}

impl SessionCredential {
    pub fn new(credential: Option<String>) -> Self {
        Self { inner: Mutex::new(credential) }
    }

    fn lock(&self) -> MutexGuard<'_, Option<String>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn current(&self) -> Option<String> {
        self.lock().clone()
    }

    /// Snapshot the credential and open an override scope.
    pub fn override_scope(&self) -> CredentialGuard<'_> {
        CredentialGuard { session: self, original: self.current() }
    }
}

/// Scoped credential override. Restores the snapshot on every exit path,
/// including early returns, `?` and unwinding.
pub struct CredentialGuard<'a> {
    session: &'a SessionCredential,
    original: Option<String>,
}

impl CredentialGuard<'_> {
    /// `None` removes the credential for subsequent requests.
    pub fn set(&self, credential: Option<String>) {
        *self.session.lock() = credential;
    }

    pub fn original(&self) -> Option<&str> {
        self.original.as_deref()
    }
}

impl Drop for CredentialGuard<'_> {
    fn drop(&mut self) {
        *self.session.lock() = self.original.take();
    }
}
