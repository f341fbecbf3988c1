//! A password held in zeroizing memory. Plaintext is only reachable inside
//! [`Password::deploy`], which guarantees the plaintext copy it hands out is
//! dropped (and zeroized) on every exit path, including panics that unwind.

use zeroize::Zeroizing;

#[derive(Clone)]
pub struct Password(Zeroizing<String>);

impl Password {
    pub fn empty() -> Self {
        Password(Zeroizing::new(String::new()))
    }

    pub fn new(plaintext: impl Into<String>) -> Self {
        Password(Zeroizing::new(plaintext.into()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Runs `f` with the plaintext password. The plaintext handed to `f` is
    /// a [`Zeroizing`] guard that is wiped when it drops, even if `f` panics.
    pub fn deploy<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        let guard: Zeroizing<String> = Zeroizing::new(self.0.as_str().to_string());
        f(&guard)
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}
