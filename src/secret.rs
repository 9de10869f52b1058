use std::fmt;

/// A wrapper that keeps credentials out of logs.
///
/// The portal's admin token lives in a `Secret<String>` from the moment it is
/// read from the environment. `Debug` and `Display` always print
/// `[REDACTED]`, so a config struct or an error can be logged whole.
///
/// # Examples
///
/// ```
/// use exercise_portal::Secret;
///
/// let token = Secret::new("portal-admin-token".to_string());
///
/// assert_eq!(format!("{:?}", token), "[REDACTED]");
/// assert!(token.matches("portal-admin-token"));
/// assert!(!token.matches("guess"));
/// ```
// BREAKING CHANGE WARNING: Do NOT add Clone, Copy, or Default derives.
// Share a secret through Arc instead of duplicating it.
pub struct Secret<T> {
    // BREAKING CHANGE WARNING: This field MUST remain private.
    inner: T,
}

impl<T> Secret<T> {
    /// Wraps a sensitive value.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Explicitly exposes the secret value.
    ///
    /// The verbose name marks every place secret material is read.
    pub fn expose_secret(&self) -> &T {
        &self.inner
    }
}

impl Secret<String> {
    /// Compares a presented credential against the secret.
    ///
    /// Every byte is compared regardless of where the first mismatch is.
    pub fn matches(&self, candidate: &str) -> bool {
        let expected = self.inner.as_bytes();
        let candidate = candidate.as_bytes();

        if expected.len() != candidate.len() {
            return false;
        }

        expected
            .iter()
            .zip(candidate)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
    }
}

// BREAKING CHANGE WARNING: Do NOT implement Deref, AsRef, Borrow, or a Debug/Display
// that shows the value. The ONLY access is expose_secret().

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
