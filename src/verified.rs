/// A wrapper for data that has been sanitized and is safe to write.
///
/// `Verified<T>` represents a value that has gone through a
/// [`Sanitizer`](crate::Sanitizer). Document-store writes take
/// `&Verified<SanitizedPayload>`, so a verified payload is compile-time proof
/// that coercion ran before the write.
///
/// # Construction Invariants
///
/// **IMPORTANT:** `Verified<T>` cannot be constructed directly by external code.
/// There are no public constructors, and no `From<T>` or `Into<Verified<T>>`
/// implementations that would allow arbitrary values to be wrapped.
///
/// Construction is restricted to crate-internal code through `new_unchecked`,
/// which is intentionally `pub(crate)`.
///
/// # Access
///
/// - [`AsRef::as_ref`]: Borrow the verified value
/// - [`into_inner`](Self::into_inner): Consume and extract the value
///
/// # Examples
///
/// External callers cannot create `Verified<T>` directly:
///
/// ```compile_fail
/// use exercise_portal::Verified;
///
/// // This will not compile - no public constructor:
/// let verified = Verified::new("data".to_string());
/// ```
///
/// Verified values come out of a sanitizer:
///
/// ```
/// use exercise_portal::{PayloadSanitizer, RawPayload, SanitizeMode, Sanitizer, Tainted, EXERCISE_FIELDS};
///
/// let sanitizer = PayloadSanitizer::new(&EXERCISE_FIELDS, SanitizeMode::CREATE);
/// let verified = sanitizer.sanitize(Tainted::new(RawPayload::new()));
///
/// assert_eq!(verified.as_ref().len(), EXERCISE_FIELDS.len());
/// let payload = verified.into_inner();
/// assert!(payload.contains_key("name_en"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Verified<T> {
    inner: T,
}

impl<T> Verified<T> {
    /// Creates a `Verified<T>` without performing validation.
    ///
    /// # Safety (Policy-Level)
    ///
    /// This function is `pub(crate)` to restrict construction to code within
    /// this crate. Callers are responsible for having sanitized the value.
    pub(crate) fn new_unchecked(value: T) -> Self {
        Self { inner: value }
    }

    /// Consumes the `Verified<T>` and returns the inner value.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> AsRef<T> for Verified<T> {
    fn as_ref(&self) -> &T {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verified_as_ref_returns_reference() {
        let verified = Verified::new_unchecked("test-data".to_string());
        let value_ref = verified.as_ref();

        assert_eq!(value_ref, "test-data");
        assert_eq!(value_ref.len(), 9);
    }

    #[test]
    fn verified_into_inner_returns_value() {
        let verified = Verified::new_unchecked(42);
        assert_eq!(verified.into_inner(), 42);
    }

    #[test]
    fn verified_derives_work() {
        let v1 = Verified::new_unchecked("data".to_string());
        let v2 = v1.clone();

        assert_eq!(v1, v2);

        let debug_output = format!("{:?}", v1);
        assert!(debug_output.contains("Verified"));
        assert!(debug_output.contains("data"));
    }

    #[test]
    fn verified_prevents_direct_construction() {
        // If the following were uncommented outside the crate, they would not compile:
        // let v = Verified { inner: 42 }; // ← private field
        // let v: Verified<i32> = 42.into(); // ← no From impl

        let _ = Verified::new_unchecked(42);
    }

    mod proptests {
        use crate::fields::EXERCISE_FIELDS;
        use crate::sanitizer::sanitize;
        use crate::test_utils::{arb_mode, arb_raw_payload};
        use crate::{PayloadSanitizer, Sanitizer, Tainted};
        use proptest::prelude::*;

        proptest! {
            /// Property: the Tainted → Sanitizer → Verified flow matches the pure sanitize function
            #[test]
            fn proptest_verified_matches_pure_sanitize(raw in arb_raw_payload(), mode in arb_mode()) {
                let expected = sanitize(&EXERCISE_FIELDS, &raw, mode);

                let sanitizer = PayloadSanitizer::new(&EXERCISE_FIELDS, mode);
                let verified = sanitizer.sanitize(Tainted::new(raw));

                prop_assert_eq!(verified.as_ref(), &expected);
                prop_assert_eq!(verified.into_inner(), expected);
            }
        }
    }
}
