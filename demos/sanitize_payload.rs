//! Payload sanitization demonstration.
//!
//! This example walks a loosely-typed payload through the sanitizer in each
//! mode and writes the result to an in-memory document store:
//! 1. Wrap the raw payload in `Tainted<RawPayload>`
//! 2. Sanitize it with `PayloadSanitizer` in CREATE, UPDATE and LISTING mode
//! 3. Write the `Verified<SanitizedPayload>` to the store
//!
//! Run with: `cargo run --example sanitize_payload`

use exercise_portal::{
    CollectionPath, DocumentStore, MemoryDocumentStore, PayloadSanitizer, RawPayload,
    SanitizeMode, Sanitizer, Tainted, EXERCISE_FIELDS,
};
use serde_json::json;

fn main() {
    println!("=== Payload Sanitization Example ===\n");

    let store = MemoryDocumentStore::new();
    let exercises = CollectionPath::exercises();

    let raw: RawPayload = json!({
        "name_en": "  Bench Press ",
        "added_count": "5",
        "primaryMuscles_en": ["chest", " triceps ", "", null],
        "video_url": null,
        "custom_note": "kept only when listing"
    })
    .as_object()
    .cloned()
    .unwrap_or_default();

    // Scenario 1: Create - defaults filled, unknown fields dropped
    println!("--- Scenario 1: CREATE ---");
    let created = PayloadSanitizer::new(&EXERCISE_FIELDS, SanitizeMode::CREATE)
        .sanitize(Tainted::new(raw.clone()));
    println!("{}", to_pretty(created.as_ref()));

    match store.set(&exercises, "bench_press", &created) {
        Ok(()) => println!("✓ Stored exercise bench_press"),
        Err(e) => println!("✗ Store failed: {e}"),
    }

    // Scenario 2: Update - only fields present in the input
    println!("\n--- Scenario 2: UPDATE ---");
    let update = PayloadSanitizer::new(&EXERCISE_FIELDS, SanitizeMode::UPDATE)
        .sanitize(Tainted::new(
            json!({"completed_count": "3.0", "bogus": true})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        ));
    println!("{}", to_pretty(update.as_ref()));

    match store.update(&exercises, "bench_press", &update) {
        Ok(()) => println!("✓ Updated exercise bench_press"),
        Err(e) => println!("✗ Update failed: {e}"),
    }

    // Scenario 3: Listing - defaults filled, unknown fields kept
    println!("\n--- Scenario 3: LISTING ---");
    let listed = PayloadSanitizer::new(&EXERCISE_FIELDS, SanitizeMode::LISTING)
        .sanitize(Tainted::new(raw));
    println!("{}", to_pretty(listed.as_ref()));

    println!("\n=== Example Complete ===");
}

fn to_pretty(value: &impl serde::Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unprintable: {e}>"))
}
