// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums, errors and traits describing
// students, predictions and explanations.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

// Raw student rows and feature maps
pub mod student;

// Prediction results, explanations and recommendation rules
pub mod prediction;

// Typed error taxonomy
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;
