// ── Kubesage Atoms Layer ───────────────────────────────────────────────────
// Pure constants, error types, value types and boundary traits.
// Dependency rule: atoms may only depend on std and external pure crates.
// Nothing here may import from engine/.

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;
