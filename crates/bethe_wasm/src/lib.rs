//! WASM bindings for `bethe_core`.
//!
//! Values cross the boundary through `serde-wasm-bindgen`: complex numbers as `[re, im]`,
//! configs as `{ ex: { e1, e2, e3 }, ax: { al, ar } }`, Newton settings as an optional object
//! (missing fields and `undefined` fall back to the defaults). Seeds are traced sequentially here.

mod runner;
mod system;

pub use runner::WasmContinuationRunner;
pub use system::WasmBetheSystem;
