//! Generates foreign bindings for `idlink-core` built with the `ffi` feature.

fn main() {
    uniffi::uniffi_bindgen_main();
}
