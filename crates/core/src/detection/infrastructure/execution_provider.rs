use ort::execution_providers::ExecutionProviderDispatch;

/// Hardware accelerators to try before ONNX Runtime's CPU fallback.
///
/// CoreML on macOS, DirectML on Windows, plain CPU elsewhere.
pub fn accelerators() -> Vec<ExecutionProviderDispatch> {
    let mut providers = Vec::new();
    #[cfg(target_os = "macos")]
    providers.push(ort::execution_providers::CoreMLExecutionProvider::default().build());
    #[cfg(target_os = "windows")]
    providers.push(ort::execution_providers::DirectMLExecutionProvider::default().build());
    providers
}

/// Human-readable name of the accelerator in use, for the startup banner.
pub fn accelerator_name() -> &'static str {
    if cfg!(target_os = "macos") {
        "CoreML"
    } else if cfg!(target_os = "windows") {
        "DirectML"
    } else {
        "CPU"
    }
}
