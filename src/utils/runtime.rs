use anyhow::Result;

/// Both surfaces are single threaded; the daemon drives everything from one current-thread
/// runtime.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
