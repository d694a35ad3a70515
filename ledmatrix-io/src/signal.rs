//! Signal handling for graceful shutdown

use crate::error::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set up a Ctrl-C handler that sets the returned flag to false.
///
/// # Example
/// ```no_run
/// use std::sync::atomic::Ordering;
///
/// let running = ledmatrix_io::signal::setup_ctrl_c_handler()?;
/// while running.load(Ordering::SeqCst) {
///     // ... send frames ...
/// }
/// # Ok::<(), ledmatrix_io::Error>(())
/// ```
pub fn setup_ctrl_c_handler() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        log::info!("Received Ctrl-C, stopping");
        r.store(false, Ordering::SeqCst);
    })?;
    Ok(running)
}
