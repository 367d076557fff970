/**
 * Interrupt handling
 *
 * SIGINT/SIGTERM only set a flag; the main thread polls `interrupted()` and
 * runs the normal teardown path.
 */

use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_signal(_signum: libc::c_int){
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Route SIGINT and SIGTERM to the interrupt flag
#[cfg(unix)]
pub fn install_interrupt_handler() -> std::io::Result<()>{
    let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
    for signum in [libc::SIGINT, libc::SIGTERM]{
        //only touches an atomic, async-signal-safe
        let prev = unsafe{ libc::signal(signum, handler) };
        if prev == libc::SIG_ERR{
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn install_interrupt_handler() -> std::io::Result<()>{
    log::warn!("interrupt handler not supported on this platform");
    Ok(())
}

pub fn interrupted() -> bool{
    INTERRUPTED.load(Ordering::SeqCst)
}
