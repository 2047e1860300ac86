#[cfg(unix)]
mod unix;

#[cfg(unix)]
pub use unix::terminate;

#[cfg(windows)]
mod windows;

#[cfg(windows)]
pub use windows::terminate;
