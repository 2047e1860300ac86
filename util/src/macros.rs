/// Prints to stderr. For use before tracing is installed.
#[macro_export]
macro_rules! bootstrap {
    ($fmt:literal $( , $args:expr )* $(,)?) => {
        eprintln!(concat!("[bootstrap] ", $fmt) $( , $args )*)
    };
}

/// Logs the error of a `Result` without consuming it. Logs at error level unless prefixed with
/// `warn,`.
#[macro_export]
macro_rules! trace_catch {
    (warn, $val:expr, $($rest:tt)*) => {
        if let Err(ref e) = $val {
            ::tracing::warn!(error = %e, $($rest)*);
        }
    };

    ($val:expr, $($rest:tt)*) => {
        if let Err(ref e) = $val {
            ::tracing::error!(error = %e, $($rest)*);
        }
    };
}
