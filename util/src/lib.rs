mod macros;
mod throttle;

pub use throttle::{
    LogThrottle,
    Throttled,
    DEFAULT_REPEAT_INTERVAL,
};
