// Logging shim: forwards to `tracing` when the feature is on, otherwise errors
// go to stderr and everything else is dropped.

#[cfg(feature = "tracing")]
macro_rules! log_error {
  ($($arg:tt)*) => {{
    tracing::error!($($arg)*);
  }};
}

#[cfg(feature = "tracing")]
macro_rules! log_debug {
  ($($arg:tt)*) => {{
    tracing::debug!($($arg)*);
  }};
}

#[cfg(feature = "tracing")]
macro_rules! log_trace {
  ($($arg:tt)*) => {{
    tracing::trace!($($arg)*);
  }};
}

#[cfg(not(feature = "tracing"))]
macro_rules! log_error {
  ($($arg:tt)*) => {{
    eprintln!($($arg)*);
  }};
}

#[cfg(not(feature = "tracing"))]
macro_rules! log_debug {
  ($($arg:tt)*) => {{
    if false {
      let _ = format!($($arg)*);
    }
  }};
}

#[cfg(not(feature = "tracing"))]
macro_rules! log_trace {
  ($($arg:tt)*) => {{
    if false {
      let _ = format!($($arg)*);
    }
  }};
}

pub(crate) use {log_debug, log_error, log_trace};
