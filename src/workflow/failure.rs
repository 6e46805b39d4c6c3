//! Rendering of action failures into the entity's error field.
//!
//! Layout, newline-joined: `<category>: <message>`, then the failure's debug
//! rendering when it says more than the message (cause chains, anyhow
//! backtraces), then a stack trace when `RUST_BACKTRACE` enables capture.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt::{Debug, Display};

pub fn describe_error<E: Display + Debug>(err: &E) -> String {
    let message = err.to_string();
    let mut lines = vec![format!("{}: {message}", category::<E>())];

    let debug = format!("{err:?}");
    if debug != message {
        lines.push(debug);
    }
    push_backtrace(&mut lines);
    lines.join("\n")
}

pub fn describe_panic(payload: &(dyn Any + Send)) -> String {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());

    let mut lines = vec![format!("panic: {message}")];
    push_backtrace(&mut lines);
    lines.join("\n")
}

fn push_backtrace(lines: &mut Vec<String>) {
    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        lines.push(backtrace.to_string());
    }
}

/// Unqualified type name, generics dropped: `my_app::errors::PetError` -> `PetError`
fn category<E>() -> &'static str {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
