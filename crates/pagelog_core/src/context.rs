//! Stream identity and payload rendering.

use std::fmt::{self, Display, Write};

/// Data field written when a payload's `Display` impl fails.
pub const SERIALIZATION_FAILED: &str = "arguments serialization failed.";

/// Static identity of a logging stream.
///
/// A context is shared by every log call of a stream, so implementations
/// compute their serialized form once and hand out the cached string.
/// `serial()` is written verbatim as the record's `name` field.
pub trait LogContext: Send + Sync {
    /// Name used to relate pages to the stream.
    fn name(&self) -> &str;

    /// Cached serialized form.
    fn serial(&self) -> &str;
}

/// A context built from precomputed immutable strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticContext {
    name: String,
    serial: String,
}

impl StaticContext {
    /// Context whose serial form is `{name}`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let serial = format!("{{{name}}}");
        Self { name, serial }
    }

    /// Context with a custom serial form.
    pub fn with_serial(name: impl Into<String>, serial: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            serial: serial.into(),
        }
    }
}

impl LogContext for StaticContext {
    fn name(&self) -> &str {
        &self.name
    }

    fn serial(&self) -> &str {
        &self.serial
    }
}

impl Display for StaticContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serial)
    }
}

/// Space-separated argument list, rendered lazily.
///
/// ```
/// use pagelog_core::LogData;
///
/// let data = LogData::new("OrderService")
///     .arg(&42)
///     .arg_opt(None::<&u32>)
///     .arg(&"shipped");
/// assert_eq!(data.to_string(), "OrderService 42 null shipped");
/// ```
#[derive(Default)]
pub struct LogData<'a> {
    source: &'a str,
    args: Vec<Option<&'a dyn Display>>,
}

impl<'a> LogData<'a> {
    /// Start a payload attributed to `source`.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            args: Vec::new(),
        }
    }

    /// Append an argument.
    #[must_use]
    pub fn arg(mut self, value: &'a dyn Display) -> Self {
        self.args.push(Some(value));
        self
    }

    /// Append an optional argument; `None` renders as `null`.
    #[must_use]
    pub fn arg_opt<T: Display>(mut self, value: Option<&'a T>) -> Self {
        self.args.push(value.map(|v| v as &dyn Display));
        self
    }
}

impl Display for LogData<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source)?;
        for arg in &self.args {
            f.write_char(' ')?;
            match arg {
                Some(value) => value.fmt(f)?,
                None => f.write_str("null")?,
            }
        }
        Ok(())
    }
}

/// Render a payload without panicking.
///
/// `ToString` panics when a `Display` impl returns an error; a log call
/// must not, so the data field degrades to [`SERIALIZATION_FAILED`].
pub(crate) fn render(data: &dyn Display) -> String {
    let mut out = String::new();
    match write!(out, "{data}") {
        Ok(()) => out,
        Err(_) => SERIALIZATION_FAILED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl Display for Broken {
        fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    #[test]
    fn static_context_default_serial() {
        let ctx = StaticContext::new("email=123@lafaspot.com");
        assert_eq!(ctx.name(), "email=123@lafaspot.com");
        assert_eq!(ctx.serial(), "{email=123@lafaspot.com}");
        assert_eq!(ctx.to_string(), ctx.serial());
    }

    #[test]
    fn static_context_custom_serial() {
        let ctx = StaticContext::with_serial("email=123", "{sledid=1291298/email=123}");
        assert_eq!(ctx.name(), "email=123");
        assert_eq!(ctx.serial(), "{sledid=1291298/email=123}");
    }

    #[test]
    fn log_data_joins_arguments() {
        let numbers = vec![10, 20];
        let rendered = format!("{numbers:?}");
        let data = LogData::new("LoggerTest").arg(&rendered).arg(&7);
        assert_eq!(data.to_string(), "LoggerTest [10, 20] 7");
    }

    #[test]
    fn log_data_without_arguments() {
        assert_eq!(LogData::new("only").to_string(), "only");
    }

    #[test]
    fn render_survives_failing_display() {
        assert_eq!(render(&Broken), SERIALIZATION_FAILED);
        assert_eq!(render(&LogData::new("x").arg(&Broken)), SERIALIZATION_FAILED);
        assert_eq!(render(&"fine"), "fine");
    }
}
