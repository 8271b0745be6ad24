//! Status and progress sinks for long-running operations
//!
//! Scans report what stage they are in and how far along they are through
//! two injected sinks. Both are pure reporting side effects: sinks never
//! influence control flow, and a caller that does not care passes
//! [`NullSink`].

/// Receives human-readable stage messages
pub trait StatusSink: Send + Sync {
    /// Report a stage message
    fn report(&self, message: &str);
}

/// Receives overall progress in percent (0.0 to 100.0)
pub trait ProgressSink: Send + Sync {
    /// Report overall progress
    fn report(&self, percent: f64);
}

impl<F> StatusSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, message: &str) {
        self(message)
    }
}

impl<F> ProgressSink for F
where
    F: Fn(f64) + Send + Sync,
{
    fn report(&self, percent: f64) {
        self(percent)
    }
}

/// Sink that discards every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl StatusSink for NullSink {
    fn report(&self, _message: &str) {}
}

impl ProgressSink for NullSink {
    fn report(&self, _percent: f64) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_closures_are_sinks() {
        let messages = Mutex::new(Vec::new());
        let percents = Mutex::new(Vec::new());

        let status = |m: &str| messages.lock().unwrap().push(m.to_string());
        let progress = |p: f64| percents.lock().unwrap().push(p);

        StatusSink::report(&status, "starting");
        ProgressSink::report(&progress, 42.0);

        assert_eq!(messages.into_inner().unwrap(), vec!["starting"]);
        assert_eq!(percents.into_inner().unwrap(), vec![42.0]);
    }

    #[test]
    fn test_null_sink_accepts_everything() {
        let sink = NullSink;
        StatusSink::report(&sink, "ignored");
        ProgressSink::report(&sink, 100.0);
    }
}
