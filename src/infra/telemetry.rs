use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing::Subscriber;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    fmt::MakeWriter,
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(event_layer(logging.format, std::io::stdout))
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// One line per event. Publish and request logs carry everything in their
/// fields, so span context is left out of JSON output.
fn event_layer<S, W>(format: LogFormat, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(writer)
            .boxed(),
    }
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "folio_publish_total",
            Unit::Count,
            "Publish attempts by final outcome."
        );
        describe_counter!(
            "folio_storage_write_total",
            Unit::Count,
            "Artifact writes by outcome (written, skipped, failed)."
        );
        describe_histogram!(
            "folio_render_remote_ms",
            Unit::Milliseconds,
            "Latency of the round-trip render call in milliseconds."
        );
    });
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing::{info, info_span};

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("capture lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    impl Captured {
        fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().expect("capture lock").clone();
            String::from_utf8(bytes)
                .expect("utf-8 logs")
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    #[test]
    fn json_events_omit_span_context() {
        let captured = Captured::default();
        let subscriber =
            tracing_subscriber::registry().with(event_layer(LogFormat::Json, captured.clone()));

        tracing::subscriber::with_default(subscriber, || {
            let span = info_span!("request", id = 7);
            let _entered = span.enter();
            info!(stage = "start", "post published");
        });

        let lines = captured.lines();
        assert_eq!(lines.len(), 1);
        let event: serde_json::Value = serde_json::from_str(&lines[0]).expect("json line");
        assert_eq!(event["fields"]["message"], "post published");
        assert_eq!(event["fields"]["stage"], "start");
        assert!(event.get("span").is_none());
        assert!(event.get("spans").is_none());
    }

    #[test]
    fn compact_events_keep_structured_fields() {
        let captured = Captured::default();
        let subscriber =
            tracing_subscriber::registry().with(event_layer(LogFormat::Compact, captured.clone()));

        tracing::subscriber::with_default(subscriber, || {
            info!(path = "md/markdown.md", "artifact written");
        });

        let lines = captured.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("artifact written"));
        assert!(lines[0].contains("md/markdown.md"));
    }
}
