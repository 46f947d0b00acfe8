//! Logging to stderr, plus span export over OTLP/gRPC when a collector is
//! configured through the standard `OTEL_*` variables.

use anyhow::{anyhow, Context, Result};
use once_cell::sync::OnceCell;
use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::{Compression, SpanExporter, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{trace::SdkTracerProvider, Resource};
use std::{env::var, io, time::Duration};
use tonic::{
    metadata::{Ascii, MetadataKey, MetadataMap, MetadataValue},
    transport::ClientTlsConfig,
};
use tracing::{debug, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};
use ulid::Ulid;
use url::Url;

const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

/// Where spans go and how to authenticate against the collector.
#[derive(Debug, PartialEq, Eq)]
struct Collector {
    endpoint: Url,
    headers: Vec<(String, String)>,
    instance_id: String,
}

impl Collector {
    /// `None` unless `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
    fn from_env() -> Result<Option<Self>> {
        let Ok(raw) = var("OTEL_EXPORTER_OTLP_ENDPOINT") else {
            return Ok(None);
        };

        Ok(Some(Self {
            endpoint: parse_endpoint(&raw)?,
            headers: var("OTEL_EXPORTER_OTLP_HEADERS")
                .map(|headers| parse_headers(&headers))
                .unwrap_or_default(),
            instance_id: var("OTEL_SERVICE_INSTANCE_ID")
                .unwrap_or_else(|_| Ulid::new().to_string()),
        }))
    }

    fn metadata(&self) -> Result<MetadataMap> {
        let mut metadata = MetadataMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let key = MetadataKey::<Ascii>::from_bytes(name.to_ascii_lowercase().as_bytes())
                .map_err(|e| anyhow!("invalid OTLP header name {name}: {e}"))?;
            let value: MetadataValue<Ascii> = value
                .parse()
                .map_err(|e| anyhow!("invalid OTLP header value for {name}: {e}"))?;
            metadata.insert(key, value);
        }
        Ok(metadata)
    }

    fn exporter(&self) -> Result<SpanExporter> {
        let mut builder = SpanExporter::builder()
            .with_tonic()
            .with_endpoint(self.endpoint.as_str().trim_end_matches('/'))
            .with_compression(Compression::Gzip)
            .with_timeout(EXPORT_TIMEOUT);

        if self.endpoint.scheme() == "https" {
            if let Some(host) = self.endpoint.host_str() {
                builder = builder.with_tls_config(
                    ClientTlsConfig::new()
                        .domain_name(host.to_string())
                        .with_native_roots(),
                );
            }
        }

        if !self.headers.is_empty() {
            builder = builder.with_metadata(self.metadata()?);
        }

        Ok(builder.build()?)
    }

    fn resource(&self) -> Resource {
        Resource::builder_empty()
            .with_attributes(vec![
                KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
                KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                KeyValue::new("service.instance.id", self.instance_id.clone()),
            ])
            .build()
    }
}

/// `key=value` pairs separated by commas; malformed pairs are skipped.
fn parse_headers(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Bare `host:port` endpoints default to TLS.
fn parse_endpoint(raw: &str) -> Result<Url> {
    let raw = raw.trim().trim_end_matches('/');
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };
    Url::parse(&candidate).with_context(|| format!("invalid OTLP endpoint: {raw}"))
}

fn init_tracer_provider(collector: &Collector) -> Result<SdkTracerProvider> {
    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(collector.exporter()?)
        .with_resource(collector.resource())
        .build();

    let _ = TRACER_PROVIDER.set(provider.clone());
    global::set_tracer_provider(provider.clone());

    Ok(provider)
}

/// Initialize logging and, when a collector is configured, span export.
///
/// Logs go to stderr so command output on stdout stays machine readable.
///
/// # Errors
///
/// Returns an error if the collector settings are invalid or a subscriber is
/// already installed.
pub fn init(verbosity_level: Option<Level>) -> Result<()> {
    let verbosity_level = verbosity_level.unwrap_or(Level::ERROR);

    let fmt_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .compact();

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity_level.into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("hyper_util=error".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("opentelemetry_sdk=warn".parse()?);

    match Collector::from_env()? {
        Some(collector) => {
            let tracer = init_tracer_provider(&collector)?.tracer(env!("CARGO_PKG_NAME"));
            let subscriber = Registry::default()
                .with(fmt_layer)
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .with(filter);
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = Registry::default().with(fmt_layer).with(filter);
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}

/// Flushes pending spans; a no-op when export was never enabled.
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        debug!("shutting down tracer provider");
        if let Err(err) = provider.shutdown() {
            debug!("tracer provider shutdown failed: {err}");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn headers_skip_malformed_pairs() {
        assert_eq!(
            parse_headers("api-key = k1,malformed,=orphan,x-tenant=posts"),
            vec![
                ("api-key".to_string(), "k1".to_string()),
                ("x-tenant".to_string(), "posts".to_string()),
            ]
        );
        assert!(parse_headers("").is_empty());
    }

    #[test]
    fn bare_endpoint_defaults_to_tls() {
        let url = parse_endpoint("collector.internal:4317/").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("collector.internal"));
        assert_eq!(url.port(), Some(4317));

        let url = parse_endpoint("http://localhost:4317").unwrap();
        assert_eq!(url.scheme(), "http");
    }

    #[test]
    fn collector_is_disabled_without_endpoint() {
        temp_env::with_var_unset("OTEL_EXPORTER_OTLP_ENDPOINT", || {
            assert_eq!(Collector::from_env().unwrap(), None);
        });
    }

    #[test]
    fn collector_reads_environment() {
        temp_env::with_vars(
            [
                ("OTEL_EXPORTER_OTLP_ENDPOINT", Some("http://localhost:4317")),
                ("OTEL_EXPORTER_OTLP_HEADERS", Some("Authorization=Bearer abc")),
                ("OTEL_SERVICE_INSTANCE_ID", Some("cli-1")),
            ],
            || {
                let collector = Collector::from_env().unwrap().unwrap();
                assert_eq!(collector.instance_id, "cli-1");
                assert_eq!(collector.headers.len(), 1);
                assert_eq!(collector.metadata().unwrap().len(), 1);
            },
        );
    }

    #[test]
    fn invalid_header_name_is_rejected() {
        let collector = Collector {
            endpoint: parse_endpoint("http://localhost:4317").unwrap(),
            headers: vec![("bad header".to_string(), "x".to_string())],
            instance_id: "cli-1".to_string(),
        };
        assert!(collector.metadata().is_err());
    }

    #[test]
    fn shutdown_without_provider_is_noop() {
        shutdown_tracer();
    }
}
