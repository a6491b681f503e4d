use brief_core::pipeline::PipelineOutcome;
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;

// ── Label types ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ExtractionLabel {
    pub channel: String,
    /// "ok" or the failure kind.
    pub outcome: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct SourceLabel {
    pub source: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct AcquisitionLabel {
    pub channel: String,
    pub kind: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ChannelLabel {
    pub channel: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabel {
    pub method: String,
    pub status: String,
}

// ── Metrics registry ───────────────────────────────────────────────────────────

pub struct BriefMetrics {
    pub registry: Registry,

    pub extractions: Family<ExtractionLabel, Counter>,
    pub question_sources: Family<SourceLabel, Counter>,
    pub acquisition_failures: Family<AcquisitionLabel, Counter>,
    pub run_duration: Family<ChannelLabel, Histogram>,
    pub http_requests: Family<HttpLabel, Counter>,

    // Set on each scrape
    pub project_count: Gauge,
    pub uptime_seconds: Gauge,
}

impl BriefMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let extractions: Family<ExtractionLabel, Counter> = Family::default();
        registry.register(
            "brief_extractions",
            "Extraction runs by channel and outcome",
            extractions.clone(),
        );

        let question_sources: Family<SourceLabel, Counter> = Family::default();
        registry.register(
            "brief_question_plans",
            "Question plans by source (model, fallback, complete)",
            question_sources.clone(),
        );

        let acquisition_failures: Family<AcquisitionLabel, Counter> = Family::default();
        registry.register(
            "brief_acquisition_failures",
            "Inputs rejected before extraction, by channel and kind",
            acquisition_failures.clone(),
        );

        let run_duration: Family<ChannelLabel, Histogram> = Family::new_with_constructor(|| {
            Histogram::new([0.1_f64, 0.5, 1.0, 5.0, 15.0, 60.0].into_iter())
        });
        registry.register(
            "brief_run_duration_seconds",
            "Pipeline run duration in seconds",
            run_duration.clone(),
        );

        let http_requests: Family<HttpLabel, Counter> = Family::default();
        registry.register(
            "brief_http_requests",
            "Total HTTP requests by method and status code",
            http_requests.clone(),
        );

        let project_count: Gauge = Gauge::default();
        registry.register("brief_projects", "Number of stored projects", project_count.clone());

        let uptime_seconds: Gauge = Gauge::default();
        registry.register("brief_uptime_seconds", "Server uptime in seconds", uptime_seconds.clone());

        Self {
            registry,
            extractions,
            question_sources,
            acquisition_failures,
            run_duration,
            http_requests,
            project_count,
            uptime_seconds,
        }
    }

    /// Count one finished pipeline run.
    pub fn observe(&self, outcome: &PipelineOutcome, elapsed_secs: f64) {
        let channel = outcome.channel.as_str().to_string();
        self.run_duration
            .get_or_create(&ChannelLabel {
                channel: channel.clone(),
            })
            .observe(elapsed_secs);

        if let Some(err) = &outcome.acquisition_error {
            self.acquisition_failures
                .get_or_create(&AcquisitionLabel {
                    channel,
                    kind: err.kind().to_string(),
                })
                .inc();
            return;
        }

        let result = match outcome.extraction_failure {
            Some(failure) => failure.as_str().to_string(),
            None => "ok".to_string(),
        };
        self.extractions
            .get_or_create(&ExtractionLabel {
                channel,
                outcome: result,
            })
            .inc();
        if let Some(source) = outcome.question_source {
            self.question_sources
                .get_or_create(&SourceLabel {
                    source: source.as_str().to_string(),
                })
                .inc();
        }
    }

    /// OpenMetrics text exposition.
    pub fn render(&self) -> anyhow::Result<String> {
        let mut body = String::new();
        encode(&mut body, &self.registry)?;
        Ok(body)
    }
}

impl Default for BriefMetrics {
    fn default() -> Self {
        Self::new()
    }
}
