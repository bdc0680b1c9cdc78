//! Query duration summary
//!
//! A Prometheus summary over a sliding window of the most recent samples.
//!
//! ## Design
//! - **VecDeque ring buffer** of the last 1000 durations for the quantiles
//! - **Lifetime count and sum** kept beside the window, as summaries require
//! - Clones share state, so one clone can be registered while the query keeps
//!   observing through another

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use prometheus::core::{Collector, Desc};
use prometheus::proto::{LabelPair, Metric, MetricFamily, MetricType, Quantile, Summary};
use sqlpulse_domain::constants::{
    CONST_LABEL_JOB, CONST_LABEL_QUERY, DURATION_OBJECTIVES, QUERY_DURATIONS_HELP,
    QUERY_DURATIONS_METRIC,
};
use sqlpulse_domain::{Result, SqlPulseError};

const WINDOW: usize = 1000;

#[derive(Debug, Default)]
struct Window {
    samples: VecDeque<f64>,
    count: u64,
    sum: f64,
}

#[derive(Debug)]
struct SummaryCore {
    desc: Desc,
    window: Mutex<Window>,
}

/// `sql_query_durations{sql_job, sql_query}` in seconds.
#[derive(Debug, Clone)]
pub struct DurationSummary {
    core: Arc<SummaryCore>,
}

impl DurationSummary {
    pub fn new(job: &str, query: &str) -> Result<Self> {
        let mut const_labels = HashMap::new();
        const_labels.insert(CONST_LABEL_JOB.to_string(), job.to_string());
        const_labels.insert(CONST_LABEL_QUERY.to_string(), query.to_string());
        let desc = Desc::new(
            QUERY_DURATIONS_METRIC.to_string(),
            QUERY_DURATIONS_HELP.to_string(),
            Vec::new(),
            const_labels,
        )
        .map_err(|err| {
            SqlPulseError::DescriptorRegistration(format!("{QUERY_DURATIONS_METRIC}: {err}"))
        })?;

        Ok(Self {
            core: Arc::new(SummaryCore {
                desc,
                window: Mutex::new(Window {
                    samples: VecDeque::with_capacity(WINDOW),
                    ..Window::default()
                }),
            }),
        })
    }

    pub fn observe(&self, duration: Duration) {
        let seconds = duration.as_secs_f64();
        let mut window = self.core.window.lock();
        window.count += 1;
        window.sum += seconds;
        window.samples.push_back(seconds);
        if window.samples.len() > WINDOW {
            window.samples.pop_front();
        }
    }

    pub fn descriptor(&self) -> &Desc {
        &self.core.desc
    }

    pub fn sample_count(&self) -> u64 {
        self.core.window.lock().count
    }

    pub fn sample_sum(&self) -> f64 {
        self.core.window.lock().sum
    }

    /// Quantile over the current window, `None` when no sample was observed.
    pub fn quantile(&self, q: f64) -> Option<f64> {
        let window = self.core.window.lock();
        let mut sorted: Vec<f64> = window.samples.iter().copied().collect();
        drop(window);
        quantile_of(&mut sorted, q)
    }

    fn snapshot(&self) -> Summary {
        let window = self.core.window.lock();
        let mut sorted: Vec<f64> = window.samples.iter().copied().collect();
        let (count, sum) = (window.count, window.sum);
        drop(window);

        sorted.sort_by(f64::total_cmp);
        let quantiles: Vec<Quantile> = DURATION_OBJECTIVES
            .iter()
            .map(|(q, _)| {
                let mut quantile = Quantile::default();
                quantile.set_quantile(*q);
                quantile.set_value(quantile_of_sorted(&sorted, *q).unwrap_or(f64::NAN));
                quantile
            })
            .collect();

        let mut summary = Summary::default();
        summary.set_sample_count(count);
        summary.set_sample_sum(sum);
        summary.set_quantile(quantiles.into());
        summary
    }
}

fn quantile_of(samples: &mut [f64], q: f64) -> Option<f64> {
    samples.sort_by(f64::total_cmp);
    quantile_of_sorted(samples, q)
}

fn quantile_of_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (q * sorted.len() as f64).ceil() as usize;
    let index = rank.saturating_sub(1).min(sorted.len() - 1);
    Some(sorted[index])
}

impl Collector for DurationSummary {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.core.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let desc = &self.core.desc;
        let labels: Vec<LabelPair> = desc.const_label_pairs.clone();

        let mut metric = Metric::default();
        metric.set_label(labels.into());
        metric.set_summary(self.snapshot());

        let mut family = MetricFamily::default();
        family.set_name(desc.fq_name.clone());
        family.set_help(desc.help.clone());
        family.set_field_type(MetricType::SUMMARY);
        family.set_metric(vec![metric].into());
        vec![family]
    }
}
