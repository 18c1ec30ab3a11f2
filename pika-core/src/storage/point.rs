use std::collections::BTreeMap;
use std::fmt;

/// One sample headed for the time-series engine.
///
/// Labels are kept sorted so the rendered exposition line is stable.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
    /// Unix milliseconds.
    pub timestamp: i64,
}

impl MetricPoint {
    /// Every series carries an `agent_id` label, so the constructor takes it up front.
    pub fn new(name: &str, agent_id: &str, value: f64, timestamp: i64) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(
            crate::metric_names::LABEL_AGENT_ID.to_string(),
            agent_id.to_string(),
        );
        Self {
            name: name.to_string(),
            labels,
            value,
            timestamp,
        }
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }
}

/// Renders the point as a Prometheus exposition line with a millisecond
/// timestamp, e.g. `pika_cpu_usage_percent{agent_id="a-1"} 42.5 1700000000000`.
impl fmt::Display for MetricPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.labels.is_empty() {
            write!(f, "{{")?;
            for (i, (key, value)) in self.labels.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}=\"{}\"", key, escape_label_value(value))?;
            }
            write!(f, "}}")?;
        }
        write!(f, " {} {}", self.value, self.timestamp)
    }
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}
