use anyhow::{Result, bail};

use crate::metadata::{AxisStructure, GridStructure};
use crate::protocol::Protocol;
use crate::util::{percent_encode_query, urljoin};

/// An immutable description of one dataset fetch.
///
/// Built once with the builder methods and passed explicitly to
/// [`Client::fetch`](crate::Client::fetch); nothing on the client is mutated
/// per request.
///
/// Constraint keys combine an axis or variable name with a comparator suffix
/// (`>=`, `<=`, `=`, or `_step` for a griddap stride). Values are literal
/// bounds or expressions the server evaluates, such as `max(time)-30`.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    server: String,
    dataset_id: String,
    protocol: Protocol,
    variables: Vec<String>,
    constraints: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn new(server: impl Into<String>, dataset_id: impl Into<String>, protocol: Protocol) -> Self {
        Self {
            server: server.into(),
            dataset_id: dataset_id.into(),
            protocol,
            variables: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn griddap(server: impl Into<String>, dataset_id: impl Into<String>) -> Self {
        Self::new(server, dataset_id, Protocol::Griddap)
    }

    pub fn tabledap(server: impl Into<String>, dataset_id: impl Into<String>) -> Self {
        Self::new(server, dataset_id, Protocol::Tabledap)
    }

    /// Restricts the fetch to the named variables, in order. When never
    /// called, all of the dataset's data variables are requested.
    pub fn variables<I, S>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variables = variables.into_iter().map(Into::into).collect();
        self
    }

    /// Adds one constraint, e.g. `.constraint("longitude<=", "10")`.
    pub fn constraint(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.constraints.push((key.into(), value.into()));
        self
    }

    /// Adds several constraints at once, preserving order.
    pub fn constraints<I, K, V>(mut self, constraints: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.constraints
            .extend(constraints.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Download URL for the tabledap protocol.
    ///
    /// Tabledap has no server-side defaults to merge with, so the request's
    /// constraints are passed through as the whole constraint set.
    pub(crate) fn tabledap_url(&self) -> String {
        let base = urljoin(&self.server, &format!("tabledap/{}.csv", self.dataset_id));

        let mut parts = Vec::new();
        if !self.variables.is_empty() {
            parts.push(self.variables.join(","));
        }
        for (key, value) in &self.constraints {
            parts.push(format!("{key}{value}"));
        }

        if parts.is_empty() {
            base
        } else {
            format!("{}?{}", base, percent_encode_query(&parts.join("&")))
        }
    }

    /// Download URL for the griddap protocol.
    ///
    /// Every selected data variable gets one `[(start):stride:(stop)]`
    /// selector per dimension, in dimension order. Bounds default to the full
    /// extent from the dataset's `actual_range` metadata; the request's
    /// constraints override the matching bound.
    pub(crate) fn griddap_url(&self, grid: &GridStructure) -> Result<String> {
        let bounds = self.resolve_axis_bounds(grid)?;

        let mut selector = String::new();
        for (axis, bound) in grid.axes.iter().zip(&bounds) {
            selector.push_str(&render_selector(axis, bound)?);
        }

        let variables: &[String] = if self.variables.is_empty() {
            &grid.data_variables
        } else {
            &self.variables
        };
        if variables.is_empty() {
            bail!(
                "dataset [{}] lists no data variables and none were requested",
                self.dataset_id
            );
        }

        let query = variables
            .iter()
            .map(|v| format!("{v}{selector}"))
            .collect::<Vec<_>>()
            .join(",");

        let base = urljoin(&self.server, &format!("griddap/{}.csv", self.dataset_id));
        Ok(format!("{}?{}", base, percent_encode_query(&query)))
    }

    fn resolve_axis_bounds<'a>(&'a self, grid: &GridStructure) -> Result<Vec<AxisBounds<'a>>> {
        let mut bounds = vec![AxisBounds::default(); grid.axes.len()];

        for (key, value) in &self.constraints {
            let (name, slot) = split_constraint_key(key);
            let Some(idx) = grid.axes.iter().position(|a| a.name == name) else {
                bail!(
                    "constraint [{key}] does not match any dimension of dataset [{}] (dimensions: {})",
                    self.dataset_id,
                    grid.axis_names().join(", ")
                );
            };
            let Some(slot) = slot else {
                bail!("constraint [{key}] has no comparator; use >=, <=, = or _step");
            };
            match slot {
                ConstraintSlot::Start => bounds[idx].start = Some(value),
                ConstraintSlot::Stop => bounds[idx].stop = Some(value),
                ConstraintSlot::Exact => bounds[idx].exact = Some(value),
                ConstraintSlot::Step => bounds[idx].step = Some(value),
            }
        }

        Ok(bounds)
    }
}

#[derive(Debug, Clone, Copy)]
enum ConstraintSlot {
    Start,
    Stop,
    Exact,
    Step,
}

#[derive(Debug, Clone, Default)]
struct AxisBounds<'a> {
    start: Option<&'a String>,
    stop: Option<&'a String>,
    exact: Option<&'a String>,
    step: Option<&'a String>,
}

fn split_constraint_key(key: &str) -> (&str, Option<ConstraintSlot>) {
    // Order matters: ">=" and "<=" both end with "=".
    if let Some(name) = key.strip_suffix(">=") {
        (name, Some(ConstraintSlot::Start))
    } else if let Some(name) = key.strip_suffix("<=") {
        (name, Some(ConstraintSlot::Stop))
    } else if let Some(name) = key.strip_suffix("_step") {
        (name, Some(ConstraintSlot::Step))
    } else if let Some(name) = key.strip_suffix('=') {
        (name, Some(ConstraintSlot::Exact))
    } else {
        (key, None)
    }
}

fn render_selector(axis: &AxisStructure, bounds: &AxisBounds<'_>) -> Result<String> {
    let stride = bounds.step.map(String::as_str).unwrap_or("1");

    if let Some(exact) = bounds.exact {
        return Ok(format!("[({exact}):{stride}:({exact})]"));
    }

    let unconstrained = bounds.start.is_none() && bounds.stop.is_none();
    if unconstrained && axis.actual_range.is_none() {
        // No value range is known, so select the full extent by index.
        return Ok(if bounds.step.is_some() {
            format!("[0:{stride}:last]")
        } else {
            "[0:last]".to_string()
        });
    }

    let range = axis.actual_range.as_ref();
    let start = match bounds.start {
        Some(v) => v.as_str(),
        None => match range {
            Some((min, _)) => min.as_str(),
            None => bail!(
                "dimension [{}] has no actual_range in the dataset metadata; a lower bound constraint is required",
                axis.name
            ),
        },
    };
    let stop = match bounds.stop {
        Some(v) => v.as_str(),
        None => match range {
            Some((_, max)) => max.as_str(),
            None => "last",
        },
    };

    Ok(format!("[({start}):{stride}:({stop})]"))
}
