use anyhow::{Result, anyhow, bail};
use serde_json::Value;

/// ERDDAP `/info/{dataset_id}/index.json` response.
///
/// The info endpoint serves one flat table: a `columnNames` header plus rows
/// of `["Row Type", "Variable Name", "Attribute Name", "Data Type", "Value"]`.
/// Dimensions, data variables and attributes are all rows of that table.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct InfoResponse {
    pub(crate) table: InfoTable,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct InfoTable {
    #[serde(rename = "columnNames")]
    pub(crate) column_names: Vec<String>,
    #[serde(default)]
    pub(crate) rows: Vec<Vec<Value>>,
}

impl InfoTable {
    fn column_index(&self, name: &str) -> Result<usize> {
        self.column_names
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| anyhow!("info response has no [{name}] column"))
    }

    fn cell(row: &[Value], idx: usize) -> String {
        match row.get(idx) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

/// The griddap structure of a dataset: its dimensions in declared order and
/// its data variables.
#[derive(Debug, Clone)]
pub(crate) struct GridStructure {
    pub(crate) axes: Vec<AxisStructure>,
    pub(crate) data_variables: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct AxisStructure {
    pub(crate) name: String,
    /// `actual_range` attribute when the server publishes one, as verbatim
    /// `(min, max)` strings. Time axes encode this as seconds since epoch,
    /// which griddap accepts inside value selectors.
    pub(crate) actual_range: Option<(String, String)>,
}

impl GridStructure {
    pub(crate) fn from_info(info: &InfoResponse) -> Result<GridStructure> {
        let table = &info.table;
        let row_type = table.column_index("Row Type")?;
        let var_name = table.column_index("Variable Name")?;
        let attr_name = table.column_index("Attribute Name")?;
        let value = table.column_index("Value")?;

        let mut axes: Vec<AxisStructure> = Vec::new();
        let mut data_variables = Vec::new();

        for row in &table.rows {
            match InfoTable::cell(row, row_type).as_str() {
                "dimension" => axes.push(AxisStructure {
                    name: InfoTable::cell(row, var_name),
                    actual_range: None,
                }),
                "variable" => data_variables.push(InfoTable::cell(row, var_name)),
                "attribute" if InfoTable::cell(row, attr_name) == "actual_range" => {
                    let owner = InfoTable::cell(row, var_name);
                    if let Some(axis) = axes.iter_mut().find(|a| a.name == owner) {
                        axis.actual_range = parse_actual_range(&InfoTable::cell(row, value));
                    }
                }
                _ => {}
            }
        }

        if axes.is_empty() {
            bail!(
                "dataset metadata lists no dimensions; the dataset is not served under griddap"
            );
        }

        Ok(GridStructure {
            axes,
            data_variables,
        })
    }

    pub(crate) fn axis_names(&self) -> Vec<String> {
        self.axes.iter().map(|a| a.name.clone()).collect()
    }
}

fn parse_actual_range(value: &str) -> Option<(String, String)> {
    let (min, max) = value.split_once(',')?;
    let (min, max) = (min.trim(), max.trim());
    if min.is_empty() || max.is_empty() {
        return None;
    }
    Some((min.to_string(), max.to_string()))
}
