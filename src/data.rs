use anyhow::{Context, Result, anyhow, bail};
use ndarray::{ArrayD, IxDyn};
use std::fmt;

/// A single CSV cell from an ERDDAP response.
///
/// ERDDAP serves everything as text; numeric cells are promoted to `Float`,
/// empty cells (missing values) become `Null`, and everything else (ISO 8601
/// timestamps, station labels) stays `Text`.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Float(f64),
    Text(String),
    Null,
}

impl DataValue {
    fn parse(cell: &str) -> Self {
        let cell = cell.trim();
        if cell.is_empty() {
            return DataValue::Null;
        }
        match cell.parse::<f64>() {
            Ok(v) => DataValue::Float(v),
            Err(_) => DataValue::Text(cell.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Float(v) => write!(f, "{v}"),
            DataValue::Text(s) => write!(f, "{s}"),
            DataValue::Null => write!(f, ""),
        }
    }
}

/// One named column of a tabledap result.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub units: Option<String>,
    pub values: Vec<DataValue>,
}

/// A row-oriented tabledap result, stored column-wise.
#[derive(Debug, Clone)]
pub struct Table {
    pub columns: Vec<Column>,
}

impl Table {
    /// Decodes an ERDDAP `.csv` response: one column-name row, one units row,
    /// then data rows.
    pub(crate) fn from_csv(bytes: &[u8]) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);
        let mut records = reader.records();

        let header = match records.next() {
            Some(record) => record.context("reading CSV column names")?,
            None => bail!("empty CSV response"),
        };
        let mut columns: Vec<Column> = header
            .iter()
            .map(|name| Column {
                name: name.trim().to_string(),
                units: None,
                values: Vec::new(),
            })
            .collect();

        if let Some(units_row) = records.next() {
            let units_row = units_row.context("reading CSV units row")?;
            if units_row.len() != columns.len() {
                bail!(
                    "CSV units row has {} fields, expected {}",
                    units_row.len(),
                    columns.len()
                );
            }
            for (column, units) in columns.iter_mut().zip(units_row.iter()) {
                let units = units.trim();
                if !units.is_empty() {
                    column.units = Some(units.to_string());
                }
            }
        }

        for (i, record) in records.enumerate() {
            let record = record.with_context(|| format!("reading CSV data row {i}"))?;
            if record.len() != columns.len() {
                bail!(
                    "CSV data row {i} has {} fields, expected {}",
                    record.len(),
                    columns.len()
                );
            }
            for (column, cell) in columns.iter_mut().zip(record.iter()) {
                column.values.push(DataValue::parse(cell));
            }
        }

        Ok(Table { columns })
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }
}

/// One coordinate axis of a gridded result, with its distinct values in grid
/// order.
#[derive(Debug, Clone)]
pub struct GridAxis {
    pub name: String,
    pub units: Option<String>,
    pub values: Vec<DataValue>,
}

impl GridAxis {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One data variable of a gridded result, shaped by the coordinate axes.
#[derive(Debug, Clone)]
pub struct GridVariable {
    pub name: String,
    pub units: Option<String>,
    pub data: ArrayD<f64>,
}

/// A multidimensional labeled array keyed by its coordinate variables, the
/// griddap counterpart of a [`Table`].
#[derive(Debug, Clone)]
pub struct GridDataset {
    pub axes: Vec<GridAxis>,
    pub variables: Vec<GridVariable>,
}

impl GridDataset {
    /// Reshapes a row-major grid CSV (axis columns first, then data columns)
    /// into labeled arrays. Missing cells become NaN.
    pub(crate) fn from_table(table: &Table, axis_names: &[String]) -> Result<GridDataset> {
        let mut axes = Vec::with_capacity(axis_names.len());
        for name in axis_names {
            let column = table.column(name).ok_or_else(|| {
                anyhow!("grid response is missing the [{name}] dimension column")
            })?;
            let mut values: Vec<DataValue> = Vec::new();
            for value in &column.values {
                if !values.contains(value) {
                    values.push(value.clone());
                }
            }
            axes.push(GridAxis {
                name: name.clone(),
                units: column.units.clone(),
                values,
            });
        }

        let shape: Vec<usize> = axes.iter().map(|a| a.values.len()).collect();
        let expected: usize = shape.iter().product();
        if expected != table.n_rows() {
            bail!(
                "grid response has {} rows but the coordinate shape {:?} implies {}",
                table.n_rows(),
                shape,
                expected
            );
        }

        let mut variables = Vec::new();
        for column in &table.columns {
            if axis_names.iter().any(|n| n == &column.name) {
                continue;
            }
            let mut flat = Vec::with_capacity(column.values.len());
            for (i, value) in column.values.iter().enumerate() {
                match value {
                    DataValue::Float(v) => flat.push(*v),
                    DataValue::Null => flat.push(f64::NAN),
                    DataValue::Text(s) => bail!(
                        "grid variable [{}] has non-numeric value [{s}] at row {i}",
                        column.name
                    ),
                }
            }
            let data = ArrayD::from_shape_vec(IxDyn(&shape), flat)
                .with_context(|| format!("reshaping grid variable [{}]", column.name))?;
            variables.push(GridVariable {
                name: column.name.clone(),
                units: column.units.clone(),
                data,
            });
        }

        if variables.is_empty() {
            bail!("grid response contains no data variables");
        }

        Ok(GridDataset { axes, variables })
    }

    /// The coordinate shape, one extent per axis in dimension order.
    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(|a| a.values.len()).collect()
    }

    pub fn axis(&self, name: &str) -> Option<&GridAxis> {
        self.axes.iter().find(|a| a.name == name)
    }

    pub fn variable(&self, name: &str) -> Option<&GridVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }
}

/// The result of a fetch: gridded for griddap, tabular for tabledap.
#[derive(Debug, Clone)]
pub enum ErddapData {
    Grid(GridDataset),
    Table(Table),
}

impl ErddapData {
    pub fn as_grid(&self) -> Option<&GridDataset> {
        match self {
            ErddapData::Grid(grid) => Some(grid),
            ErddapData::Table(_) => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            ErddapData::Table(table) => Some(table),
            ErddapData::Grid(_) => None,
        }
    }
}
