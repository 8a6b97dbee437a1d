/// Type inferred for a whole column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Rows and named columns parsed from a delimited text file.
///
/// Rows are positional: `rows[i][j]` is the value of `columns[j]` in the
/// i-th data row of the file.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Panics if a row does not have one value per column.
    pub fn from_parts(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Dataset {
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(
                row.len(),
                columns.len(),
                "row {} has {} values for {} columns",
                i,
                row.len(),
                columns.len()
            );
        }
        Dataset { columns, rows }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a cell by row index and column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let j = self.columns.iter().position(|c| c.name == column)?;
        self.rows.get(row).map(|r| &r[j])
    }

    /// Count the non-null values of each column, in column order.
    pub fn non_null_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.columns.len()];
        for row in &self.rows {
            for (j, value) in row.iter().enumerate() {
                if !value.is_null() {
                    counts[j] += 1;
                }
            }
        }
        counts
    }
}
