//! A validated, immutable table of rows.

use std::fmt;

use ndarray::{s, Array2, ArrayView1, ArrayView2, Axis};

use super::DatasetError;

/// The role a partition plays in a fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionRole {
    Train,
    Variance,
    Validate,
    Test,
}

impl fmt::Display for PartitionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Train => "train",
            Self::Variance => "variance",
            Self::Validate => "validate",
            Self::Test => "test",
        };
        f.write_str(name)
    }
}

/// Row-major table `[n_rows, dimension]`; the last column is the output.
///
/// Stored in standard (C) layout so each row is a contiguous slice.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    rows: Array2<f64>,
}

impl Partition {
    /// Validate and wrap a row-major table.
    ///
    /// # Errors
    ///
    /// - [`DatasetError::Empty`] if there are no rows
    /// - [`DatasetError::DimensionTooSmall`] if there are fewer than 2 columns
    /// - [`DatasetError::NonFinite`] if any value is NaN or infinite
    pub fn new(rows: Array2<f64>, role: PartitionRole) -> Result<Self, DatasetError> {
        if rows.nrows() == 0 {
            return Err(DatasetError::Empty { role });
        }
        if rows.ncols() < 2 {
            return Err(DatasetError::DimensionTooSmall(rows.ncols()));
        }
        for ((row, column), value) in rows.indexed_iter() {
            if !value.is_finite() {
                return Err(DatasetError::NonFinite { row, column });
            }
        }
        let rows = if rows.is_standard_layout() {
            rows
        } else {
            rows.as_standard_layout().into_owned()
        };
        Ok(Self { rows })
    }

    /// Build from a slice of rows.
    ///
    /// # Errors
    ///
    /// As [`Partition::new`], plus [`DatasetError::RaggedRows`] when rows
    /// differ in width.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R], role: PartitionRole) -> Result<Self, DatasetError> {
        let Some(first) = rows.first() else {
            return Err(DatasetError::Empty { role });
        };
        let dimension = first.as_ref().len();
        let mut data = Vec::with_capacity(rows.len() * dimension);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != dimension {
                return Err(DatasetError::RaggedRows {
                    row: i,
                    expected: dimension,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        let table = Array2::from_shape_vec((rows.len(), dimension), data)
            .map_err(|_| DatasetError::DimensionTooSmall(dimension))?;
        Self::new(table, role)
    }

    /// Number of rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.rows.nrows()
    }

    /// Number of columns (inputs + 1 output).
    #[inline]
    pub fn dimension(&self) -> usize {
        self.rows.ncols()
    }

    /// Number of input columns.
    #[inline]
    pub fn n_inputs(&self) -> usize {
        self.dimension() - 1
    }

    /// A full row (inputs followed by the output).
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        let start = i * self.dimension();
        &self.as_slice()[start..start + self.dimension()]
    }

    /// The input part of a row.
    #[inline]
    pub fn inputs(&self, i: usize) -> &[f64] {
        &self.row(i)[..self.n_inputs()]
    }

    /// The output value of a row.
    #[inline]
    pub fn target(&self, i: usize) -> f64 {
        self.rows[[i, self.n_inputs()]]
    }

    /// All output values.
    pub fn targets(&self) -> Vec<f64> {
        self.column(self.n_inputs()).to_vec()
    }

    /// A single column.
    #[inline]
    pub fn column(&self, j: usize) -> ArrayView1<'_, f64> {
        self.rows.column(j)
    }

    /// The whole table.
    #[inline]
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.rows.view()
    }

    /// The input columns.
    #[inline]
    pub fn input_view(&self) -> ArrayView2<'_, f64> {
        self.rows.slice(s![.., ..self.n_inputs()])
    }

    /// Iterate over full rows.
    pub fn iter_rows(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.as_slice().chunks_exact(self.dimension())
    }

    /// Copy the given rows, in the given order, into a new partition.
    ///
    /// # Panics
    ///
    /// Panics if `indices` is empty or contains an out-of-range index.
    pub fn select(&self, indices: &[usize]) -> Partition {
        assert!(!indices.is_empty(), "cannot select an empty partition");
        Partition {
            rows: self.rows.select(Axis(0), indices),
        }
    }

    /// Stack `other` below `self`.
    ///
    /// # Errors
    ///
    /// [`DatasetError::DimensionMismatch`] if the widths differ.
    pub fn concat(&self, other: &Partition, role: PartitionRole) -> Result<Partition, DatasetError> {
        if other.dimension() != self.dimension() {
            return Err(DatasetError::DimensionMismatch {
                role,
                expected: self.dimension(),
                actual: other.dimension(),
            });
        }
        let rows = ndarray::concatenate(Axis(0), &[self.rows.view(), other.rows.view()])
            .map_err(|_| DatasetError::DimensionMismatch {
                role,
                expected: self.dimension(),
                actual: other.dimension(),
            })?;
        Ok(Partition { rows })
    }

    fn as_slice(&self) -> &[f64] {
        self.rows
            .as_slice()
            .expect("partition rows are stored in standard layout")
    }
}
