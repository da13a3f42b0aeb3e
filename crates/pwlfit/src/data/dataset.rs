//! Dataset container grouping partitions by role.

use super::{DatasetError, Partition, PartitionRole};

/// The partitions of one fit.
///
/// A train partition is mandatory. All other partitions are optional but must
/// share its dimension.
///
/// # Example
///
/// ```
/// use pwlfit::data::{Dataset, Partition, PartitionRole};
///
/// let rows: Vec<[f64; 2]> = (0..10).map(|i| [i as f64, i as f64]).collect();
/// let train = Partition::from_rows(&rows, PartitionRole::Train).unwrap();
/// let ds = Dataset::new(train);
///
/// assert_eq!(ds.n_inputs(), 1);
/// assert_eq!(ds.training_rows().n_rows(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct Dataset {
    train: Partition,
    variance: Option<Partition>,
    validate: Option<Partition>,
    test: Option<Partition>,
    /// Train followed by variance rows, built when variance rows are attached.
    combined: Option<Partition>,
}

impl Dataset {
    pub fn new(train: Partition) -> Self {
        Self {
            train,
            variance: None,
            validate: None,
            test: None,
            combined: None,
        }
    }

    /// Attach extra rows used only for noise estimation and training.
    pub fn with_variance(self, variance: Partition) -> Result<Self, DatasetError> {
        let combined = self.train.concat(&variance, PartitionRole::Variance)?;
        Ok(Self {
            variance: Some(variance),
            combined: Some(combined),
            ..self
        })
    }

    /// Attach rows used for the ensemble report.
    pub fn with_validate(self, validate: Partition) -> Result<Self, DatasetError> {
        self.check_dimension(&validate, PartitionRole::Validate)?;
        Ok(Self {
            validate: Some(validate),
            ..self
        })
    }

    /// Attach held-out rows evaluated once at the end of a fit.
    pub fn with_test(self, test: Partition) -> Result<Self, DatasetError> {
        self.check_dimension(&test, PartitionRole::Test)?;
        Ok(Self {
            test: Some(test),
            ..self
        })
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.train.dimension()
    }

    #[inline]
    pub fn n_inputs(&self) -> usize {
        self.train.n_inputs()
    }

    /// The partition with a given role, if present.
    pub fn partition(&self, role: PartitionRole) -> Option<&Partition> {
        match role {
            PartitionRole::Train => Some(&self.train),
            PartitionRole::Variance => self.variance.as_ref(),
            PartitionRole::Validate => self.validate.as_ref(),
            PartitionRole::Test => self.test.as_ref(),
        }
    }

    /// Train rows followed by variance rows.
    pub fn training_rows(&self) -> &Partition {
        self.combined.as_ref().unwrap_or(&self.train)
    }

    /// Validate rows, falling back to the training rows.
    pub fn report_rows(&self) -> &Partition {
        self.validate.as_ref().unwrap_or_else(|| self.training_rows())
    }

    fn check_dimension(&self, other: &Partition, role: PartitionRole) -> Result<(), DatasetError> {
        if other.dimension() != self.dimension() {
            return Err(DatasetError::DimensionMismatch {
                role,
                expected: self.dimension(),
                actual: other.dimension(),
            });
        }
        Ok(())
    }
}
