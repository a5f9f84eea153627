//! Column storage backed by `ndarray`.
use crate::BatchBase;
use ndarray::{ArrayD, Axis, IxDyn};

/// Column storage of fixed-shape `f32` arrays.
///
/// The first dimension indexes slots. The shape of the remaining dimensions
/// is taken from the first item pushed.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayBatch {
    capacity: usize,
    data: Option<ArrayD<f32>>,
}

impl ArrayBatch {
    /// Returns the stored array of shape `[n, item_shape...]`, if any item was pushed.
    pub fn array(&self) -> Option<&ArrayD<f32>> {
        self.data.as_ref()
    }

    /// Consumes the batch and returns the stored array.
    pub fn into_array(self) -> Option<ArrayD<f32>> {
        self.data
    }

    /// Returns the shape of a single item.
    pub fn item_shape(&self) -> Option<&[usize]> {
        self.data.as_ref().map(|a| &a.shape()[1..])
    }
}

impl BatchBase for ArrayBatch {
    type Item = ArrayD<f32>;

    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            data: None,
        }
    }

    /// # Panics
    ///
    /// Panics if the shape of `item` differs from the shape of the first item.
    fn push(&mut self, ix: usize, item: Self::Item) {
        let capacity = self.capacity;
        let data = self.data.get_or_insert_with(|| {
            let mut shape = vec![capacity];
            shape.extend_from_slice(item.shape());
            ArrayD::zeros(IxDyn(&shape))
        });
        assert_eq!(&data.shape()[1..], item.shape(), "item shape mismatch");
        data.index_axis_mut(Axis(0), ix).assign(&item);
    }

    fn sample(&self, ixs: &[usize]) -> Self {
        Self {
            capacity: ixs.len(),
            data: self.data.as_ref().map(|a| a.select(Axis(0), ixs)),
        }
    }
}

/// Column storage of multi-modal observations.
///
/// Each item is a list of arrays, one per modality. Sampling transposes the
/// items into one [`ArrayBatch`] per modality.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiArrayBatch {
    capacity: usize,
    modalities: Vec<ArrayBatch>,
}

impl MultiArrayBatch {
    /// Returns the per-modality batches.
    pub fn modalities(&self) -> &[ArrayBatch] {
        &self.modalities
    }

    /// Consumes the batch and returns one array per modality.
    pub fn into_arrays(self) -> Vec<ArrayD<f32>> {
        self.modalities
            .into_iter()
            .filter_map(ArrayBatch::into_array)
            .collect()
    }
}

impl BatchBase for MultiArrayBatch {
    type Item = Vec<ArrayD<f32>>;

    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            modalities: vec![],
        }
    }

    /// # Panics
    ///
    /// Panics if the number of modalities or their shapes change between items.
    fn push(&mut self, ix: usize, item: Self::Item) {
        if self.modalities.is_empty() {
            self.modalities = (0..item.len())
                .map(|_| ArrayBatch::new(self.capacity))
                .collect();
        }
        assert_eq!(self.modalities.len(), item.len(), "number of modalities mismatch");
        for (m, a) in self.modalities.iter_mut().zip(item.into_iter()) {
            m.push(ix, a);
        }
    }

    fn sample(&self, ixs: &[usize]) -> Self {
        Self {
            capacity: ixs.len(),
            modalities: self.modalities.iter().map(|m| m.sample(ixs)).collect(),
        }
    }
}
