//! The receiver's table of accepted datasets.
//!
//! A receiver only stores frames whose identifier appears in its registry, and
//! it expects exactly the registered number of payload bytes for that
//! identifier. The table is built once, validated, and never changes while the
//! receiver is running.

use crate::consts::MAX_DATASET_LEN;
use crate::error::LinkError;

/// Called from the edge interrupt when a dataset has been fully received.
///
/// Receives the dataset's registry index and its arrival timestamp. Runs in
/// interrupt context: keep it short and do not touch the receiver from it.
pub type CompletionHook = fn(index: u8, timestamp: u32);

/// One receivable dataset.
#[derive(Debug, Clone, Copy)]
pub struct RxDataset {
    id: u8,
    size: u8,
    on_complete: Option<CompletionHook>,
}

/// Hooks compare by address.
impl PartialEq for RxDataset {
    fn eq(&self, other: &Self) -> bool {
        let same_hook = match (self.on_complete, other.on_complete) {
            (Some(a), Some(b)) => core::ptr::fn_addr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        self.id == other.id && self.size == other.size && same_hook
    }
}

impl Eq for RxDataset {}

impl RxDataset {
    /// Describes a dataset of `size` payload bytes sent under `id`.
    ///
    /// # Errors
    /// [`LinkError::InvalidDatasetSize`] if `size` is zero.
    pub const fn new(id: u8, size: u8) -> Result<Self, LinkError> {
        if size == 0 {
            return Err(LinkError::InvalidDatasetSize);
        }
        Ok(Self {
            id,
            size,
            on_complete: None,
        })
    }

    /// Attaches a hook invoked when this dataset becomes available.
    pub const fn with_hook(mut self, hook: CompletionHook) -> Self {
        self.on_complete = Some(hook);
        self
    }

    /// The dataset identifier.
    pub const fn id(&self) -> u8 {
        self.id
    }

    /// Payload size in bytes.
    pub const fn size(&self) -> u8 {
        self.size
    }

    /// The completion hook, if any.
    pub const fn hook(&self) -> Option<CompletionHook> {
        self.on_complete
    }
}

/// An ordered, non-empty set of datasets with unique identifiers.
#[derive(Debug, Clone, Copy)]
pub struct Registry<'r> {
    datasets: &'r [RxDataset],
    max_size: u8,
}

impl<'r> Registry<'r> {
    /// Validates `datasets`.
    ///
    /// # Errors
    /// - [`LinkError::EmptyRegistry`] for an empty slice
    /// - [`LinkError::RegistryTooLarge`] for more than 255 entries
    /// - [`LinkError::DuplicateId`] when an identifier repeats
    pub fn new(datasets: &'r [RxDataset]) -> Result<Self, LinkError> {
        if datasets.is_empty() {
            return Err(LinkError::EmptyRegistry);
        }
        if datasets.len() > MAX_DATASET_LEN as usize {
            return Err(LinkError::RegistryTooLarge);
        }
        for (i, dataset) in datasets.iter().enumerate() {
            if datasets[..i].iter().any(|other| other.id == dataset.id) {
                return Err(LinkError::DuplicateId(dataset.id));
            }
        }
        let max_size = datasets.iter().map(RxDataset::size).max().unwrap_or(0);
        Ok(Self { datasets, max_size })
    }

    /// Linear lookup of `id`, returning the registry index and entry.
    pub fn find(&self, id: u8) -> Option<(u8, &'r RxDataset)> {
        self.datasets
            .iter()
            .enumerate()
            .find(|(_, dataset)| dataset.id == id)
            .map(|(index, dataset)| (index as u8, dataset))
    }

    /// Entry at `index`.
    pub fn get(&self, index: u8) -> Option<&'r RxDataset> {
        self.datasets.get(index as usize)
    }

    /// The largest registered payload.
    pub const fn max_size(&self) -> u8 {
        self.max_size
    }

    /// Number of registered datasets.
    pub const fn len(&self) -> usize {
        self.datasets.len()
    }

    /// Always `false`; a registry cannot be empty.
    pub const fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}
