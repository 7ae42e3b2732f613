//! Model invocation contract.
//!
//! The analysis engine only ever sees a [`Model`]: something that maps the
//! feature tensor `(1, frames, mel_bands)` to a flat prediction vector.
//! [`ModelLoader`] produces one on `initialize`.

pub mod dense;
pub mod source;

use ndarray::ArrayView3;

use crate::error::Result;

pub use dense::{Activation, DenseModel};
pub use source::ModelSource;

pub trait Model: Send + Sync {
    /// Run inference, returning the flattened output tensor.
    fn predict(&self, input: ArrayView3<'_, f32>) -> Result<Vec<f32>>;
}

pub trait ModelLoader: Send + Sync {
    fn load(&self) -> Result<Box<dyn Model>>;
}

impl<F> ModelLoader for F
where
    F: Fn() -> Result<Box<dyn Model>> + Send + Sync,
{
    fn load(&self) -> Result<Box<dyn Model>> {
        self()
    }
}
