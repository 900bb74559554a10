//! SafeTensors I/O for model parameters
//!
//! Weights files are memory-mapped and decoded into f32 arrays keyed by
//! layer name. The SHA-256 digest of the raw file is computed alongside so
//! the live artifact can be identified in logs.

use super::ModelError;
use memmap2::Mmap;
use ndarray::{ArrayD, IxDyn};
use safetensors::tensor::{Dtype, TensorView};
use safetensors::SafeTensors;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

/// Parameter tensors keyed by layer name
pub type TensorMap = BTreeMap<String, ArrayD<f32>>;

/// A decoded weights file
#[derive(Debug)]
pub struct WeightsFile {
    pub tensors: TensorMap,
    pub sha256: String,
    pub size_bytes: usize,
}

/// Read and decode every tensor in a SafeTensors file.
pub fn read_weights(path: &Path) -> Result<WeightsFile, ModelError> {
    let file = File::open(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    // The mapping is read-only and dropped before this function returns.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let sha256 = hex::encode(Sha256::digest(&mmap[..]));
    let st = SafeTensors::deserialize(&mmap).map_err(|e| ModelError::Format(e.to_string()))?;

    let mut tensors = TensorMap::new();
    for (name, view) in st.tensors() {
        if view.dtype() != Dtype::F32 {
            return Err(ModelError::UnsupportedDtype {
                name,
                dtype: format!("{:?}", view.dtype()),
            });
        }

        let values: Vec<f32> = view
            .data()
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        let array = ArrayD::from_shape_vec(IxDyn(view.shape()), values)
            .map_err(|e| ModelError::Format(format!("tensor '{}': {}", name, e)))?;

        tensors.insert(name, array);
    }

    Ok(WeightsFile {
        tensors,
        sha256,
        size_bytes: mmap.len(),
    })
}

/// Serialize tensors to a SafeTensors file at `path`.
pub fn write_weights(path: &Path, tensors: &TensorMap) -> Result<(), ModelError> {
    let buffers: Vec<(&String, Vec<usize>, Vec<u8>)> = tensors
        .iter()
        .map(|(name, array)| {
            let bytes = array.iter().flat_map(|v| v.to_le_bytes()).collect();
            (name, array.shape().to_vec(), bytes)
        })
        .collect();

    let mut views = BTreeMap::new();
    for (name, shape, bytes) in &buffers {
        let view = TensorView::new(Dtype::F32, shape.clone(), bytes)
            .map_err(|e| ModelError::Format(format!("tensor '{}': {}", name, e)))?;
        views.insert(name.to_string(), view);
    }

    let serialized =
        safetensors::serialize(&views, &None).map_err(|e| ModelError::Format(e.to_string()))?;
    std::fs::write(path, serialized).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })
}
