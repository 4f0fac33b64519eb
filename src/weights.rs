//! Weight tensors and the on-disk weight file codec
//!
//! The weight file (`model.pt` by default) is a binary document: an 8-byte
//! little-endian header length, a JSON header mapping parameter names to
//! dtype/shape/offsets, then a raw little-endian f32 payload. The contract
//! is that a name -> tensor mapping round-trips exactly.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Default weight file name inside a model directory
pub const WEIGHTS_FILENAME: &str = "model.pt";

/// Upper bound on the JSON header, matching the reference format
const MAX_HEADER_BYTES: usize = 100_000_000;

/// A dense f32 tensor: shape plus row-major values
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Zero-filled tensor of the given shape
    pub fn zeros(shape: &[usize]) -> Self {
        let numel = shape.iter().product();
        Self {
            shape: shape.to_vec(),
            data: vec![0.0; numel],
        }
    }

    /// Build a tensor from raw values; `None` if the value count does not
    /// match the shape
    pub fn from_vec(shape: Vec<usize>, data: Vec<f32>) -> Option<Self> {
        if shape.iter().product::<usize>() != data.len() {
            return None;
        }
        Some(Self { shape, data })
    }

    /// 1-D tensor holding the given values
    pub fn from_data(data: Vec<f32>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }
}

/// Mapping from parameter name to tensor
pub type StateDict = BTreeMap<String, Tensor>;

/// Per-tensor header entry
#[derive(Debug, Serialize, Deserialize)]
struct TensorInfo {
    dtype: String,
    shape: Vec<usize>,
    data_offsets: [usize; 2],
}

/// Serialize a state dict to `path`, overwriting any existing file
pub fn save_state(path: &Path, state: &StateDict) -> Result<()> {
    let mut header = BTreeMap::new();
    let mut offset = 0usize;
    for (name, tensor) in state {
        let nbytes = tensor.numel() * 4;
        header.insert(
            name.clone(),
            TensorInfo {
                dtype: "F32".to_string(),
                shape: tensor.shape.clone(),
                data_offsets: [offset, offset + nbytes],
            },
        );
        offset += nbytes;
    }
    let header_bytes = serde_json::to_vec(&header)?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&(header_bytes.len() as u64).to_le_bytes())?;
    writer.write_all(&header_bytes)?;
    for tensor in state.values() {
        for value in &tensor.data {
            writer.write_all(&value.to_le_bytes())?;
        }
    }
    writer.flush()?;

    tracing::debug!(path = %path.display(), tensors = state.len(), "wrote weight file");
    Ok(())
}

/// Read a state dict back from `path`
///
/// Fails with [`Error::NotFound`] when the file is absent and
/// [`Error::CorruptWeights`] when it cannot be decoded.
pub fn load_state(path: &Path) -> Result<StateDict> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            Error::NotFound(format!("weight file `{}`", path.display()))
        }
        _ => Error::Io(e),
    })?;
    let mut reader = BufReader::new(file);

    let mut len_bytes = [0u8; 8];
    reader
        .read_exact(&mut len_bytes)
        .map_err(|_| corrupt(path, "missing header length"))?;
    let header_len = u64::from_le_bytes(len_bytes) as usize;
    if header_len == 0 || header_len > MAX_HEADER_BYTES {
        return Err(corrupt(path, "implausible header length"));
    }

    let mut header_bytes = vec![0u8; header_len];
    reader
        .read_exact(&mut header_bytes)
        .map_err(|_| corrupt(path, "truncated header"))?;
    let header: BTreeMap<String, serde_json::Value> = serde_json::from_slice(&header_bytes)
        .map_err(|e| corrupt(path, &format!("invalid header: {e}")))?;

    let mut payload = Vec::new();
    reader.read_to_end(&mut payload)?;

    let mut state = StateDict::new();
    for (name, info) in header {
        if name == "__metadata__" {
            continue;
        }
        let info: TensorInfo = serde_json::from_value(info)
            .map_err(|e| corrupt(path, &format!("bad entry for `{name}`: {e}")))?;
        if info.dtype != "F32" {
            return Err(corrupt(
                path,
                &format!("unsupported dtype `{}` for `{name}`", info.dtype),
            ));
        }
        let [start, end] = info.data_offsets;
        if start > end || end > payload.len() {
            return Err(corrupt(path, &format!("offsets out of range for `{name}`")));
        }
        let bytes = &payload[start..end];
        if bytes.len() != info.shape.iter().product::<usize>() * 4 {
            return Err(corrupt(
                path,
                &format!("payload size does not match shape for `{name}`"),
            ));
        }
        let data: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        // from_vec cannot fail here, the size was checked against the shape
        let tensor = Tensor::from_vec(info.shape, data)
            .ok_or_else(|| corrupt(path, &format!("shape mismatch for `{name}`")))?;
        state.insert(name, tensor);
    }
    Ok(state)
}

fn corrupt(path: &Path, detail: &str) -> Error {
    Error::CorruptWeights(format!("{}: {detail}", path.display()))
}
