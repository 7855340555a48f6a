//! Container format codec
//!
//! The container is a single self-describing binary artifact: an 8-byte
//! magic signature, a format version, a length-prefixed JSON header (artifact
//! metadata plus the graph config), then a SafeTensors blob holding every
//! variable keyed `"{layer}/{variable}"`. The signature alone identifies the
//! format; validity is checkable without parsing the rest of the file.

use crate::config::GraphConfig;
use crate::graph::ModelGraph;
use crate::weights::{LayerWeights, TensorRecord, WeightSet};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use safetensors::tensor::{Dtype, TensorView};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Magic bytes opening every container artifact
pub const CONTAINER_MAGIC: [u8; 8] = *b"\x89GDR\r\n\x1a\n";

/// Container format version written by this crate
pub const FORMAT_VERSION: u32 = 1;

// magic + version + header length
const PREFIX_LEN: usize = 8 + 4 + 8;

/// Artifact-level metadata stored in the container header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Model name, if the graph has one
    pub name: Option<String>,

    /// Producing library identifier
    pub library: String,

    /// Save timestamp
    pub saved_at: DateTime<Utc>,
}

impl ArtifactMetadata {
    fn new(name: Option<&str>) -> Self {
        Self {
            name: name.map(str::to_string),
            library: "guardar".to_string(),
            saved_at: Utc::now(),
        }
    }
}

/// JSON header of a container artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerHeader {
    pub metadata: ArtifactMetadata,
    pub graph: GraphConfig,

    /// Tensor keys in declaration order; entries for one layer are contiguous.
    /// The weight payload indexes tensors by name, so this list is what
    /// preserves layer and variable order across a round trip.
    pub tensors: Vec<String>,
}

/// Check whether the file at `path` carries the container signature.
///
/// Reads only the first 8 bytes; a missing or unreadable file is simply not
/// a container.
pub fn is_container(path: impl AsRef<Path>) -> bool {
    let mut signature = [0u8; 8];
    match File::open(path) {
        Ok(mut file) => file.read_exact(&mut signature).is_ok() && signature == CONTAINER_MAGIC,
        Err(_) => false,
    }
}

/// Check whether an in-memory buffer starts with the container signature
pub fn matches_signature(data: &[u8]) -> bool {
    data.len() >= CONTAINER_MAGIC.len() && data[..CONTAINER_MAGIC.len()] == CONTAINER_MAGIC
}

/// Encode a graph (config + weights) into container bytes
pub fn encode(graph: &ModelGraph) -> Result<Vec<u8>> {
    let weights = WeightSet::extract(graph);
    let tensor_data: Vec<(String, Vec<u8>, Vec<usize>)> = weights
        .layers
        .iter()
        .flat_map(|lw| {
            lw.tensors.iter().map(move |t| {
                let bytes: Vec<u8> = bytemuck::cast_slice(&t.data).to_vec();
                (format!("{}/{}", lw.layer, t.name), bytes, t.shape.clone())
            })
        })
        .collect();

    let header = ContainerHeader {
        metadata: ArtifactMetadata::new(graph.name()),
        graph: GraphConfig::from_graph(graph),
        tensors: tensor_data.iter().map(|(name, _, _)| name.clone()).collect(),
    };
    let mut header_json = serde_json::to_vec(&header)
        .map_err(|e| Error::Serialization(format!("container header serialization failed: {e}")))?;
    // Pad with spaces so the weight payload starts 8-byte aligned
    while (PREFIX_LEN + header_json.len()) % 8 != 0 {
        header_json.push(b' ');
    }

    let views: Vec<(&str, TensorView<'_>)> = tensor_data
        .iter()
        .map(|(name, bytes, shape)| {
            let view = TensorView::new(Dtype::F32, shape.clone(), bytes).unwrap();
            (name.as_str(), view)
        })
        .collect();

    let mut st_metadata = HashMap::new();
    st_metadata.insert("library".to_string(), "guardar".to_string());
    if let Some(name) = graph.name() {
        st_metadata.insert("name".to_string(), name.to_string());
    }
    let payload = safetensors::serialize(views, &Some(st_metadata))
        .map_err(|e| Error::Serialization(format!("weight serialization failed: {e}")))?;

    let mut out = Vec::with_capacity(PREFIX_LEN + header_json.len() + payload.len());
    out.extend_from_slice(&CONTAINER_MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&(header_json.len() as u64).to_le_bytes());
    out.extend_from_slice(&header_json);
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode container bytes into the header and stored weights
pub fn decode(data: &[u8]) -> Result<(ContainerHeader, WeightSet)> {
    if !matches_signature(data) {
        return Err(Error::UnrecognizedFormat(
            "missing container signature".to_string(),
        ));
    }
    if data.len() < PREFIX_LEN {
        return Err(Error::Serialization("truncated container".to_string()));
    }
    let version = u32::from_le_bytes(
        data[8..12]
            .try_into()
            .map_err(|_| Error::Serialization("truncated container".to_string()))?,
    );
    if version != FORMAT_VERSION {
        return Err(Error::UnrecognizedFormat(format!(
            "unsupported container version {version}"
        )));
    }
    let header_len = u64::from_le_bytes(
        data[12..20]
            .try_into()
            .map_err(|_| Error::Serialization("truncated container".to_string()))?,
    ) as usize;
    let header_end = PREFIX_LEN
        .checked_add(header_len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| Error::Serialization("truncated container header".to_string()))?;

    let header: ContainerHeader = serde_json::from_slice(&data[PREFIX_LEN..header_end])
        .map_err(|e| Error::Serialization(format!("container header parsing failed: {e}")))?;

    let tensors = safetensors::SafeTensors::deserialize(&data[header_end..])
        .map_err(|e| Error::Serialization(format!("weight payload parsing failed: {e}")))?;

    // The payload indexes tensors by name; the header manifest restores
    // layer and variable declaration order.
    let mut layers: Vec<LayerWeights> = Vec::new();
    for key in &header.tensors {
        let view = tensors.tensor(key).map_err(|e| {
            Error::Serialization(format!("tensor `{key}` missing from weight payload: {e}"))
        })?;
        let (layer, name) = key.rsplit_once('/').ok_or_else(|| {
            Error::Serialization(format!("malformed tensor key `{key}` in weight payload"))
        })?;
        if view.dtype() != Dtype::F32 {
            return Err(Error::Serialization(format!(
                "tensor `{key}` has unsupported dtype {:?}",
                view.dtype()
            )));
        }
        let record = TensorRecord {
            name: name.to_string(),
            shape: view.shape().to_vec(),
            dtype: "f32".to_string(),
            data: bytemuck::pod_collect_to_vec(view.data()),
        };
        match layers.last_mut() {
            Some(lw) if lw.layer == layer => lw.tensors.push(record),
            _ => layers.push(LayerWeights {
                layer: layer.to_string(),
                tensors: vec![record],
            }),
        }
    }

    Ok((header, WeightSet { layers }))
}
