//! Save and load the forest and the id map.
//!
//! Requires the `persistence` feature flag (on by default).
//!
//! The forest is a single binary blob: a fixed header (magic, format
//! version, metric id, dim, n, ntree) followed by each tree's nodes in
//! pre-order, so reload is a single forward pass with no pointer fixup.
//! The id map is a stream of JSON-lines records, one `(index, id)` pair per
//! line, order-insensitive on reload.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::distance::DistanceMetric;
use crate::error::{ForestError, Result};
use crate::forest::ForestIndex;
use crate::store::IdIndexMap;
use crate::tree::{Node, PartitionTree};

const MAGIC: [u8; 4] = *b"ANNF";
const FORMAT_VERSION: u8 = 1;

const TAG_INTERNAL: u8 = 0;
const TAG_LEAF: u8 = 1;

/// Well-formed trees are near-balanced; anything deeper than this is not a
/// blob we wrote.
const MAX_NODE_DEPTH: usize = 512;

// ---------------------------------------------------------------------------
// Forest blob
// ---------------------------------------------------------------------------

impl ForestIndex {
    /// Serialize the forest to a writer.
    pub fn save_forest<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_all(&[FORMAT_VERSION, self.metric.to_tag()])?;
        writer.write_all(&(self.dim as u64).to_le_bytes())?;
        writer.write_all(&(self.n as u64).to_le_bytes())?;
        writer.write_all(&(self.trees.len() as u64).to_le_bytes())?;

        for tree in &self.trees {
            write_node(&mut writer, &tree.root)?;
        }
        writer.flush()?;

        debug!(ntree = self.trees.len(), n = self.n, "forest saved");
        Ok(())
    }

    /// Deserialize a forest from a reader.
    ///
    /// Fails with [`ForestError::CorruptIndex`] on truncated, malformed, or
    /// inconsistent input; no partial forest is ever returned.
    pub fn load_forest<R: Read>(reader: R) -> Result<Self> {
        let mut reader = BlobReader { inner: reader };

        let magic = reader.read_bytes::<4>()?;
        if magic != MAGIC {
            return Err(ForestError::CorruptIndex("bad magic bytes".into()));
        }
        let version = reader.read_u8()?;
        if version != FORMAT_VERSION {
            return Err(ForestError::CorruptIndex(format!(
                "unsupported format version {version}"
            )));
        }
        let metric_tag = reader.read_u8()?;
        let metric = DistanceMetric::from_tag(metric_tag).ok_or_else(|| {
            ForestError::CorruptIndex(format!("unknown metric id {metric_tag}"))
        })?;

        let dim = reader.read_u64()? as usize;
        let n = reader.read_u64()? as usize;
        let ntree = reader.read_u64()? as usize;
        if dim == 0 || n == 0 {
            return Err(ForestError::CorruptIndex(format!(
                "inconsistent header: dim={dim}, n={n}"
            )));
        }

        let mut trees = Vec::with_capacity(ntree.min(1024));
        for _ in 0..ntree {
            let root = read_node(&mut reader, dim, n, 0)?;
            trees.push(PartitionTree { root });
        }

        let mut trailing = [0u8; 1];
        match reader.inner.read(&mut trailing) {
            Ok(0) => {}
            Ok(_) => {
                return Err(ForestError::CorruptIndex(
                    "trailing data after last tree".into(),
                ))
            }
            Err(e) => return Err(ForestError::Io(e)),
        }

        debug!(ntree, n, dim, "forest loaded");

        Ok(ForestIndex {
            dim,
            n,
            metric,
            trees,
            metrics: None,
        })
    }

    /// Serialize the forest to an in-memory blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.save_forest(&mut buf)?;
        Ok(buf)
    }

    /// Deserialize a forest from an in-memory blob.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::load_forest(bytes)
    }

    /// Serialize the forest to a file.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save_forest(BufWriter::new(File::create(path)?))
    }

    /// Deserialize a forest from a file.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_forest(BufReader::new(File::open(path)?))
    }
}

fn write_node<W: Write>(writer: &mut W, node: &Node) -> Result<()> {
    match node {
        Node::Internal {
            normal,
            threshold,
            left,
            right,
        } => {
            writer.write_all(&[TAG_INTERNAL])?;
            writer.write_all(&threshold.to_le_bytes())?;
            for component in normal.iter() {
                writer.write_all(&component.to_le_bytes())?;
            }
            write_node(writer, left)?;
            write_node(writer, right)?;
        }
        Node::Leaf { items } => {
            writer.write_all(&[TAG_LEAF])?;
            writer.write_all(&(items.len() as u64).to_le_bytes())?;
            for &index in items {
                writer.write_all(&(index as u64).to_le_bytes())?;
            }
        }
    }
    Ok(())
}

fn read_node<R: Read>(
    reader: &mut BlobReader<R>,
    dim: usize,
    n: usize,
    depth: usize,
) -> Result<Node> {
    if depth > MAX_NODE_DEPTH {
        return Err(ForestError::CorruptIndex(format!(
            "tree deeper than {MAX_NODE_DEPTH} nodes"
        )));
    }

    match reader.read_u8()? {
        TAG_INTERNAL => {
            let threshold = reader.read_f32()?;
            let mut normal = Vec::with_capacity(dim);
            for _ in 0..dim {
                normal.push(reader.read_f32()?);
            }
            let left = read_node(reader, dim, n, depth + 1)?;
            let right = read_node(reader, dim, n, depth + 1)?;
            Ok(Node::Internal {
                normal: Array1::from_vec(normal),
                threshold,
                left: Box::new(left),
                right: Box::new(right),
            })
        }
        TAG_LEAF => {
            let count = reader.read_u64()? as usize;
            if count > n {
                return Err(ForestError::CorruptIndex(format!(
                    "leaf claims {count} members but forest holds {n} vectors"
                )));
            }
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                let index = reader.read_u64()? as usize;
                if index >= n {
                    return Err(ForestError::CorruptIndex(format!(
                        "leaf member index {index} out of range 0..{n}"
                    )));
                }
                items.push(index);
            }
            Ok(Node::Leaf { items })
        }
        tag => Err(ForestError::CorruptIndex(format!("unknown node tag {tag}"))),
    }
}

/// Byte-level reader that turns truncation into `CorruptIndex`.
struct BlobReader<R> {
    inner: R,
}

impl<R: Read> BlobReader<R> {
    fn read_bytes<const LEN: usize>(&mut self) -> Result<[u8; LEN]> {
        let mut buf = [0u8; LEN];
        self.inner.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                ForestError::CorruptIndex("unexpected end of data".into())
            } else {
                ForestError::Io(e)
            }
        })?;
        Ok(buf)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes::<1>()?[0])
    }

    fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_bytes::<4>()?))
    }

    fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_bytes::<8>()?))
    }
}

// ---------------------------------------------------------------------------
// Id map records
// ---------------------------------------------------------------------------

/// One persisted `(internal index, external id)` record.
#[derive(Debug, Serialize, Deserialize)]
struct IdRecord {
    idx: usize,
    id: String,
}

impl IdIndexMap {
    /// Write the map as JSON-lines records, one pair per line.
    pub fn save_records<W: Write>(&self, mut writer: W) -> Result<()> {
        for (idx, id) in self.iter() {
            let record = IdRecord {
                idx,
                id: id.to_string(),
            };
            serde_json::to_writer(&mut writer, &record).map_err(std::io::Error::from)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Rebuild a map from JSON-lines records, in any record order.
    pub fn load_records<R: BufRead>(reader: R) -> Result<Self> {
        let mut records = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: IdRecord = serde_json::from_str(&line).map_err(|e| {
                ForestError::CorruptIndex(format!("id record line {}: {e}", line_no + 1))
            })?;
            records.push((record.idx, record.id));
        }
        Self::from_records(records).map_err(|e| match e {
            ForestError::InvalidParameter(msg) => ForestError::CorruptIndex(msg),
            ForestError::DuplicateId(id) => {
                ForestError::CorruptIndex(format!("duplicate external id {id:?}"))
            }
            other => other,
        })
    }

    /// Write the map to a file.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save_records(BufWriter::new(File::create(path)?))
    }

    /// Read a map from a file.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_records(BufReader::new(File::open(path)?))
    }
}
