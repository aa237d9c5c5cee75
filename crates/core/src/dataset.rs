//! Loaders for the recognition database and query descriptor files.
//!
//! Three plain-text formats are supported:
//!
//! - **Label names** (`object.txt`): `label<TAB>name` per line.
//! - **Descriptor database** (`description.txt`): `label<TAB>source<TAB>f0<TAB>...<TAB>f(D-1)`
//!   per line, one line per reference descriptor. `source` records where the
//!   descriptor came from (usually the reference image) and is kept alongside.
//! - **Keypoint descriptors** (`*.surf`, written per image by the extractor):
//!   a `count dim` header, then `count` lines of
//!   `x y size laplacian d0 ... d(dim-1)`, whitespace-separated.
//!
//! Blank lines are ignored in all three formats.

use crate::error::MatchError;
use crate::vectors::{Label, VectorSet};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading or writing dataset files.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to access '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },

    /// A line could not be parsed. `line` is 1-based.
    #[error("{path}:{line}: {reason}")]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// A descriptor's length disagrees with the rest of the file.
    #[error("{path}:{line}: {source}")]
    Dimension {
        path: PathBuf,
        line: usize,
        source: MatchError,
    },

    #[error(transparent)]
    Invalid(#[from] MatchError),
}

/// Labeled reference descriptors plus the provenance column of each line.
#[derive(Debug, Clone)]
pub struct DescriptorDatabase {
    pub vectors: VectorSet,
    /// Second column of each line, parallel to `vectors`.
    pub provenance: Vec<String>,
}

/// One keypoint of a query image and its descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    /// Sign of the Laplacian at the keypoint.
    pub laplacian: i32,
    pub descriptor: Vec<f32>,
}

fn open(path: &Path) -> Result<BufReader<File>, LoadError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn parse_error(path: &Path, line: usize, reason: impl Into<String>) -> LoadError {
    LoadError::Parse {
        path: path.to_path_buf(),
        line,
        reason: reason.into(),
    }
}

/// Numbered non-blank lines of a reader, with I/O errors attributed to `path`.
fn content_lines<'p, R: BufRead + 'p>(
    reader: R,
    path: &'p Path,
) -> impl Iterator<Item = Result<(usize, String), LoadError>> + 'p {
    reader
        .lines()
        .enumerate()
        .map(move |(i, line)| {
            line.map(|l| (i + 1, l)).map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })
        })
        .filter(|item| !matches!(item, Ok((_, l)) if l.trim().is_empty()))
}

/// Labels index a vote table of `max label + 1` classes, so `Label::MAX` is reserved.
fn parse_label(path: &Path, line: usize, field: &str) -> Result<Label, LoadError> {
    let label = field
        .trim()
        .parse::<Label>()
        .map_err(|e| parse_error(path, line, format!("invalid label '{field}': {e}")))?;
    if label == Label::MAX {
        return Err(parse_error(
            path,
            line,
            format!("label {label} exceeds the maximum of {}", Label::MAX - 1),
        ));
    }
    Ok(label)
}

fn parse_float(path: &Path, line: usize, field: &str) -> Result<f32, LoadError> {
    field
        .trim()
        .parse::<f32>()
        .map_err(|e| parse_error(path, line, format!("invalid number '{field}': {e}")))
}

/// Loads the `label<TAB>name` table.
pub fn load_label_names(path: &Path) -> Result<BTreeMap<Label, String>, LoadError> {
    let names = read_label_names(open(path)?, path)?;
    tracing::info!(path = %path.display(), labels = names.len(), "Loaded label names");
    Ok(names)
}

/// Parses a label table from any reader; `path` is used in error messages.
/// A repeated label keeps its last name.
pub fn read_label_names<R: BufRead>(
    reader: R,
    path: &Path,
) -> Result<BTreeMap<Label, String>, LoadError> {
    let mut names = BTreeMap::new();
    for item in content_lines(reader, path) {
        let (line_no, line) = item?;
        let Some((label, name)) = line.split_once('\t') else {
            return Err(parse_error(path, line_no, "expected 'label<TAB>name'"));
        };
        let label = parse_label(path, line_no, label)?;
        if names.insert(label, name.trim_end().to_string()).is_some() {
            tracing::warn!(path = %path.display(), line = line_no, label, "Duplicate label name");
        }
    }
    Ok(names)
}

/// Loads the labeled descriptor database.
pub fn load_descriptor_database(path: &Path) -> Result<DescriptorDatabase, LoadError> {
    let db = read_descriptor_database(open(path)?, path)?;
    tracing::info!(
        path = %path.display(),
        descriptors = db.vectors.len(),
        dimension = db.vectors.dimension(),
        "Loaded descriptor database"
    );
    Ok(db)
}

/// Parses a descriptor database from any reader; `path` is used in error messages.
///
/// The dimension is fixed by the first line; any later line with a different
/// number of components fails with [`LoadError::Dimension`].
pub fn read_descriptor_database<R: BufRead>(
    reader: R,
    path: &Path,
) -> Result<DescriptorDatabase, LoadError> {
    let mut data: Vec<f32> = Vec::new();
    let mut labels: Vec<Label> = Vec::new();
    let mut provenance = Vec::new();
    let mut dimension: Option<usize> = None;

    for item in content_lines(reader, path) {
        let (line_no, line) = item?;
        let mut fields = line.split('\t');
        let label = match fields.next() {
            Some(field) => parse_label(path, line_no, field)?,
            None => return Err(parse_error(path, line_no, "missing label")),
        };
        let source = fields
            .next()
            .ok_or_else(|| parse_error(path, line_no, "missing source column"))?;

        let row_start = data.len();
        for field in fields.filter(|f| !f.trim().is_empty()) {
            data.push(parse_float(path, line_no, field)?);
        }
        let found = data.len() - row_start;
        if found == 0 {
            return Err(parse_error(path, line_no, "no descriptor components"));
        }
        let expected = *dimension.get_or_insert(found);
        if found != expected {
            return Err(LoadError::Dimension {
                path: path.to_path_buf(),
                line: line_no,
                source: MatchError::DimensionMismatch {
                    index: labels.len(),
                    expected,
                    found,
                },
            });
        }
        labels.push(label);
        provenance.push(source.to_string());
    }

    let vectors = match dimension {
        Some(dimension) => VectorSet::from_flat(dimension, data, labels)?,
        None => VectorSet::new(Vec::new(), Vec::new())?,
    };
    Ok(DescriptorDatabase {
        vectors,
        provenance,
    })
}

/// Loads the keypoints and descriptors extracted from one image.
pub fn load_keypoints(path: &Path) -> Result<Vec<Keypoint>, LoadError> {
    let keypoints = read_keypoints(open(path)?, path)?;
    tracing::debug!(path = %path.display(), keypoints = keypoints.len(), "Loaded keypoints");
    Ok(keypoints)
}

/// Parses a keypoint descriptor file from any reader; `path` is used in error messages.
///
/// A header of `0 dim` is valid and yields no keypoints.
pub fn read_keypoints<R: BufRead>(reader: R, path: &Path) -> Result<Vec<Keypoint>, LoadError> {
    let mut lines = content_lines(reader, path);
    let Some(header) = lines.next() else {
        return Err(parse_error(path, 1, "missing 'count dim' header"));
    };
    let (header_no, header) = header?;
    let header: Vec<&str> = header.split_whitespace().collect();
    let [count, dim] = header.as_slice() else {
        return Err(parse_error(path, header_no, "expected 'count dim' header"));
    };
    let count: usize = count
        .parse()
        .map_err(|e| parse_error(path, header_no, format!("invalid keypoint count: {e}")))?;
    let dim: usize = dim
        .parse()
        .map_err(|e| parse_error(path, header_no, format!("invalid dimension: {e}")))?;

    // The header is untrusted; grow past this as lines arrive.
    let mut keypoints = Vec::with_capacity(count.min(1024));
    for item in lines {
        let (line_no, line) = item?;
        if keypoints.len() == count {
            return Err(parse_error(
                path,
                line_no,
                format!("more than the {count} keypoints declared in the header"),
            ));
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len().checked_sub(4) != Some(dim) {
            return Err(LoadError::Dimension {
                path: path.to_path_buf(),
                line: line_no,
                source: MatchError::DimensionMismatch {
                    index: keypoints.len(),
                    expected: dim,
                    found: fields.len().saturating_sub(4),
                },
            });
        }
        let laplacian = fields[3]
            .parse::<i32>()
            .map_err(|e| parse_error(path, line_no, format!("invalid laplacian '{}': {e}", fields[3])))?;
        let descriptor = fields[4..]
            .iter()
            .map(|f| parse_float(path, line_no, f))
            .collect::<Result<Vec<f32>, _>>()?;
        keypoints.push(Keypoint {
            x: parse_float(path, line_no, fields[0])?,
            y: parse_float(path, line_no, fields[1])?,
            size: parse_float(path, line_no, fields[2])?,
            laplacian,
            descriptor,
        });
    }

    if keypoints.len() != count {
        return Err(parse_error(
            path,
            header_no,
            format!("header declares {count} keypoints, found {}", keypoints.len()),
        ));
    }
    Ok(keypoints)
}

/// Writes keypoints in the format [`load_keypoints`] reads.
///
/// All keypoints must share one descriptor dimension.
pub fn write_keypoints(path: &Path, keypoints: &[Keypoint]) -> Result<(), LoadError> {
    let dim = keypoints.first().map_or(0, |k| k.descriptor.len());
    if let Some((index, k)) = keypoints
        .iter()
        .enumerate()
        .find(|(_, k)| k.descriptor.len() != dim)
    {
        return Err(MatchError::DimensionMismatch {
            index,
            expected: dim,
            found: k.descriptor.len(),
        }
        .into());
    }

    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut out = BufWriter::new(file);
    writeln!(out, "{} {}", keypoints.len(), dim).map_err(io_err)?;
    for k in keypoints {
        write!(out, "{} {} {} {}", k.x, k.y, k.size, k.laplacian).map_err(io_err)?;
        for v in &k.descriptor {
            write!(out, " {v}").map_err(io_err)?;
        }
        writeln!(out).map_err(io_err)?;
    }
    out.flush().map_err(io_err)?;
    Ok(())
}
