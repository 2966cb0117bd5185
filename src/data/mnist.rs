//! MNIST in IDX format.
//!
//! Both files start with a big-endian header: a magic number (2051 for
//! images, 2049 for labels) and an item count; image files follow with the
//! row and column counts. Pixels are unsigned bytes and are quantized to
//! `[0, 127]` by halving.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use super::training::TrainingData;
use crate::core::QuantizedVector;
use crate::layers::Shape2;
use crate::network::SampleBatch;

pub const IMAGES_MAGIC: u32 = 2051;
pub const LABELS_MAGIC: u32 = 2049;

pub const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
pub const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";

/// A decoded image set with its labels.
#[derive(Clone, Debug)]
pub struct MnistDataset {
    images: Vec<QuantizedVector>,
    labels: Vec<usize>,
    shape: Shape2,
}

impl MnistDataset {
    /// Read the training image and label files from `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        Self::load(&dir.join(TRAIN_IMAGES), &dir.join(TRAIN_LABELS))
    }

    pub fn load(images: &Path, labels: &Path) -> Result<Self> {
        let image_bytes = fs::read(images)
            .with_context(|| format!("failed to read MNIST images '{}'", images.display()))?;
        let label_bytes = fs::read(labels)
            .with_context(|| format!("failed to read MNIST labels '{}'", labels.display()))?;
        let dataset = Self::parse(&image_bytes, &label_bytes)?;
        info!(
            images = dataset.len(),
            shape = %dataset.shape,
            "loaded MNIST from {}",
            images.display()
        );
        Ok(dataset)
    }

    pub fn parse(image_bytes: &[u8], label_bytes: &[u8]) -> Result<Self> {
        let (images, shape) = parse_images(image_bytes)?;
        let labels = parse_labels(label_bytes)?;
        if images.len() != labels.len() {
            bail!(
                "MNIST image count {} does not match label count {}",
                images.len(),
                labels.len()
            );
        }
        Ok(Self {
            images,
            labels,
            shape,
        })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn shape(&self) -> Shape2 {
        self.shape
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Items `[start, start + len)`, clipped to the dataset.
    pub fn to_training_data(&self, start: usize, len: usize) -> Result<TrainingData> {
        let start = start.min(self.len());
        let end = start.saturating_add(len).min(self.len());
        let batch = SampleBatch::Quantized(self.images[start..end].to_vec());
        Ok(TrainingData::from_batch(batch, self.labels[start..end].to_vec())?)
    }

    /// Everything as one training set.
    pub fn into_training_data(self) -> Result<TrainingData> {
        Ok(TrainingData::from_batch(
            SampleBatch::Quantized(self.images),
            self.labels,
        )?)
    }
}

struct Header<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Header<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn read_u32(&mut self, what: &str) -> Result<u32> {
        let end = self.offset + 4;
        let Some(chunk) = self.bytes.get(self.offset..end) else {
            bail!("IDX header truncated while reading {}", what);
        };
        self.offset = end;
        Ok(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
    }

    fn expect_magic(&mut self, magic: u32) -> Result<()> {
        let found = self.read_u32("magic number")?;
        if found != magic {
            bail!("bad IDX magic number: expected {}, found {}", magic, found);
        }
        Ok(())
    }

    fn body(&self, len: usize, what: &str) -> Result<&'a [u8]> {
        let Some(body) = self.bytes.get(self.offset..self.offset.saturating_add(len)) else {
            bail!(
                "{} truncated: need {} bytes after header, have {}",
                what,
                len,
                self.bytes.len().saturating_sub(self.offset)
            );
        };
        Ok(body)
    }
}

fn parse_images(bytes: &[u8]) -> Result<(Vec<QuantizedVector>, Shape2)> {
    let mut header = Header::new(bytes);
    header.expect_magic(IMAGES_MAGIC)?;
    let count = header.read_u32("image count")? as usize;
    let rows = header.read_u32("row count")? as usize;
    let cols = header.read_u32("column count")? as usize;
    let shape = Shape2::new(rows, cols);
    if shape.size() == 0 {
        bail!("IDX images declare an empty {} shape", shape);
    }

    let total = count
        .checked_mul(shape.size())
        .context("IDX image data size overflows")?;
    let pixels = header.body(total, "IDX image data")?;
    let images = pixels
        .chunks_exact(shape.size())
        .map(QuantizedVector::from_unsigned)
        .collect();
    Ok((images, shape))
}

fn parse_labels(bytes: &[u8]) -> Result<Vec<usize>> {
    let mut header = Header::new(bytes);
    header.expect_magic(LABELS_MAGIC)?;
    let count = header.read_u32("label count")? as usize;
    let body = header.body(count, "IDX label data")?;
    Ok(body.iter().map(|&b| b as usize).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn idx_bytes(images: &[Vec<u8>], labels: &[u8], rows: u32, cols: u32) -> (Vec<u8>, Vec<u8>) {
        let mut img = Vec::new();
        img.extend_from_slice(&IMAGES_MAGIC.to_be_bytes());
        img.extend_from_slice(&(images.len() as u32).to_be_bytes());
        img.extend_from_slice(&rows.to_be_bytes());
        img.extend_from_slice(&cols.to_be_bytes());
        for image in images {
            img.extend_from_slice(image);
        }
        let mut lbl = Vec::new();
        lbl.extend_from_slice(&LABELS_MAGIC.to_be_bytes());
        lbl.extend_from_slice(&(labels.len() as u32).to_be_bytes());
        lbl.extend_from_slice(labels);
        (img, lbl)
    }

    #[test]
    fn test_parse_quantizes_pixels() {
        let (img, lbl) = idx_bytes(&[vec![0, 255, 128, 3], vec![10; 4]], &[7, 2], 2, 2);
        let ds = MnistDataset::parse(&img, &lbl).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.shape(), Shape2::new(2, 2));
        assert_eq!(ds.labels(), &[7, 2]);
        let data = ds.to_training_data(0, 2).unwrap();
        let SampleBatch::Quantized(images) = data.inputs() else {
            panic!("expected quantized inputs");
        };
        assert_eq!(images[0].to_vec(), vec![0, 127, 64, 1]);
    }

    #[test]
    fn test_bad_magic() {
        let (mut img, lbl) = idx_bytes(&[vec![0; 4]], &[1], 2, 2);
        img[3] = 0x02;
        let err = MnistDataset::parse(&img, &lbl).unwrap_err();
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    fn test_truncated_images() {
        let (mut img, lbl) = idx_bytes(&[vec![0; 4], vec![0; 4]], &[1, 2], 2, 2);
        img.truncate(img.len() - 1);
        let err = MnistDataset::parse(&img, &lbl).unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_count_mismatch() {
        let (img, lbl) = idx_bytes(&[vec![0; 4]], &[1, 2], 2, 2);
        assert!(MnistDataset::parse(&img, &lbl).is_err());
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        let (img, lbl) = idx_bytes(&[vec![4; 9], vec![8; 9], vec![2; 9]], &[0, 1, 2], 3, 3);
        fs::File::create(dir.path().join(TRAIN_IMAGES))
            .unwrap()
            .write_all(&img)
            .unwrap();
        fs::File::create(dir.path().join(TRAIN_LABELS))
            .unwrap()
            .write_all(&lbl)
            .unwrap();
        let ds = MnistDataset::load_dir(dir.path()).unwrap();
        assert_eq!(ds.len(), 3);
        let window = ds.to_training_data(1, 10).unwrap();
        assert_eq!(window.labels(), &[1, 2]);
    }

    #[test]
    fn test_missing_file_has_context() {
        let dir = tempfile::tempdir().unwrap();
        let err = MnistDataset::load_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("failed to read MNIST images"));
    }
}
