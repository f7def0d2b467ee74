// ============================================================
// Layer 4 — Pair Sources
// ============================================================
// One PairSource per supported directory layout. A source only
// indexes file paths and labels; it never decodes an image.
//
// Pair drawing rules:
//   CelebA   item i = file i + random file with the same identity
//   Chairs   item i = two random renders (with replacement)
//            from instance folder i, label = i
//   Flowers  item i = file i + random file of the same category
//
// The partner image is drawn uniformly from the whole label
// group, so an image can be paired with itself.
//
// Reference: rand crate documentation (SliceRandom::choose)

use anyhow::{anyhow, bail, Context, Result};
use rand::{seq::SliceRandom, RngCore};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::domain::{dataset_kind::DatasetKind, pair::PairRecord, traits::PairSource};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "ppm", "gif"];

/// Build the source for a dataset layout rooted at `data_path`.
pub fn open_source(kind: DatasetKind, data_path: &Path) -> Result<Box<dyn PairSource>> {
    let image_dir = kind.image_dir(data_path);
    let source: Box<dyn PairSource> = match kind {
        DatasetKind::CelebA => {
            let labels = kind.label_file(data_path)
                .ok_or_else(|| anyhow!("celebA layout has no label file"))?;
            Box::new(CelebaIdentities::open(&image_dir, &labels)?)
        }
        DatasetKind::Flowers102 => {
            let labels = kind.label_file(data_path)
                .ok_or_else(|| anyhow!("102flowers layout has no label file"))?;
            Box::new(FlowerCategories::open(&image_dir, &labels)?)
        }
        DatasetKind::Chairs3d => Box::new(ChairRenders::open(&image_dir)?),
    };

    tracing::info!("Indexed {} items from '{}' ({})", source.len(), image_dir.display(), kind);
    Ok(source)
}

/// Image files directly inside `dir`, sorted by file name.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Cannot read image directory '{}'", dir.display()))?
    {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if path.is_file() && is_image {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Index positions grouped by label
fn group_by_label(labels: &[i64]) -> HashMap<i64, Vec<usize>> {
    let mut groups: HashMap<i64, Vec<usize>> = HashMap::new();
    for (i, &label) in labels.iter().enumerate() {
        groups.entry(label).or_default().push(i);
    }
    groups
}

fn check_index(name: &str, index: usize, len: usize) -> Result<()> {
    if index >= len {
        bail!("{name}: index {index} out of range (len {len})");
    }
    Ok(())
}

// ─── CelebA ───────────────────────────────────────────────────────────────────

/// Faces grouped by identity, as listed in the identity label file.
pub struct CelebaIdentities {
    files:  Vec<PathBuf>,
    labels: Vec<i64>,
    groups: HashMap<i64, Vec<usize>>,
}

impl CelebaIdentities {
    pub fn open(image_dir: &Path, label_file: &Path) -> Result<Self> {
        let text = fs::read_to_string(label_file)
            .with_context(|| format!("Cannot read label file '{}'", label_file.display()))?;
        let entries = parse_identity_file(&text)
            .with_context(|| format!("Malformed label file '{}'", label_file.display()))?;

        let (names, labels): (Vec<String>, Vec<i64>) = entries.into_iter().unzip();
        let files = names.iter().map(|n| image_dir.join(n)).collect();
        Ok(Self::from_parts(files, labels))
    }

    pub fn from_parts(files: Vec<PathBuf>, labels: Vec<i64>) -> Self {
        let groups = group_by_label(&labels);
        Self { files, labels, groups }
    }

    pub fn identity_count(&self) -> usize {
        self.groups.len()
    }
}

/// Parse `"<file> <identity>"` lines. Blank lines are skipped;
/// anything else that does not have both columns is an error.
pub fn parse_identity_file(text: &str) -> Result<Vec<(String, i64)>> {
    let mut entries = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let mut cols = line.split_whitespace();
        let Some(file) = cols.next() else { continue };
        let label = cols
            .next()
            .ok_or_else(|| anyhow!("line {}: missing identity column", line_no + 1))?
            .parse::<i64>()
            .with_context(|| format!("line {}: identity is not an integer", line_no + 1))?;
        entries.push((file.to_string(), label));
    }
    Ok(entries)
}

impl PairSource for CelebaIdentities {
    fn name(&self) -> &str {
        "celeba"
    }

    fn len(&self) -> usize {
        self.files.len()
    }

    fn pick_pair(&self, index: usize, rng: &mut dyn RngCore) -> Result<PairRecord> {
        check_index(self.name(), index, self.len())?;
        let label = self.labels[index];
        // Every label has at least its own index in the group
        let partner = self.groups
            .get(&label)
            .and_then(|g| g.choose(rng))
            .copied()
            .unwrap_or(index);
        Ok(PairRecord::new(&self.files[index], &self.files[partner], label))
    }
}

// ─── 3D chairs ────────────────────────────────────────────────────────────────

/// One folder of renders per chair instance.
pub struct ChairRenders {
    instances: Vec<Vec<PathBuf>>,
}

impl ChairRenders {
    pub fn open(root: &Path) -> Result<Self> {
        let mut folders: Vec<PathBuf> = fs::read_dir(root)
            .with_context(|| format!("Cannot read chairs directory '{}'", root.display()))?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_dir())
            .collect();
        folders.sort();

        let mut instances = Vec::with_capacity(folders.len());
        for folder in folders {
            let renders = list_images(&folder)?;
            if renders.is_empty() {
                tracing::warn!("Skipping '{}': no images", folder.display());
                continue;
            }
            instances.push(renders);
        }
        Ok(Self { instances })
    }

    pub fn from_instances(instances: Vec<Vec<PathBuf>>) -> Self {
        Self { instances: instances.into_iter().filter(|i| !i.is_empty()).collect() }
    }
}

impl PairSource for ChairRenders {
    fn name(&self) -> &str {
        "3dchairs"
    }

    fn len(&self) -> usize {
        self.instances.len()
    }

    fn pick_pair(&self, index: usize, rng: &mut dyn RngCore) -> Result<PairRecord> {
        check_index(self.name(), index, self.len())?;
        let renders = &self.instances[index];
        let first  = renders.choose(&mut *rng).ok_or_else(|| anyhow!("instance {index} is empty"))?;
        let second = renders.choose(rng).ok_or_else(|| anyhow!("instance {index} is empty"))?;
        Ok(PairRecord::new(first, second, index as i64))
    }
}

// ─── 102 flowers ──────────────────────────────────────────────────────────────

/// Flower photos grouped by category, labels from `imagelabels.mat`.
pub struct FlowerCategories {
    files:  Vec<PathBuf>,
    labels: Vec<i64>,
    groups: HashMap<i64, Vec<usize>>,
}

impl FlowerCategories {
    pub fn open(image_dir: &Path, mat_file: &Path) -> Result<Self> {
        let files  = list_images(image_dir)?;
        let labels = read_mat_labels(mat_file, "labels")?;
        Self::from_parts(files, labels)
    }

    /// Files must already be sorted; label `i` belongs to file `i`.
    pub fn from_parts(files: Vec<PathBuf>, labels: Vec<i64>) -> Result<Self> {
        if files.len() != labels.len() {
            bail!(
                "102flowers: {} images but {} labels",
                files.len(),
                labels.len()
            );
        }
        let groups = group_by_label(&labels);
        Ok(Self { files, labels, groups })
    }
}

/// Read a numeric MATLAB v5 variable as integer labels.
pub fn read_mat_labels(path: &Path, variable: &str) -> Result<Vec<i64>> {
    let file = fs::File::open(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))?;
    let mat = matfile::MatFile::parse(file)
        .map_err(|e| anyhow!("Cannot parse MATLAB file '{}': {:?}", path.display(), e))?;
    let array = mat
        .find_by_name(variable)
        .ok_or_else(|| anyhow!("'{}' has no variable '{variable}'", path.display()))?;

    use matfile::NumericData;
    #[allow(unreachable_patterns)]
    let labels = match array.data() {
        NumericData::Double { real, .. } => real.iter().map(|&v| v as i64).collect(),
        NumericData::Single { real, .. } => real.iter().map(|&v| v as i64).collect(),
        NumericData::Int8   { real, .. } => real.iter().map(|&v| v as i64).collect(),
        NumericData::UInt8  { real, .. } => real.iter().map(|&v| v as i64).collect(),
        NumericData::Int16  { real, .. } => real.iter().map(|&v| v as i64).collect(),
        NumericData::UInt16 { real, .. } => real.iter().map(|&v| v as i64).collect(),
        NumericData::Int32  { real, .. } => real.iter().map(|&v| v as i64).collect(),
        NumericData::UInt32 { real, .. } => real.iter().map(|&v| v as i64).collect(),
        NumericData::Int64  { real, .. } => real.clone(),
        NumericData::UInt64 { real, .. } => real.iter().map(|&v| v as i64).collect(),
        _ => bail!("'{variable}' in '{}' is not a numeric array", path.display()),
    };
    Ok(labels)
}

impl PairSource for FlowerCategories {
    fn name(&self) -> &str {
        "102flowers"
    }

    fn len(&self) -> usize {
        self.files.len()
    }

    fn pick_pair(&self, index: usize, rng: &mut dyn RngCore) -> Result<PairRecord> {
        check_index(self.name(), index, self.len())?;
        let label = self.labels[index];
        let partner = self.groups
            .get(&label)
            .and_then(|g| g.choose(rng))
            .copied()
            .unwrap_or(index);
        Ok(PairRecord::new(&self.files[index], &self.files[partner], label))
    }
}
