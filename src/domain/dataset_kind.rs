// ============================================================
// Layer 3 — Dataset Kind
// ============================================================
// The trainer understands three on-disk layouts. Each one has
// its own folder structure, label format and crop policy:
//
//   celeba      data/celebA/aligned/*.jpg
//               data/celebA/identity_celebA_train.txt
//               centre-crop 128 → resize
//
//   102flowers  data/102flowers/jpg/*.jpg
//               data/102flowers/imagelabels.mat
//               resize → centre-crop
//
//   3dchairs    data/rendered_chairs/train/<instance>/*.png
//               centre-crop 300 → resize

use serde::{Deserialize, Serialize};
use std::{fmt, path::{Path, PathBuf}, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetKind {
    #[serde(rename = "celeba")]
    CelebA,
    #[serde(rename = "102flowers")]
    Flowers102,
    #[serde(rename = "3dchairs")]
    Chairs3d,
}

/// How an image is brought to `size × size` before it becomes a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropPolicy {
    /// Centre-crop a fixed window first, then resize the shorter edge
    CropThenResize(u32),
    /// Resize the shorter edge first, then centre-crop to the output size
    ResizeThenCrop,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 3] = [Self::CelebA, Self::Flowers102, Self::Chairs3d];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CelebA     => "celeba",
            Self::Flowers102 => "102flowers",
            Self::Chairs3d   => "3dchairs",
        }
    }

    /// Directory holding the images, relative to the data root
    pub fn image_dir(&self, data_path: &Path) -> PathBuf {
        match self {
            Self::CelebA     => data_path.join("celebA").join("aligned"),
            Self::Flowers102 => data_path.join("102flowers").join("jpg"),
            Self::Chairs3d   => data_path.join("rendered_chairs").join("train"),
        }
    }

    /// Label file, if the layout has one (chairs use folder names)
    pub fn label_file(&self, data_path: &Path) -> Option<PathBuf> {
        match self {
            Self::CelebA     => Some(data_path.join("celebA").join("identity_celebA_train.txt")),
            Self::Flowers102 => Some(data_path.join("102flowers").join("imagelabels.mat")),
            Self::Chairs3d   => None,
        }
    }

    pub fn crop_policy(&self) -> CropPolicy {
        match self {
            Self::CelebA     => CropPolicy::CropThenResize(128),
            Self::Flowers102 => CropPolicy::ResizeThenCrop,
            Self::Chairs3d   => CropPolicy::CropThenResize(300),
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = String;

    /// Case-insensitive; also accepts the mixed-case spellings
    /// used by the dataset authors ("celebA", "3Dchairs").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == lower)
            .ok_or_else(|| format!(
                "unknown dataset '{s}' (expected one of: celeba, 102flowers, 3dchairs)"
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("celebA".parse::<DatasetKind>().unwrap(), DatasetKind::CelebA);
        assert_eq!("3Dchairs".parse::<DatasetKind>().unwrap(), DatasetKind::Chairs3d);
        assert_eq!("102flowers".parse::<DatasetKind>().unwrap(), DatasetKind::Flowers102);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "mnist".parse::<DatasetKind>().unwrap_err();
        assert!(err.contains("mnist"));
    }

    #[test]
    fn test_layout_paths() {
        let root = Path::new("/data");
        assert_eq!(
            DatasetKind::Chairs3d.image_dir(root),
            PathBuf::from("/data/rendered_chairs/train")
        );
        assert!(DatasetKind::Chairs3d.label_file(root).is_none());
        assert_eq!(
            DatasetKind::CelebA.label_file(root).unwrap(),
            PathBuf::from("/data/celebA/identity_celebA_train.txt")
        );
    }

    #[test]
    fn test_serde_names_match_display() {
        for kind in DatasetKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }
}
