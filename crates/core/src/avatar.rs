//! On-disk avatar storage.
//!
//! One flat directory, one file per owner named `<owner_id>.<ext>`. After a
//! successful [`AvatarResolver::replace`] the only file left for an owner is
//! `<owner_id>.webp`.
//!
//! `replace` deletes before it writes and takes no lock. A failure between
//! the two steps (including an unrecognized upload) leaves the owner with no
//! avatar, and concurrent uploads for one owner may interleave.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::image_codec::{self, ImageError, ImageFormat, DEFAULT_WEBP_QUALITY};

/// Candidate extensions in probe priority order.
pub const AVATAR_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "webp"];

static OWNER_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid regex"));

#[derive(Debug, thiserror::Error)]
pub enum AvatarError {
    #[error("Owner id {0:?} contains unsupported characters")]
    InvalidIdentifier(String),

    #[error("Avatar storage failed at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Image(#[from] ImageError),
}

/// An avatar file found by [`AvatarResolver::probe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAvatar {
    pub path: PathBuf,
    /// Format implied by the file extension, not by the file contents.
    pub format: ImageFormat,
}

#[derive(Debug, Clone)]
pub struct AvatarResolver {
    root: PathBuf,
    quality: f32,
}

impl AvatarResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            quality: DEFAULT_WEBP_QUALITY,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the storage directory if it does not exist yet.
    pub fn ensure_root(&self) -> Result<(), AvatarError> {
        std::fs::create_dir_all(&self.root).map_err(|source| AvatarError::Storage {
            path: self.root.clone(),
            source,
        })
    }

    fn validate_owner(owner_id: &str) -> Result<(), AvatarError> {
        if OWNER_ID_RE.is_match(owner_id) {
            Ok(())
        } else {
            Err(AvatarError::InvalidIdentifier(owner_id.to_string()))
        }
    }

    fn candidate(&self, owner_id: &str, ext: &str) -> PathBuf {
        self.root.join(format!("{owner_id}.{ext}"))
    }

    /// Every existing avatar file for `owner_id`, in priority order.
    fn existing(&self, owner_id: &str) -> Vec<StoredAvatar> {
        AVATAR_EXTENSIONS
            .iter()
            .filter_map(|ext| {
                let path = self.candidate(owner_id, ext);
                let format = ImageFormat::from_extension(ext)?;
                path.is_file().then_some(StoredAvatar { path, format })
            })
            .collect()
    }

    /// First existing avatar file for `owner_id`, if any.
    pub fn probe(&self, owner_id: &str) -> Result<Option<StoredAvatar>, AvatarError> {
        Self::validate_owner(owner_id)?;
        Ok(self.existing(owner_id).into_iter().next())
    }

    /// The avatar of `owner_id` as WebP bytes, transcoding a legacy
    /// non-WebP file on the fly. `None` when there is no avatar.
    pub fn load_webp(&self, owner_id: &str) -> Result<Option<Vec<u8>>, AvatarError> {
        let Some(found) = self.probe(owner_id)? else {
            return Ok(None);
        };
        let bytes = match std::fs::read(&found.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(AvatarError::Storage {
                    path: found.path,
                    source,
                })
            }
        };

        match image_codec::detect_format(&bytes) {
            Some(ImageFormat::WebP) => Ok(Some(bytes)),
            Some(actual) => Ok(Some(image_codec::transcode_to_webp(
                &bytes,
                actual,
                self.quality,
            )?)),
            None => Err(ImageError::UnrecognizedFormat.into()),
        }
    }

    /// Replace the avatar of `owner_id` with `raw`, stored as WebP.
    ///
    /// Existing files under every supported extension are removed first;
    /// a failed removal aborts the call.
    pub fn replace(&self, owner_id: &str, raw: &[u8]) -> Result<PathBuf, AvatarError> {
        Self::validate_owner(owner_id)?;

        for stale in self.existing(owner_id) {
            match std::fs::remove_file(&stale.path) {
                Ok(()) => {
                    tracing::debug!(owner_id, path = %stale.path.display(), "Removed previous avatar");
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(AvatarError::Storage {
                        path: stale.path,
                        source,
                    })
                }
            }
        }

        let format = image_codec::detect_format(raw).ok_or(ImageError::UnrecognizedFormat)?;
        let webp = match format {
            ImageFormat::WebP => raw.to_vec(),
            other => image_codec::transcode_to_webp(raw, other, self.quality)?,
        };

        let target = self.candidate(owner_id, ImageFormat::WebP.extension());
        std::fs::write(&target, &webp).map_err(|source| AvatarError::Storage {
            path: target.clone(),
            source,
        })?;

        tracing::info!(owner_id, %format, bytes = webp.len(), "Avatar stored");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::image_codec::tests::sample_image;

    fn resolver() -> (tempfile::TempDir, AvatarResolver) {
        let dir = tempfile::tempdir().unwrap();
        let resolver = AvatarResolver::new(dir.path());
        (dir, resolver)
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn probe_finds_nothing_in_empty_dir() {
        let (_dir, resolver) = resolver();
        assert_eq!(resolver.probe("42").unwrap(), None);
        assert_eq!(resolver.load_webp("42").unwrap(), None);
    }

    #[test]
    fn probe_prefers_png_over_jpg() {
        let (dir, resolver) = resolver();
        std::fs::write(dir.path().join("42.jpg"), b"jpg").unwrap();
        std::fs::write(dir.path().join("42.png"), b"png").unwrap();

        let found = resolver.probe("42").unwrap().unwrap();
        assert_eq!(found.path, dir.path().join("42.png"));
        assert_eq!(found.format, ImageFormat::Png);
    }

    #[test]
    fn probe_reports_format_from_extension() {
        let (dir, resolver) = resolver();
        std::fs::write(dir.path().join("7.jpeg"), b"x").unwrap();
        assert_eq!(
            resolver.probe("7").unwrap().unwrap().format,
            ImageFormat::Jpeg
        );
    }

    #[test]
    fn unsafe_owner_ids_are_rejected() {
        let resolver = AvatarResolver::new("/definitely/not/a/real/dir");
        for bad in ["../etc/passwd", "a/b", "a.b", "", "name with space", "..", "é"] {
            assert_matches!(
                resolver.probe(bad),
                Err(AvatarError::InvalidIdentifier(id)) if id == bad
            );
            assert_matches!(
                resolver.replace(bad, b"irrelevant"),
                Err(AvatarError::InvalidIdentifier(_))
            );
        }
        assert!(resolver.probe("user_01-a").unwrap().is_none());
    }

    #[test]
    fn replace_leaves_only_canonical_webp() {
        let (dir, resolver) = resolver();
        std::fs::write(dir.path().join("42.png"), b"old png").unwrap();
        std::fs::write(dir.path().join("42.gif"), b"old gif").unwrap();
        std::fs::write(dir.path().join("43.png"), b"someone else").unwrap();

        let path = resolver
            .replace("42", &sample_image(image::ImageFormat::Png))
            .unwrap();

        assert_eq!(path, dir.path().join("42.webp"));
        assert_eq!(files_in(dir.path()), vec!["42.webp", "43.png"]);

        let bytes = resolver.load_webp("42").unwrap().unwrap();
        assert_eq!(image_codec::detect_format(&bytes), Some(ImageFormat::WebP));
    }

    #[test]
    fn webp_upload_is_stored_verbatim() {
        let (dir, resolver) = resolver();
        let png = sample_image(image::ImageFormat::Png);
        let webp = image_codec::transcode_to_webp(&png, ImageFormat::Png, 0.8).unwrap();

        resolver.replace("42", &webp).unwrap();
        assert_eq!(std::fs::read(dir.path().join("42.webp")).unwrap(), webp);
    }

    #[test]
    fn unrecognized_upload_after_delete_leaves_no_avatar() {
        let (dir, resolver) = resolver();
        std::fs::write(dir.path().join("42.png"), b"old png").unwrap();

        let result = resolver.replace("42", b"plain text, not an image");

        assert_matches!(
            result,
            Err(AvatarError::Image(ImageError::UnrecognizedFormat))
        );
        // Delete-then-write is not atomic: the old file is already gone.
        assert!(files_in(dir.path()).is_empty());
        assert_eq!(resolver.probe("42").unwrap(), None);
    }

    #[test]
    fn concurrent_replaces_for_one_owner_interleave() {
        let png = sample_image(image::ImageFormat::Png);
        let jpeg = sample_image(image::ImageFormat::Jpeg);

        for _ in 0..20 {
            let (dir, resolver) = resolver();
            std::fs::write(dir.path().join("42.png"), b"stale").unwrap();

            let (first, second) = std::thread::scope(|s| {
                let a = s.spawn(|| resolver.replace("42", &png));
                let b = s.spawn(|| resolver.replace("42", &jpeg));
                (a.join().unwrap(), b.join().unwrap())
            });

            for result in [first, second] {
                assert_matches!(result, Ok(_) | Err(AvatarError::Storage { .. }));
            }

            // One call's delete can land on the other's fresh file, so the
            // owner may end up with a single webp or with nothing at all.
            let remaining = files_in(dir.path());
            assert!(
                remaining.is_empty() || remaining == ["42.webp"],
                "unexpected files: {remaining:?}"
            );
            if let Some(bytes) = resolver.load_webp("42").unwrap() {
                assert_eq!(image_codec::detect_format(&bytes), Some(ImageFormat::WebP));
            }
        }
    }

    #[test]
    fn legacy_png_is_served_as_webp() {
        let (dir, resolver) = resolver();
        std::fs::write(
            dir.path().join("42.png"),
            sample_image(image::ImageFormat::Png),
        )
        .unwrap();

        let bytes = resolver.load_webp("42").unwrap().unwrap();
        assert_eq!(image_codec::detect_format(&bytes), Some(ImageFormat::WebP));
        assert_eq!(files_in(dir.path()), vec!["42.png"]);
    }

    #[test]
    fn unreadable_stored_file_is_unrecognized() {
        let (dir, resolver) = resolver();
        std::fs::write(dir.path().join("42.gif"), b"not a gif").unwrap();
        assert_matches!(
            resolver.load_webp("42"),
            Err(AvatarError::Image(ImageError::UnrecognizedFormat))
        );
    }

    #[test]
    fn corrupt_upload_is_decode_error() {
        let (_dir, resolver) = resolver();
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(b"garbage");
        assert_matches!(
            resolver.replace("42", &bytes),
            Err(AvatarError::Image(ImageError::Decode { .. }))
        );
    }

    #[test]
    fn write_failure_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = AvatarResolver::new(dir.path().join("missing"));
        assert_matches!(
            resolver.replace("42", &sample_image(image::ImageFormat::Png)),
            Err(AvatarError::Storage { .. })
        );
    }

    #[test]
    fn ensure_root_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = AvatarResolver::new(dir.path().join("nested").join("avatars"));
        resolver.ensure_root().unwrap();
        assert!(resolver.root().is_dir());
    }
}
