//! Blob store seam for exercise images.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;

use crate::store::StoreError;

/// Prefix under which exercise images are stored.
pub const EXERCISE_IMAGES: &str = "exercise_images";

/// One of the two image slots an exercise carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSlot {
    /// `image_1`
    First,
    /// `image_2`
    Second,
}

impl ImageSlot {
    /// Both slots, in order.
    pub const ALL: [ImageSlot; 2] = [ImageSlot::First, ImageSlot::Second];

    /// Parses a slot from its wire form (`"1"` or `"2"`).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "1" => Some(ImageSlot::First),
            "2" => Some(ImageSlot::Second),
            _ => None,
        }
    }

    /// The slot number as used in keys and field names.
    pub fn number(self) -> u8 {
        match self {
            ImageSlot::First => 1,
            ImageSlot::Second => 2,
        }
    }

    /// Document field holding this slot's public URL.
    pub fn field_name(self) -> &'static str {
        match self {
            ImageSlot::First => "image_1",
            ImageSlot::Second => "image_2",
        }
    }
}

impl fmt::Display for ImageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Path-like key of a blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobKey(String);

impl BlobKey {
    /// Key of an exercise image: `exercise_images/{id}/{slot}.jpg`.
    pub fn exercise_image(exercise_id: &str, slot: ImageSlot) -> Self {
        Self(format!("{EXERCISE_IMAGES}/{exercise_id}/{slot}.jpg"))
    }

    /// Parses a key taken from a URL path.
    ///
    /// Surrounding slashes are ignored. Empty, `.` and `..` segments are
    /// rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim_matches('/');
        if key.is_empty()
            || key
                .split('/')
                .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return None;
        }
        Some(Self(key.to_string()))
    }

    /// The key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a best-effort blob deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobDeletion {
    /// The blob existed and was removed.
    Deleted,
    /// There was nothing to remove.
    NotFound,
    /// The store failed; the blob may still exist.
    Failed(StoreError),
}

/// Access to an object store.
pub trait BlobStore: Send + Sync {
    /// Stores a blob, makes it publicly readable and returns its public URL.
    fn upload(&self, key: &BlobKey, bytes: &[u8], content_type: &str)
        -> Result<String, StoreError>;

    /// Reads a blob back, if it exists.
    fn read(&self, key: &BlobKey) -> Result<Option<StoredBlob>, StoreError>;

    /// Removes a blob. Never fails; the outcome says what happened.
    fn delete(&self, key: &BlobKey) -> BlobDeletion;
}

/// A stored blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Raw content
    pub bytes: Vec<u8>,
    /// MIME type given at upload
    pub content_type: String,
}

/// An in-process blob store.
///
/// Public URLs are `{public_base_url}/{key}`. The portal router serves these
/// blobs under `/blobs/{key}`, so a base URL ending in `/blobs` on the
/// portal's own address yields working links.
///
/// # Examples
///
/// ```
/// use exercise_portal::{BlobKey, BlobStore, ImageSlot, MemoryBlobStore};
///
/// let blobs = MemoryBlobStore::new("http://cdn.test");
/// let key = BlobKey::exercise_image("squat", ImageSlot::First);
///
/// let url = blobs.upload(&key, b"jpeg", "image/jpeg").unwrap();
/// assert_eq!(url, "http://cdn.test/exercise_images/squat/1.jpg");
/// ```
#[derive(Debug)]
pub struct MemoryBlobStore {
    public_base_url: String,
    blobs: RwLock<HashMap<BlobKey, StoredBlob>>,
}

impl MemoryBlobStore {
    /// Creates an empty store serving blobs under `public_base_url`.
    pub fn new(public_base_url: impl Into<String>) -> Self {
        let mut public_base_url = public_base_url.into();
        while public_base_url.ends_with('/') {
            public_base_url.pop();
        }

        Self {
            public_base_url,
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Returns a copy of a stored blob.
    pub fn get(&self, key: &BlobKey) -> Option<StoredBlob> {
        self.blobs.read().get(key).cloned()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// Returns true if no blobs are stored.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    fn public_url(&self, key: &BlobKey) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

impl BlobStore for MemoryBlobStore {
    fn upload(
        &self,
        key: &BlobKey,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, StoreError> {
        self.blobs.write().insert(
            key.clone(),
            StoredBlob {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(self.public_url(key))
    }

    fn read(&self, key: &BlobKey) -> Result<Option<StoredBlob>, StoreError> {
        Ok(self.get(key))
    }

    fn delete(&self, key: &BlobKey) -> BlobDeletion {
        match self.blobs.write().remove(key) {
            Some(_) => BlobDeletion::Deleted,
            None => BlobDeletion::NotFound,
        }
    }
}
