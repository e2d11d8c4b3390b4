//! Validation of a new issue before anything is uploaded or stored.

use std::fmt;

use crate::types::Location;

/// Minimum title length, in characters.
pub const MIN_TITLE_CHARS: usize = 5;
/// Minimum description length, in characters.
pub const MIN_DESCRIPTION_CHARS: usize = 20;
/// Largest accepted image, in bytes (5 MiB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// A single reason a draft was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("Title must be at least 5 characters")]
    TitleTooShort,
    #[error("Description must be at least 20 characters")]
    DescriptionTooShort,
    #[error("Image must be at most 5 MB")]
    ImageTooLarge { size: usize },
    #[error("Only image files can be attached")]
    UnsupportedImageType(String),
    #[error("Please detect your location first")]
    LocationMissing,
}

impl DraftError {
    /// Form field the error belongs to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::TitleTooShort => "title",
            Self::DescriptionTooShort => "description",
            Self::ImageTooLarge { .. } | Self::UnsupportedImageType(_) => "image",
            Self::LocationMissing => "location",
        }
    }
}

/// An image chosen for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl ImageUpload {
    /// File extension derived from the content type.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/heic" => "heic",
            _ => "bin",
        }
    }
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Everything a citizen fills in on the report form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueDraft {
    pub title: String,
    pub description: String,
    pub image: Option<ImageUpload>,
    pub location: Option<Location>,
}

impl IssueDraft {
    /// Check every rule and return all violations together.
    ///
    /// Lengths are counted in characters, as typed.
    ///
    /// # Errors
    ///
    /// Returns the list of violations when the draft is not acceptable.
    pub fn validate(&self) -> Result<(), Vec<DraftError>> {
        let mut errors = Vec::new();

        if self.title.chars().count() < MIN_TITLE_CHARS {
            errors.push(DraftError::TitleTooShort);
        }
        if self.description.chars().count() < MIN_DESCRIPTION_CHARS {
            errors.push(DraftError::DescriptionTooShort);
        }
        if let Some(image) = &self.image {
            if !image.content_type.starts_with("image/") {
                errors.push(DraftError::UnsupportedImageType(image.content_type.clone()));
            }
            if image.data.len() > MAX_IMAGE_BYTES {
                errors.push(DraftError::ImageTooLarge {
                    size: image.data.len(),
                });
            }
        }
        if self.location.is_none() {
            errors.push(DraftError::LocationMissing);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid_draft() -> IssueDraft {
        IssueDraft {
            title: "Broken swing".to_owned(),
            description: "The left swing chain snapped yesterday".to_owned(),
            image: None,
            location: Some(Location::new(40.72, -74.0, "Riverside Park").unwrap()),
        }
    }

    #[test]
    fn test_valid_draft_passes() {
        assert_eq!(valid_draft().validate(), Ok(()));
    }

    #[test]
    fn test_description_boundary() {
        let mut draft = valid_draft();
        draft.description = "a".repeat(19);
        assert_eq!(draft.validate(), Err(vec![DraftError::DescriptionTooShort]));

        draft.description = "a".repeat(20);
        assert_eq!(draft.validate(), Ok(()));
    }

    #[test]
    fn test_padded_input_counts_as_typed() {
        let mut draft = valid_draft();
        draft.description = format!(" {}", "a".repeat(19));
        assert_eq!(draft.description.chars().count(), 20);
        assert_eq!(draft.validate(), Ok(()));

        draft.title = "  abc".to_owned();
        assert_eq!(draft.validate(), Ok(()));

        draft.title = " abc".to_owned();
        assert_eq!(draft.validate(), Err(vec![DraftError::TitleTooShort]));
    }

    #[test]
    fn test_lengths_count_characters_not_bytes() {
        let mut draft = valid_draft();
        draft.title = "ñandú".to_owned();
        assert_eq!(draft.validate(), Ok(()));
    }

    #[test]
    fn test_missing_location_is_reported() {
        let mut draft = valid_draft();
        draft.location = None;
        let errors = draft.validate().unwrap_err();
        assert_eq!(errors, vec![DraftError::LocationMissing]);
        assert_eq!(errors[0].to_string(), "Please detect your location first");
    }

    #[test]
    fn test_image_rules() {
        let mut draft = valid_draft();
        draft.image = Some(ImageUpload {
            file_name: "big.png".to_owned(),
            content_type: "image/png".to_owned(),
            data: vec![0; MAX_IMAGE_BYTES + 1],
        });
        assert!(matches!(
            draft.validate().unwrap_err().as_slice(),
            [DraftError::ImageTooLarge { .. }]
        ));

        draft.image = Some(ImageUpload {
            file_name: "notes.txt".to_owned(),
            content_type: "text/plain".to_owned(),
            data: vec![1, 2, 3],
        });
        assert_eq!(
            draft.validate().unwrap_err(),
            vec![DraftError::UnsupportedImageType("text/plain".to_owned())]
        );
    }

    #[test]
    fn test_all_errors_collected() {
        let draft = IssueDraft::default();
        let fields: Vec<_> = draft
            .validate()
            .unwrap_err()
            .iter()
            .map(DraftError::field)
            .collect();
        assert_eq!(fields, vec!["title", "description", "location"]);
    }
}
