use crate::models::content::{ContentSubmission, FieldError};

pub const TITLE_MAX_CHARS: usize = 255;
pub const CATEGORY_MAX_CHARS: usize = 100;
pub const AUTHOR_MAX_CHARS: usize = 100;
pub const TAGS_MAX_CHARS: usize = 500;

/// Validates a submission against the content field constraints.
///
/// Lengths are counted in characters, not bytes. Every failing field is
/// reported, so callers can render all errors inline at once.
pub fn validate_submission(submission: &ContentSubmission) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    if submission.title.trim().is_empty() {
        errors.push(FieldError::new("title", "Title is required"));
    } else if char_len(&submission.title) > TITLE_MAX_CHARS {
        errors.push(FieldError::new(
            "title",
            format!("Title must not exceed {TITLE_MAX_CHARS} characters"),
        ));
    }

    if submission.body.trim().is_empty() {
        errors.push(FieldError::new("body", "Body is required"));
    }

    check_max(
        &mut errors,
        "category",
        "Category",
        submission.category.as_deref(),
        CATEGORY_MAX_CHARS,
    );
    check_max(
        &mut errors,
        "author",
        "Author",
        submission.author.as_deref(),
        AUTHOR_MAX_CHARS,
    );
    check_max(
        &mut errors,
        "tags",
        "Tags",
        submission.tags.as_deref(),
        TAGS_MAX_CHARS,
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_max(
    errors: &mut Vec<FieldError>,
    field: &str,
    label: &str,
    value: Option<&str>,
    max: usize,
) {
    if let Some(v) = value {
        if char_len(v) > max {
            errors.push(FieldError::new(
                field,
                format!("{label} must not exceed {max} characters"),
            ));
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
