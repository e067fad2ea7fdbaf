use crate::server::response::ApiError;

const MAX_NAME_LEN: usize = 255;
const MAX_TITLE_LEN: usize = 255;

fn validate_name(name: &str, entity: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::bad_request(format!(
            "{entity} name cannot be empty"
        )));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "{entity} name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_space_name(name: &str) -> Result<(), ApiError> {
    validate_name(name, "Note space")
}

pub fn validate_tag_name(name: &str) -> Result<(), ApiError> {
    validate_name(name, "Tag")
}

pub fn validate_fullname(name: &str) -> Result<(), ApiError> {
    validate_name(name, "Full")
}

/// Titles may be empty (untitled note) but are length-capped.
pub fn validate_note_title(title: &str) -> Result<(), ApiError> {
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::bad_request(format!(
            "Note title cannot exceed {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}
