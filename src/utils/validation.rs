use crate::utils::error::{AppError, AppResult};

fn is_printable(s: &str) -> bool {
    s.chars().all(|c| !c.is_control())
}

fn validate_name(kind: &str, name: &str, max_len: usize) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::Validation(format!("{} cannot be empty", kind)));
    }

    if name.chars().count() > max_len {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters long",
            kind, max_len
        )));
    }

    if !is_printable(name) {
        return Err(AppError::Validation(format!(
            "{} must contain only printable characters",
            kind
        )));
    }

    Ok(())
}

pub fn validate_username(username: &str) -> AppResult<()> {
    validate_name("Username", username, 64)?;

    if username.chars().any(char::is_whitespace) {
        return Err(AppError::Validation(
            "Username cannot contain whitespace".to_string(),
        ));
    }

    Ok(())
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    if password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be at most 128 characters long".to_string(),
        ));
    }

    Ok(())
}

pub fn validate_server_name(name: &str) -> AppResult<()> {
    validate_name("Server name", name, 100)
}

pub fn validate_category_name(name: &str) -> AppResult<()> {
    validate_name("Category name", name, 100)
}

pub fn validate_description(description: &str) -> AppResult<()> {
    if description.chars().count() > 250 {
        return Err(AppError::Validation(
            "Description must be at most 250 characters long".to_string(),
        ));
    }

    Ok(())
}
