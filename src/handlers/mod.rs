pub mod health;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod stores;
pub mod users;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Hard cap on page size for list endpoints.
pub const MAX_PAGE_SIZE: u64 = 100;

pub(crate) fn default_page() -> u64 {
    1
}

pub(crate) fn default_limit() -> u64 {
    20
}

/// The dashboard sends `all` (or an empty string) in a filter dropdown to
/// mean "no filter".
pub(crate) fn effective_filter(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

pub(crate) fn normalize_paging(page: u64, limit: u64) -> (u64, u64) {
    (page.max(1), limit.clamp(1, MAX_PAGE_SIZE))
}

/// Flattens validator output into per-field messages for the response body.
pub(crate) fn validation_messages(validation_errors: &validator::ValidationErrors) -> Vec<String> {
    validation_errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            let field = *field;
            errors.iter().map(move |error| {
                format!(
                    "{}: {}",
                    field,
                    error.message.as_ref().unwrap_or(&"Invalid value".into())
                )
            })
        })
        .collect()
}
