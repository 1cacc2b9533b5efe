use thiserror::Error;

/// Errors from identifier normalization.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    /// The identifier does not contain exactly 32 hexadecimal characters
    /// once dashes are stripped.
    #[error("invalid identifier `{id}`: expected 32 hex characters, found {found}")]
    InvalidIdentifier { id: String, found: usize },
}

/// Widths of the canonical `8-4-4-4-12` UUID groups.
const GROUP_WIDTHS: [usize; 5] = [8, 4, 4, 4, 12];

/// Reformats a hexadecimal identifier into the canonical dashed UUID form
/// the Notion API expects.
///
/// Dashes in the input are tolerated and stripped before regrouping, so the
/// function is idempotent on its own output.
///
/// # Errors
///
/// Returns [`IdError::InvalidIdentifier`] unless the stripped input is
/// exactly 32 hex characters.
pub fn to_dashed_id(raw: &str) -> Result<String, IdError> {
    let stripped: String = raw.chars().filter(|&c| c != '-').collect();

    if stripped.len() != 32 || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(IdError::InvalidIdentifier {
            id: raw.to_string(),
            found: stripped.chars().filter(|c| c.is_ascii_hexdigit()).count(),
        });
    }

    let mut out = String::with_capacity(36);
    let mut rest = stripped.as_str();
    for (i, width) in GROUP_WIDTHS.iter().enumerate() {
        let (group, tail) = rest.split_at(*width);
        if i > 0 {
            out.push('-');
        }
        out.push_str(group);
        rest = tail;
    }

    Ok(out)
}
