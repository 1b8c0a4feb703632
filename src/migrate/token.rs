//! Splitting the `TYPE[.VERSION][.GROUP][/NAME]` argument.

use thiserror::Error;

/// The claim argument could not be split into a type and an instance name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// No `/NAME` suffix and no separate name.
    #[error(
        "missing name, must be provided separately 'TYPE[.VERSION][.GROUP] [NAME]' \
         or in the 'TYPE[.VERSION][.GROUP][/NAME]' format"
    )]
    MissingName,
    /// Both a `/NAME` suffix and a separate name.
    #[error(
        "name provided twice, must be provided separately 'TYPE[.VERSION][.GROUP] [NAME]' \
         or in the 'TYPE[.VERSION][.GROUP][/NAME]' format"
    )]
    NameDoubled,
    /// Empty, or more than one `/`.
    #[error("invalid resource, must be provided in the 'TYPE[.VERSION][.GROUP][/NAME]' format")]
    InvalidResource,
}

/// Splits `token` into `(type, name)`, taking the name either from a `/NAME`
/// suffix or from `name`, never both.
///
/// # Errors
///
/// Returns [`TokenError`] when the name is missing, doubled, or the token is
/// malformed.
pub fn parse_claim_token<'t>(
    token: &'t str,
    name: Option<&'t str>,
) -> Result<(&'t str, &'t str), TokenError> {
    if token.is_empty() {
        return Err(TokenError::InvalidResource);
    }
    let name = name.filter(|n| !n.is_empty());
    let mut parts = token.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(kind), None, _) => name.map(|n| (kind, n)).ok_or(TokenError::MissingName),
        (Some(_), Some(_), None) if name.is_some() => Err(TokenError::NameDoubled),
        (Some(kind), Some(inline), None) if !kind.is_empty() && !inline.is_empty() => {
            Ok((kind, inline))
        }
        _ => Err(TokenError::InvalidResource),
    }
}
