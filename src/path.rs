//! Path decomposition shared by route registration and lookup.

use crate::error::InsertError;

use std::borrow::Cow;
use std::str::Split;

/// One component of a registered route pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'p> {
    /// Matched by exact text.
    Literal(&'p str),
    /// `:name`, matched by any non-empty component.
    Param(&'p str),
}

/// Splits a registered route pattern into its segments.
///
/// `"/"` decomposes into no segments at all and therefore addresses the root.
/// A single trailing slash is ignored, so `/users/` and `/users` are the same
/// route.
pub(crate) fn segments(path: &str) -> Result<Vec<Segment<'_>>, InsertError> {
    if !path.starts_with('/') {
        return Err(InsertError::MissingLeadingSlash {
            path: path.to_owned(),
        });
    }

    if path == "/" {
        return Ok(Vec::new());
    }

    let mut segments: Vec<Segment<'_>> = Vec::new();

    for component in components(path) {
        let segment = match component.strip_prefix(':') {
            Some("") => {
                return Err(InsertError::EmptySegment {
                    path: path.to_owned(),
                })
            }
            Some(name) => {
                let reused = segments
                    .iter()
                    .any(|segment| *segment == Segment::Param(name));

                if reused {
                    return Err(InsertError::DuplicateParam {
                        path: path.to_owned(),
                        name: name.to_owned(),
                    });
                }

                Segment::Param(name)
            }
            None if component.is_empty() => {
                return Err(InsertError::EmptySegment {
                    path: path.to_owned(),
                })
            }
            None if component.contains(':') => {
                return Err(InsertError::MisplacedParam {
                    path: path.to_owned(),
                })
            }
            None => Segment::Literal(component),
        };

        segments.push(segment);
    }

    Ok(segments)
}

/// Splits a request path into the components walked during lookup.
///
/// The leading slash and one optional trailing slash are dropped. Everything
/// else, empty components included, is kept as is.
pub(crate) fn components(path: &str) -> Split<'_, char> {
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.strip_suffix('/').unwrap_or(path);
    path.split('/')
}

/// Lowercases `path` unless matching is case sensitive.
///
/// Folds with [`str::to_lowercase`], the same mapping applied to literals on
/// insert. Titlecase letters such as `ǅ` fold too.
pub(crate) fn normalize(path: &str, case_sensitive: bool) -> Cow<'_, str> {
    if case_sensitive || is_folded(path) {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(path.to_lowercase())
    }
}

fn is_folded(path: &str) -> bool {
    if path.is_ascii() {
        return !path.bytes().any(|b| b.is_ascii_uppercase());
    }

    path.chars().all(|c| {
        let mut lower = c.to_lowercase();
        lower.next() == Some(c) && lower.next().is_none()
    })
}
