//! Paging and sorting modifiers shared by list operations.

use crate::error::{Result, SynoError};
use crate::request::ApiRequest;
use std::fmt;

/// Largest page the list APIs accept
pub const MAX_LIMIT: u32 = 5000;

/// Sort keys understood by the media list APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Title,
    SortTitle,
    Added,
    Year,
    ReleaseDate,
}

impl SortBy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::SortTitle => "sort_title",
            Self::Added => "added",
            Self::Year => "year",
            Self::ReleaseDate => "original_available",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

/// Optional `offset`/`limit`/`sort_by`/`sort_direction` modifiers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub offset: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<SortBy>,
    pub sort_direction: Option<SortDirection>,
}

impl ListOptions {
    #[must_use]
    pub fn page(offset: u32, limit: u32) -> Self {
        Self {
            offset: Some(offset),
            limit: Some(limit),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn sorted(mut self, sort_by: SortBy, direction: SortDirection) -> Self {
        self.sort_by = Some(sort_by);
        self.sort_direction = Some(direction);
        self
    }

    /// Appends the modifiers that are set, in `offset, limit, sort_by,
    /// sort_direction` order
    ///
    /// # Errors
    ///
    /// Returns [`SynoError::InvalidArgument`] if:
    /// - `limit` is zero or above [`MAX_LIMIT`]
    /// - `sort_direction` is given without `sort_by`
    pub fn apply(&self, request: ApiRequest) -> Result<ApiRequest> {
        if let Some(limit) = self.limit {
            if limit == 0 || limit > MAX_LIMIT {
                return Err(SynoError::InvalidArgument(format!(
                    "limit must be between 1 and {MAX_LIMIT}, got {limit}"
                )));
            }
        }
        if self.sort_direction.is_some() && self.sort_by.is_none() {
            return Err(SynoError::InvalidArgument(
                "sort_direction requires sort_by".into(),
            ));
        }
        Ok(request
            .param_opt("offset", self.offset)
            .param_opt("limit", self.limit)
            .param_opt("sort_by", self.sort_by)
            .param_opt("sort_direction", self.sort_direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_in_order() {
        let request = ListOptions::page(20, 10)
            .sorted(SortBy::Added, SortDirection::Desc)
            .apply(ApiRequest::new("X", "list").param("library_id", 3))
            .unwrap();
        assert_eq!(
            request.encode(),
            "webapi?api=X&method=list&library_id=3&offset=20&limit=10&sort_by=added&sort_direction=desc"
        );
    }

    #[test]
    fn test_defaults_add_nothing() {
        let request = ListOptions::default()
            .apply(ApiRequest::new("X", "list"))
            .unwrap();
        assert_eq!(request.params().count(), 0);
    }

    #[test]
    fn test_invalid_modifiers() {
        assert!(ListOptions::page(0, 0).apply(ApiRequest::default()).is_err());
        assert!(
            ListOptions::page(0, MAX_LIMIT + 1)
                .apply(ApiRequest::default())
                .is_err()
        );
        let direction_only = ListOptions {
            sort_direction: Some(SortDirection::Desc),
            ..ListOptions::default()
        };
        assert!(direction_only.apply(ApiRequest::default()).is_err());
    }
}
