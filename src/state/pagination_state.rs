/// Pagination state definitions for listing crawls
///
/// The pagination driver walks listing pages through these states. Every
/// state other than `Loading` and `ProductsFound` ends the walk.
use std::fmt;

/// Current state of a listing pagination walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaginationState {
    // ===== Active States =====
    /// Page is being fetched
    Loading(u32),

    /// Page yielded at least one product
    ProductsFound { page: u32, count: usize },

    // ===== Terminal States =====
    /// Page had no result container, zero products, or could not be loaded
    Empty(u32),

    /// Page was an anti-automation challenge
    Blocked(u32),

    /// No next-page control was found before the requested page count
    NoMorePages(u32),

    /// All requested pages were read
    Done,
}

impl PaginationState {
    /// Returns true if the walk stops in this state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Loading(_) | Self::ProductsFound { .. })
    }
}

impl fmt::Display for PaginationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading(p) => write!(f, "Loading page {}", p),
            Self::ProductsFound { page, count } => {
                write!(f, "{} products found on page {}", count, page)
            }
            Self::Empty(p) => write!(f, "Empty page {}", p),
            Self::Blocked(p) => write!(f, "Blocked on page {}", p),
            Self::NoMorePages(p) => write!(f, "No more pages after page {}", p),
            Self::Done => write!(f, "Done"),
        }
    }
}
