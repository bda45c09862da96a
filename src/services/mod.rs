//! Business logic services

pub mod library;

pub use library::{LibraryService, Notice, NoticeLevel, Sourced};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub library: LibraryService,
}

impl Services {
    pub fn new(library: LibraryService) -> Self {
        Self { library }
    }
}
