#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod library_service;
pub mod progress_service;
pub mod session;
pub mod throttle;

#[cfg(test)]
mod test_support;

pub use folio_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, ServiceError};
pub use library_service::LibraryService;
pub use progress_service::ProgressService;
pub use session::{SessionHandle, SessionProvider};
pub use throttle::{ThrottleConfig, ThrottledProgressWriter};
