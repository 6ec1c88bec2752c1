pub mod category;
pub mod config;
pub mod error;
pub mod extract;
pub mod pagination;
pub mod render;
pub mod result;
pub mod retry;

pub use category::Category;
pub use config::{BrowserOptions, Pacing, ScrapeConfig};
pub use error::ScanError;
pub use pagination::{Paginator, ProgressCallback};
pub use render::{ChromeRenderer, HtmlRenderer, Renderer};
pub use result::{CollectionReport, PageProgress, StopReason};
pub use retry::RetryPolicy;
