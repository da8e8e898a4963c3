pub mod autach;
pub mod html_listing;

pub use autach::AutachSource;
pub use html_listing::HtmlListingSource;
