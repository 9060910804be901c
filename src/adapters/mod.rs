// Adapters layer: concrete implementations for external systems (storage, http, events page, geocoding)

pub mod events_page;
pub mod geocode;
pub mod http;
pub mod storage;

pub use events_page::EventsPageSource;
pub use geocode::{Geocoder, LocationCache};
pub use http::HttpRecordFetcher;
pub use storage::LocalStorage;
