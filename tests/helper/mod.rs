pub mod fetcher;
pub mod page;
pub mod store;

#[allow(unused_imports)]
pub use fetcher::ScriptedFetcher;
#[allow(unused_imports)]
pub use page::{PKG_URL, installer_page, installer_row, section};
#[allow(unused_imports)]
pub use store::{create_test_checker, create_test_store, fixed_clock};
