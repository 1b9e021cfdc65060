pub mod batch;
pub mod ping;
pub mod redirect;
pub mod shorten;
pub mod stats;
pub mod urls;

pub use batch::shorten_batch;
pub use ping::ping;
pub use redirect::redirect;
pub use shorten::{shorten_json, shorten_text};
pub use stats::stats;
pub use urls::{delete_user_urls, list_user_urls};
