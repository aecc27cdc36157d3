pub mod footer;
pub mod header;
pub mod utils;

pub use footer::draw_footer;
pub use header::{draw_header, extract_host};
pub use utils::{action_color, bar, subscribed_color, truncate};
