pub mod ice_api;
pub mod listen_api;
pub mod offer_api;
pub mod util_api;

pub use ice_api::check_ice;
pub use listen_api::{listen, start_session, Trigger};
pub use offer_api::offer;
pub use util_api::disconnect;
