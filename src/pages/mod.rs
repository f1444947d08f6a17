//! Page objects: fixed multi-step flows over the [`Actor`](crate::driver::Actor)
pub mod left_menu;
pub mod mobile;

pub use left_menu::LeftMenuPage;
pub use mobile::MobileComponent;
