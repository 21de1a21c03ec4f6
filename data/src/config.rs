pub mod state;
pub mod theme;

pub use state::Settings;
pub use theme::Theme;
