// Game core as a library; the binary adds the terminal front end.
pub mod app;
pub mod app_dirs;
pub mod celebration;
pub mod clock;
pub mod preferences;
pub mod rating;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod store;
pub mod text;
pub mod util;
