pub mod blur;
pub mod context;
pub mod error;
pub mod foreman;
pub mod io;
pub mod pixels;
pub mod pool;
pub mod settings;
pub mod sources;
pub mod stages;
pub mod twopass;
