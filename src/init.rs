pub mod context;
pub mod renderer;
pub mod window;
